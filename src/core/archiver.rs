/*
 * Expands content templates and aggregates the expansions of many files into
 * one text block. A template may contain the tokens `{name}` (the file's
 * relative path) and `{code}` (its verbatim content). Substitution is a single
 * left-to-right pass, so text inserted for one token is never re-scanned for
 * another.
 *
 * File contents are read through `FileReaderOperations` so tests can inject
 * failures. Unreadable files are skipped and counted; they never abort the run.
 */
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const NAME_TOKEN: &str = "{name}";
pub const CODE_TOKEN: &str = "{code}";
pub const DEFAULT_TEMPLATE: &str = "File: {name}\n```\n{code}\n```\n";
pub const FILE_CONTENTS_HEADER: &str = "File Contents:";

/*
 * Abstracts reading a selected file's content. Non-UTF-8 bytes are passed
 * through lossily by the core implementation; no binary detection happens.
 */
pub trait FileReaderOperations: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

pub struct CoreFileReader {}

impl CoreFileReader {
    pub fn new() -> Self {
        CoreFileReader {}
    }
}

impl Default for CoreFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileReaderOperations for CoreFileReader {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = fs::read(path)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/*
 * The result of aggregating a selection. `skipped` lists, in order, the
 * relative paths that could not be read so the caller can surface a warning.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateOutcome {
    pub content: String,
    pub skipped: Vec<String>,
}

impl AggregateOutcome {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

pub fn expand_one(template: &str, relative_path: &str, content: &str) -> String {
    let mut out = String::with_capacity(template.len() + relative_path.len() + content.len());
    let mut rest = template;
    loop {
        let next_name = rest.find(NAME_TOKEN);
        let next_code = rest.find(CODE_TOKEN);
        let (index, token, replacement) = match (next_name, next_code) {
            (Some(n), Some(c)) if c < n => (c, CODE_TOKEN, content),
            (Some(n), _) => (n, NAME_TOKEN, relative_path),
            (None, Some(c)) => (c, CODE_TOKEN, content),
            (None, None) => break,
        };
        out.push_str(&rest[..index]);
        out.push_str(replacement);
        rest = &rest[index + token.len()..];
    }
    out.push_str(rest);
    out
}

/*
 * Expands `template` for every `(relative_path, absolute_path)` entry in the
 * given order, each expansion followed by a blank-line separator.
 */
pub fn aggregate(
    template: &str,
    entries: &[(String, PathBuf)],
    reader: &dyn FileReaderOperations,
) -> AggregateOutcome {
    let mut outcome = AggregateOutcome::default();
    for (relative_path, absolute_path) in entries {
        match reader.read_to_string(absolute_path) {
            Ok(content) => {
                outcome
                    .content
                    .push_str(&expand_one(template, relative_path, &content));
                outcome.content.push('\n');
            }
            Err(e) => {
                log::warn!("Archiver: Skipping unreadable file {absolute_path:?}: {e}");
                outcome.skipped.push(relative_path.clone());
            }
        }
    }
    log::debug!(
        "Archiver: Aggregated {} of {} files ({} skipped).",
        entries.len() - outcome.skipped.len(),
        entries.len(),
        outcome.skipped.len()
    );
    outcome
}

/*
 * Joins the structure text and the aggregated contents into the full context
 * block: structure, a blank line, then the "File Contents:" section.
 */
pub fn compose_full_context(structure_text: &str, contents: &str) -> String {
    format!("{structure_text}\n\n{FILE_CONTENTS_HEADER}\n{contents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    struct MockFileReader {
        contents: HashMap<PathBuf, String>,
    }

    impl FileReaderOperations for MockFileReader {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.contents
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mocked missing file"))
        }
    }

    #[test]
    fn test_expand_one_default_template() {
        assert_eq!(
            expand_one(DEFAULT_TEMPLATE, "a/b.txt", "X"),
            "File: a/b.txt\n```\nX\n```\n"
        );
    }

    #[test]
    fn test_expand_one_replaces_every_occurrence() {
        assert_eq!(
            expand_one("{name}|{code}|{name}|{code}", "n", "c"),
            "n|c|n|c"
        );
        assert_eq!(expand_one("no tokens here", "n", "c"), "no tokens here");
    }

    #[test]
    fn test_expand_one_does_not_rescan_inserted_text() {
        assert_eq!(
            expand_one("{name}: {code}", "weird{code}.txt", "uses {name} literally"),
            "weird{code}.txt: uses {name} literally"
        );
    }

    #[test]
    fn test_aggregate_follows_given_order_and_separates_with_blank_line() {
        let reader = MockFileReader {
            contents: HashMap::from([
                (PathBuf::from("/p/a.txt"), "A".to_string()),
                (PathBuf::from("/p/b.txt"), "B".to_string()),
            ]),
        };
        let entries = vec![
            ("b.txt".to_string(), PathBuf::from("/p/b.txt")),
            ("a.txt".to_string(), PathBuf::from("/p/a.txt")),
        ];

        let outcome = aggregate("{name}={code}\n", &entries, &reader);

        assert_eq!(outcome.content, "b.txt=B\n\na.txt=A\n\n");
        assert_eq!(outcome.skipped_count(), 0);
    }

    #[test]
    fn test_aggregate_skips_unreadable_files_and_counts_them() {
        let reader = MockFileReader {
            contents: HashMap::from([(PathBuf::from("/p/ok.txt"), "fine".to_string())]),
        };
        let entries = vec![
            ("gone.txt".to_string(), PathBuf::from("/p/gone.txt")),
            ("ok.txt".to_string(), PathBuf::from("/p/ok.txt")),
        ];

        let outcome = aggregate("{name}:{code}", &entries, &reader);

        assert_eq!(outcome.content, "ok.txt:fine\n");
        assert_eq!(outcome.skipped, vec!["gone.txt".to_string()]);
        assert_eq!(outcome.skipped_count(), 1);
    }

    #[test]
    fn test_core_file_reader_reads_disk_and_passes_invalid_utf8_through() -> io::Result<()> {
        let dir = tempdir()?;
        let text_path = dir.path().join("text.txt");
        std::fs::write(&text_path, "hello\n")?;
        let bin_path = dir.path().join("blob.bin");
        let mut f = std::fs::File::create(&bin_path)?;
        f.write_all(&[b'o', b'k', 0xFF])?;

        let reader = CoreFileReader::new();

        assert_eq!(reader.read_to_string(&text_path)?, "hello\n");
        assert_eq!(reader.read_to_string(&bin_path)?, "ok\u{FFFD}");
        assert!(reader.read_to_string(&dir.path().join("missing")).is_err());
        Ok(())
    }

    #[test]
    fn test_compose_full_context_layout() {
        let full = compose_full_context("Project Structure:\np\n└── a.txt\n", "body\n");
        assert_eq!(
            full,
            "Project Structure:\np\n└── a.txt\n\n\nFile Contents:\nbody\n"
        );
    }
}

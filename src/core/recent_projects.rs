/*
 * The recent-project ledger: previously opened project roots, most recent
 * first, unique by path and capped at `MAX_RECENT_PROJECTS`. Re-opening a
 * project moves it to the front instead of duplicating it.
 */
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime, macros::format_description};

pub const MAX_RECENT_PROJECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub path: PathBuf,
    #[serde(with = "time::serde::rfc3339")]
    pub opened_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecentLedger {
    entries: Vec<RecentEntry>,
}

impl RecentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /*
     * Rebuilds the ledger from persisted entries, keeping their order but
     * dropping repeated paths and anything past the cap.
     */
    pub fn from_entries(entries: Vec<RecentEntry>) -> Self {
        let mut ledger = RecentLedger::new();
        for entry in entries {
            if ledger.entries.len() == MAX_RECENT_PROJECTS {
                break;
            }
            if ledger.contains(&entry.path) {
                continue;
            }
            ledger.entries.push(entry);
        }
        ledger
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn record_opened(&mut self, path: &Path, opened_at: OffsetDateTime) {
        self.remove(path);
        self.entries.insert(
            0,
            RecentEntry {
                path: path.to_path_buf(),
                opened_at,
            },
        );
        if self.entries.len() > MAX_RECENT_PROJECTS {
            let evicted = self.entries.split_off(MAX_RECENT_PROJECTS);
            log::debug!("RecentLedger: Evicted {} old entries.", evicted.len());
        }
    }

    /// Removes `path` if present. Returns true if an entry was removed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.path != path);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/*
 * Describes how long ago `entry` was opened, relative to `now`:
 * "Just now", "N mins ago", "N hours ago", "Yesterday", or the date.
 */
pub fn relative_time_label(entry: &RecentEntry, now: OffsetDateTime) -> String {
    let elapsed = now - entry.opened_at;
    if elapsed < Duration::MINUTE {
        "Just now".to_string()
    } else if elapsed < Duration::HOUR {
        format!("{} mins ago", elapsed.whole_minutes())
    } else if elapsed < Duration::DAY {
        format!("{} hours ago", elapsed.whole_hours())
    } else if elapsed < Duration::days(2) {
        "Yesterday".to_string()
    } else {
        let format = format_description!("[year]-[month]-[day]");
        entry
            .opened_at
            .to_offset(time::UtcOffset::UTC)
            .format(&format)
            .unwrap_or_else(|_| entry.opened_at.date().to_string())
    }
}

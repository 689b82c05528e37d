/*
 * Command-line front end. Each subcommand loads the saved state, drives
 * `AppLogic`, and writes its text to stdout (or `--output`). Anything that
 * changes presets or recent projects is saved by `AppLogic` itself.
 */
use crate::app_logic::{AppError, AppLogic};
use crate::core::{
    CheckState, ConfigManagerOperations, CoreConfigManager, CoreFileReader,
    CoreFileSystemScanner, DEFAULT_TEMPLATE, FileSystemError, PresetError, SessionError,
};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

/// nafuda: pick files from a project and copy them as one text block
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence all log output, including warnings.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Directory holding app_state.json (defaults to the per-user config dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the project structure diagram.
    Tree {
        #[arg(value_name = "DIR", default_value = ".")]
        root: PathBuf,

        /// Print only the entries below this directory, relative to DIR.
        #[arg(long, value_name = "REL_PATH")]
        subtree: Option<String>,
    },
    /// Select files and emit structure, contents, or both.
    Copy(CopyArgs),
    /// Manage content-template presets.
    Preset {
        #[command(subcommand)]
        action: PresetCommand,
    },
    /// Manage the recent-project list.
    Recent {
        #[command(subcommand)]
        action: RecentCommand,
    },
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    #[arg(value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// File or directory to select, relative to DIR. Can be repeated.
    #[arg(short, long, value_name = "REL_PATH")]
    pub select: Vec<String>,

    /// File or directory to leave out, applied after the selections.
    /// "." clears the whole selection. Can be repeated.
    #[arg(short, long, value_name = "REL_PATH")]
    pub deselect: Vec<String>,

    /// Select every file in the project.
    #[arg(short, long)]
    pub all: bool,

    #[arg(short, long, value_enum, default_value_t = CopyMode::Full)]
    pub mode: CopyMode,

    /// Use this preset's template instead of the active one.
    #[arg(short, long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Write the result to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// The directory diagram only.
    Structure,
    /// The expanded template for each selected file.
    Content,
    /// Structure followed by contents.
    Full,
}

#[derive(Args, Debug)]
pub struct TemplateSource {
    /// Template text; `{name}` and `{code}` are substituted.
    #[arg(long, conflicts_with = "template_file")]
    pub template: Option<String>,

    /// Read the template text from FILE.
    #[arg(long, value_name = "FILE")]
    pub template_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// List presets; the active one is marked with '*'.
    List,
    /// Print a preset's template (the active preset by default).
    Show { name: Option<String> },
    /// Create a preset. Without a template it starts from the default one.
    Create {
        name: String,
        #[command(flatten)]
        source: TemplateSource,
    },
    /// Replace a preset's template.
    Edit {
        name: String,
        #[command(flatten)]
        source: TemplateSource,
    },
    Rename { old_name: String, new_name: String },
    Delete { name: String },
    /// Make a preset the active one.
    Use { name: String },
    /// Reset a preset's template to the built-in default.
    Reset { name: String },
}

#[derive(Subcommand, Debug)]
pub enum RecentCommand {
    List,
    Remove { path: PathBuf },
    Clear,
}

#[derive(Debug)]
pub enum CliError {
    App(AppError),
    Io { path: Option<PathBuf>, source: io::Error },
    MissingTemplate,
}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        CliError::App(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io {
            path: None,
            source: err,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::App(e) => write!(f, "{e}"),
            CliError::Io {
                path: Some(p),
                source,
            } => write!(f, "I/O error on {}: {source}", p.display()),
            CliError::Io { path: None, source } => write!(f, "I/O error: {source}"),
            CliError::MissingTemplate => write!(f, "Provide --template or --template-file"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::App(e) => Some(e),
            CliError::Io { source, .. } => Some(source),
            CliError::MissingTemplate => None,
        }
    }
}

impl CliError {
    /*
     * 1: generic failure, 2: something named on the command line does not
     * exist, 3: nothing selected, 4: a preset operation was refused.
     */
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::App(AppError::FileSystem(FileSystemError::NotFound(_)))
            | CliError::App(AppError::Session(SessionError::NodeNotFound(_)))
            | CliError::App(AppError::Preset(PresetError::NotFound(_))) => 2,
            CliError::App(AppError::NothingSelected) => 3,
            CliError::App(AppError::Preset(_)) => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

pub fn run_with_output(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config_manager: Arc<dyn ConfigManagerOperations> = match &cli.config_dir {
        Some(dir) => Arc::new(CoreConfigManager::with_config_dir(dir)),
        None => Arc::new(CoreConfigManager::new()),
    };
    let mut logic = AppLogic::new(
        Arc::new(CoreFileSystemScanner::new()),
        Arc::new(CoreFileReader::new()),
        config_manager,
    );
    logic.load_state();

    match cli.command {
        Commands::Tree { root, subtree } => {
            logic.open_project(&root)?;
            let text = match subtree {
                Some(relative) => logic.render_tree(&logic.resolve_relative(&relative)?)?,
                None => logic.copy_directory_tree()?,
            };
            out.write_all(text.as_bytes())?;
        }
        Commands::Copy(args) => run_copy(&mut logic, &args, out)?,
        Commands::Preset { action } => run_preset(&mut logic, action, out)?,
        Commands::Recent { action } => run_recent(&mut logic, action, out)?,
    }
    out.flush()?;
    Ok(())
}

fn is_project_root(relative: &str) -> bool {
    relative
        .split(std::path::is_separator)
        .all(|part| part.is_empty() || part == ".")
}

fn apply_selection(logic: &mut AppLogic, args: &CopyArgs) -> Result<()> {
    if args.all {
        logic.select_all()?;
    }
    for relative in &args.select {
        if is_project_root(relative) {
            logic.select_all()?;
        } else {
            logic.toggle_relative(relative, CheckState::Checked)?;
        }
    }
    for relative in &args.deselect {
        if is_project_root(relative) {
            logic.deselect_all()?;
        } else {
            logic.toggle_relative(relative, CheckState::Unchecked)?;
        }
    }
    log::info!(
        "Cli: {} files selected.",
        logic.selected_relative_paths().len()
    );
    Ok(())
}

fn run_copy(logic: &mut AppLogic, args: &CopyArgs, out: &mut dyn Write) -> Result<()> {
    logic.open_project(&args.root)?;
    apply_selection(logic, args)?;

    let text = match args.mode {
        CopyMode::Structure => logic.copy_directory_tree()?,
        CopyMode::Content | CopyMode::Full => {
            let outcome = match (&args.preset, args.mode) {
                (Some(name), CopyMode::Content) => {
                    logic.copy_file_content_with(logic.preset_template(name)?)?
                }
                (Some(name), _) => logic.copy_full_context_with(logic.preset_template(name)?)?,
                (None, CopyMode::Content) => logic.copy_file_content()?,
                (None, _) => logic.copy_full_context()?,
            };
            if outcome.skipped_count() > 0 {
                log::warn!(
                    "Cli: {} selected file(s) could not be read and were skipped: {}",
                    outcome.skipped_count(),
                    outcome.skipped.join(", ")
                );
            }
            outcome.content
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, text).map_err(|source| CliError::Io {
                path: Some(path.clone()),
                source,
            })?;
            log::info!("Cli: Wrote output to {path:?}.");
        }
        None => out.write_all(text.as_bytes())?,
    }
    Ok(())
}

fn read_template(source: &TemplateSource) -> Result<Option<String>> {
    if let Some(text) = &source.template {
        return Ok(Some(text.clone()));
    }
    match &source.template_file {
        Some(path) => fs::read_to_string(path)
            .map(Some)
            .map_err(|e| CliError::Io {
                path: Some(path.clone()),
                source: e,
            }),
        None => Ok(None),
    }
}

fn run_preset(logic: &mut AppLogic, action: PresetCommand, out: &mut dyn Write) -> Result<()> {
    match action {
        PresetCommand::List => {
            let active = logic.active_preset_name().to_string();
            for name in logic.preset_names() {
                let marker = if name == active { '*' } else { ' ' };
                writeln!(out, "{marker} {name}")?;
            }
        }
        PresetCommand::Show { name } => {
            let template = match name {
                Some(n) => logic.preset_template(&n)?,
                None => logic.active_template(),
            };
            out.write_all(template.as_bytes())?;
        }
        PresetCommand::Create { name, source } => {
            let template = read_template(&source)?.unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
            logic.create_preset(&name, &template)?;
            writeln!(out, "Created preset '{name}'.")?;
        }
        PresetCommand::Edit { name, source } => {
            let template = read_template(&source)?.ok_or(CliError::MissingTemplate)?;
            logic.update_preset_template(&name, &template)?;
            writeln!(out, "Updated preset '{name}'.")?;
        }
        PresetCommand::Rename { old_name, new_name } => {
            logic.rename_preset(&old_name, &new_name)?;
            writeln!(out, "Renamed preset '{old_name}' to '{new_name}'.")?;
        }
        PresetCommand::Delete { name } => {
            logic.delete_preset(&name)?;
            writeln!(
                out,
                "Deleted preset '{name}'. Active preset: '{}'.",
                logic.active_preset_name()
            )?;
        }
        PresetCommand::Use { name } => {
            logic.set_active_preset(&name)?;
            writeln!(out, "Active preset: '{name}'.")?;
        }
        PresetCommand::Reset { name } => {
            logic.restore_default_preset_content(&name)?;
            writeln!(out, "Restored default template for '{name}'.")?;
        }
    }
    Ok(())
}

fn run_recent(logic: &mut AppLogic, action: RecentCommand, out: &mut dyn Write) -> Result<()> {
    match action {
        RecentCommand::List => {
            for (path, label) in logic.recent_projects_with_labels(OffsetDateTime::now_utc()) {
                writeln!(out, "{}\t{label}", path.display())?;
            }
        }
        RecentCommand::Remove { path } => {
            let resolved = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
            let removed = logic.remove_recent_project(&resolved)?
                || logic.remove_recent_project(&path)?;
            if removed {
                writeln!(out, "Removed {} from recent projects.", path.display())?;
            } else {
                writeln!(out, "{} is not in the recent projects.", path.display())?;
            }
        }
        RecentCommand::Clear => {
            logic.clear_recent_projects()?;
            writeln!(out, "Cleared recent projects.")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    fn run_to_string(args: &[&str]) -> Result<String> {
        let mut buffer = Vec::new();
        run_with_output(parse(args), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    fn make_project(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src").join("a.go"), "package a").unwrap();
        fs::write(root.join("src").join("b.go"), "package b").unwrap();
        fs::write(root.join("README.md"), "# Proj").unwrap();
    }

    #[test]
    fn test_parse_copy_defaults_and_flags() {
        let cli = parse(&["nafuda", "-vv", "copy", "proj", "-s", "src", "--select", "README.md"]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Copy(args) => {
                assert_eq!(args.root, PathBuf::from("proj"));
                assert_eq!(args.select, vec!["src", "README.md"]);
                assert_eq!(args.mode, CopyMode::Full);
                assert!(!args.all);
                assert!(args.output.is_none());
            }
            other => panic!("Expected copy command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_conflicting_template_sources() {
        let result = Cli::try_parse_from([
            "nafuda",
            "preset",
            "create",
            "X",
            "--template",
            "t",
            "--template-file",
            "f",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tree_command_prints_structure() {
        let project = tempdir().unwrap();
        let root = project.path().join("proj");
        make_project(&root);
        let config = tempdir().unwrap();

        let text = run_to_string(&[
            "nafuda",
            "--config-dir",
            config.path().to_str().unwrap(),
            "tree",
            root.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(
            text,
            "Project Structure:\nproj\n├── src\n│   ├── a.go\n│   └── b.go\n└── README.md\n"
        );
        assert!(config.path().join("app_state.json").exists());
    }

    #[test]
    fn test_copy_content_to_output_file_in_selection_order() {
        let project = tempdir().unwrap();
        let root = project.path().join("proj");
        make_project(&root);
        let config = tempdir().unwrap();
        let output = project.path().join("out.txt");

        let stdout_text = run_to_string(&[
            "nafuda",
            "--config-dir",
            config.path().to_str().unwrap(),
            "copy",
            root.to_str().unwrap(),
            "--select",
            "README.md",
            "--select",
            "src/a.go",
            "--mode",
            "content",
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();

        assert!(stdout_text.is_empty());
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "File: README.md\n```\n# Proj\n```\n\nFile: src/a.go\n```\npackage a\n```\n\n"
        );
    }

    #[test]
    fn test_tree_subtree_prints_entries_below_directory() {
        let project = tempdir().unwrap();
        make_project(project.path());
        let config = tempdir().unwrap();

        let text = run_to_string(&[
            "nafuda",
            "--config-dir",
            config.path().to_str().unwrap(),
            "tree",
            project.path().to_str().unwrap(),
            "--subtree",
            "src",
        ])
        .unwrap();

        assert_eq!(text, "├── a.go\n└── b.go\n");
    }

    #[test]
    fn test_copy_all_then_deselect_uses_active_preset() {
        let project = tempdir().unwrap();
        make_project(project.path());
        let config = tempdir().unwrap();
        let config_arg = config.path().to_str().unwrap();
        run_to_string(&[
            "nafuda", "--config-dir", config_arg, "preset", "create", "Names", "--template",
            "{name}",
        ])
        .unwrap();
        run_to_string(&["nafuda", "--config-dir", config_arg, "preset", "use", "Names"]).unwrap();

        let text = run_to_string(&[
            "nafuda",
            "--config-dir",
            config_arg,
            "copy",
            project.path().to_str().unwrap(),
            "--all",
            "--deselect",
            "src/b.go",
            "--mode",
            "content",
        ])
        .unwrap();

        assert_eq!(text, "src/a.go\nREADME.md\n");
    }

    #[test]
    fn test_copy_deselect_root_clears_selection() {
        let project = tempdir().unwrap();
        make_project(project.path());
        let config = tempdir().unwrap();

        let err = run_to_string(&[
            "nafuda",
            "--config-dir",
            config.path().to_str().unwrap(),
            "copy",
            project.path().to_str().unwrap(),
            "--select",
            "src",
            "--deselect",
            ".",
        ])
        .unwrap_err();

        assert!(matches!(err, CliError::App(AppError::NothingSelected)));
    }

    #[test]
    fn test_copy_without_selection_is_exit_code_3() {
        let project = tempdir().unwrap();
        make_project(project.path());
        let config = tempdir().unwrap();

        let err = run_to_string(&[
            "nafuda",
            "--config-dir",
            config.path().to_str().unwrap(),
            "copy",
            project.path().to_str().unwrap(),
        ])
        .unwrap_err();

        assert!(matches!(err, CliError::App(AppError::NothingSelected)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_missing_project_is_exit_code_2() {
        let config = tempdir().unwrap();
        let missing = config.path().join("does_not_exist");

        let err = run_to_string(&[
            "nafuda",
            "--config-dir",
            config.path().to_str().unwrap(),
            "tree",
            missing.to_str().unwrap(),
        ])
        .unwrap_err();

        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_preset_commands_persist_between_runs() {
        let config = tempdir().unwrap();
        let config_arg = config.path().to_str().unwrap();

        run_to_string(&[
            "nafuda", "--config-dir", config_arg, "preset", "create", "Short", "--template",
            "{name}",
        ])
        .unwrap();
        run_to_string(&["nafuda", "--config-dir", config_arg, "preset", "use", "Short"]).unwrap();

        let listing =
            run_to_string(&["nafuda", "--config-dir", config_arg, "preset", "list"]).unwrap();
        assert_eq!(listing, "  Default\n* Short\n");

        let shown = run_to_string(&["nafuda", "--config-dir", config_arg, "preset", "show"]).unwrap();
        assert_eq!(shown, "{name}");

        let err = run_to_string(&[
            "nafuda", "--config-dir", config_arg, "preset", "delete", "Short",
        ])
        .and_then(|_| {
            run_to_string(&["nafuda", "--config-dir", config_arg, "preset", "delete", "Default"])
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_recent_list_and_clear() {
        let project = tempdir().unwrap();
        make_project(project.path());
        let config = tempdir().unwrap();
        let config_arg = config.path().to_str().unwrap();
        let project_arg = project.path().to_str().unwrap();

        run_to_string(&["nafuda", "--config-dir", config_arg, "tree", project_arg]).unwrap();
        let listing =
            run_to_string(&["nafuda", "--config-dir", config_arg, "recent", "list"]).unwrap();
        assert!(listing.ends_with("\tJust now\n"), "Unexpected listing: {listing}");
        assert_eq!(listing.lines().count(), 1);

        run_to_string(&["nafuda", "--config-dir", config_arg, "recent", "clear"]).unwrap();
        let listing =
            run_to_string(&["nafuda", "--config-dir", config_arg, "recent", "list"]).unwrap();
        assert!(listing.is_empty());
    }
}

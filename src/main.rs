//! Frontend Guardian CLI - Command-line interface for front-end project checks
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to domain operations
//! - Handles external concerns like process exit codes and terminal output
//! - Validation runs on the blocking pool; the async runtime only drives the CLI

use clap::{Parser, Subcommand, ValueEnum};
use frontend_guardian::rules::{self, Rule};
use frontend_guardian::{
    AnalysisOptions, FrontendGuardian, GuardianConfig, GuardianError, GuardianResult,
    OutputFormat, ReportFormatter, ReportOptions, Severity,
};
use std::path::{Path, PathBuf};
use std::process;

/// Frontend Guardian - convention checks for static HTML/SCSS projects
#[derive(Parser)]
#[command(name = "frontend-guardian")]
#[command(version)]
#[command(about = "Checks BEM naming, semantic HTML, styles, images and project layout")]
#[command(
    long_about = "Frontend Guardian loads a static site project (HTML pages, SCSS/CSS, images) and runs a fixed set of convention checks over it. The process exits with code 1 when any finding is reported."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a project directory
    Check {
        /// Project directory (defaults to WORKING_DIR or the current directory)
        dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Minimum severity level to report
        #[arg(short, long, value_enum)]
        severity: Option<SeverityArg>,

        /// Maximum number of findings to report
        #[arg(long)]
        max_findings: Option<usize>,

        /// Disable parallel processing
        #[arg(long)]
        no_parallel: bool,

        /// Also send pages to the W3C Nu HTML Checker
        #[arg(long)]
        w3c: bool,
    },

    /// Watch a project and re-run checks on changes
    Watch {
        /// Project directory (defaults to WORKING_DIR or the current directory)
        dir: Option<PathBuf>,

        /// Debounce delay in milliseconds
        #[arg(long, default_value = "500")]
        delay: u64,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// List available rules
    Rules {
        /// Show only enabled rules
        #[arg(long)]
        enabled_only: bool,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Junit,
    Sarif,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Sarif => OutputFormat::Sarif,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

/// Settings of one `check` run
struct CheckArgs {
    dir: Option<PathBuf>,
    format: OutputFormatArg,
    severity: Option<SeverityArg>,
    max_findings: Option<usize>,
    no_parallel: bool,
    w3c: bool,
    use_colors: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run_command(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

async fn run_command(cli: Cli) -> GuardianResult<i32> {
    let use_colors = !cli.no_color;
    match cli.command {
        Commands::Check {
            dir,
            format,
            severity,
            max_findings,
            no_parallel,
            w3c,
        } => {
            let args = CheckArgs {
                dir,
                format,
                severity,
                max_findings,
                no_parallel,
                w3c,
                use_colors,
            };
            run_check(cli.config.as_deref(), &args).await
        }
        Commands::Watch { dir, delay } => run_watch(cli.config, dir, delay, use_colors).await,
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
        Commands::Explain { rule_id } => run_explain(&rule_id),
        Commands::Rules {
            enabled_only,
            category,
        } => run_list_rules(cli.config.as_deref(), enabled_only, category.as_deref()),
    }
}

/// Defaults, then the config file, then the environment, then the command line
fn load_config(config_path: Option<&Path>, dir: Option<&Path>, w3c: bool) -> GuardianResult<GuardianConfig> {
    let mut config = GuardianConfig::discover(config_path)?;
    if let Some(dir) = dir {
        config.paths.working_dir = dir.to_path_buf();
    }
    if w3c {
        config.conformance.enabled = true;
    }
    config.validate()?;
    Ok(config)
}

async fn run_check(config_path: Option<&Path>, args: &CheckArgs) -> GuardianResult<i32> {
    let config = load_config(config_path, args.dir.as_deref(), args.w3c)?;
    let fingerprint = config.fingerprint();

    let guardian = FrontendGuardian::new(config)?.with_report_formatter(ReportFormatter::new(ReportOptions {
        use_colors: args.use_colors,
        config_fingerprint: Some(fingerprint),
        ..Default::default()
    }));

    let options = AnalysisOptions {
        parallel: !args.no_parallel,
        min_severity: args.severity.map(Severity::from).unwrap_or(Severity::Info),
        max_findings: args.max_findings,
    };

    let report = guardian.validate(options).await?;
    let formatted = guardian.format_report(&report, args.format.into())?;
    print!("{formatted}");

    Ok(if report.passed() { 0 } else { 1 })
}

async fn run_watch(
    config_path: Option<PathBuf>,
    dir: Option<PathBuf>,
    delay_ms: u64,
    use_colors: bool,
) -> GuardianResult<i32> {
    use notify::{Event, EventKind, RecursiveMode, Result as NotifyResult, Watcher};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    let config = load_config(config_path.as_deref(), dir.as_deref(), false)?;
    let watch_path = config.paths.working_dir.clone();
    if !watch_path.is_dir() {
        return Err(GuardianError::missing_directory(&watch_path));
    }

    println!("🔍 Watching {} (debounce {}ms, Ctrl+C to stop)", watch_path.display(), delay_ms);

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: NotifyResult<Event>| match res {
        Ok(event) => {
            if let Err(e) = tx.send(event) {
                tracing::warn!("Error sending event: {}", e);
            }
        }
        Err(e) => tracing::warn!("Watch error: {}", e),
    })
    .map_err(|e| GuardianError::config(format!("Failed to create file watcher: {e}")))?;

    watcher
        .watch(&watch_path, RecursiveMode::Recursive)
        .map_err(|e| {
            GuardianError::config(format!("Failed to watch path '{}': {}", watch_path.display(), e))
        })?;

    let check = CheckArgs {
        dir: Some(watch_path.clone()),
        format: OutputFormatArg::Human,
        severity: None,
        max_findings: None,
        no_parallel: false,
        w3c: false,
        use_colors,
    };

    run_watch_check(config_path.as_deref(), &check).await;

    let debounce = Duration::from_millis(delay_ms);
    let mut pending: Option<Instant> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) && event.paths.iter().any(|path| is_project_change(path));
                if relevant {
                    pending = Some(Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::warn!("File watcher disconnected");
                break;
            }
        }

        if pending.is_some_and(|since| since.elapsed() >= debounce) {
            pending = None;
            println!("📝 Changes detected, checking again...");
            run_watch_check(config_path.as_deref(), &check).await;
        }
    }

    Ok(0)
}

/// One watch iteration; errors are printed and the watch continues
async fn run_watch_check(config_path: Option<&Path>, check: &CheckArgs) {
    if let Err(e) = run_check(config_path, check).await {
        eprintln!("❌ Check failed: {e}");
    }
    println!("⌚ Watching for changes...");
}

/// Source, style, image and config edits; tool directories are noise
fn is_project_change(path: &Path) -> bool {
    let in_tool_dir = path.components().any(|component| {
        matches!(component.as_os_str().to_str(), Some(".git" | "node_modules" | "target"))
    });
    !in_tool_dir
}

fn run_validate_config(config_path: Option<PathBuf>) -> GuardianResult<i32> {
    let config_path = config_path
        .or_else(|| {
            frontend_guardian::config::DEFAULT_CONFIG_FILES
                .iter()
                .map(PathBuf::from)
                .find(|path| path.exists())
        })
        .unwrap_or_else(|| PathBuf::from(frontend_guardian::config::DEFAULT_CONFIG_FILES[0]));

    println!("Validating configuration: {}", config_path.display());

    match GuardianConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");
            println!("📊 Configuration summary:");
            println!("  Working directory: {}", config.paths.working_dir.display());
            println!(
                "  Directories: styles={}, images={}, assets={}",
                config.paths.styles_dir, config.paths.images_dir, config.paths.assets_dir
            );
            println!("  Disabled rules: {}", config.rules.disabled.len());
            println!("  Severity overrides: {}", config.rules.severity.len());
            println!(
                "  W3C conformance: {}",
                if config.conformance.enabled { "enabled" } else { "disabled" }
            );
            println!("  Fingerprint: {}", config.fingerprint());
            Ok(0)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

/// Every built-in rule, including the ones a configuration switches off
fn catalog() -> GuardianResult<Vec<Box<dyn Rule>>> {
    let mut config = GuardianConfig::default();
    config.conformance.enabled = true;
    rules::all_rules(&config)
}

fn run_explain(rule_id: &str) -> GuardianResult<i32> {
    let catalog = catalog()?;

    if let Some(rule) = catalog.iter().find(|rule| rule.id() == rule_id) {
        println!("📖 Rule: {}", rule.id());
        println!("📂 Category: {}", rule.category());
        println!();
        println!("📝 Description:");
        println!("   {}", rule.description());
        if rule.id() == rules::conformance::RULE_ID {
            println!();
            println!("🌐 Runs only with --w3c or `conformance.enabled: true`");
        }
        return Ok(0);
    }

    eprintln!("❌ Rule '{rule_id}' not found");
    println!();
    println!("Available rules:");
    for rule in &catalog {
        println!("  - {}", rule.id());
    }

    Ok(1)
}

fn run_list_rules(
    config_path: Option<&Path>,
    enabled_only: bool,
    category_filter: Option<&str>,
) -> GuardianResult<i32> {
    let config = match config_path {
        Some(path) => GuardianConfig::load_from_file(path)?,
        None => GuardianConfig::default(),
    };

    println!("📋 Available Rules\n");

    for rule in catalog()? {
        if category_filter.is_some_and(|filter| rule.category().as_str() != filter) {
            continue;
        }

        let enabled = config.is_rule_enabled(rule.id())
            && (rule.id() != rules::conformance::RULE_ID || config.conformance.enabled);
        if enabled_only && !enabled {
            continue;
        }

        let status = if enabled { "✅" } else { "❌" };
        let severity = config
            .severity_override(rule.id())
            .map(|severity| format!(" [{}]", severity.as_str()))
            .unwrap_or_default();
        println!(
            "  {} {} ({}){} - {}",
            status,
            rule.id(),
            rule.category(),
            severity,
            rule.description()
        );
    }

    Ok(0)
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn check_args(dir: &Path) -> CheckArgs {
        CheckArgs {
            dir: Some(dir.to_path_buf()),
            format: OutputFormatArg::Json,
            severity: None,
            max_findings: None,
            no_parallel: false,
            w3c: false,
            use_colors: false,
        }
    }

    #[tokio::test]
    async fn test_check_command() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("index.html"), "<html><body><div class=\"Card\"></div></body></html>").unwrap();

        let result = run_check(None, &check_args(temp_dir.path())).await;

        // Should find problems (exit code 1)
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_check_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = run_check(None, &check_args(&temp_dir.path().join("missing"))).await;

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("test_config.yaml");

        let config = GuardianConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        fs::write(&config_file, yaml).unwrap();

        assert_eq!(run_validate_config(Some(config_file)).unwrap(), 0);

        let broken = temp_dir.path().join("broken.yaml");
        fs::write(&broken, "version: \"9.9\"\n").unwrap();
        assert_eq!(run_validate_config(Some(broken)).unwrap(), 1);
    }

    #[test]
    fn test_explain_rule() {
        assert_eq!(run_explain("bem/class-naming").unwrap(), 0);
        assert_eq!(run_explain("markup/conformance").unwrap(), 0);
        assert_eq!(run_explain("nonexistent_rule").unwrap(), 1);
    }

    #[test]
    fn test_list_rules() {
        assert_eq!(run_list_rules(None, false, None).unwrap(), 0);
        assert_eq!(run_list_rules(None, true, Some("styles")).unwrap(), 0);
    }

    #[test]
    fn test_project_change_filter() {
        assert!(is_project_change(Path::new("site/styles/main.scss")));
        assert!(!is_project_change(Path::new("site/node_modules/x/index.js")));
        assert!(!is_project_change(Path::new("site/.git/index")));
    }
}

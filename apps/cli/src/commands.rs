//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use remotedocs_core::{BuildConfig, BuildReport, ProgressReporter, WrittenFile, build_site};
use remotedocs_markdown::{Pipeline, builtin_hooks};
use remotedocs_shared::{
    AppConfig, Document, LinkRule, SourceRegistry, default_config_path, init_config,
    load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// remotedocs: pull remote documentation into a static site.
#[derive(Parser)]
#[command(
    name = "remotedocs",
    version,
    about = "Fetch remote documentation, make it renderer-compatible, and write it into a site tree.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to the config file (defaults to ./remotedocs.toml).
    #[arg(long, global = true, env = "REMOTEDOCS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch, transform and write every configured source.
    Build {
        /// Override the content root (defaults to [site].content_root,
        /// relative to the config file).
        #[arg(long)]
        content_root: Option<PathBuf>,

        /// Only build the named source (repeatable).
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,

        /// Write a JSON build report to this file.
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// List the validated content sources.
    Sources {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the markdown pipeline over a local file.
    Transform {
        /// Markdown file to transform.
        file: PathBuf,

        /// Apply the link rules of this configured source (none by default).
        #[arg(long, value_name = "NAME")]
        source: Option<String>,

        /// Write the result here instead of stdout.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a starter config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `transform` output on stdout stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "remotedocs=info",
        1 => "remotedocs=debug",
        _ => "remotedocs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Build {
            content_root,
            only,
            report,
        } => cmd_build(config, content_root, &only, report.as_deref()).await,
        Command::Sources { json } => cmd_sources(config, json),
        Command::Transform {
            file,
            source,
            output,
        } => cmd_transform(config, &file, source.as_deref(), output.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(config, force),
            ConfigAction::Show => cmd_config_show(config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    config_path: Option<&Path>,
    content_root: Option<PathBuf>,
    only: &[String],
    report_path: Option<&Path>,
) -> Result<()> {
    let path = resolve_config_path(config_path)?;
    let config = load_config_from(&path)?;
    let registry =
        SourceRegistry::from_sources(config.sources.clone(), &builtin_hooks())?.retain_named(only)?;

    let mut build_config = BuildConfig::from_app_config(&config);
    build_config.content_root =
        content_root.unwrap_or_else(|| config_dir(&path).join(&config.site.content_root));

    info!(
        config = %path.display(),
        content_root = %build_config.content_root.display(),
        sources = registry.len(),
        "building site"
    );

    let reporter = CliProgress::new(registry.len());
    let report = match build_site(&build_config, &registry, &reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.clear();
            return Err(eyre!(e).wrap_err("build failed"));
        }
    };

    if let Some(report_path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_path, json)
            .wrap_err_with(|| format!("failed to write report to {}", report_path.display()))?;
    }

    println!();
    println!("  Site built successfully!");
    println!("  Sources:     {}", report.sources);
    println!("  Files:       {}", report.files.len());
    println!("  Transformed: {}", report.transformed_count());
    println!("  Bytes:       {}", report.total_bytes());
    println!("  Root:        {}", build_config.content_root.display());
    if let Some(report_path) = report_path {
        println!("  Report:      {}", report_path.display());
    }
    println!("  Time:        {:.1}s", report.elapsed_ms as f64 / 1000.0);
    println!();

    Ok(())
}

fn cmd_sources(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = SourceRegistry::from_sources(config.sources, &builtin_hooks())?;

    if json {
        let sources: Vec<_> = registry.iter().map(|r| &r.source).collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!(
        "{:<24} {:<7} {:>5} {:>5}  {:<32} HOOK",
        "NAME", "TYPE", "DOCS", "LINKS", "OUT_DIR"
    );
    for registered in registry.iter() {
        let source = &registered.source;
        println!(
            "{:<24} {:<7} {:>5} {:>5}  {:<32} {}",
            source.name,
            source.fetch_options.response_type.to_string(),
            source.documents.len(),
            source.link_rewrites.len(),
            source.out_dir,
            source.hook.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

fn cmd_transform(
    config_path: Option<&Path>,
    file: &Path,
    source: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(p) => load_config_from(p)?,
        None => {
            let p = default_config_path()?;
            if p.exists() {
                load_config_from(&p)?
            } else {
                AppConfig::default()
            }
        }
    };

    let pipeline = Pipeline::from_rules(transform_rules(&config, source)?)?;

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("'{}' is not a file path", file.display()))?;
    let bytes =
        std::fs::read(file).wrap_err_with(|| format!("failed to read {}", file.display()))?;

    let doc = Document::new(source.unwrap_or("local"), name, bytes);
    if !doc.is_markdown() {
        return Err(eyre!("'{}' is not a markdown (.md) file", file.display()));
    }

    let out = pipeline.transform(doc, None)?;
    match output {
        Some(path) => {
            std::fs::write(path, &out.bytes)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(input = %file.display(), output = %path.display(), "transformed");
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&out.bytes)?;
        }
    }

    Ok(())
}

/// Link rules `transform` applies: those of the named source, or none.
fn transform_rules<'a>(config: &'a AppConfig, source: Option<&str>) -> Result<&'a [LinkRule]> {
    let Some(name) = source else {
        return Ok(&[]);
    };
    config
        .sources
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.link_rewrites.as_slice())
        .ok_or_else(|| eyre!("unknown source '{name}'"))
}

fn cmd_config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path)?;
    init_config(&path, force)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn resolve_config_path(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(default_config_path()?),
    }
}

/// Directory a relative `content_root` is resolved against.
fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    total: usize,
    finished: AtomicUsize,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&[
                    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
                ]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            spinner,
            total,
            finished: AtomicUsize::new(0),
        }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn source_started(&self, name: &str, documents: usize) {
        self.spinner
            .set_message(format!("Fetching {name} ({documents} documents)"));
    }

    fn source_finished(&self, name: &str, files: &[WrittenFile]) {
        let done = self.finished.fetch_add(1, Ordering::Relaxed) + 1;
        self.spinner.set_message(format!(
            "Built [{done}/{}] {name} ({} files)",
            self.total,
            files.len()
        ));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use remotedocs_shared::CONFIG_FILE_NAME;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_flags_parse() {
        let cli = Cli::try_parse_from([
            "remotedocs",
            "-vv",
            "build",
            "--only",
            "ros-racer",
            "--only",
            "ros-racer-img",
            "--report",
            "report.json",
            "--config",
            "site/remotedocs.toml",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("site/remotedocs.toml")));
        match cli.command {
            Command::Build { only, report, content_root } => {
                assert_eq!(only, vec!["ros-racer", "ros-racer-img"]);
                assert_eq!(report, Some(PathBuf::from("report.json")));
                assert!(content_root.is_none());
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn config_init_force_parses() {
        let cli = Cli::try_parse_from(["remotedocs", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[test]
    fn log_format_rejects_unknown() {
        assert!(Cli::try_parse_from(["remotedocs", "--log-format", "xml", "sources"]).is_err());
    }

    #[test]
    fn config_dir_of_bare_file_name() {
        assert_eq!(config_dir(Path::new(CONFIG_FILE_NAME)), PathBuf::from("."));
        assert_eq!(
            config_dir(Path::new("site/remotedocs.toml")),
            PathBuf::from("site")
        );
    }

    #[test]
    fn transform_source_flag_parses() {
        let cli = Cli::try_parse_from([
            "remotedocs",
            "transform",
            "README.md",
            "--source",
            "ros-racer",
        ])
        .unwrap();
        match cli.command {
            Command::Transform { file, source, output } => {
                assert_eq!(file, PathBuf::from("README.md"));
                assert_eq!(source.as_deref(), Some("ros-racer"));
                assert!(output.is_none());
            }
            _ => panic!("expected transform command"),
        }
    }

    #[test]
    fn transform_uses_only_the_named_source_rules() {
        let config: AppConfig = toml::from_str(
            r#"
[[sources]]
name = "ros-racer"
source_base_url = "https://raw.githubusercontent.com/eclipse-sdv-blueprints/ros-racer/main"
out_dir = "docs/ros-racer"
documents = ["README.md"]

[[sources.link_rewrites]]
kind = "license"
repository = "https://github.com/eclipse-sdv-blueprints/ros-racer"

[[sources]]
name = "companion-application"
source_base_url = "https://raw.githubusercontent.com/eclipse-sdv-blueprints/companion-application/main"
out_dir = "docs/companion-application"
documents = ["Readme.md"]
"#,
        )
        .unwrap();

        assert!(transform_rules(&config, None).unwrap().is_empty());
        assert_eq!(transform_rules(&config, Some("ros-racer")).unwrap().len(), 1);

        let companion = transform_rules(&config, Some("companion-application")).unwrap();
        let pipeline = Pipeline::from_rules(companion).unwrap();
        let input = "Licensed under [Apache-2.0](LICENSE). See [qs](docs/quickstart.md).";
        assert_eq!(pipeline.rewrite_markdown(input), input);

        let err = transform_rules(&config, Some("nope")).unwrap_err();
        assert!(err.to_string().contains("unknown source 'nope'"));
    }
}

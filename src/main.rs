//! `content-engine`: command-line front end of the content engine.
//!
//! Every subcommand prints a JSON report on stdout; logs go to stderr or to
//! the file given with `--log-file`.

use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use clap::{
    Parser,
    Subcommand,
};
use content_i18n_engine::config::{
    ConfigManager,
    EngineSettings,
};
use content_i18n_engine::coverage;
use content_i18n_engine::error::EngineError;
use content_i18n_engine::fallback::FallbackChain;
use content_i18n_engine::indexer::WorkspaceIndexer;
use content_i18n_engine::input::messages::{
    export_messages,
    import_messages,
};
use content_i18n_engine::maintenance::{
    self,
    MaintenanceOptions,
};
use content_i18n_engine::resolver::resolve;
use content_i18n_engine::store::SqliteStore;
use content_i18n_engine::translate::{
    BulkOptions,
    ChatCompletionsClient,
    Translator,
};
use serde::Serialize;
use serde_json::json;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-engine")]
#[command(version)]
#[command(about = "Dynamic content and translation resolution engine")]
#[command(long_about = None)]
struct Cli {
    /// Workspace holding `.content-engine.json` (default: current directory)
    #[arg(short, long, global = true, value_name = "DIR")]
    workspace: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved message tree of a locale
    Resolve {
        #[arg(short, long)]
        locale: String,
    },

    /// Resolve one dotted path through the locale fallback chain
    Lookup {
        #[arg(short, long)]
        locale: String,

        /// Dotted path, e.g. `HomePage.cta.title`
        #[arg(value_name = "PATH")]
        path: String,

        /// Text returned when no locale has the path
        #[arg(long, default_value = "")]
        literal: String,
    },

    /// Remove rows sharing an identity, keeping the earliest
    Dedup {
        #[arg(long)]
        dry_run: bool,
    },

    /// Rewrite keys containing separators into their canonical position
    Renormalize {
        #[arg(long)]
        dry_run: bool,
    },

    /// Diff every locale against the source locale
    Coverage,

    /// Diff keys referenced by templates against the store
    Usage,

    /// Translate source-locale rows into the locales missing them
    Translate {
        /// Only translate rows of this page
        #[arg(long)]
        page: Option<String>,

        /// Target locales (default: every configured locale but the source)
        #[arg(long, value_delimiter = ',')]
        locales: Option<Vec<String>>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Import a nested messages file into the store
    Import {
        #[arg(short, long)]
        locale: String,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Export the resolved tree of a locale as a messages file
    Export {
        #[arg(short, long)]
        locale: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Installs the global subscriber; the guard flushes the file writer on drop.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>, EngineError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        return Ok(None);
    };

    let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "log file path has no file name")
    })?;
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}

fn write_json<T: Serialize>(report: &T) -> Result<(), EngineError> {
    let rendered = serde_json::to_string_pretty(report)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

fn open_store(config: &ConfigManager) -> Result<SqliteStore, EngineError> {
    let path = config.resolve_path(&config.get_settings().store.database_path);
    tracing::debug!(path = %path.display(), "Opening content store");
    Ok(SqliteStore::open(&path)?)
}

async fn run(cli: Cli) -> Result<(), EngineError> {
    let workspace = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let mut config = ConfigManager::new();
    config.load_settings(Some(workspace.clone()))?;
    let settings: EngineSettings = config.get_settings().clone();
    let store = open_store(&config)?;

    match cli.command {
        Commands::Resolve { locale } => {
            let tree = resolve(&store, &locale).await;
            for identity in tree.shadowed() {
                tracing::warn!(%identity, "General leaf shadowed by a section of the same name");
            }
            write_json(&json!({
                "locale": tree.locale(),
                "leafCount": tree.leaf_count(),
                "shadowed": tree.shadowed(),
                "messages": tree.to_json(),
            }))
        }
        Commands::Lookup { locale, path, literal } => {
            let messages = FallbackChain::new(&settings.default_locale).load(&store, &locale).await;
            write_json(&json!({
                "locale": messages.locale(),
                "path": path,
                "resolution": messages.lookup(&path, &literal),
            }))
        }
        Commands::Dedup { dry_run } => {
            let options = MaintenanceOptions::from(&settings.maintenance).dry_run(dry_run);
            write_json(&maintenance::deduplicate(&store, options).await?)
        }
        Commands::Renormalize { dry_run } => {
            let options = MaintenanceOptions::from(&settings.maintenance).dry_run(dry_run);
            write_json(&maintenance::renormalize(&store, options).await?)
        }
        Commands::Coverage => {
            write_json(&coverage::diff(&store, &settings.source_locale, &settings.locales).await?)
        }
        Commands::Usage => {
            let indexer = WorkspaceIndexer::new(workspace, &settings.templates)?;
            let index = indexer.index_workspace().await?;
            let report =
                coverage::usage_diff(&store, &index, &settings.source_locale, &settings.locales).await?;
            write_json(&report)
        }
        Commands::Translate { page, locales, dry_run } => {
            let options = BulkOptions {
                target_locales: locales
                    .unwrap_or_else(|| settings.other_locales(&settings.source_locale)),
                source_locale: settings.source_locale.clone(),
                page,
                dry_run,
            };
            let translator = Translator::new(ChatCompletionsClient::from_config(&settings.translation)?);
            write_json(&translator.translate_missing(&store, &options).await?)
        }
        Commands::Import { locale, file } => {
            let body = tokio::fs::read_to_string(&file).await?;
            write_json(&import_messages(&store, &locale, &body).await?)
        }
        Commands::Export { locale, output } => {
            let rendered = export_messages(&resolve(&store, &locale).await)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, format!("{rendered}\n")).await?;
                    tracing::info!(locale = %locale, path = %path.display(), "Messages exported");
                    Ok(())
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{rendered}")?;
                    Ok(())
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(error) => {
            let _ = writeln!(std::io::stderr(), "content-engine: {error}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Command failed");
            ExitCode::FAILURE
        }
    }
}

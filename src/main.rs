// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};

use fictrans::app_config::{self, Config};
use fictrans::app_controller::Controller;
use fictrans::store::MemoryStore;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an HTML chapter
    Translate(TranslateArgs),

    /// Parse a glossary file and print its compiled rules
    Glossary {
        /// Glossary file in the sectioned text format
        #[arg(value_name = "GLOSSARY_FILE")]
        path: PathBuf,

        /// Set logging level
        #[arg(short, long, value_enum)]
        log_level: Option<CliLogLevel>,
    },

    /// Generate shell completions for fictrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input HTML file
    #[arg(value_name = "INPUT_FILE")]
    input_path: PathBuf,

    /// Output file; defaults to `<input>.<target>.html`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Provider id from the configuration (e.g. 'deepseek', 'gemini')
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code, or 'auto'
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'zh-CN', 'ja', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Additional glossary files
    #[arg(short, long)]
    glossary: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// fictrans - glossary-aware fan-fiction translation
#[derive(Parser, Debug)]
#[command(name = "fictrans")]
#[command(version)]
#[command(about = "Glossary-aware translation of fan-fiction chapters")]
#[command(long_about = "fictrans translates HTML chapters with LLM and machine-translation providers, \
keeping glossary terms intact.

EXAMPLES:
    fictrans translate chapter.html                     # Translate using conf.json
    fictrans translate -p gemini -t ja chapter.html     # Use another provider and target
    fictrans translate -g names.txt chapter.html        # Add a glossary file
    fictrans glossary names.txt                         # Inspect compiled glossary rules
    fictrans completions bash > fictrans.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation; the active level is `log::max_level()`
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config or a flag says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "fictrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Glossary { path, log_level } => {
            if let Some(level) = log_level {
                log::set_max_level(app_config::LogLevel::from(level).to_level_filter());
            }
            run_glossary(&path)
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

fn run_glossary(path: &Path) -> Result<()> {
    let controller = Controller::with_parts(Config::default(), Arc::new(MemoryStore::new()), None);
    let lines = controller.describe_glossary(path)?;
    let mut stdout = std::io::stdout();
    for line in &lines {
        writeln!(stdout, "{}", line)?;
    }
    info!("{} rules", lines.len());
    Ok(())
}

fn load_config(options: &TranslateArgs) -> Result<Config> {
    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", options.config_path);
        let config = Config::default();
        config
            .save_to_file(config_path)
            .context("Failed to write default config")?;
        config
    };

    // Command-line options win over the file
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_mut().model = model.clone();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    config
        .glossary
        .files
        .extend(options.glossary.iter().map(|p| p.display().to_string()));

    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        log::set_max_level(app_config::LogLevel::from(level.clone()).to_level_filter());
    }

    let config = load_config(&options)?;
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    controller
        .run(options.input_path, options.output, options.force_overwrite)
        .await?;
    Ok(())
}

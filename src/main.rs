use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use llamabox::chat::{self, ChatContext};
use llamabox::config::{Settings, UserPreferences};
use llamabox::models::{import_models, OllamaCliCreator};
use llamabox::ollama::OllamaClient;
use llamabox::stack::{self, CommandRunner, Compose, ReadinessProbe, Stack, StackError, SystemRunner};

const EXAMPLES: &str = "\
Examples:
  llamabox start
  llamabox status
  llamabox logs --follow ollama
  llamabox chat \"Hello, how are you?\"
  llamabox chat --interactive --model llama3-small-q3-k-s
  llamabox code \"Create a Python function to calculate fibonacci\"
  llamabox explain \"What is recursion?\"
  llamabox translate \"Bonjour le monde\" --to english
  llamabox summarize document.txt
  llamabox review mycode.py
  llamabox models";

/// Local AI stack: Ollama + web chat UI under Docker Compose, and a terminal client for it
#[derive(Parser)]
#[command(name = "llamabox")]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
struct Cli {
    /// Model to use (defaults to the configured default model)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Stream responses as they are generated
    #[arg(short, long, global = true, conflicts_with = "no_stream")]
    stream: bool,

    /// Wait for complete responses even if streaming is the configured default
    #[arg(long, global = true)]
    no_stream: bool,

    /// Preferences file (default: ~/.llamabox/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr instead of the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Stack(StackCommand),
    #[command(flatten)]
    Ai(AiCommand),
    /// Inspect or create the preferences file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum StackCommand {
    /// Start the containers and wait until Ollama and the web UI answer
    Start,
    /// Stop the containers
    Stop,
    /// Stop, then start the containers
    Restart,
    /// Show container state and endpoint health
    Status,
    /// Show container logs
    Logs {
        /// Keep following new output
        #[arg(short, long)]
        follow: bool,
        /// Number of lines to show from the end of the logs
        #[arg(long)]
        tail: Option<u32>,
        /// Only show logs of this service
        service: Option<String>,
    },
    /// Container entrypoint: run the inference server and import models
    #[command(hide = true)]
    ContainerStart,
    /// Register every GGUF file in the models directory with Ollama
    #[command(hide = true)]
    ImportModels {
        /// Directory to scan (defaults to the configured models directory)
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AiCommand {
    /// Chat with the model
    Chat {
        /// Message to send (omit for interactive mode)
        message: Option<String>,
        /// Start an interactive chat session
        #[arg(short, long)]
        interactive: bool,
    },
    /// Code generation and assistance
    Code {
        /// Code request or question
        prompt: String,
    },
    /// Explain a concept, or the contents of a file
    Explain {
        /// Topic to explain or file to analyze
        topic: String,
    },
    /// Translate text
    Translate {
        /// Text to translate
        text: String,
        /// Target language
        #[arg(long)]
        to: String,
    },
    /// Summarize text or a file
    Summarize {
        /// Text to summarize or file path
        input: String,
    },
    /// Review a source file
    Review {
        /// File to review
        file: PathBuf,
    },
    /// List the models Ollama has registered
    Models,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective settings as JSON
    Show,
    /// Write a preferences file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the preferences file location
    Path,
}

/// Request overrides given as global flags.
struct ChatFlags {
    model: Option<String>,
    stream: bool,
    no_stream: bool,
}

/// Parses the command line, loads settings, initialises logging and runs
/// the selected command. Exits with the failing tool's exit code where one
/// is known.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let preferences_path = cli.config.clone().unwrap_or_else(UserPreferences::default_path);
    let flags = ChatFlags {
        model: cli.model,
        stream: cli.stream,
        no_stream: cli.no_stream,
    };
    let command = cli
        .command
        .unwrap_or(Commands::Ai(AiCommand::Chat { message: None, interactive: true }));

    // Config commands must work even when the preferences file is malformed
    let command = match command {
        Commands::Config { command } => return config_command(command, &preferences_path),
        Commands::Stack(command) => Ok(command),
        Commands::Ai(command) => Err(command),
    };

    let settings = Settings::new(Some(&preferences_path)).context("Failed to load configuration")?;
    let guard = init_logging(&settings, cli.verbose);

    info!("llamabox starting up");
    info!("Ollama endpoint: {}", settings.ollama_url());

    let code = match command {
        Ok(command) => run_stack(command, &settings).await?,
        Err(command) => {
            run_ai(command, flags, &settings).await?;
            0
        }
    };

    if code != 0 {
        drop(guard);
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(settings: &Settings, verbose: bool) -> Option<WorkerGuard> {
    if verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::new("debug"))
            .with_target(false)
            .init();
        return None;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.to_lowercase()));

    let log_dir = &settings.logging.directory;
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        // Read-only filesystems (e.g. inside the container) fall back to stderr
        eprintln!("Cannot create log directory {}: {}", log_dir.display(), e);
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::new("warn"))
            .init();
        return None;
    }

    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        log_dir,
        "llamabox",
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    Some(guard)
}

async fn run_stack(command: StackCommand, settings: &Settings) -> Result<i32> {
    let op = match command {
        StackCommand::ContainerStart => {
            return Ok(stack::container_start(settings).await.unwrap_or_else(report_stack_error));
        }
        StackCommand::ImportModels { dir } => {
            let dir = dir.unwrap_or_else(|| settings.stack.models_dir.clone());
            return run_import(&dir, settings).await;
        }
        op => op,
    };

    let stack = match build_stack(settings).await {
        Ok(stack) => stack,
        Err(e) => return Ok(report_stack_error(e)),
    };

    let result = match op {
        StackCommand::Start => stack.start().await,
        StackCommand::Stop => stack.stop().await,
        StackCommand::Restart => stack.restart().await,
        StackCommand::Status => stack.status().await.map(|_| ()),
        StackCommand::Logs { follow, tail, service } => {
            let tail = tail.unwrap_or(settings.stack.log_tail);
            stack.logs(follow, tail, service.as_deref()).await
        }
        StackCommand::ContainerStart | StackCommand::ImportModels { .. } => Ok(()),
    };

    Ok(result.map(|_| 0).unwrap_or_else(report_stack_error))
}

async fn run_ai(command: AiCommand, flags: ChatFlags, settings: &Settings) -> Result<()> {
    let context = chat_context(flags, settings)?;

    match command {
        AiCommand::Chat { message: Some(message), interactive: false } => {
            chat::handle_chat_once(&context, &message).await
        }
        AiCommand::Chat { .. } => chat::chat_loop(&context).await,
        AiCommand::Code { prompt } => chat::handle_code(&context, &prompt).await,
        AiCommand::Explain { topic } => chat::handle_explain(&context, &topic).await,
        AiCommand::Translate { text, to } => chat::handle_translate(&context, &text, &to).await,
        AiCommand::Summarize { input } => chat::handle_summarize(&context, &input).await,
        AiCommand::Review { file } => chat::handle_review(&context, &file).await,
        AiCommand::Models => {
            context.ensure_connected().await?;
            chat::handle_list_models(&context).await
        }
    }
}

fn config_command(command: ConfigCommand, preferences_path: &Path) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let settings = Settings::new(Some(preferences_path)).context("Failed to load configuration")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigCommand::Init { force } => init_preferences(preferences_path, force)?,
        ConfigCommand::Path => println!("{}", preferences_path.display()),
    }
    Ok(())
}

async fn build_stack(settings: &Settings) -> Result<Stack, StackError> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let compose = Compose::detect(runner, settings.compose_file(), &settings.stack.project_dir).await?;
    let probe = ReadinessProbe::from_config(&settings.stack)?;
    Ok(Stack::new(compose, probe, settings.ollama_url(), settings.stack.webui_url.clone()))
}

fn report_stack_error(e: StackError) -> i32 {
    error!("{}", e);
    eprintln!("{} {}", "❌ Error:".red(), e);
    e.exit_code()
}

async fn run_import(dir: &Path, settings: &Settings) -> Result<i32> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let creator = OllamaCliCreator::new(runner, settings.stack.ollama_binary.clone());

    println!("Importing models from {}", dir.display());
    let report = import_models(dir, &creator)
        .await
        .with_context(|| format!("Failed to import models from {}", dir.display()))?;

    for model in &report.imported {
        println!("  {} {} -> {}", "✓".bright_green(), model.file.display(), model.name.yellow());
    }
    for failure in &report.failed {
        println!("  {} {}: {}", "✗".red(), failure.file.display(), failure.reason);
    }
    println!("{}", report.summary());
    Ok(0)
}

fn chat_context(flags: ChatFlags, settings: &Settings) -> Result<ChatContext> {
    let stream = if flags.stream {
        true
    } else if flags.no_stream {
        false
    } else {
        settings.chat.stream
    };

    Ok(ChatContext {
        client: OllamaClient::from_config(&settings.ollama)?,
        model: flags.model.unwrap_or_else(|| settings.chat.default_model.clone()),
        stream,
        temperature: settings.chat.temperature,
        max_tokens: settings.chat.max_tokens,
    })
}

fn init_preferences(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    UserPreferences::template().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

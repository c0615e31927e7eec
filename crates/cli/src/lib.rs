pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use teller_agent::runtime::DialogueRuntime;
use teller_core::backend::InMemoryBankingBackend;
use teller_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use teller_core::interaction::InMemoryInteractionLog;

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "teller",
    about = "Teller banking assistant CLI",
    long_about = "Talk to the Teller banking assistant, classify utterances, and inspect configuration.",
    after_help = "Examples:\n  teller chat\n  teller ask \"My account is 12345678, what's my balance?\"\n  teller classify --offline \"block my credit card\"\n  teller config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a teller.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Skip the model classifier and use keyword rules only")]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation")]
    Chat,
    #[command(about = "Run a single turn and print the reply")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "What to say")]
        utterance: Vec<String>,
    },
    #[command(about = "Print the classification of an utterance as JSON")]
    Classify {
        #[arg(required = true, num_args = 1.., help = "Utterance to classify")]
        utterance: Vec<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                llm_enabled: self.offline.then_some(false),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli).await;
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

async fn execute(cli: Cli) -> CommandResult {
    let options = cli.load_options();
    match cli.command {
        Command::Config => CommandResult::text(commands::config::run(options)),
        Command::Chat => match bootstrap(options) {
            Ok((runtime, log)) => chat(&runtime, &log).await,
            Err(failure) => failure,
        },
        Command::Ask { utterance } => match bootstrap(options) {
            Ok((runtime, _)) => commands::ask::run(&runtime, &utterance.join(" ")).await,
            Err(failure) => failure,
        },
        Command::Classify { utterance } => match bootstrap(options) {
            Ok((runtime, _)) => {
                commands::classify::run(runtime.classifier(), &utterance.join(" ")).await
            }
            Err(failure) => failure,
        },
    }
}

fn bootstrap(
    options: LoadOptions,
) -> Result<(DialogueRuntime, InMemoryInteractionLog), CommandResult> {
    let config = AppConfig::load(options).map_err(|error| {
        CommandResult::failure("teller", "config_validation", error.to_string(), 2)
    })?;
    logging::init(&config);

    let log = InMemoryInteractionLog::default();
    let runtime = DialogueRuntime::from_config(
        &config,
        Arc::new(InMemoryBankingBackend::seeded()),
        Arc::new(log.clone()),
    )
    .map_err(|error| {
        CommandResult::failure("teller", "runtime_bootstrap", format!("{error:#}"), 1)
    })?;

    Ok((runtime, log))
}

async fn chat(runtime: &DialogueRuntime, log: &InMemoryInteractionLog) -> CommandResult {
    let mut session = runtime.open_session();
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    match commands::chat::run_repl(&mut session, log, input, &mut output, shutdown).await {
        Ok(()) => CommandResult::text(String::new()),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 1),
    }
}

//! chat-stream binary entry point

use std::io::Write;

use chat_stream::{
    cli::{Cli, Commands},
    config::{Config, ModelProfile},
    messages::ConversationHistory,
    services::transport::ReqwestTransport,
    Conversation, StreamDriver, TurnOutcome,
};
use color_eyre::{eyre::bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Install error handler
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse_args();

    let global_path = cli
        .config_file
        .clone()
        .unwrap_or_else(Config::global_config_path);
    let config = Config::load_from(&global_path, &Config::project_config_path())?;

    // Set up logging
    let filter = if config.verbose(cli.verbose) {
        EnvFilter::new("chat_stream=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Query { query }) => {
            let profile = config.resolve_model(cli.model.as_deref())?;
            let driver = build_driver(&config)?;
            let mut conversation = new_conversation(&config);

            if let TurnOutcome::Failed(error) =
                run_turn(&mut conversation, &driver, profile, query).await?
            {
                bail!("{error}");
            }
        }
        Some(Commands::Repl) | None => {
            let profile = config.resolve_model(cli.model.as_deref())?;
            let driver = build_driver(&config)?;
            let mut conversation = new_conversation(&config);
            repl(&mut conversation, &driver, profile).await?;
        }
        Some(Commands::Config { list }) => {
            if list {
                list_config(&config)?;
            } else {
                println!("{}", global_path.display());
            }
        }
        Some(Commands::Models { list: _ }) => {
            list_models(&config);
        }
        Some(Commands::Version) => {
            println!("chat-stream version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn build_driver(config: &Config) -> Result<StreamDriver> {
    let transport = ReqwestTransport::with_proxy(config.global.proxy.as_deref())?;
    let options = config.global.stream.try_driver_options()?;
    Ok(StreamDriver::with_options(transport, options))
}

fn new_conversation(config: &Config) -> Conversation {
    let history = config
        .global
        .max_history
        .map_or_else(ConversationHistory::new, ConversationHistory::with_max_messages);

    let conversation =
        Conversation::with_history(history).with_tool_events(config.global.stream.tool_events);
    match config.system_prompt() {
        Some(prompt) => conversation.with_system_prompt(prompt),
        None => conversation,
    }
}

/// Stream one turn to stdout; Ctrl-C cancels it
async fn run_turn(
    conversation: &mut Conversation,
    driver: &StreamDriver,
    profile: &ModelProfile,
    prompt: String,
) -> Result<TurnOutcome> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut stdout = std::io::stdout();
    let outcome = conversation
        .send(prompt, driver, profile, &cancel, |event| {
            if let Some(text) = event.visible_text() {
                let _ = write!(stdout, "{text}");
                let _ = stdout.flush();
            }
        })
        .await;
    watcher.abort();
    println!();

    let outcome = outcome?;
    match &outcome {
        TurnOutcome::Completed => {}
        TurnOutcome::Cancelled => eprintln!("[cancelled]"),
        TurnOutcome::Failed(error) => eprintln!("error: {error}"),
    }
    Ok(outcome)
}

async fn repl(
    conversation: &mut Conversation,
    driver: &StreamDriver,
    profile: &ModelProfile,
) -> Result<()> {
    eprintln!(
        "chat-stream {} using {} ({}). Type /exit to quit.",
        env!("CARGO_PKG_VERSION"),
        profile.name,
        profile.model_name
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        match prompt {
            "" => continue,
            "/exit" | "/quit" => break,
            _ => {
                run_turn(conversation, driver, profile, prompt.to_string()).await?;
            }
        }
    }

    Ok(())
}

fn list_config(config: &Config) -> Result<()> {
    let mut global = config.global.clone();
    for profile in &mut global.model_profiles {
        if !profile.api_key.is_empty() {
            profile.api_key = "<redacted>".to_string();
        }
    }
    println!("{}", serde_json::to_string_pretty(&global)?);

    if let Some(prompt) = config.system_prompt() {
        println!("system_prompt (project): {prompt}");
    }

    for problem in config.validate() {
        eprintln!("warning: {problem}");
    }
    Ok(())
}

fn list_models(config: &Config) {
    if config.global.model_profiles.is_empty() {
        println!("No model profiles configured");
        return;
    }

    let default = config.default_model().map(|profile| profile.name.as_str());
    for profile in &config.global.model_profiles {
        let marker = if Some(profile.name.as_str()) == default {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {} [{}] {} {}",
            profile.name,
            profile.provider,
            profile.model_name,
            profile.effective_base_url().unwrap_or_default()
        );
    }
}

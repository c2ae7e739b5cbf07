use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lib::config::Config;
use lib::watson::Context;
use lib::{BotInfo, Middleware, Session, Update, WatsonConversationWare};

const CLI_USER_ID: &str = "cli-user";
const CLI_BOT_ID: &str = "watson-ware-cli";

#[derive(Parser)]
#[command(name = "watson-ware")]
#[command(about = "Watson Conversation ware CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Write a config template with placeholder credentials (skipped if the file exists).
    Init {
        /// Config file path (default: WATSON_WARE_CONFIG_PATH or ~/.watson-ware/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Send one message through the ware and print the full Watson reply as JSON.
    Send {
        /// Config file path (default: WATSON_WARE_CONFIG_PATH or ~/.watson-ware/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// JSON file with a context from a previous reply, to continue that conversation.
        #[arg(long, value_name = "FILE")]
        context: Option<std::path::PathBuf>,

        /// Message text.
        text: String,
    },

    /// Chat with the workspace (interactive). Context is kept in memory between turns.
    Chat {
        /// Config file path (default: WATSON_WARE_CONFIG_PATH or ~/.watson-ware/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("watson-ware {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            context,
            text,
        }) => {
            if let Err(e) = run_send(config, context, text).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config }) => {
            if let Err(e) = run_chat(config).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    if lib::config::write_template(&path)? {
        println!("wrote config template to {}", path.display());
    } else {
        println!("config already exists at {}", path.display());
    }
    Ok(())
}

/// Load config, apply env overrides, and build the ware.
fn build_ware(config_path: Option<std::path::PathBuf>) -> anyhow::Result<Middleware> {
    let (config, path) = lib::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    build_ware_from(&config)
}

fn build_ware_from(config: &Config) -> anyhow::Result<Middleware> {
    let options = lib::config::resolve_ware_options(config);
    let mut ware = WatsonConversationWare::controller(&options)?;
    if let Some(target) = config.log_target.as_deref() {
        ware = ware.with_log_target(target);
    }
    log::info!("using workspace {}", ware.workspace_id());
    let middleware = ware.into_middleware();
    log::debug!("built {:?} middleware {}", middleware.kind(), middleware.name());
    Ok(middleware)
}

fn read_context(path: &std::path::Path) -> anyhow::Result<Context> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading context from {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing context from {}", path.display()))
}

async fn run_send(
    config_path: Option<std::path::PathBuf>,
    context_path: Option<std::path::PathBuf>,
    text: String,
) -> anyhow::Result<()> {
    let ware = build_ware(config_path)?;
    let mut session = Session::new(CLI_USER_ID);
    if let Some(p) = context_path {
        session.watson_context = Some(read_context(&p)?);
    }

    let mut update = Update::text(CLI_USER_ID, CLI_BOT_ID, text).with_session(session);
    ware.handle(&BotInfo::new("cli").with_id(CLI_BOT_ID), &mut update).await?;

    let reply = update
        .watson_update
        .context("no reply: message had no text")?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

async fn run_chat(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let ware = build_ware(config_path)?;
    let bot = BotInfo::new("cli").with_id(CLI_BOT_ID);
    let mut session = Session::generate();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/reset") {
            session.reset();
            println!("(context cleared)");
            continue;
        }

        let mut update =
            Update::text(CLI_USER_ID, CLI_BOT_ID, input).with_session(session.clone());
        match ware.handle(&bot, &mut update).await {
            Ok(()) => {
                if let Some(s) = update.session.take() {
                    session = s;
                }
                let Some(reply) = update.watson_update else {
                    continue;
                };
                if let Some(intent) = reply.top_intent() {
                    log::info!("#{} ({:.2})", intent.intent, intent.confidence);
                }
                println!("< {}", reply.output_text().trim());
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}

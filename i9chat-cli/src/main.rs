use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use i9chat_store::{deliveries, heatmap, preferences, DocumentStore, Theme};
use std::sync::{Arc, Mutex};

mod admin;
mod auth;
mod chat;
mod chat_worker;
mod config;
mod llm;
mod llm_stream;
mod logging;
mod repl;
mod seed;
mod service;
mod state;

use config::Config;
use service::ChatService;

#[derive(Parser, Debug)]
#[command(name = "i9chat", version, about = "i9 Delivery support chat")]
struct Cli {
    /// Write logs to stderr instead of ~/.i9chat/logs/i9chat.log
    #[arg(long, global = true)]
    log_stderr: bool,

    /// Act as this user id (defaults to [user] id in config.toml)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage ~/.i9chat/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store API keys in ~/.i9chat/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Install demo couriers, users, deliveries and heatmap points
    Seed {
        /// Overwrite an existing directory
        #[arg(long)]
        force: bool,
    },

    /// Full-screen chat
    Chat {
        /// Resume a conversation instead of starting a new one
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Line-based chat on stdin/stdout
    Repl {
        #[arg(long)]
        conversation: Option<String>,
    },

    /// List your conversations
    Conversations {
        /// Case-insensitive title filter
        #[arg(long)]
        search: Option<String>,
    },

    /// List deliveries created from the chat
    Deliveries,

    /// Operator tools: transcripts and bot takeover
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },

    /// Print heatmap points as JSON
    Heatmap,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config file
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    PasteGeminiKey,
    PasteOpenaiKey,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: String,
    },
    /// Take over: the bot stops answering
    Pause {
        id: String,
    },
    Resume {
        id: String,
    },
    /// Answer as the assistant
    Reply {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    Get,
    Set { theme: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_stderr)?;

    let mut cfg = config::load_config()?;
    if let Some(user) = cli.user {
        cfg.user.id = user;
    }

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteGeminiKey => auth::gemini_paste_key()?,
            AuthCommand::PasteOpenaiKey => auth::openai_paste_key()?,
        },

        Command::Seed { force } => {
            let store = open_store(&cfg)?;
            seed::run_seed(&store, force)?;
        }

        Command::Chat { conversation } => {
            let store = open_store(&cfg)?;
            let (svc, model_ready) = chat_service(&cfg, store.clone(), conversation.as_deref())?;
            let theme = preferences::theme(&store, &cfg.user.id)?;
            let ui = chat::ChatUi {
                store,
                user_id: cfg.user.id.clone(),
                user_name: cfg.user.display_name.clone(),
                theme,
                typing_speed: cfg.chat.typing_speed,
                model_ready,
            };
            chat::run_chat(ui, Arc::new(Mutex::new(svc)))?;
        }

        Command::Repl { conversation } => {
            let store = open_store(&cfg)?;
            let (mut svc, model_ready) = chat_service(&cfg, store, conversation.as_deref())?;
            if !model_ready {
                eprintln!("No model configured. Run: i9chat auth paste-gemini-key");
            }
            repl::run_repl(&mut svc)?;
        }

        Command::Conversations { search } => {
            let store = open_store(&cfg)?;
            admin::list(&store, &cfg.user.id, search.as_deref())?;
        }

        Command::Deliveries => {
            let store = open_store(&cfg)?;
            let list = deliveries::load_deliveries(&store, &cfg.user.id)?;
            if list.is_empty() {
                println!("No deliveries for {}.", cfg.user.id);
            }
            for d in &list {
                println!("{}\n", d.summary());
            }
        }

        Command::Admin { command } => {
            let store = open_store(&cfg)?;
            match command {
                AdminCommand::List { search } => admin::list(&store, &cfg.user.id, search.as_deref())?,
                AdminCommand::Show { id } => admin::show(&store, &id)?,
                AdminCommand::Pause { id } => admin::set_paused(&store, &id, true)?,
                AdminCommand::Resume { id } => admin::set_paused(&store, &id, false)?,
                AdminCommand::Reply { id, text } => {
                    let msg = admin::reply(&store, &id, &text.join(" "))?;
                    println!("Sent {}", msg.id);
                }
            }
        }

        Command::Theme { command } => {
            let store = open_store(&cfg)?;
            match command {
                ThemeCommand::Get => println!("{}", preferences::theme(&store, &cfg.user.id)?),
                ThemeCommand::Set { theme } => {
                    let theme: Theme = theme.parse().map_err(anyhow::Error::msg)?;
                    preferences::set_theme(&store, &cfg.user.id, theme)?;
                    println!("Theme set to {theme}");
                }
            }
        }

        Command::Heatmap => {
            let store = open_store(&cfg)?;
            let points = heatmap::points(&store)?;
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
    }

    Ok(())
}

fn open_store(cfg: &Config) -> Result<DocumentStore> {
    let root = cfg.store_root()?;
    DocumentStore::open(&root).with_context(|| format!("open store at {}", root.display()))
}

fn chat_service(
    cfg: &Config,
    store: DocumentStore,
    conversation: Option<&str>,
) -> Result<(ChatService, bool)> {
    let llm_cfg = llm::resolve_config(cfg)?;
    let completer = llm::LlmCompleter::new(llm_cfg);
    let model_ready = completer.is_configured();
    tracing::info!(user = %cfg.user.id, model_ready, "starting chat");

    let mut svc = ChatService::from_config(cfg, store, Box::new(completer));
    if let Some(id) = conversation {
        svc.open_conversation(id)?;
    }
    Ok((svc, model_ready))
}

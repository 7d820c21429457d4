use clap::{Parser, Subcommand};
use copydesk::chat::{ChatSession, Outcome, SkipReason};
use copydesk::clients::ClientDirectory;
use copydesk::conversation::{Message, Role};
use copydesk::llm::GenerateCopyClient;
use copydesk::scope::ClientScope;
use copydesk::templates::{self, TemplateId};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "copydesk")]
#[command(about = "Copydesk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and an empty config file.
    Init {
        /// Config file path (default: COPYDESK_CONFIG_PATH or ~/.copydesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// List the available copywriting templates.
    Templates,

    /// List a user's clients (usable with `chat --client`).
    Clients {
        /// Config file path (default: COPYDESK_CONFIG_PATH or ~/.copydesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Owner id (default: clients.userId from config)
        #[arg(long, value_name = "ID")]
        user: Option<String>,
    },

    /// Chat with a template (interactive). Type /help inside the chat for commands.
    Chat {
        /// Config file path (default: COPYDESK_CONFIG_PATH or ~/.copydesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Template id (default: chat.defaultTemplate from config)
        #[arg(long, short)]
        template: Option<String>,

        /// Client id whose reference files the backend should use.
        #[arg(long, value_name = "ID")]
        client: Option<String>,
    },

    /// Run the local HTTP gateway over chat sessions.
    Serve {
        /// Config file path (default: COPYDESK_CONFIG_PATH or ~/.copydesk/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("copydesk {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Templates) => run_templates(),
        Some(Commands::Clients { config, user }) => {
            if let Err(e) = run_clients(config, user).await {
                log::error!("clients failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            template,
            client,
        }) => {
            if let Err(e) = run_chat(config, template, client).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(copydesk::config::default_config_path);
    let dir = copydesk::config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn run_templates() {
    for t in templates::all() {
        println!("{:<18} {}", t.id, t.name);
        for (i, s) in t.suggestions.iter().enumerate() {
            println!("    {}. {}", i + 1, s);
        }
    }
}

async fn run_clients(config_path: Option<PathBuf>, user: Option<String>) -> anyhow::Result<()> {
    let (config, _) = copydesk::config::load_config(config_path)?;
    let user = user
        .or_else(|| config.clients.user_id.clone())
        .ok_or_else(|| anyhow::anyhow!("no user id (pass --user or set clients.userId)"))?;
    let directory = ClientDirectory::from_config(&config)?;
    let clients = directory.list(&user).await?;
    if clients.is_empty() {
        println!("no clients for {}", user);
    }
    for c in clients {
        let files = if c.has_files() {
            format!("{} files", c.openai_file_ids.len())
        } else {
            "no files".to_string()
        };
        println!(
            "{}  {}  [{}]  {}",
            c.id,
            c.name,
            c.sector.as_deref().unwrap_or("-"),
            files
        );
    }
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, _) = copydesk::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    copydesk::gateway::run_gateway(config).await
}

const CHAT_HELP: &str = "\
commands:
  <enter>          send the pending input (shown in brackets)
  /new [template]  start a new conversation
  /regen [n]       regenerate reply n (default: last reply)
  /client <id>     scope to a client (/client none to clear)
  /suggest <n>     load suggestion n into the input
  /history         print the conversation
  /exit            quit";

async fn run_chat(
    config_path: Option<PathBuf>,
    template: Option<String>,
    client: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = copydesk::config::load_config(config_path)?;
    let template = template
        .as_deref()
        .map(TemplateId::resolve)
        .unwrap_or(config.chat.default_template);
    let generator = GenerateCopyClient::from_config(&config)?;
    let session =
        ChatSession::with_max_tokens(template, Arc::new(generator), config.backend.max_tokens);
    if let Some(id) = client {
        session.set_client_scope(Some(ClientScope::new(id))).await;
    }

    print_welcome(&session).await;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let pending = session.input().await;
        if pending.is_empty() {
            write!(stdout, "> ")?;
        } else {
            write!(stdout, "[{}] > ", pending)?;
        }
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        if let Some(command) = input.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));
            match name {
                "exit" | "quit" => break,
                "help" => println!("{}", CHAT_HELP),
                "new" => {
                    let t = if arg.is_empty() {
                        session.template().await
                    } else {
                        TemplateId::resolve(arg)
                    };
                    session.reset_conversation(t).await;
                    print_welcome(&session).await;
                }
                "regen" => {
                    let index = match arg.parse::<usize>() {
                        Ok(n) => Some(n),
                        Err(_) => last_reply_index(&session.messages().await),
                    };
                    match index {
                        Some(i) => {
                            let outcome = session.regenerate(i).await;
                            report(&session, outcome, Some(i)).await;
                        }
                        None => println!("nothing to regenerate"),
                    }
                }
                "client" => {
                    if arg.is_empty() || arg.eq_ignore_ascii_case("none") {
                        session.set_client_scope(None).await;
                        println!("client scope cleared");
                    } else {
                        session.set_client_scope(Some(ClientScope::new(arg))).await;
                        println!("client scope: {}", arg);
                    }
                }
                "suggest" => {
                    let ok = match arg.parse::<usize>() {
                        Ok(n) if n > 0 => session.apply_suggestion(n - 1).await,
                        _ => false,
                    };
                    if !ok {
                        println!("no such suggestion");
                    }
                }
                "history" => {
                    for (i, m) in session.messages().await.iter().enumerate() {
                        print_message(i, m);
                    }
                }
                _ => println!("unknown command; /help for commands"),
            }
            continue;
        }

        let outcome = if input.is_empty() {
            session.submit().await
        } else {
            session.send(input).await
        };
        report(&session, outcome, None).await;
    }

    Ok(())
}

async fn print_welcome(session: &ChatSession) {
    let messages = session.messages().await;
    if let Some(m) = messages.first() {
        println!("< {}", m.content);
    }
    let config = session.template().await.config();
    println!("  ({})", config.placeholder);
    if session.suggestions_visible().await {
        for (i, s) in config.suggestions.iter().enumerate() {
            println!("  /suggest {}  {}", i + 1, s);
        }
    }
}

/// Print the reply a send/regenerate produced, or why nothing happened.
async fn report(session: &ChatSession, outcome: Outcome, index: Option<usize>) {
    match outcome {
        Outcome::Generated | Outcome::Fallback => {
            let messages = session.messages().await;
            let i = index.unwrap_or(messages.len().saturating_sub(1));
            if let Some(m) = messages.get(i) {
                print_message(i, m);
            }
        }
        Outcome::Skipped(SkipReason::EmptyInput) => {}
        Outcome::Skipped(SkipReason::InvalidIndex) => println!("that message cannot be regenerated"),
        Outcome::Skipped(SkipReason::Busy) => println!("still generating, please wait"),
        Outcome::Skipped(SkipReason::Reset) => {}
    }
}

fn print_message(index: usize, m: &Message) {
    let marker = match m.role {
        Role::User => '>',
        Role::Assistant => '<',
    };
    println!("{} {} {}", index, marker, m.content.trim());
}

fn last_reply_index(messages: &[Message]) -> Option<usize> {
    messages
        .iter()
        .rposition(|m| m.role == Role::Assistant && !m.is_welcome())
}

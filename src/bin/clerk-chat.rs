//! Interactive chat application for conversing with a site agent.
//!
//! This binary provides a REPL over the clerk orchestrator: it begins a
//! session about a site, relays free-text turns and option picks, and keeps
//! the conversation in a state directory so it survives restarts.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the local development backend
//! clerk-chat
//!
//! # Point at another backend and skip the prompts
//! clerk-chat --backend-url https://agent.example --passphrase secret1 --url https://a.example/shop
//!
//! # Disable colors (useful for piping output)
//! clerk-chat --no-color
//! ```
//!
//! Set `CLERK_LOG` (e.g. `CLERK_LOG=clerk=debug`) to see diagnostics on stderr.
//!
//! # Commands
//!
//! - `/pick <n>` - Answer the agent's options
//! - `/new` - Discard the conversation and start another
//! - `/history` - Reprint the conversation
//! - `/status` - Show session status
//! - `/ping` - Check the backend
//! - `/help` - Show available commands
//! - `/quit` - Exit the application

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utf8path::Path;

use clerk::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, help_text, parse_command,
};
use clerk::{AgentClient, Conversation, Error, FileStore, Outcome, SessionStore};

type Chat = Arc<Conversation<AgentClient>>;

const NEW_CONVERSATION_WARNING: &str = "All chat history will be lost.";

enum Flow {
    Continue,
    Quit,
}

/// Main entry point for the clerk-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("clerk-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("CLERK_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = AgentClient::with_options(config.backend_url.clone(), Some(config.timeout))?;
    let store = FileStore::open(Path::from(config.state_dir.as_str()))?;
    let chat: Chat = Arc::new(Conversation::new(client, SessionStore::new(store)));
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // The token of the exchange currently awaited, cancelled by Ctrl+C.
    let current = Arc::new(Mutex::new(CancellationToken::new()));
    let current_clone = current.clone();
    ctrlc::set_handler(move || {
        current_clone
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    })?;

    println!("Clerk Chat (backend: {})", chat.transport().base_url());
    println!("Type /help for commands, /quit to exit\n");

    let session = chat.session();
    if let Some(host) = session.host() {
        renderer.print_info(&format!("Restored conversation about {host}."));
        print_history(&chat, &mut renderer);
    }

    let mut presets = Some((config.passphrase.clone(), config.url.clone()));
    loop {
        if !chat.session().is_active() {
            match begin(&chat, &mut rl, &mut renderer, &current, presets.take()).await {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        let line = match rl.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        if let Some(cmd) = parse_command(&line) {
            match cmd {
                ChatCommand::Quit => {
                    println!("Goodbye!");
                    break;
                }
                ChatCommand::Help => {
                    for line in help_text().lines() {
                        println!("    {}", line);
                    }
                }
                ChatCommand::Pick(number) => {
                    let Some(index) = chat.session().open_choice().map(|(index, _)| index) else {
                        renderer.print_error("There are no options to pick from.");
                        continue;
                    };
                    let cancel = arm(&current);
                    let task = {
                        let chat = chat.clone();
                        let cancel = cancel.clone();
                        async move { chat.select_option(index, number - 1, &cancel).await }
                    };
                    let outcome = await_exchange(task, &cancel).await;
                    report(&chat, &mut renderer, outcome);
                }
                ChatCommand::New => {
                    let answer = rl.readline(&format!(
                        "{NEW_CONVERSATION_WARNING} Start a new conversation? [y/N] "
                    ));
                    if matches!(answer.as_deref().map(str::trim), Ok("y" | "Y" | "yes")) {
                        match chat.reset() {
                            Ok(()) => renderer.print_info("Conversation discarded."),
                            Err(err) => renderer.print_error(&err.to_string()),
                        }
                    }
                }
                ChatCommand::History => print_history(&chat, &mut renderer),
                ChatCommand::Status => print_status(&chat),
                ChatCommand::Ping => match chat.heartbeat().await {
                    Ok(heartbeat) => renderer.print_info(&format!(
                        "Backend is up (server time {}).",
                        heartbeat.server_time
                    )),
                    Err(err) => renderer.print_error(&err.to_string()),
                },
                ChatCommand::Invalid(message) => renderer.print_error(&message),
            }
            continue;
        }

        let cancel = arm(&current);
        let task = {
            let chat = chat.clone();
            let cancel = cancel.clone();
            async move { chat.send_message(&line, &cancel).await }
        };
        let outcome = await_exchange(task, &cancel).await;
        report(&chat, &mut renderer, outcome);
    }

    Ok(())
}

/// Prompts for a passphrase and site and runs a begin-session exchange.
async fn begin(
    chat: &Chat,
    rl: &mut DefaultEditor,
    renderer: &mut PlainTextRenderer,
    current: &Arc<Mutex<CancellationToken>>,
    presets: Option<(Option<String>, Option<String>)>,
) -> Flow {
    let (preset_passphrase, preset_url) = presets.unwrap_or_default();
    let kept = chat.session().passphrase().map(String::from);

    let passphrase = match preset_passphrase {
        Some(passphrase) => passphrase,
        None => {
            let prompt = if kept.is_some() {
                "Passphrase (enter to keep current): "
            } else {
                "Passphrase: "
            };
            match prompt_line(rl, prompt) {
                Some(line) if line.is_empty() => kept.unwrap_or_default(),
                Some(line) => line,
                None => return Flow::Quit,
            }
        }
    };
    let url = match preset_url {
        Some(url) => url,
        None => match prompt_line(rl, "Site URL: ") {
            Some(url) => {
                let _ = rl.add_history_entry(url.as_str());
                url
            }
            None => return Flow::Quit,
        },
    };

    let cancel = arm(current);
    let task = {
        let chat = chat.clone();
        let cancel = cancel.clone();
        async move { chat.begin_session(&url, &passphrase, &cancel).await }
    };
    match await_exchange(task, &cancel).await {
        Some(Ok(Outcome::Committed)) => {
            if let Some(host) = chat.session().host() {
                renderer.print_info(&format!("Chatting about {host}."));
            }
            print_history(chat, renderer);
        }
        Some(Ok(Outcome::Failed(err))) => renderer.print_attached(&err),
        Some(Ok(Outcome::AlreadyInFlight)) => {}
        Some(Ok(Outcome::Abandoned)) | None => renderer.print_info("[abandoned]"),
        Some(Err(err)) => renderer.print_error(&err.to_string()),
    }
    Flow::Continue
}

/// Reads one line, mapping end-of-input and `/quit` to `None`.
fn prompt_line(rl: &mut DefaultEditor, prompt: &str) -> Option<String> {
    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if matches!(parse_command(&line), Some(ChatCommand::Quit)) {
                    return None;
                }
                return Some(line);
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(_) => return None,
        }
    }
}

/// Installs a fresh cancellation token for the next exchange.
fn arm(current: &Arc<Mutex<CancellationToken>>) -> CancellationToken {
    let token = CancellationToken::new();
    *current.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
    token
}

/// Runs an exchange, giving up on it when `cancel` fires.
///
/// The exchange keeps running after it is given up on; it resolves as
/// abandoned and releases the conversation when its reply arrives.
async fn await_exchange<F>(task: F, cancel: &CancellationToken) -> Option<clerk::Result<Outcome>>
where
    F: Future<Output = clerk::Result<Outcome>> + Send + 'static,
{
    let mut handle = tokio::spawn(task);
    tokio::select! {
        joined = &mut handle => Some(joined.unwrap_or_else(|err| {
            Err(Error::unknown(format!("exchange task failed: {err}")))
        })),
        _ = cancel.cancelled() => None,
    }
}

fn report(chat: &Chat, renderer: &mut PlainTextRenderer, outcome: Option<clerk::Result<Outcome>>) {
    match outcome {
        Some(Ok(Outcome::Committed)) => {
            let session = chat.session();
            if let Some(reply) = session.messages().last() {
                let index = session.messages().len() - 1;
                renderer.print_message(reply, chat.can_select(index));
            }
        }
        Some(Ok(Outcome::Failed(err))) => renderer.print_attached(&err),
        Some(Ok(Outcome::AlreadyInFlight)) => {
            renderer.print_info("(still waiting for the previous reply)")
        }
        Some(Ok(Outcome::Abandoned)) | None => renderer.print_info("[abandoned]"),
        Some(Err(err)) => renderer.print_error(&err.to_string()),
    }
}

fn print_history(chat: &Chat, renderer: &mut PlainTextRenderer) {
    let session = chat.session();
    let selectable = session
        .open_choice()
        .map(|(index, _)| index)
        .filter(|index| chat.can_select(*index));
    renderer.print_history(&session, selectable);
}

fn print_status(chat: &Chat) {
    let session = chat.session();
    println!("    Session Status:");
    println!("      State: {:?}", session.state());
    match session.identity() {
        Some(identity) => {
            println!("      Site: {}", identity.host);
            println!("      Thread: {}", identity.session_id);
        }
        None => println!("      Site: (none)"),
    }
    println!("      Messages: {}", session.messages().len());
    println!(
        "      Exchange: {}",
        if chat.is_awaiting_reply() {
            "awaiting reply"
        } else {
            "idle"
        }
    );
    match chat.conversation_error() {
        Some(err) => println!("      Last error: {err}"),
        None => println!("      Last error: (none)"),
    }
}

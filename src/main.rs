//! tutor-link terminal client entry point.
//!
//! Connects to the chat backend, streams bot replies to stdout, and reads
//! user input line by line from stdin.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use tutor_link::config::ClientConfig;
use tutor_link::domain::{ClientEvent, ConnectionState, TerminalReason};
use tutor_link::service::{Document, Uploader};
use tutor_link::transcript::{Speaker, Transcript, format_bot_message};
use tutor_link::ws::RealtimeClient;

/// One line of user input.
enum Command<'a> {
    Say(&'a str),
    Upload(&'a str),
    History,
    Quit,
    Empty,
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if let Some(path) = line.strip_prefix("/upload ") {
            return Self::Upload(path.trim());
        }
        match line {
            "/quit" | "/exit" => Self::Quit,
            "/history" => Self::History,
            _ => Self::Say(line),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    init_tracing(config.log_json);

    let client = RealtimeClient::new(&config);
    let uploader = Uploader::new(config.upload_url.clone());
    let mut events = client.subscribe();

    tracing::info!(
        conversation_id = %client.conversation_id(),
        url = %config.server_url,
        upload_url = %uploader.endpoint(),
        "starting tutor-link"
    );
    client.connect(config.server_url.clone());

    let mut transcript = Transcript::new();
    for entry in transcript.entries() {
        println!("bot> {}", entry.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    let mut reply_open = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Command::Quit => break,
                    Command::Empty => {}
                    Command::History => print_history(&transcript),
                    Command::Upload(path) => {
                        match upload(&uploader, path).await {
                            Ok(message) => {
                                println!("bot> {message}");
                                transcript.push_bot_note(message);
                            }
                            Err(e) => eprintln!("upload failed [{}]: {e}", e.error_code()),
                        }
                    }
                    Command::Say(text) => {
                        if reply_open {
                            println!();
                            reply_open = false;
                        }
                        transcript.push_user(text);
                        client.send(text);
                        if client.state().is_reconnecting() {
                            eprintln!("[queued until connected]");
                        }
                    }
                }
            }
            event = events.recv() => {
                if let Ok(event) = &event {
                    tracing::trace!(event = event.name(), at = %event.timestamp(), "client event");
                }
                match event {
                    Ok(ClientEvent::Token { delta, .. }) => {
                        if !reply_open {
                            print!("bot> ");
                            reply_open = true;
                        }
                        print!("{delta}");
                        stdout.flush()?;
                        transcript.apply_reply(&client.response(), false);
                    }
                    Ok(ClientEvent::TurnCompleted { text, .. }) => {
                        if reply_open {
                            println!();
                            reply_open = false;
                        }
                        transcript.apply_reply(&text, true);
                    }
                    Ok(ClientEvent::EasterEgg { .. }) => {
                        if client.take_easter_egg() {
                            println!("*** you found the easter egg ***");
                        }
                    }
                    Ok(ClientEvent::StateChanged { state, .. }) => match state {
                        ConnectionState::Open => eprintln!("[connected]"),
                        ConnectionState::Retrying { attempt } => {
                            eprintln!("[reconnecting {attempt}/{}]", config.max_retries);
                        }
                        ConnectionState::Terminal {
                            reason: TerminalReason::RetriesExhausted,
                        } => eprintln!("[connection lost]"),
                        _ => {}
                    },
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "terminal fell behind client events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    client.close();
    tracing::info!("tutor-link stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn upload(uploader: &Uploader, path: &str) -> Result<String, tutor_link::error::ClientError> {
    let document = Document::from_path(path).await?;
    Ok(uploader.upload(document).await?)
}

fn print_history(transcript: &Transcript) {
    for entry in transcript.entries() {
        match entry.speaker {
            Speaker::User => println!("you> {}", entry.text),
            Speaker::Bot => {
                let items = format_bot_message(&entry.text);
                if items.len() > 1 {
                    println!("bot>");
                    for item in items {
                        println!("  • {item}");
                    }
                } else {
                    println!("bot> {}", entry.text);
                }
            }
        }
    }
}

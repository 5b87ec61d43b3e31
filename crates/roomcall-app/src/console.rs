//! Line-based input from stdin.
//!
//! Plain text is sent as chat. Lines starting with `/` are commands.

use roomcall_call::{CallCommand, CallHandle};
use tokio::io::{AsyncBufReadExt, BufReader};

pub const HELP: &str = "\
commands:
  /mute           toggle microphone
  /video          toggle camera
  /share          toggle screen sharing
  /watch <url>    start cinema mode with a YouTube link
  /peers          list connected participants
  /quit           leave the call
anything else is sent as a chat message";

/// What one input line asks for.
#[derive(Debug)]
pub enum ConsoleAction {
    Command(CallCommand),
    Peers,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> ConsoleAction {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleAction::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ConsoleAction::Command(CallCommand::SendChat(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "mute" => ConsoleAction::Command(CallCommand::ToggleAudio),
        "video" => ConsoleAction::Command(CallCommand::ToggleVideo),
        "share" => ConsoleAction::Command(CallCommand::ToggleScreenShare),
        "watch" if !arg.is_empty() => {
            ConsoleAction::Command(CallCommand::StartCinema(arg.to_string()))
        }
        "peers" => ConsoleAction::Peers,
        "help" => ConsoleAction::Help,
        "quit" | "exit" => ConsoleAction::Quit,
        _ => ConsoleAction::Unknown(line.to_string()),
    }
}

/// Read stdin until EOF or `/quit`, forwarding commands to the call.
///
/// Returns when the user quits, stdin closes, or the call has ended.
pub async fn run(handle: &CallHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin read failed: {e}");
                break;
            }
        };

        match parse_line(&line) {
            ConsoleAction::Command(command) => {
                if handle.send(command).await.is_err() {
                    break;
                }
            }
            ConsoleAction::Peers => match handle.peers().await {
                Ok(peers) if peers.is_empty() => println!("no one else is here"),
                Ok(peers) => {
                    for peer in peers {
                        println!("  {} ({:?})", peer.participant_id, peer.state);
                    }
                }
                Err(_) => break,
            },
            ConsoleAction::Help => println!("{HELP}"),
            ConsoleAction::Quit => break,
            ConsoleAction::Unknown(line) => println!("unknown command: {line} (try /help)"),
            ConsoleAction::Empty => {}
        }
    }
}

//! Interactive chat loop.

use std::path::Path;
use std::sync::Arc;

use roomtalk_backend::BackendClient;
use roomtalk_session::config::ClientConfig;
use roomtalk_session::local::LocalTokenService;
use roomtalk_session::setup::forget_profile;
use roomtalk_session::{
    Config, SessionController, SessionProfile, SessionServices, SessionSnapshot, SessionState,
    TransportKind,
};
use roomtalk_transport::{LocalConnector, LocalHub, RoomConnector};
use roomtalk_types::Origin;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;

/// Chat input that is a command rather than a message.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Leave the room and forget the identity.
    Leave,
    Quit,
    Reconnect,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "/leave" => Some(Command::Leave),
        "/quit" => Some(Command::Quit),
        "/reconnect" => Some(Command::Reconnect),
        _ => None,
    }
}

/// Services for the configured transport. Agent replies always come from
/// the backend.
fn services(config: &ClientConfig) -> anyhow::Result<SessionServices> {
    let replies = Arc::new(BackendClient::new(&config.backend_url)?);
    let services = match config.transport {
        TransportKind::Livekit => SessionServices {
            tokens: replies.clone(),
            connector: livekit_connector()?,
            replies,
        },
        TransportKind::Local => SessionServices {
            tokens: Arc::new(LocalTokenService),
            connector: Arc::new(LocalConnector::new(LocalHub::new())),
            replies,
        },
    };
    Ok(services)
}

#[cfg(feature = "livekit")]
#[allow(clippy::unnecessary_wraps)]
fn livekit_connector() -> anyhow::Result<Arc<dyn RoomConnector>> {
    Ok(Arc::new(roomtalk_transport::LiveKitConnector::new()))
}

#[cfg(not(feature = "livekit"))]
fn livekit_connector() -> anyhow::Result<Arc<dyn RoomConnector>> {
    anyhow::bail!(
        "roomtalk was built without LiveKit support; rebuild with `--features livekit` \
         or run `roomtalk chat --local`"
    )
}

pub async fn run(profile: SessionProfile, config: &Config, dir: &Path) -> anyhow::Result<()> {
    let services = services(&config.client)?;
    info!(transport = ?config.client.transport, "starting chat session");

    println!(
        "Joining room {} as {}. Type /quit to exit, /leave to log out.",
        profile.room, profile.identity
    );
    let mut controller = SessionController::new(profile, &config.chat, services);
    let mut errors = controller
        .take_error_receiver()
        .ok_or_else(|| anyhow::anyhow!("error receiver already taken"))?;
    let handle = controller.handle();
    let session = tokio::spawn(controller.run());

    tokio::spawn(async move {
        while let Some(e) = errors.recv().await {
            eprintln!("error: {e}");
        }
    });
    let printer = tokio::spawn(print_updates(handle.subscribe(), config.chat.agent_label.clone()));

    handle.connect().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Some(Command::Leave) => {
                handle.disconnect().await?;
                forget_profile(dir)?;
                break;
            }
            Some(Command::Quit) => break,
            Some(Command::Reconnect) => handle.connect().await?,
            None => handle.send_message(line).await?,
        }
    }

    info!("leaving chat");
    handle.shutdown().await?;
    session.await?;
    printer.abort();
    Ok(())
}

/// Print log entries and status changes as they arrive.
async fn print_updates(mut rx: watch::Receiver<SessionSnapshot>, agent_label: String) {
    let mut last = SessionSnapshot::default();
    loop {
        let next = rx.borrow_and_update().clone();
        for line in render_changes(&last, &next, &agent_label) {
            println!("{line}");
        }
        last = next;
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Lines describing what changed between two snapshots.
///
/// Our own messages are not echoed; the terminal already shows them.
fn render_changes(last: &SessionSnapshot, next: &SessionSnapshot, agent_label: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if next.state != last.state {
        lines.push(match next.state {
            SessionState::Idle => "-- left the room".to_string(),
            SessionState::Connecting => "-- connecting...".to_string(),
            SessionState::Connected => "-- connected".to_string(),
            SessionState::Disconnected => {
                "-- disconnected (type /reconnect to rejoin)".to_string()
            }
        });
    }

    // A shorter log or a different first entry means it was cleared;
    // everything in it is new.
    let cleared = next.messages.len() < last.messages.len()
        || next.messages.first().map(|e| e.id) != last.messages.first().map(|e| e.id);
    let seen = if cleared { 0 } else { last.messages.len() };
    lines.extend(
        next.messages[seen..]
            .iter()
            .filter(|e| e.origin != Origin::Local)
            .map(ToString::to_string),
    );

    if next.is_typing && !last.is_typing {
        lines.push(format!("-- {agent_label} is typing..."));
    }
    lines
}

#[cfg(test)]
mod tests {
    use roomtalk_types::ChatEntry;

    use super::*;

    fn snapshot(state: SessionState, messages: Vec<ChatEntry>, is_typing: bool) -> SessionSnapshot {
        SessionSnapshot {
            state,
            messages,
            is_typing,
        }
    }

    #[test]
    fn local_transport_needs_no_media_server() {
        let config = ClientConfig {
            transport: TransportKind::Local,
            ..ClientConfig::default()
        };
        assert!(services(&config).is_ok());
    }

    #[cfg(not(feature = "livekit"))]
    #[test]
    fn livekit_transport_needs_feature() {
        let Err(e) = services(&ClientConfig::default()) else {
            panic!("livekit transport should be unavailable");
        };
        assert!(e.to_string().contains("--local"));
    }

    #[cfg(feature = "livekit")]
    #[test]
    fn livekit_transport_is_default() {
        assert!(services(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("/leave"), Some(Command::Leave));
        assert_eq!(parse_command(" /quit "), Some(Command::Quit));
        assert_eq!(parse_command("/reconnect"), Some(Command::Reconnect));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/unknown"), None);
    }

    #[test]
    fn renders_new_remote_entries_only() {
        let hello = ChatEntry::new("alice", "hello", Origin::Local);
        let reply = ChatEntry::new("Assistant", "hi alice", Origin::Remote);
        let last = snapshot(SessionState::Connected, vec![hello.clone()], true);
        let next = snapshot(SessionState::Connected, vec![hello, reply], false);

        assert_eq!(
            render_changes(&last, &next, "Assistant"),
            vec!["<Assistant> hi alice".to_string()]
        );
    }

    #[test]
    fn renders_state_and_typing_changes() {
        let notice = ChatEntry::system("bob is in the room");
        let last = snapshot(SessionState::Connecting, Vec::new(), false);
        let next = snapshot(SessionState::Connected, vec![notice], true);

        assert_eq!(
            render_changes(&last, &next, "Assistant"),
            vec![
                "-- connected".to_string(),
                "* bob is in the room".to_string(),
                "-- Assistant is typing...".to_string(),
            ]
        );
    }

    #[test]
    fn cleared_log_renders_from_start() {
        let old = ChatEntry::new("bob", "hey", Origin::Remote);
        let last = snapshot(SessionState::Connected, vec![old.clone(), old], false);
        let new = ChatEntry::new("bob", "back", Origin::Remote);
        let next = snapshot(SessionState::Connected, vec![new], false);

        assert_eq!(
            render_changes(&last, &next, "Assistant"),
            vec!["<bob> back".to_string()]
        );
    }

    #[test]
    fn cleared_log_regrown_past_old_length_renders_from_start() {
        let old = ChatEntry::new("bob", "hey", Origin::Remote);
        let last = snapshot(SessionState::Connected, vec![old], false);
        let notice = ChatEntry::system("bob is in the room");
        let back = ChatEntry::new("bob", "back", Origin::Remote);
        let next = snapshot(SessionState::Connected, vec![notice, back], false);

        assert_eq!(
            render_changes(&last, &next, "Assistant"),
            vec!["* bob is in the room".to_string(), "<bob> back".to_string()]
        );
    }

    #[test]
    fn cleared_log_regrown_to_same_length_renders_from_start() {
        let old = ChatEntry::new("bob", "hey", Origin::Remote);
        let last = snapshot(SessionState::Connected, vec![old], false);
        let back = ChatEntry::new("bob", "back", Origin::Remote);
        let next = snapshot(SessionState::Connected, vec![back], false);

        assert_eq!(
            render_changes(&last, &next, "Assistant"),
            vec!["<bob> back".to_string()]
        );
    }
}

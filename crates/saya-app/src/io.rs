use std::io::BufRead;

use kanal::AsyncSender;
use saya_types::{AppEvent, SearchMode};
use tokio_util::sync::CancellationToken;

/// Reads commands from stdin and forwards them as events.
///
/// The blocking read lives on a plain thread so a pending read never holds
/// up runtime shutdown.
pub async fn watcher_io(
    cancel: CancellationToken,
    event_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let (line_tx, line_rx) = kanal::bounded::<String>(16);
    let line_rx = line_rx.to_async();

    std::thread::Builder::new()
        .name("saya-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    tracing::info!("Reading commands from stdin (:help for a list)");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = line_rx.recv() => {
                let Ok(line) = line else {
                    tracing::info!("stdin closed");
                    event_tx.send(AppEvent::Shutdown).await?;
                    return Ok(());
                };
                if let Some(event) = parse_command(&line) {
                    event_tx.send(event).await?;
                }
            }
        }
    }
}

pub const HELP: &str = "\
plain text         fast search
:search <query>    full search
:ocr <text>        match every word of recognized text
:import <path>     import a Yomitan archive
:cancel            cancel the running import
:list              list dictionaries
:delete <id>       delete a dictionary
:priority <id> <n> set dictionary priority
:quit              exit";

/// One input line -> event; `None` for blank lines and unknown commands
pub fn parse_command(line: &str) -> Option<AppEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Some(AppEvent::TextInput(line.to_string()));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    let event = match (name, rest) {
        ("search", query) if !query.is_empty() => AppEvent::Search {
            query: query.to_string(),
            profile_id: None,
            mode: SearchMode::Full,
        },
        ("ocr", text) if !text.is_empty() => AppEvent::OcrText {
            text: text.to_string(),
            profile_id: None,
        },
        ("import", path) if !path.is_empty() => AppEvent::ImportArchive {
            path: path.to_string(),
        },
        ("cancel", _) => AppEvent::CancelImport,
        ("list", _) => AppEvent::ListDictionaries,
        ("delete", id) => match id.parse() {
            Ok(id) => AppEvent::DeleteDictionary(id),
            Err(_) => {
                tracing::warn!("Usage: :delete <id>");
                return None;
            }
        },
        ("priority", args) => {
            let mut parts = args.split_whitespace().map(str::parse::<i64>);
            match (parts.next(), parts.next()) {
                (Some(Ok(dictionary_id)), Some(Ok(priority))) => {
                    AppEvent::UpdateDictionaryPriority {
                        dictionary_id,
                        priority,
                    }
                }
                _ => {
                    tracing::warn!("Usage: :priority <id> <priority>");
                    return None;
                }
            }
        }
        ("quit" | "q", _) => AppEvent::Shutdown,
        ("help", _) => {
            println!("{}", HELP);
            return None;
        }
        _ => {
            tracing::warn!("Unknown command: {}", line);
            return None;
        }
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_live_search() {
        assert!(matches!(parse_command("  食べる "), Some(AppEvent::TextInput(t)) if t == "食べる"));
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_commands() {
        assert!(matches!(
            parse_command(":search 単語"),
            Some(AppEvent::Search { query, mode: SearchMode::Full, .. }) if query == "単語"
        ));
        assert!(matches!(
            parse_command(":import /tmp/jmdict.zip"),
            Some(AppEvent::ImportArchive { path }) if path == "/tmp/jmdict.zip"
        ));
        assert!(matches!(
            parse_command(":priority 3 10"),
            Some(AppEvent::UpdateDictionaryPriority { dictionary_id: 3, priority: 10 })
        ));
        assert!(matches!(parse_command(":delete 4"), Some(AppEvent::DeleteDictionary(4))));
        assert!(matches!(parse_command(":q"), Some(AppEvent::Shutdown)));
    }

    #[test]
    fn test_bad_arguments_ignored() {
        assert!(parse_command(":delete x").is_none());
        assert!(parse_command(":priority 1").is_none());
        assert!(parse_command(":import").is_none());
        assert!(parse_command(":nope").is_none());
    }
}

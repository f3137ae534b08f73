use std::time::Duration;

use kanal::AsyncReceiver;
use saya_types::{AppEvent, DictionaryMetadata, DisplayResult, ImportProgress};
use tokio_util::sync::CancellationToken;

/// Prints app output to stdout. Import progress is coalesced to one line per
/// `delta_time` tick.
pub async fn ui_loop(
    app_to_ui_rx: AsyncReceiver<AppEvent>,
    delta_time: Duration,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(delta_time.max(Duration::from_millis(1)));
    let mut pending: Option<ImportProgress> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interval.tick() => {
                if let Some(progress) = pending.take() {
                    println!("{}", format_progress(&progress));
                }
            }
            event = app_to_ui_rx.recv() => {
                let Ok(event) = event else { return Ok(()) };
                match event {
                    AppEvent::ImportProgress(progress) => pending = Some(progress),
                    AppEvent::ImportFinished { message, .. } => {
                        pending = None;
                        println!("{}", message);
                    }
                    AppEvent::ShowResults(results) => {
                        if results.is_empty() {
                            println!("(no results)");
                        }
                        for result in &results {
                            println!("{}", format_result(result));
                        }
                    }
                    AppEvent::ShowDictionaries(dictionaries) => {
                        for dictionary in &dictionaries {
                            println!("{}", format_dictionary(dictionary));
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

pub fn format_progress(progress: &ImportProgress) -> String {
    format!("[{:>5.1}%] {}", progress.percent, progress.message)
}

pub fn format_result(result: &DisplayResult) -> String {
    let mut header = result.term.clone();
    if !result.reading.is_empty() && result.reading != result.term {
        header.push_str(&format!(" 【{}】", result.reading));
    }
    if let Some(pitch) = &result.pitch_accent {
        header.push_str(&format!(" {}", pitch));
    }
    if !result.part_of_speech.is_empty() {
        header.push_str(&format!(" ({})", result.part_of_speech));
    }
    if let Some(frequency) = &result.frequency {
        header.push_str(&format!(" {}", frequency));
    }

    let body = result
        .definition
        .lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}", header, body)
}

pub fn format_dictionary(dictionary: &DictionaryMetadata) -> String {
    format!(
        "#{} {} ({} entries, priority {})",
        dictionary.id, dictionary.title, dictionary.entry_count, dictionary.priority
    )
}

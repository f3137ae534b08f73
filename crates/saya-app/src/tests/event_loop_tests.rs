use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use saya_config::Config;
use saya_dictionary::{DictionaryService, DictionaryStore};
use saya_types::AppEvent;
use tokio::time::timeout;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::events::event_loop;
use crate::state::AppState;

const INDEX: &str = r#"{"title": "Pocket", "format": 3, "revision": "1", "author": "me"}"#;
const TERMS: &str = r#"[
    ["単語", "たんご", "n", "", ["word"], 1, ""],
    ["単語帳", "たんごちょう", "n", "", ["vocabulary notebook"], 2, ""],
    ["読む", "よむ", "v5", "v5", ["to read"], 3, ""]
]"#;
const META: &str = r#"[["単語", "freq", 800], ["単語", "pitch", {"reading": "たんご", "pitches": [{"position": 0}]}]]"#;

struct Harness {
    state: Arc<AppState>,
    tx: AsyncSender<AppEvent>,
    rx: AsyncReceiver<AppEvent>,
}

fn harness() -> Harness {
    let config = Config::default();
    let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
    let service = DictionaryService::with_store(store, &config.dictionary);
    let state = Arc::new(AppState::new(config, service));

    let (ui_to_app_tx, ui_to_app_rx) = kanal::bounded_async(64);
    let (app_to_ui_tx, app_to_ui_rx) = kanal::bounded_async(256);
    tokio::spawn(event_loop(state.clone(), ui_to_app_rx, app_to_ui_tx));

    Harness {
        state,
        tx: ui_to_app_tx,
        rx: app_to_ui_rx,
    }
}

fn write_archive(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    for (name, contents) in [
        ("index.json", INDEX),
        ("term_bank_1.json", TERMS),
        ("term_meta_bank_1.json", META),
    ] {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Next event that is not import progress
async fn next_output(rx: &AsyncReceiver<AppEvent>) -> AppEvent {
    loop {
        let event = timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for output")
            .expect("output channel closed");
        if !matches!(event, AppEvent::ImportProgress(_)) {
            return event;
        }
    }
}

async fn import(h: &Harness, dir: &Path) -> i64 {
    let path = dir.join("pocket.zip");
    write_archive(&path);
    h.tx
        .send(AppEvent::ImportArchive {
            path: path.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();

    match next_output(&h.rx).await {
        AppEvent::ImportFinished {
            dictionary_id: Some(id),
            ..
        } => id,
        other => panic!("Expected a finished import, got {:?}", other),
    }
}

#[tokio::test]
async fn test_import_then_live_search() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness();
    import(&h, dir.path()).await;
    assert!(!h.state.import_running.load(std::sync::atomic::Ordering::Acquire));

    h.tx.send(AppEvent::TextInput("単語".to_string())).await.unwrap();
    let AppEvent::ShowResults(results) = next_output(&h.rx).await else {
        panic!("Expected results");
    };
    let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
    assert_eq!(terms, vec!["単語", "単語帳"]);
    assert_eq!(results[0].pitch_accent.as_deref(), Some("⓪"));
    assert_eq!(results[0].frequency.as_deref(), Some("★★★★ Very Common (#800)"));
}

#[tokio::test]
async fn test_ocr_text_matches_every_word() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness();
    import(&h, dir.path()).await;

    h.tx
        .send(AppEvent::OcrText {
            text: "単語帳を読む".to_string(),
            profile_id: None,
        })
        .await
        .unwrap();
    let AppEvent::ShowResults(results) = next_output(&h.rx).await else {
        panic!("Expected results");
    };
    let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
    assert_eq!(terms, vec!["単語帳", "単語", "読む"]);
}

#[tokio::test]
async fn test_delete_lists_remaining_dictionaries() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness();
    let id = import(&h, dir.path()).await;

    h.tx.send(AppEvent::ListDictionaries).await.unwrap();
    let AppEvent::ShowDictionaries(listed) = next_output(&h.rx).await else {
        panic!("Expected dictionaries");
    };
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].entry_count, 3);

    h.tx.send(AppEvent::DeleteDictionary(id)).await.unwrap();
    let AppEvent::ShowDictionaries(listed) = next_output(&h.rx).await else {
        panic!("Expected dictionaries");
    };
    assert!(listed.is_empty());
    assert_eq!(h.state.dictionary.get_entry_count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_import_rejected_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness();
    let _running = h.state.begin_import().unwrap();

    let path = dir.path().join("pocket.zip");
    write_archive(&path);
    h.tx
        .send(AppEvent::ImportArchive {
            path: path.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();

    match next_output(&h.rx).await {
        AppEvent::ImportFinished {
            dictionary_id,
            message,
        } => {
            assert_eq!(dictionary_id, None);
            assert!(message.contains("already running"));
        }
        other => panic!("Expected a rejected import, got {:?}", other),
    }
    assert!(h.state.dictionary.list_dictionaries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_archive_reports_failure() {
    let h = harness();
    h.tx
        .send(AppEvent::ImportArchive {
            path: "/nonexistent/pocket.zip".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(
        next_output(&h.rx).await,
        AppEvent::ImportFinished {
            dictionary_id: None,
            ..
        }
    ));
    assert!(!h.state.import_running.load(std::sync::atomic::Ordering::Acquire));
}

#[tokio::test]
async fn test_shutdown_stops_loop() {
    let config = Config::default();
    let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
    let service = DictionaryService::with_store(store, &config.dictionary);
    let state = Arc::new(AppState::new(config, service));
    let (tx, rx) = kanal::bounded_async(4);
    let (out_tx, _out_rx) = kanal::bounded_async(4);

    let handle = tokio::spawn(event_loop(state, rx, out_tx));
    tx.send(AppEvent::Shutdown).await.unwrap();
    let result = timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

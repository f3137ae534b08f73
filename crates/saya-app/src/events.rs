use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use saya_types::AppEvent;

use crate::state::AppState;

pub mod import_archive;
pub mod manage;
pub mod ocr_text;
pub mod text_input;

use import_archive::handle_import;
use manage::{handle_delete, handle_list, handle_priority};
use ocr_text::handle_ocr_text;
use text_input::{handle_search, handle_text_input};

/// App's main loop
pub async fn event_loop(
    state: Arc<AppState>,
    ui_to_app_rx: AsyncReceiver<AppEvent>,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let Ok(event) = ui_to_app_rx.recv().await else {
            tracing::info!("[EVENT_LOOP] Input channel closed, stopping");
            return Ok(());
        };

        tracing::debug!(
            "[EVENT_LOOP] EVENT RECEIVED: {:?}",
            std::mem::discriminant(&event)
        );
        if matches!(event, AppEvent::Shutdown) {
            tracing::info!("[EVENT_LOOP] Shutdown requested");
            state.cancel_import();
            return Ok(());
        }
        handle_events(state.clone(), &app_to_ui_tx, event).await?;
    }
}

async fn handle_events(
    state: Arc<AppState>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
    event: AppEvent,
) -> anyhow::Result<()> {
    match event {
        AppEvent::ConfigChanged => {
            tracing::info!("[EVENT_LOOP] Config changed");
        }
        AppEvent::ImportArchive { path } => {
            handle_import(state, path, app_to_ui_tx).await?;
        }
        AppEvent::CancelImport => {
            if !state.cancel_import() {
                tracing::warn!("[EVENT_LOOP] Cancel requested but no import is running");
            }
        }
        AppEvent::TextInput(text) => {
            tracing::debug!("TextInput received: '{}' chars", text.chars().count());
            handle_text_input(state, text, app_to_ui_tx).await?;
        }
        AppEvent::Search {
            query,
            profile_id,
            mode,
        } => {
            handle_search(state, query, profile_id, mode, app_to_ui_tx).await?;
        }
        AppEvent::OcrText { text, profile_id } => {
            handle_ocr_text(state, text, profile_id, app_to_ui_tx).await?;
        }
        AppEvent::DeleteDictionary(dictionary_id) => {
            handle_delete(state, dictionary_id, app_to_ui_tx).await?;
        }
        AppEvent::UpdateDictionaryPriority {
            dictionary_id,
            priority,
        } => {
            handle_priority(state, dictionary_id, priority, app_to_ui_tx).await?;
        }
        AppEvent::ListDictionaries => {
            handle_list(state, app_to_ui_tx).await?;
        }
        // Output-only events
        AppEvent::ImportProgress(_)
        | AppEvent::ImportFinished { .. }
        | AppEvent::ShowResults(_)
        | AppEvent::ShowDictionaries(_)
        | AppEvent::Shutdown => {}
    }

    Ok(())
}

use std::sync::Arc;

use kanal::AsyncSender;
use saya_types::AppEvent;

use crate::state::AppState;

pub async fn handle_delete(
    state: Arc<AppState>,
    dictionary_id: i64,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let result = state.dictionary.delete_dictionary(dictionary_id).await;
    match result {
        Ok(_) => handle_list(state, app_to_ui_tx).await,
        Err(e) => {
            tracing::error!("Failed to delete dictionary {}: {}", dictionary_id, e);
            Ok(())
        }
    }
}

pub async fn handle_priority(
    state: Arc<AppState>,
    dictionary_id: i64,
    priority: i64,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let result = state
        .dictionary
        .update_dictionary_priority(dictionary_id, priority)
        .await;
    match result {
        Ok(()) => handle_list(state, app_to_ui_tx).await,
        Err(e) => {
            tracing::error!(
                "Failed to set priority of dictionary {}: {}",
                dictionary_id,
                e
            );
            Ok(())
        }
    }
}

pub async fn handle_list(
    state: Arc<AppState>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let dictionaries = state.dictionary.list_dictionaries().await?;
    app_to_ui_tx
        .send(AppEvent::ShowDictionaries(dictionaries))
        .await?;
    Ok(())
}

use std::sync::Arc;

use kanal::AsyncSender;
use saya_types::{AppEvent, SearchMode};

use crate::state::AppState;

/// Live typing: fast mode, unscoped
pub async fn handle_text_input(
    state: Arc<AppState>,
    text: String,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    handle_search(state, text, None, SearchMode::Fast, app_to_ui_tx).await
}

pub async fn handle_search(
    state: Arc<AppState>,
    query: String,
    profile_id: Option<i64>,
    mode: SearchMode,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let entries = state.dictionary.search(&query, profile_id, mode).await;
    tracing::debug!("[SEARCH] '{}' ({:?}): {} entries", query, mode, entries.len());

    let display_results = state
        .processor
        .display_results(entries, &state.dictionary)
        .await;

    app_to_ui_tx
        .send(AppEvent::ShowResults(display_results))
        .await?;
    Ok(())
}

use std::sync::Arc;

use kanal::AsyncSender;
use saya_types::AppEvent;

use crate::state::AppState;

/// Recognized on-screen text: every candidate word in batched exact lookups
pub async fn handle_ocr_text(
    state: Arc<AppState>,
    text: String,
    profile_id: Option<i64>,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        tracing::debug!("[OCR] Empty text, nothing to match");
        return Ok(());
    }

    let entries = state
        .processor
        .match_words(&text, &state.dictionary, profile_id)
        .await;
    tracing::debug!("[OCR] Matched {} entries", entries.len());

    let display_results = state
        .processor
        .display_results(entries, &state.dictionary)
        .await;

    app_to_ui_tx
        .send(AppEvent::ShowResults(display_results))
        .await?;
    Ok(())
}

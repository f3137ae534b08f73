use std::path::PathBuf;
use std::sync::Arc;

use kanal::AsyncSender;
use saya_types::{AppEvent, ImportProgress};

use crate::state::AppState;

/// Start an import in the background so the loop keeps serving searches and
/// cancel requests. Only one import runs at a time.
pub async fn handle_import(
    state: Arc<AppState>,
    path: String,
    app_to_ui_tx: &AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    if state.import_running.load(std::sync::atomic::Ordering::Acquire) {
        tracing::warn!("[IMPORT] Rejected '{}': another import is running", path);
        app_to_ui_tx
            .send(AppEvent::ImportFinished {
                dictionary_id: None,
                message: "Another import is already running".to_string(),
            })
            .await?;
        return Ok(());
    }

    let tx = app_to_ui_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = run_import(state, path, tx).await {
            tracing::error!("[IMPORT] Could not report import result: {}", e);
        }
    });
    Ok(())
}

/// Import one archive file, forwarding progress and the final result
pub async fn run_import(
    state: Arc<AppState>,
    path: String,
    app_to_ui_tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let Some(cancel) = state.begin_import() else {
        app_to_ui_tx
            .send(AppEvent::ImportFinished {
                dictionary_id: None,
                message: "Another import is already running".to_string(),
            })
            .await?;
        return Ok(());
    };

    let progress_tx = app_to_ui_tx.clone_sync();
    let progress = move |progress: ImportProgress| {
        // Progress is lossy under backpressure; the final result is not
        match progress_tx.try_send(AppEvent::ImportProgress(progress)) {
            Ok(true) => {}
            Ok(false) => tracing::trace!("[IMPORT] Progress dropped, output is behind"),
            Err(e) => tracing::debug!("[IMPORT] Progress dropped: {}", e),
        }
    };

    tracing::info!("[IMPORT] Importing {}", path);
    let result = state
        .dictionary
        .import_archive_file(PathBuf::from(&path), progress, cancel)
        .await;
    state.finish_import();

    let event = match result {
        Ok(outcome) => AppEvent::ImportFinished {
            dictionary_id: Some(outcome.dictionary_id),
            message: format!(
                "Imported '{}': {} entries, {} frequencies, {} pitch accents ({} records skipped)",
                outcome.title,
                outcome.entries,
                outcome.frequencies,
                outcome.pitch_accents,
                outcome.skipped
            ),
        },
        Err(e) => {
            tracing::error!("[IMPORT] {} failed: {}", path, e);
            AppEvent::ImportFinished {
                dictionary_id: None,
                message: e.to_string(),
            }
        }
    };
    app_to_ui_tx.send(event).await?;
    Ok(())
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use saya_config::Config;
use saya_dictionary::DictionaryService;
use saya_lang_japanese::JapaneseProcessor;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub dictionary: DictionaryService,
    pub processor: Arc<JapaneseProcessor>,
    pub import_running: AtomicBool,
    import_cancel: Mutex<Option<CancellationToken>>,
}

impl AppState {
    pub fn new(config: Config, dictionary: DictionaryService) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            dictionary,
            processor: Arc::new(JapaneseProcessor::new()),
            import_running: AtomicBool::new(false),
            import_cancel: Mutex::new(None),
        }
    }

    /// Claim the single import slot; `None` while another import runs
    pub fn begin_import(&self) -> Option<CancellationToken> {
        if self
            .import_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let token = CancellationToken::new();
        *self.import_cancel.lock().unwrap_or_else(|p| p.into_inner()) = Some(token.clone());
        Some(token)
    }

    pub fn finish_import(&self) {
        self.import_cancel
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        self.import_running.store(false, Ordering::Release);
    }

    /// Returns false when no import is running
    pub fn cancel_import(&self) -> bool {
        match self
            .import_cancel
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

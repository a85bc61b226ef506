//! Terminal implementations of the clipboard ports

use std::collections::HashMap;
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use parking_lot::Mutex;
use sonder::{SelectionHost, SonderError, SystemClipboard};
use tracing::debug;

/// System clipboard through arboard, on a blocking thread
pub struct ArboardClipboard;

#[async_trait::async_trait]
impl SystemClipboard for ArboardClipboard {
    async fn write_text(&self, text: String) -> Result<(), SonderError> {
        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new().map_err(|e| SonderError::Clipboard(e.to_string()))?;
            clipboard.set_text(text).map_err(|e| SonderError::Clipboard(e.to_string()))
        })
        .await
        .map_err(|e| SonderError::Clipboard(format!("clipboard thread failed: {}", e)))?
    }
}

/// Selection fallback for terminals: staged text is copied with an OSC 52
/// escape sequence, which most terminal emulators forward to the clipboard.
#[derive(Default)]
pub struct Osc52Host {
    next_id: AtomicU64,
    surfaces: Mutex<HashMap<u64, String>>,
    selected: Mutex<Option<u64>>,
}

impl Osc52Host {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionHost for Osc52Host {
    fn attach_surface(&self, text: String) -> Result<u64, SonderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.surfaces.lock().insert(id, text);
        Ok(id)
    }

    fn select_surface(&self, surface: u64) -> Result<(), SonderError> {
        if !self.surfaces.lock().contains_key(&surface) {
            return Err(SonderError::Clipboard(format!("surface {} is not attached", surface)));
        }
        *self.selected.lock() = Some(surface);
        Ok(())
    }

    fn exec_copy(&self) -> bool {
        let stdout = std::io::stdout();
        if !stdout.is_terminal() {
            debug!("stdout is not a terminal; OSC 52 copy skipped");
            return false;
        }
        let selected = *self.selected.lock();
        let Some(text) = selected.and_then(|id| self.surfaces.lock().get(&id).cloned()) else {
            return false;
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        let mut out = stdout.lock();
        out.write_all(format!("\x1b]52;c;{}\x07", encoded).as_bytes())
            .and_then(|_| out.flush())
            .is_ok()
    }

    fn detach_surface(&self, surface: u64) {
        self.surfaces.lock().remove(&surface);
        let mut selected = self.selected.lock();
        if *selected == Some(surface) {
            *selected = None;
        }
    }
}

//! Multi-format copy with a selection-based fallback, plus copy feedback marks
//!
//! `ClipboardPort::copy` never fails past its boundary: the outcome says which
//! path delivered the value, or that nothing was copied.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::interface::{CopyFormat, CopyOutcome, CopyPath, SelectionHost, SonderError, Symbol, SystemClipboard};

pub struct ClipboardPort {
    primary: Option<Arc<dyn SystemClipboard>>,
    fallback: Arc<dyn SelectionHost>,
}

impl ClipboardPort {
    pub fn new(primary: Option<Arc<dyn SystemClipboard>>, fallback: Arc<dyn SelectionHost>) -> Self {
        Self { primary, fallback }
    }

    /// Resolve `format` for `symbol` and copy it, primary path first.
    pub async fn copy(&self, symbol: &Symbol, format: CopyFormat) -> CopyOutcome {
        let value = format.resolve(symbol);

        if let Some(primary) = &self.primary {
            match primary.write_text(value.clone()).await {
                Ok(()) => {
                    debug!(glyph = %symbol.glyph, format = format.label(), "copied via system clipboard");
                    return CopyOutcome::Copied { value, format, path: CopyPath::Primary };
                }
                Err(e) => warn!("System clipboard write failed, trying selection fallback: {}", e),
            }
        }

        match self.copy_with_selection(&value) {
            Ok(true) => {
                debug!(glyph = %symbol.glyph, format = format.label(), "copied via selection fallback");
                CopyOutcome::Copied { value, format, path: CopyPath::Fallback }
            }
            Ok(false) => {
                warn!("Selection copy command was refused for {}", symbol.glyph);
                CopyOutcome::Failed { format }
            }
            Err(e) => {
                warn!("Selection fallback failed for {}: {}", symbol.glyph, e);
                CopyOutcome::Failed { format }
            }
        }
    }

    fn copy_with_selection(&self, value: &str) -> Result<bool, SonderError> {
        let surface = StagedSurface::attach(self.fallback.as_ref(), value)?;
        surface.select()?;
        Ok(self.fallback.exec_copy())
    }
}

/// Hidden surface attached to the host for the duration of one fallback copy.
/// Detached on drop, whichever way the copy exits.
struct StagedSurface<'a> {
    host: &'a dyn SelectionHost,
    id: u64,
}

impl<'a> StagedSurface<'a> {
    fn attach(host: &'a dyn SelectionHost, text: &str) -> Result<Self, SonderError> {
        let id = host.attach_surface(text.to_string())?;
        Ok(Self { host, id })
    }

    fn select(&self) -> Result<(), SonderError> {
        self.host.select_surface(self.id)
    }
}

impl Drop for StagedSurface<'_> {
    fn drop(&mut self) {
        self.host.detach_surface(self.id);
    }
}

/// "Just copied" marks, keyed by (glyph, format).
///
/// A mark is the instant of the last successful copy; it reads as active for
/// `window` after that. Copying again overwrites the instant, so repeated copies
/// extend the window instead of stacking timers.
#[derive(Debug, Clone)]
pub struct CopyFeedback {
    window: Duration,
    marks: HashMap<(String, CopyFormat), Instant>,
}

impl CopyFeedback {
    pub fn new(window: Duration) -> Self {
        Self { window, marks: HashMap::new() }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn mark(&mut self, glyph: &str, format: CopyFormat, now: Instant) {
        self.prune(now);
        self.marks.insert((glyph.to_string(), format), now);
    }

    pub fn is_copied(&self, glyph: &str, format: CopyFormat, now: Instant) -> bool {
        self.marks
            .get(&(glyph.to_string(), format))
            .is_some_and(|&stamp| now < stamp + self.window)
    }

    /// Active marks for `glyph`, in format order
    pub fn copied_formats(&self, glyph: &str, now: Instant) -> Vec<CopyFormat> {
        CopyFormat::ALL
            .into_iter()
            .filter(|&format| self.is_copied(glyph, format, now))
            .collect()
    }

    /// When the earliest still-active mark clears
    pub fn next_expiry(&self, now: Instant) -> Option<Instant> {
        self.marks
            .values()
            .map(|&stamp| stamp + self.window)
            .filter(|&expiry| expiry > now)
            .min()
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.marks.retain(|_, stamp| now < *stamp + window);
    }
}

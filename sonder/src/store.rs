//! SymbolSession - presentation-facing API for host UIs
//!
//! Composes the catalog, the focus navigator, the clipboard port, the copy
//! feedback marks and the recency cache behind a single UniFFI object.
//!
//! Concurrency Model:
//! - Mutable state sits behind parking_lot mutexes that are only held inside
//!   synchronous sections, never across an await
//! - The clipboard write is the only suspending step of an activation
//! - Storage writes are queued to a background writer (fire-and-forget)
//! - Uses global FALLBACK_RUNTIME when constructed outside any runtime (e.g., from UniFFI)

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clipboard::{ClipboardPort, CopyFeedback};
use crate::filter::filter;
use crate::interface::{
    Category, CopyFormat, CopyOutcome, FocusPosition, KeyValueStore, NavEffect, NavEvent,
    SelectionHost, SessionConfig, SonderError, Symbol, SystemClipboard, UiMode,
};
use crate::location::{location_with_query, query_from_location};
use crate::models::Catalog;
use crate::navigator::FocusNavigator;
use crate::persist::PersistQueue;
use crate::recency::RecencyCache;

/// Global fallback Tokio runtime for when a session is created outside any runtime context.
/// Hosts the storage writer task. Shared across all sessions and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// What `run_events` did before its source ended or it was cancelled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRunSummary {
    pub events: usize,
    pub effects: Vec<NavEffect>,
    pub outcomes: Vec<CopyOutcome>,
    pub cancelled: bool,
}

/// One interactive session over the symbol catalog
#[derive(uniffi::Object)]
pub struct SymbolSession {
    catalog: Arc<Catalog>,
    config: SessionConfig,
    navigator: Mutex<FocusNavigator>,
    feedback: Mutex<CopyFeedback>,
    recency: Mutex<RecencyCache>,
    clipboard: ClipboardPort,
    writer: PersistQueue,
}

// Internal implementation (not exported via FFI)
impl SymbolSession {
    /// Build a session over any catalog
    pub fn with_catalog(
        catalog: Arc<Catalog>,
        config: SessionConfig,
        storage: Arc<dyn KeyValueStore>,
        clipboard: Option<Arc<dyn SystemClipboard>>,
        selection: Arc<dyn SelectionHost>,
        location: Option<String>,
    ) -> Result<Self, SonderError> {
        if config.storage_key.is_empty() {
            return Err(SonderError::InvalidInput("storage key must not be empty".to_string()));
        }

        let writer = PersistQueue::spawn(Arc::clone(&storage), &runtime_handle());
        let recency = RecencyCache::load(
            storage.as_ref(),
            &config.storage_key,
            config.recency_limit as usize,
            &catalog,
            writer.clone(),
        );

        let seeded_query = location.as_deref().and_then(query_from_location).unwrap_or_default();
        let navigator = FocusNavigator::with_query(Arc::clone(&catalog), &seeded_query);
        let feedback = CopyFeedback::new(Duration::from_millis(config.feedback_window_ms));

        info!(
            categories = catalog.categories().len(),
            symbols = catalog.symbol_count(),
            recent = recency.glyphs().len(),
            "session started"
        );

        Ok(Self {
            catalog,
            config,
            navigator: Mutex::new(navigator),
            feedback: Mutex::new(feedback),
            recency: Mutex::new(recency),
            clipboard: ClipboardPort::new(clipboard, selection),
            writer,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Feed events from `events` through the navigator until the source ends
    /// or `cancel` fires, performing activations with `format` as requested.
    pub async fn run_events<S>(&self, events: S, format: CopyFormat, cancel: CancellationToken) -> EventRunSummary
    where
        S: Stream<Item = NavEvent>,
    {
        let mut events = std::pin::pin!(events);
        let mut summary = EventRunSummary::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                next = events.next() => match next {
                    Some(event) => event,
                    None => break,
                },
            };

            summary.events += 1;
            let Some(effect) = self.navigate(event) else {
                continue;
            };
            if let NavEffect::Activate { position } = effect {
                summary.outcomes.push(self.activate(position, format).await);
            }
            summary.effects.push(effect);
        }

        debug!(events = summary.events, cancelled = summary.cancelled, "event source finished");
        summary
    }

    /// Copy `symbol`, record it as recently used and mark the format on success
    async fn perform_activation(&self, symbol: Symbol, format: CopyFormat) -> CopyOutcome {
        let outcome = self.clipboard.copy(&symbol, format).await;

        if let CopyOutcome::Copied { .. } = &outcome {
            self.feedback.lock().mark(&symbol.glyph, format, Instant::now());
        }
        self.recency.lock().record(&symbol);
        outcome
    }
}

#[uniffi::export]
impl SymbolSession {
    /// Create a session over the bundled catalog. `location` seeds the query
    /// from its `q` parameter.
    #[uniffi::constructor]
    pub fn new(
        config: SessionConfig,
        storage: Arc<dyn KeyValueStore>,
        clipboard: Option<Arc<dyn SystemClipboard>>,
        selection: Arc<dyn SelectionHost>,
        location: Option<String>,
    ) -> Result<Self, SonderError> {
        let catalog = Catalog::bundled()?;
        Self::with_catalog(Arc::new(catalog), config, storage, clipboard, selection, location)
    }

    /// The view `query` would produce. Does not change the session query.
    pub fn filter(&self, query: String) -> Vec<Category> {
        filter(&query, &self.catalog).to_categories()
    }

    pub fn navigate(&self, event: NavEvent) -> Option<NavEffect> {
        self.navigator.lock().navigate(event)
    }

    /// Copy the symbol at `position` in the current view
    pub async fn activate(&self, position: FocusPosition, format: CopyFormat) -> CopyOutcome {
        let symbol = {
            let navigator = self.navigator.lock();
            let symbol = navigator.view().symbol_at(position).cloned();
            symbol
        };
        match symbol {
            Some(symbol) => self.perform_activation(symbol, format).await,
            None => {
                debug!(?position, "activation outside the current view rejected");
                CopyOutcome::Rejected
            }
        }
    }

    /// Copy a symbol by glyph, regardless of the current view (e.g. from the recent list)
    pub async fn activate_glyph(&self, glyph: String, format: CopyFormat) -> CopyOutcome {
        match self.catalog.symbol_by_glyph(&glyph).cloned() {
            Some(symbol) => self.perform_activation(symbol, format).await,
            None => CopyOutcome::Rejected,
        }
    }

    pub fn focus(&self) -> Option<FocusPosition> {
        self.navigator.lock().focus()
    }

    pub fn focused_symbol(&self) -> Option<Symbol> {
        let navigator = self.navigator.lock();
        let symbol = navigator.focused_symbol().cloned();
        symbol
    }

    pub fn mode(&self) -> UiMode {
        self.navigator.lock().mode()
    }

    pub fn query(&self) -> String {
        self.navigator.lock().query().to_string()
    }

    /// The current filtered view
    pub fn visible(&self) -> Vec<Category> {
        let navigator = self.navigator.lock();
        let categories = navigator.view().to_categories();
        categories
    }

    /// Number of symbols in the current view
    pub fn visible_count(&self) -> u32 {
        let navigator = self.navigator.lock();
        let count = navigator.view().symbol_count() as u32;
        count
    }

    /// Recently activated symbols, most recent first
    pub fn recent(&self) -> Vec<Symbol> {
        self.recency.lock().symbols(&self.catalog)
    }

    /// Formats of `glyph` currently showing the "copied" mark
    pub fn copied_formats(&self, glyph: String) -> Vec<CopyFormat> {
        self.feedback.lock().copied_formats(&glyph, Instant::now())
    }

    /// Milliseconds until the next "copied" mark clears, if any is showing
    pub fn next_feedback_expiry_ms(&self) -> Option<u64> {
        let now = Instant::now();
        let expiry = self.feedback.lock().next_expiry(now)?;
        Some(expiry.duration_since(now).as_millis() as u64)
    }

    /// Formats offered for `glyph`; empty for unknown glyphs
    pub fn available_formats(&self, glyph: String) -> Vec<CopyFormat> {
        self.catalog
            .symbol_by_glyph(&glyph)
            .map(Symbol::available_formats)
            .unwrap_or_default()
    }

    pub fn related(&self, glyph: String) -> Vec<Symbol> {
        match self.catalog.symbol_by_glyph(&glyph) {
            Some(symbol) => self.catalog.related(symbol).into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Id of the category to highlight in the category list
    pub fn active_category(&self) -> Option<String> {
        let navigator = self.navigator.lock();
        let id = navigator.active_category().map(|category| category.id.clone());
        id
    }

    /// `base` with the current query mirrored into its `q` parameter
    pub fn shareable_location(&self, base: String) -> Result<String, SonderError> {
        let query = self.query();
        location_with_query(&base, &query)
    }

    /// Wait until every queued storage write has completed
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::mocks::{MockClipboard, MockSelection};
    use crate::database::MemoryKeyValueStore;
    use crate::interface::{CopyPath, Key, KeyEvent};
    use crate::models::fixtures::small_catalog;

    struct Fixture {
        session: SymbolSession,
        storage: Arc<MemoryKeyValueStore>,
        clipboard: Arc<MockClipboard>,
        selection: Arc<MockSelection>,
    }

    fn fixture(clipboard_fails: bool, location: Option<&str>) -> Fixture {
        fixture_with(Arc::new(MemoryKeyValueStore::new()), clipboard_fails, location)
    }

    fn fixture_with(storage: Arc<MemoryKeyValueStore>, clipboard_fails: bool, location: Option<&str>) -> Fixture {
        let clipboard = MockClipboard::new(clipboard_fails);
        let selection = Arc::new(MockSelection::default());
        let session = SymbolSession::with_catalog(
            Arc::new(small_catalog()),
            SessionConfig::default(),
            storage.clone(),
            Some(clipboard.clone()),
            selection.clone(),
            location.map(str::to_string),
        )
        .unwrap();
        Fixture { session, storage, clipboard, selection }
    }

    fn key(key: Key, sequence: u64) -> NavEvent {
        NavEvent::Key { event: KeyEvent { key, in_text_field: false, sequence } }
    }

    #[tokio::test]
    async fn test_session_starts_browsing_everything() {
        let f = fixture(false, None);
        assert_eq!(f.session.mode(), UiMode::Browsing);
        assert_eq!(f.session.visible().len(), 3);
        assert_eq!(f.session.visible_count(), 7);
        assert!(f.session.recent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_storage_key_rejected() {
        let config = SessionConfig { storage_key: String::new(), ..SessionConfig::default() };
        let result = SymbolSession::with_catalog(
            Arc::new(small_catalog()),
            config,
            Arc::new(MemoryKeyValueStore::new()),
            None,
            Arc::new(MockSelection::default()),
            None,
        );
        assert!(matches!(result, Err(SonderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_filter_does_not_touch_session_query() {
        let f = fixture(false, None);
        let view = f.session.filter("ohm".to_string());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].symbols[0].glyph, "Ω");
        assert_eq!(f.session.query(), "");
    }

    #[tokio::test]
    async fn test_activate_copies_records_and_marks() {
        let f = fixture(false, None);
        f.session.navigate(NavEvent::QueryInput { text: "kreis".to_string() });
        let position = f.session.focus().unwrap();

        let outcome = f.session.activate(position, CopyFormat::Latex).await;
        assert_eq!(
            outcome,
            CopyOutcome::Copied { value: "\\pi".to_string(), format: CopyFormat::Latex, path: CopyPath::Primary }
        );
        assert_eq!(f.session.copied_formats("π".to_string()), vec![CopyFormat::Latex]);
        assert_eq!(f.session.recent().iter().map(|s| s.glyph.as_str()).collect::<Vec<_>>(), vec!["π"]);

        // Activation leaves navigation state alone
        assert_eq!(f.session.query(), "kreis");
        assert_eq!(f.session.focus(), Some(position));
        assert_eq!(f.session.mode(), UiMode::Searching);

        f.session.flush().await;
        assert_eq!(f.storage.get("recent-symbols".to_string()).unwrap().as_deref(), Some(r#"["π"]"#));
    }

    #[tokio::test]
    async fn test_failed_copy_records_without_mark() {
        let selection = Arc::new(MockSelection { refuse_copy: true, ..Default::default() });
        let session = SymbolSession::with_catalog(
            Arc::new(small_catalog()),
            SessionConfig::default(),
            Arc::new(MemoryKeyValueStore::new()),
            Some(MockClipboard::new(true)),
            selection.clone(),
            None,
        )
        .unwrap();

        let outcome = session.activate_glyph("∫".to_string(), CopyFormat::Unicode).await;
        assert_eq!(outcome, CopyOutcome::Failed { format: CopyFormat::Unicode });
        assert!(session.copied_formats("∫".to_string()).is_empty());
        assert_eq!(session.recent()[0].glyph, "∫");
        assert!(selection.attached.lock().is_empty());
    }

    #[tokio::test]
    async fn test_activation_outside_view_rejected() {
        let f = fixture(false, None);
        f.session.navigate(NavEvent::QueryInput { text: "beta".to_string() });
        let outcome = f.session.activate(FocusPosition::new(2, 0), CopyFormat::Unicode).await;
        assert_eq!(outcome, CopyOutcome::Rejected);
        assert!(f.session.recent().is_empty());
        assert!(f.clipboard.writes.lock().is_empty());

        let outcome = f.session.activate_glyph("ℏ".to_string(), CopyFormat::Unicode).await;
        assert_eq!(outcome, CopyOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_html_request_without_entity_marks_html() {
        let f = fixture(false, None);
        let outcome = f.session.activate_glyph("Ω".to_string(), CopyFormat::Html).await;
        assert!(matches!(outcome, CopyOutcome::Copied { ref value, format: CopyFormat::Html, .. } if value == "Ω"));
        assert_eq!(f.session.copied_formats("Ω".to_string()), vec![CopyFormat::Html]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recopy_resets_feedback_window() {
        let f = fixture(false, None);
        f.session.activate_glyph("α".to_string(), CopyFormat::Unicode).await;
        assert_eq!(f.session.next_feedback_expiry_ms(), Some(1500));

        tokio::time::advance(Duration::from_millis(1000)).await;
        f.session.activate_glyph("α".to_string(), CopyFormat::Unicode).await;
        assert_eq!(f.session.next_feedback_expiry_ms(), Some(1500));

        // Past the first window, still inside the second
        tokio::time::advance(Duration::from_millis(700)).await;
        assert_eq!(f.session.copied_formats("α".to_string()), vec![CopyFormat::Unicode]);

        tokio::time::advance(Duration::from_millis(800)).await;
        assert!(f.session.copied_formats("α".to_string()).is_empty());
        assert_eq!(f.session.next_feedback_expiry_ms(), None);
    }

    #[tokio::test]
    async fn test_location_seeds_query_and_round_trips() {
        let f = fixture(false, Some("https://example.org/?q=ohm"));
        assert_eq!(f.session.mode(), UiMode::Searching);
        assert_eq!(f.session.focused_symbol().map(|s| s.glyph), Some("Ω".to_string()));
        assert_eq!(
            f.session.shareable_location("https://example.org/".to_string()).unwrap(),
            "https://example.org/?q=ohm"
        );

        f.session.navigate(key(Key::Escape, 1));
        assert_eq!(
            f.session.shareable_location("https://example.org/?q=ohm".to_string()).unwrap(),
            "https://example.org/"
        );
    }

    #[tokio::test]
    async fn test_recency_survives_new_session() {
        let storage = Arc::new(MemoryKeyValueStore::new());
        {
            let f = fixture_with(storage.clone(), false, None);
            f.session.activate_glyph("∑".to_string(), CopyFormat::Unicode).await;
            f.session.activate_glyph("°".to_string(), CopyFormat::Unicode).await;
            f.session.flush().await;
        }
        let f = fixture_with(storage, false, None);
        let recent: Vec<String> = f.session.recent().into_iter().map(|s| s.glyph).collect();
        assert_eq!(recent, vec!["°".to_string(), "∑".to_string()]);
    }

    #[tokio::test]
    async fn test_lookups_by_glyph() {
        let f = fixture(false, None);
        assert_eq!(f.session.available_formats("α".to_string()), vec![CopyFormat::Unicode, CopyFormat::Latex]);
        assert!(f.session.available_formats("ℏ".to_string()).is_empty());
        let related: Vec<String> = f.session.related("π".to_string()).into_iter().map(|s| s.glyph).collect();
        assert_eq!(related, vec!["∑".to_string()]);
        assert!(f.session.related("ℏ".to_string()).is_empty());
    }

    #[tokio::test]
    async fn test_active_category_after_digit() {
        let f = fixture(false, None);
        assert_eq!(f.session.active_category().as_deref(), Some("greek"));
        let effect = f.session.navigate(key(Key::Character { text: "3".to_string() }, 1));
        assert_eq!(effect, Some(NavEffect::ScrollToCategory { id: "units".to_string() }));
        assert_eq!(f.session.active_category().as_deref(), Some("units"));
    }

    #[tokio::test]
    async fn test_run_events_activates_on_enter() {
        let f = fixture(false, None);
        let events = futures::stream::iter(vec![
            NavEvent::QueryInput { text: "int".to_string() },
            key(Key::Enter, 1),
            key(Key::Character { text: "/".to_string() }, 2),
        ]);

        let summary = f.session.run_events(events, CopyFormat::Unicode, CancellationToken::new()).await;
        assert_eq!(summary.events, 3);
        assert!(!summary.cancelled);
        assert_eq!(
            summary.effects,
            vec![
                NavEffect::Activate { position: FocusPosition::new(0, 0) },
                NavEffect::FocusSearchField,
            ]
        );
        assert!(matches!(summary.outcomes.as_slice(), [CopyOutcome::Copied { value, .. }] if value == "∫"));
        assert_eq!(*f.clipboard.writes.lock(), vec!["∫".to_string()]);
    }

    #[tokio::test]
    async fn test_run_events_stops_when_cancelled() {
        let f = fixture(false, None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = f
            .session
            .run_events(futures::stream::pending::<NavEvent>(), CopyFormat::Unicode, cancel)
            .await;
        assert!(summary.cancelled);
        assert_eq!(summary.events, 0);
    }
}

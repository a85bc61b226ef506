//! Sonder FFI Interface Definition
//!
//! This file defines the public interface exposed to host UIs via UniFFI.
//! It acts as the source of truth for shared types and for the ports a host
//! implements (clipboard, selection fallback, key-value storage).

use serde::Serialize;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Textual encoding a symbol can be copied as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFormat {
    /// The glyph itself. Always available.
    Unicode,
    Latex,
    Html,
    /// `\uXXXX` escape built from the codepoint
    Escape,
}

impl CopyFormat {
    pub const ALL: [CopyFormat; 4] = [
        CopyFormat::Unicode,
        CopyFormat::Latex,
        CopyFormat::Html,
        CopyFormat::Escape,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CopyFormat::Unicode => "unicode",
            CopyFormat::Latex => "latex",
            CopyFormat::Html => "html",
            CopyFormat::Escape => "escape",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// UI mode as seen by the presentation layer.
/// `HelpOpen` is an overlay; closing it returns to the mode underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum UiMode {
    Browsing,
    Searching,
    HelpOpen,
}

/// A key as delivered by the host's key-down listener
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum Key {
    /// A printable key. `text` is what the key would type (e.g. "3", "/", "?").
    Character { text: String },
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
}

/// Input driving the focus navigator
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NavEvent {
    Key { event: KeyEvent },
    /// The search field's content changed to `text`
    QueryInput { text: String },
    /// Pointer/tap on a rendered symbol
    PointerActivate { position: FocusPosition },
}

/// Side effect the presentation layer must carry out after a transition
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NavEffect {
    FocusSearchField,
    ScrollToCategory { id: String },
    /// Copy the symbol at `position` (call `SymbolSession::activate`)
    Activate { position: FocusPosition },
}

/// Which clipboard strategy delivered the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyPath {
    Primary,
    Fallback,
}

/// Result of a copy request. Never an error: failures are reported as values.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CopyOutcome {
    Copied { value: String, format: CopyFormat, path: CopyPath },
    /// Both strategies failed; nothing was copied
    Failed { format: CopyFormat },
    /// The activation target does not exist in the current view/catalog
    Rejected,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A catalog symbol. `glyph` is its identity key.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record, Serialize)]
pub struct Symbol {
    pub glyph: String,
    pub name: String,
    pub latex: Option<String>,
    pub html_entity: Option<String>,
    /// String form such as "U+03B1"
    pub unicode_codepoint: Option<String>,
    pub description: String,
    /// Glyphs of related symbols. Not guaranteed to resolve.
    pub related: Vec<String>,
}

/// A catalog category with its symbols in display order
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record, Serialize)]
pub struct Category {
    /// Stable slug, used as scroll anchor
    pub id: String,
    pub title: String,
    pub description: String,
    pub symbols: Vec<Symbol>,
}

/// Position inside the current filtered view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Record)]
pub struct FocusPosition {
    pub category: u32,
    pub symbol: u32,
}

impl FocusPosition {
    pub fn new(category: usize, symbol: usize) -> Self {
        Self {
            category: category as u32,
            symbol: symbol as u32,
        }
    }
}

/// Key-down event with the context needed to suppress shortcuts while typing
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct KeyEvent {
    pub key: Key,
    /// True when the key was typed into a text field
    pub in_text_field: bool,
    /// Host-assigned id of the physical key press. The same press delivered
    /// twice (field listener + window listener) carries the same sequence.
    pub sequence: u64,
}

/// Session tunables
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SessionConfig {
    pub recency_limit: u32,
    pub feedback_window_ms: u64,
    pub storage_key: String,
    pub storage_namespace: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recency_limit: 12,
            feedback_window_ms: 1500,
            storage_key: "recent-symbols".to_string(),
            storage_namespace: "sonder".to_string(),
        }
    }
}

/// Error type for Sonder operations
#[derive(Debug, Error, uniffi::Error)]
pub enum SonderError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Location error: {0}")]
    Location(String),
    #[error("Host callback failed: {0}")]
    Callback(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for SonderError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        SonderError::Callback(e.reason)
    }
}

impl From<crate::database::DatabaseError> for SonderError {
    fn from(e: crate::database::DatabaseError) -> Self {
        SonderError::Storage(e.to_string())
    }
}

impl From<url::ParseError> for SonderError {
    fn from(e: url::ParseError) -> Self {
        SonderError::Location(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOST PORTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Persistent key-value storage scoped to the host's namespace.
#[uniffi::export(with_foreign)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: String) -> Result<Option<String>, SonderError>;

    fn set(&self, key: String, value: String) -> Result<(), SonderError>;
}

/// Asynchronous system clipboard write (the primary copy path).
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait SystemClipboard: Send + Sync {
    async fn write_text(&self, text: String) -> Result<(), SonderError>;
}

/// Legacy selection-based copy (the fallback path).
///
/// The engine attaches a hidden editable surface holding the text, selects it,
/// issues the synchronous copy command and always detaches the surface again.
#[uniffi::export(with_foreign)]
pub trait SelectionHost: Send + Sync {
    /// Stage `text` in a new hidden surface, returning its handle
    fn attach_surface(&self, text: String) -> Result<u64, SonderError>;

    fn select_surface(&self, surface: u64) -> Result<(), SonderError>;

    /// Issue the synchronous copy command for the current selection
    fn exec_copy(&self) -> bool;

    fn detach_surface(&self, surface: u64);
}

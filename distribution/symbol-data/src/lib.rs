//! Bundled physics symbol catalog.
//!
//! The rows ship as two CSV files compiled into the binary. Parsing happens once,
//! on first access, and the rows stay in file order: category order and the
//! symbol order inside each category are significant to callers.
//!
//! Glyphs are unique across the whole catalog. The units category therefore
//! uses the dedicated letterlike code points for Ohm (U+2126 OHM SIGN) and
//! Angstroem (U+212B ANGSTROM SIGN), so they stay distinct from Greek capital
//! Omega (U+03A9) and from the Latin letter Å (U+00C5).

use once_cell::sync::Lazy;
use serde::Deserialize;

const CATEGORIES_CSV: &str = include_str!("../data/categories.csv");
const SYMBOLS_CSV: &str = include_str!("../data/symbols.csv");

/// One row of `categories.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// One row of `symbols.csv`. `related` holds `;`-separated glyphs.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolRow {
    pub category: String,
    pub glyph: String,
    pub name: String,
    pub latex: Option<String>,
    pub html_entity: Option<String>,
    pub codepoint: Option<String>,
    pub description: String,
    pub related: Option<String>,
}

impl SymbolRow {
    /// Glyphs listed in the `related` column, empty entries skipped.
    pub fn related_glyphs(&self) -> Vec<String> {
        self.related
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parse one embedded CSV file. Errors name the file and the failing record.
pub fn parse_rows<T: for<'de> Deserialize<'de>>(source: &str, file: &str) -> Result<Vec<T>, String> {
    csv::Reader::from_reader(source.as_bytes())
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| format!("bundled {} is malformed: {}", file, e))
}

pub static CATEGORIES: Lazy<Result<Vec<CategoryRow>, String>> =
    Lazy::new(|| parse_rows(CATEGORIES_CSV, "categories.csv"));

pub static SYMBOLS: Lazy<Result<Vec<SymbolRow>, String>> =
    Lazy::new(|| parse_rows(SYMBOLS_CSV, "symbols.csv"));

/// Rows of `categories.csv`
pub fn categories() -> Result<&'static [CategoryRow], String> {
    CATEGORIES.as_deref().map_err(Clone::clone)
}

/// Rows of `symbols.csv`
pub fn symbols() -> Result<&'static [SymbolRow], String> {
    SYMBOLS.as_deref().map_err(Clone::clone)
}

//! Core data models for Sonder
//!
//! `Catalog` is the immutable symbol set shared read-only by every component.
//! Symbol and category records are defined in the interface so they cross FFI.

use std::collections::{HashMap, HashSet};

use crate::interface::{Category, CopyFormat, SonderError, Symbol};
use symbol_data::{CategoryRow, SymbolRow};

/// Immutable, ordered list of categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    categories: Vec<Category>,
    /// glyph → (category index, symbol index)
    glyph_index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    /// Build a catalog from already grouped categories.
    ///
    /// Rejects empty glyphs and duplicate category ids. A glyph appearing twice
    /// resolves to its first occurrence.
    pub fn new(categories: Vec<Category>) -> Result<Self, SonderError> {
        let mut ids = HashSet::new();
        let mut glyph_index = HashMap::new();
        for (ci, category) in categories.iter().enumerate() {
            if !ids.insert(category.id.as_str()) {
                return Err(SonderError::Catalog(format!(
                    "duplicate category id `{}`",
                    category.id
                )));
            }
            for (si, symbol) in category.symbols.iter().enumerate() {
                if symbol.glyph.is_empty() {
                    return Err(SonderError::Catalog(format!(
                        "empty glyph in category `{}` ({})",
                        category.id, symbol.name
                    )));
                }
                glyph_index.entry(symbol.glyph.clone()).or_insert((ci, si));
            }
        }
        Ok(Self {
            categories,
            glyph_index,
        })
    }

    /// Group flat symbol rows under their categories, keeping file order
    pub fn from_records(
        category_rows: &[CategoryRow],
        symbol_rows: &[SymbolRow],
    ) -> Result<Self, SonderError> {
        let mut categories: Vec<Category> = category_rows
            .iter()
            .map(|row| Category {
                id: row.id.clone(),
                title: row.title.clone(),
                description: row.description.clone(),
                symbols: Vec::new(),
            })
            .collect();

        let positions: HashMap<&str, usize> = category_rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.id.as_str(), i))
            .collect();

        for row in symbol_rows {
            let Some(&index) = positions.get(row.category.as_str()) else {
                return Err(SonderError::Catalog(format!(
                    "symbol `{}` references unknown category `{}`",
                    row.glyph, row.category
                )));
            };
            categories[index].symbols.push(Symbol {
                glyph: row.glyph.clone(),
                name: row.name.clone(),
                latex: row.latex.clone(),
                html_entity: row.html_entity.clone(),
                unicode_codepoint: row.codepoint.clone(),
                description: row.description.clone(),
                related: row.related_glyphs(),
            });
        }

        Self::new(categories)
    }

    /// The catalog shipped with the crate
    pub fn bundled() -> Result<Self, SonderError> {
        let categories = symbol_data::categories().map_err(SonderError::Catalog)?;
        let symbols = symbol_data::symbols().map_err(SonderError::Catalog)?;
        Self::from_records(categories, symbols)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn category_by_id(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn symbol_by_glyph(&self, glyph: &str) -> Option<&Symbol> {
        let &(ci, si) = self.glyph_index.get(glyph)?;
        self.categories.get(ci)?.symbols.get(si)
    }

    /// Resolve `symbol.related`. Glyphs missing from the catalog are skipped.
    pub fn related(&self, symbol: &Symbol) -> Vec<&Symbol> {
        symbol
            .related
            .iter()
            .filter_map(|glyph| self.symbol_by_glyph(glyph))
            .collect()
    }

    pub fn symbol_count(&self) -> usize {
        self.categories.iter().map(|c| c.symbols.len()).sum()
    }
}

impl Symbol {
    /// Formats offered for this symbol. `Unicode` is always first.
    pub fn available_formats(&self) -> Vec<CopyFormat> {
        CopyFormat::ALL
            .into_iter()
            .filter(|format| match format {
                CopyFormat::Unicode => true,
                CopyFormat::Latex => self.latex.is_some(),
                CopyFormat::Html => self.html_entity.is_some(),
                CopyFormat::Escape => self.unicode_codepoint.is_some(),
            })
            .collect()
    }
}

impl CopyFormat {
    /// The text copied for `symbol`. Missing source fields fall back to the glyph.
    pub fn resolve(&self, symbol: &Symbol) -> String {
        match self {
            CopyFormat::Unicode => symbol.glyph.clone(),
            CopyFormat::Latex => symbol.latex.clone().unwrap_or_else(|| symbol.glyph.clone()),
            CopyFormat::Html => symbol
                .html_entity
                .clone()
                .unwrap_or_else(|| symbol.glyph.clone()),
            CopyFormat::Escape => match &symbol.unicode_codepoint {
                Some(codepoint) => {
                    let hex = codepoint.strip_prefix("U+").unwrap_or(codepoint);
                    format!("\\u{}", hex)
                }
                None => symbol.glyph.clone(),
            },
        }
    }
}

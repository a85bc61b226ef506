//! Query filter over the catalog
//!
//! `filter` is a pure function of (query, catalog). The result borrows from the
//! catalog and is recomputed on every query change; nothing here is cached.
//! Matching is plain substring containment over several fields, OR-ed, with
//! no ranking: the catalog order is the result order.

use crate::interface::{Category, FocusPosition, Symbol};
use crate::models::Catalog;

/// A category with the subset of its symbols that matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSection<'a> {
    pub category: &'a Category,
    pub symbols: Vec<&'a Symbol>,
}

/// Order-preserving subset of the catalog matching a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredView<'a> {
    sections: Vec<ViewSection<'a>>,
}

/// A non-blank query prepared for matching.
///
/// The query is lowercased once. The glyph is compared against it as stored,
/// so an uppercase glyph query such as `Ω` finds `ω`. Every text field is
/// lowercased before comparison.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    lower: String,
}

impl QueryTerms {
    pub fn new(query: &str) -> Self {
        Self {
            lower: query.to_lowercase(),
        }
    }

    pub fn matches(&self, symbol: &Symbol) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(&self.lower);

        symbol.glyph.contains(&self.lower)
            || contains(&symbol.name)
            || symbol.latex.as_deref().is_some_and(contains)
            || symbol.html_entity.as_deref().is_some_and(contains)
            || contains(&symbol.description)
    }
}

/// Filter `catalog` by `query`.
///
/// A blank query yields the whole catalog, empty categories included.
pub fn filter<'a>(query: &str, catalog: &'a Catalog) -> FilteredView<'a> {
    if query.trim().is_empty() {
        return FilteredView {
            sections: catalog
                .categories()
                .iter()
                .map(|category| ViewSection {
                    category,
                    symbols: category.symbols.iter().collect(),
                })
                .collect(),
        };
    }

    let terms = QueryTerms::new(query);
    let sections = catalog
        .categories()
        .iter()
        .filter_map(|category| {
            let symbols: Vec<&Symbol> = category
                .symbols
                .iter()
                .filter(|s| terms.matches(s))
                .collect();
            (!symbols.is_empty()).then_some(ViewSection { category, symbols })
        })
        .collect();

    FilteredView { sections }
}

impl<'a> FilteredView<'a> {
    pub fn sections(&self) -> &[ViewSection<'a>] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.symbols.is_empty())
    }

    /// Number of visible symbols across all sections
    pub fn symbol_count(&self) -> usize {
        self.sections.iter().map(|s| s.symbols.len()).sum()
    }

    pub fn symbol_at(&self, position: FocusPosition) -> Option<&'a Symbol> {
        self.sections
            .get(position.category as usize)?
            .symbols
            .get(position.symbol as usize)
            .copied()
    }

    pub fn contains(&self, position: FocusPosition) -> bool {
        self.symbol_at(position).is_some()
    }

    /// First symbol of the first non-empty section
    pub fn first_position(&self) -> Option<FocusPosition> {
        self.sections
            .iter()
            .position(|s| !s.symbols.is_empty())
            .map(|ci| FocusPosition::new(ci, 0))
    }

    /// Last symbol of the last non-empty section
    pub fn last_position(&self) -> Option<FocusPosition> {
        self.sections
            .iter()
            .rposition(|s| !s.symbols.is_empty())
            .map(|ci| FocusPosition::new(ci, self.sections[ci].symbols.len() - 1))
    }

    /// First symbol of section `index`, if that section has any
    pub fn section_start(&self, index: usize) -> Option<FocusPosition> {
        let section = self.sections.get(index)?;
        (!section.symbols.is_empty()).then(|| FocusPosition::new(index, 0))
    }

    /// Step forward through the flattened view. `None` at the end.
    pub fn next_position(&self, from: FocusPosition) -> Option<FocusPosition> {
        let (ci, si) = (from.category as usize, from.symbol as usize);
        let section = self.sections.get(ci)?;
        if si + 1 < section.symbols.len() {
            return Some(FocusPosition::new(ci, si + 1));
        }
        (ci + 1..self.sections.len()).find_map(|next| self.section_start(next))
    }

    /// Step backward through the flattened view. `None` at the start.
    pub fn previous_position(&self, from: FocusPosition) -> Option<FocusPosition> {
        let (ci, si) = (from.category as usize, from.symbol as usize);
        self.sections.get(ci)?;
        if si > 0 {
            return Some(FocusPosition::new(ci, si - 1));
        }
        (0..ci).rev().find_map(|prev| {
            let len = self.sections[prev].symbols.len();
            (len > 0).then(|| FocusPosition::new(prev, len - 1))
        })
    }

    /// Position of `glyph` in this view
    pub fn position_of(&self, glyph: &str) -> Option<FocusPosition> {
        self.sections.iter().enumerate().find_map(|(ci, section)| {
            section
                .symbols
                .iter()
                .position(|s| s.glyph == glyph)
                .map(|si| FocusPosition::new(ci, si))
        })
    }

    /// Owned copy of the view, shaped like the catalog
    pub fn to_categories(&self) -> Vec<Category> {
        self.sections
            .iter()
            .map(|section| Category {
                id: section.category.id.clone(),
                title: section.category.title.clone(),
                description: section.category.description.clone(),
                symbols: section.symbols.iter().map(|s| (*s).clone()).collect(),
            })
            .collect()
    }
}

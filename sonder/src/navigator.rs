//! Keyboard-driven focus state machine
//!
//! The navigator owns the search query, the help overlay flag and the focus
//! position. The filtered view is never stored: every transition derives it
//! from (query, catalog), so focus is always checked against the live view.
//!
//! Mode is derived rather than stored: `Searching` whenever the query is
//! non-empty, `Browsing` otherwise, and `HelpOpen` layered on top of either.
//!
//! Stepping keys clamp at both ends of the view instead of wrapping.

use std::sync::Arc;

use tracing::debug;

use crate::filter::{filter, FilteredView};
use crate::interface::{Category, FocusPosition, Key, KeyEvent, NavEffect, NavEvent, Symbol, UiMode};
use crate::models::Catalog;

/// Categories reachable through the single-digit shortcuts
const MAX_DIGIT_SHORTCUT: usize = 9;

#[derive(Debug, Clone)]
pub struct FocusNavigator {
    catalog: Arc<Catalog>,
    query: String,
    help_open: bool,
    focus: Option<FocusPosition>,
    /// Sequence of the last key press handled; 0 means "unsequenced"
    last_sequence: u64,
}

impl FocusNavigator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            query: String::new(),
            help_open: false,
            focus: None,
            last_sequence: 0,
        }
    }

    /// Start with a query already typed (e.g. restored from a shared link)
    pub fn with_query(catalog: Arc<Catalog>, query: &str) -> Self {
        let mut navigator = Self::new(catalog);
        if !query.is_empty() {
            navigator.set_query(query.to_string());
        }
        navigator
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mode(&self) -> UiMode {
        if self.help_open {
            UiMode::HelpOpen
        } else if self.query.is_empty() {
            UiMode::Browsing
        } else {
            UiMode::Searching
        }
    }

    pub fn focus(&self) -> Option<FocusPosition> {
        self.focus
    }

    /// The view for the current query
    pub fn view(&self) -> FilteredView<'_> {
        filter(&self.query, &self.catalog)
    }

    pub fn focused_symbol(&self) -> Option<&Symbol> {
        self.view().symbol_at(self.focus?)
    }

    /// Category to highlight in the category list: the one holding the focus,
    /// else the first visible one.
    pub fn active_category(&self) -> Option<&Category> {
        let view = filter(&self.query, &self.catalog);
        let index = self.focus.map(|p| p.category as usize).unwrap_or(0);
        view.sections().get(index).map(|section| section.category)
    }

    /// Apply one input event. Returns the effect the presentation must perform.
    pub fn navigate(&mut self, event: NavEvent) -> Option<NavEffect> {
        let effect = match event {
            NavEvent::Key { event } => self.on_key(event),
            NavEvent::QueryInput { text } => {
                if self.help_open {
                    debug!("query input suppressed while help is open");
                    None
                } else {
                    self.set_query(text);
                    None
                }
            }
            NavEvent::PointerActivate { position } => self.on_pointer(position),
        };
        self.reconcile();
        effect
    }

    fn on_key(&mut self, event: KeyEvent) -> Option<NavEffect> {
        if event.sequence != 0 {
            if event.sequence == self.last_sequence {
                debug!(sequence = event.sequence, "duplicate key delivery ignored");
                return None;
            }
            self.last_sequence = event.sequence;
        }

        if event.key == Key::Escape {
            self.on_escape();
            return None;
        }

        if self.help_open {
            if !event.in_text_field && is_char(&event.key, "?") {
                self.help_open = false;
            }
            return None;
        }

        match event.key {
            Key::Character { text } if !event.in_text_field => self.on_shortcut(&text),
            Key::Character { .. } => None,
            Key::Enter => self.focus.map(|position| NavEffect::Activate { position }),
            Key::ArrowDown => self.step_forward(),
            Key::ArrowUp => self.step_backward(),
            // Left/Right/Home/End move the caret inside a text field
            Key::ArrowRight if !event.in_text_field => self.step_forward(),
            Key::ArrowLeft if !event.in_text_field => self.step_backward(),
            Key::Home if !event.in_text_field => self.jump_to(|view| view.first_position()),
            Key::End if !event.in_text_field => self.jump_to(|view| view.last_position()),
            Key::ArrowRight | Key::ArrowLeft | Key::Home | Key::End | Key::Escape => None,
        }
    }

    fn on_shortcut(&mut self, text: &str) -> Option<NavEffect> {
        match text {
            "/" => Some(NavEffect::FocusSearchField),
            "?" => {
                self.help_open = true;
                None
            }
            _ => {
                let digit = single_digit(text)?;
                self.jump_to_category(digit)
            }
        }
    }

    fn on_escape(&mut self) {
        if self.help_open {
            self.help_open = false;
        } else if !self.query.is_empty() {
            self.query.clear();
            self.focus = filter(&self.query, &self.catalog).first_position();
        }
    }

    fn on_pointer(&mut self, position: FocusPosition) -> Option<NavEffect> {
        if !filter(&self.query, &self.catalog).contains(position) {
            debug!(?position, "pointer activation outside the view rejected");
            return None;
        }
        self.focus = Some(position);
        Some(NavEffect::Activate { position })
    }

    fn set_query(&mut self, text: String) {
        self.query = text;
        self.focus = filter(&self.query, &self.catalog).first_position();
        debug!(query = %self.query, focus = ?self.focus, "query changed");
    }

    /// 1-indexed category shortcut
    fn jump_to_category(&mut self, digit: usize) -> Option<NavEffect> {
        if digit == 0 || digit > MAX_DIGIT_SHORTCUT {
            return None;
        }
        let index = digit - 1;
        let id = self.catalog.category(index)?.id.clone();
        self.query.clear();
        self.focus = filter(&self.query, &self.catalog).section_start(index);
        Some(NavEffect::ScrollToCategory { id })
    }

    fn step_forward(&mut self) -> Option<NavEffect> {
        let view = filter(&self.query, &self.catalog);
        let next = match self.focus {
            Some(current) => view.next_position(current),
            None => view.first_position(),
        };
        if let Some(next) = next {
            self.focus = Some(next);
        }
        None
    }

    fn step_backward(&mut self) -> Option<NavEffect> {
        let view = filter(&self.query, &self.catalog);
        let previous = match self.focus {
            Some(current) => view.previous_position(current),
            None => view.first_position(),
        };
        if let Some(previous) = previous {
            self.focus = Some(previous);
        }
        None
    }

    fn jump_to(&mut self, target: impl Fn(&FilteredView<'_>) -> Option<FocusPosition>) -> Option<NavEffect> {
        if let Some(position) = target(&filter(&self.query, &self.catalog)) {
            self.focus = Some(position);
        }
        None
    }

    /// Keep focus inside the current view: clamp to the section's last symbol,
    /// else to the view's last symbol, else clear.
    fn reconcile(&mut self) {
        let Some(position) = self.focus else {
            return;
        };
        let view = filter(&self.query, &self.catalog);
        if view.contains(position) {
            return;
        }
        let clamped = view
            .sections()
            .get(position.category as usize)
            .filter(|section| !section.symbols.is_empty())
            .map(|section| FocusPosition {
                category: position.category,
                symbol: (section.symbols.len() - 1) as u32,
            })
            .or_else(|| view.last_position());
        debug!(?position, ?clamped, "focus clamped into view");
        self.focus = clamped;
    }
}

fn is_char(key: &Key, expected: &str) -> bool {
    matches!(key, Key::Character { text } if text == expected)
}

fn single_digit(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    c.to_digit(10).map(|d| d as usize)
}

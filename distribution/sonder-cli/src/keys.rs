//! Key script parsing for the `keys` subcommand
//!
//! Tokens are either named keys (`enter`, `esc`, `up`, `down`, `left`,
//! `right`, `home`, `end`, `bs`) or single characters. After `/` the search
//! field has focus: characters and `bs` edit the query until `esc`.

use anyhow::{bail, Result};
use sonder::{Key, KeyEvent, NavEvent};

#[derive(Default)]
pub struct KeyScript {
    in_field: bool,
    text: String,
    sequence: u64,
    events: Vec<NavEvent>,
}

impl KeyScript {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<NavEvent>> {
        let mut script = Self::default();
        for token in tokens {
            script.push(token.as_ref())?;
        }
        Ok(script.events)
    }

    fn push(&mut self, token: &str) -> Result<()> {
        let named = match token.to_ascii_lowercase().as_str() {
            "enter" | "return" => Some(Key::Enter),
            "esc" | "escape" => Some(Key::Escape),
            "up" => Some(Key::ArrowUp),
            "down" => Some(Key::ArrowDown),
            "left" => Some(Key::ArrowLeft),
            "right" => Some(Key::ArrowRight),
            "home" => Some(Key::Home),
            "end" => Some(Key::End),
            "bs" | "backspace" => {
                if self.in_field {
                    self.text.pop();
                    self.query_input();
                }
                return Ok(());
            }
            _ => None,
        };

        if let Some(key) = named {
            let is_escape = key == Key::Escape;
            self.key(key);
            if is_escape && self.in_field {
                self.in_field = false;
                self.text.clear();
            }
            return Ok(());
        }

        let mut chars = token.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            bail!("unknown key `{}`", token);
        };

        if self.in_field {
            self.text.push(c);
            self.query_input();
        } else {
            self.key(Key::Character { text: c.to_string() });
            if c == '/' {
                self.in_field = true;
            }
        }
        Ok(())
    }

    fn key(&mut self, key: Key) {
        self.sequence += 1;
        self.events.push(NavEvent::Key {
            event: KeyEvent { key, in_text_field: self.in_field, sequence: self.sequence },
        });
    }

    fn query_input(&mut self) {
        self.events.push(NavEvent::QueryInput { text: self.text.clone() });
    }
}

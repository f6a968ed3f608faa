use std::fmt::Display;

use crate::config::PurgeConfig;

const SECTION: char = '\u{00A7}';

#[inline]
fn is_color_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

/// Turns `&` colour codes into section-sign codes; other `&`s are kept.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '&' && is_color_code(next) => {
                out.push(SECTION);
                out.push(next.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Substitutes the first `%s` or `%d` in `template`.
pub fn fill_placeholder(template: &str, value: impl Display) -> String {
    let pos = match (template.find("%s"), template.find("%d")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match pos {
        Some(i) => format!("{}{}{}", &template[..i], value, &template[i + 2..]),
        None => template.to_string(),
    }
}

/// User-facing replies, already colourised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Messages {
    pub permission: String,
    pub block_name: String,
    pub unknown_block_name: String,
    pub unknown_world_name: String,
    pub blocks_deleted: String,
    pub reload_complete: String,
    pub reload_failed: String,
    pub not_ready: String,
}

impl Messages {
    pub fn from_config(cfg: &PurgeConfig) -> Self {
        Self {
            permission: colorize(&cfg.permission),
            block_name: colorize(&cfg.block_name),
            unknown_block_name: colorize(&cfg.unknown_block_name),
            unknown_world_name: colorize(&cfg.unknown_world_name),
            blocks_deleted: colorize(&cfg.blocks_deleted),
            reload_complete: colorize(&cfg.reload_complete),
            reload_failed: colorize(&cfg.reload_failed),
            not_ready: colorize(&cfg.not_ready),
        }
    }

    pub fn blocks_deleted(&self, elapsed_nanos: u128) -> String {
        fill_placeholder(&self.blocks_deleted, elapsed_nanos)
    }
}

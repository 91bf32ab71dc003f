//! Provider-specific API key shape checks and display masking.
//!
//! Validation is a client-side guard only; the server decides whether a key
//! is actually usable.

use std::sync::OnceLock;

use regex::Regex;

use crate::api::ProviderKind;

const KEY_MASK: &str = "****";
const MASK_MIN_LEN: usize = 9;
const MASK_PREFIXES: &[&str] = &["sk-or-v1-", "sk-"];

fn pattern(kind: ProviderKind) -> &'static Regex {
    static OPENAI: OnceLock<Regex> = OnceLock::new();
    static OPENROUTER: OnceLock<Regex> = OnceLock::new();
    static GEMINI: OnceLock<Regex> = OnceLock::new();
    static OTHER: OnceLock<Regex> = OnceLock::new();

    let (cell, source) = match kind {
        ProviderKind::Openai => (&OPENAI, r"^sk-[A-Za-z0-9]{48}$"),
        ProviderKind::Openrouter => (&OPENROUTER, r"^sk-or-v1-[A-Za-z0-9\-_./:=+]{10,}$"),
        ProviderKind::Gemini => (&GEMINI, r"^[A-Za-z0-9\-_]{20,50}$"),
        ProviderKind::Other => (&OTHER, r"^[A-Za-z0-9\-_./:=+]{20,200}$"),
    };
    // Patterns are literals above; a compile failure is a programming error.
    cell.get_or_init(|| Regex::new(source).expect("static api key pattern"))
}

/// Whether `key` (after trimming) has the shape `kind` issues.
pub fn is_valid_api_key(key: &str, kind: ProviderKind) -> bool {
    let key = key.trim();
    !key.is_empty() && pattern(kind).is_match(key)
}

/// Display form of a stored key: known prefix, a fixed mask, and the last
/// four characters.
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let len = key.chars().count();
    if len < MASK_MIN_LEN {
        return KEY_MASK.to_string();
    }
    let prefix = MASK_PREFIXES
        .iter()
        .find(|p| key.starts_with(*p))
        .copied()
        .unwrap_or("");
    let tail: String = key.chars().skip(len - 4).collect();
    format!("{prefix}{KEY_MASK}{tail}")
}

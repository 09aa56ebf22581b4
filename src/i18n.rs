//! String tables and lookup.
//!
//! Tables are JSON objects keyed by dotted paths (`error.loading_book_title`
//! resolves `{"error": {"loading_book_title": ...}}`). Values may contain
//! `{{name}}` placeholders. Lookups fall back to the English table and then
//! to the key itself, so a missing translation never breaks a screen.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, anyhow};
use log::{debug, info, warn};
use regex::{Captures, Regex};
use serde_json::Value;

pub const DEFAULT_LOCALE: &str = "en";

/// Built-in tables, one per supported locale.
const BUILTIN: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.json")),
    ("de", include_str!("../locales/de.json")),
    ("es", include_str!("../locales/es.json")),
    ("fr", include_str!("../locales/fr.json")),
    ("pl", include_str!("../locales/pl.json")),
    ("it", include_str!("../locales/it.json")),
    ("pt", include_str!("../locales/pt.json")),
    ("bg", include_str!("../locales/bg.json")),
    ("ru", include_str!("../locales/ru.json")),
    ("ar", include_str!("../locales/ar.json")),
    ("ja", include_str!("../locales/ja.json")),
    ("ko", include_str!("../locales/ko.json")),
    ("zh-TW", include_str!("../locales/zh-TW.json")),
];

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

pub fn supported_locales() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(code, _)| *code)
}

fn canonical_locale(code: &str) -> Option<&'static str> {
    supported_locales().find(|c| c.eq_ignore_ascii_case(code))
}

pub struct Localizer {
    locale: String,
    table: Value,
    fallback: Value,
    /// Searched before the built-in tables.
    locales_dir: Option<PathBuf>,
}

impl Localizer {
    pub fn new(locales_dir: Option<PathBuf>) -> Self {
        let fallback = builtin_table(DEFAULT_LOCALE).unwrap_or(Value::Null);
        let mut localizer = Self {
            locale: DEFAULT_LOCALE.to_string(),
            table: Value::Null,
            fallback,
            locales_dir,
        };
        localizer.set_locale(DEFAULT_LOCALE);
        localizer
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Switch locale. A table that cannot be found or parsed falls back to
    /// English; returns false in that case.
    pub fn set_locale(&mut self, locale: &str) -> bool {
        let locale = canonical_locale(locale).unwrap_or(locale);
        match self.load_table(locale) {
            Ok(table) => {
                info!("i18n: locale {locale}");
                self.locale = locale.to_string();
                self.table = table;
                true
            }
            Err(e) => {
                warn!("i18n: {e:#}; falling back to {DEFAULT_LOCALE}");
                self.locale = DEFAULT_LOCALE.to_string();
                self.table = self.fallback.clone();
                false
            }
        }
    }

    fn load_table(&self, locale: &str) -> anyhow::Result<Value> {
        if let Some(dir) = &self.locales_dir {
            let path = dir.join(format!("{locale}.json"));
            if path.is_file() {
                return read_table(&path);
            }
            debug!("i18n: {} not found, trying built-in table", path.display());
        }
        builtin_table(locale)
    }

    /// Look up `key`, falling back to English and then to the key itself.
    pub fn t(&self, key: &str) -> String {
        lookup(&self.table, key)
            .or_else(|| lookup(&self.fallback, key))
            .unwrap_or(key)
            .to_string()
    }

    /// Look up `key` and substitute `{{name}}` placeholders. Placeholders
    /// without a value are replaced by their name.
    pub fn t_with(&self, key: &str, params: &[(&str, &dyn Display)]) -> String {
        let template = self.t(key);
        PLACEHOLDER_RE
            .replace_all(&template, |caps: &Captures| {
                let name = &caps[1];
                params
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map_or_else(|| name.to_string(), |(_, v)| v.to_string())
            })
            .into_owned()
    }
}

fn builtin_table(locale: &str) -> anyhow::Result<Value> {
    let (_, text) = BUILTIN
        .iter()
        .find(|(code, _)| *code == locale)
        .ok_or_else(|| anyhow!("no translations for locale '{locale}'"))?;
    serde_json::from_str(text).with_context(|| format!("built-in table for '{locale}' is invalid"))
}

fn read_table(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(table, |node, part| node.as_object()?.get(part))?
        .as_str()
}

/// Pick the best supported locale for an `Accept-Language` header value.
///
/// Entries are tried in descending quality order; an exact tag match wins
/// over a primary-subtag match (`fr-CH` → `fr`, `zh-HK` → `zh-TW`).
pub fn negotiate(accept_language: &str) -> &'static str {
    let mut ranges: Vec<(&str, f32)> = accept_language
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() {
                return None;
            }
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then_some((tag, q))
        })
        .collect();
    // Stable sort keeps header order among equal weights.
    ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (tag, _) in ranges {
        if let Some(code) = canonical_locale(tag) {
            return code;
        }
        let primary = tag.split(['-', '_']).next().unwrap_or(tag);
        if let Some(code) = supported_locales().find(|c| {
            c.split('-')
                .next()
                .is_some_and(|p| p.eq_ignore_ascii_case(primary))
        }) {
            return code;
        }
    }
    DEFAULT_LOCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_parse() {
        for code in supported_locales() {
            let table = builtin_table(code).unwrap();
            assert!(table.is_object(), "{code}");
            for key in ["error.loading_book_title", "app.engine_note"] {
                assert!(lookup(&table, key).is_some(), "{code} lacks {key}");
            }
        }
    }

    #[test]
    fn dotted_lookup() {
        let l = Localizer::new(None);
        assert_eq!(l.t("menu.contents"), "Contents");
        assert_eq!(l.t("error.reading_file_title"), "Error reading file");
    }

    #[test]
    fn missing_key_returns_key() {
        let l = Localizer::new(None);
        assert_eq!(l.t("no.such.key"), "no.such.key");
        // A path that ends in an object is not a string.
        assert_eq!(l.t("error"), "error");
    }

    #[test]
    fn missing_translation_falls_back_to_english() {
        let mut l = Localizer::new(None);
        assert!(l.set_locale("de"));
        l.table = serde_json::json!({ "menu": { "contents": "Inhalt" } });
        assert_eq!(l.t("menu.contents"), "Inhalt");
        assert_eq!(l.t("menu.settings"), "Settings");
    }

    #[test]
    fn unknown_locale_falls_back() {
        let mut l = Localizer::new(None);
        assert!(!l.set_locale("xx"));
        assert_eq!(l.locale(), "en");
        assert_eq!(l.t("menu.settings"), "Settings");
    }

    #[test]
    fn locale_code_is_case_insensitive() {
        let mut l = Localizer::new(None);
        assert!(l.set_locale("zh-tw"));
        assert_eq!(l.locale(), "zh-TW");
        assert!(l.set_locale("DE"));
        assert_eq!(l.locale(), "de");
    }

    #[test]
    fn placeholder_substitution() {
        let l = Localizer::new(None);
        let s = l.t_with("reader.page_of", &[("current", &3), ("total", &40)]);
        assert_eq!(s, "Page 3 of 40");
        // Missing params are replaced by their name.
        let s = l.t_with("reader.page_of", &[("current", &3)]);
        assert_eq!(s, "Page 3 of total");
    }

    #[test]
    fn locales_dir_overrides_builtin() {
        let dir = std::env::temp_dir().join(format!("folio-i18n-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("en.json"), r#"{"menu": {"contents": "TOC"}}"#).unwrap();
        std::fs::write(dir.join("fr.json"), "{ not json").unwrap();

        let mut l = Localizer::new(Some(dir.clone()));
        assert_eq!(l.t("menu.contents"), "TOC");
        // Broken file: fall back to English.
        assert!(!l.set_locale("fr"));
        assert_eq!(l.locale(), "en");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn negotiate_picks_highest_quality() {
        assert_eq!(negotiate("fr-CH, fr;q=0.9, en;q=0.8"), "fr");
        assert_eq!(negotiate("da, de;q=0.5, en;q=0.9"), "en");
        assert_eq!(negotiate("zh-tw"), "zh-TW");
        assert_eq!(negotiate("pt-BR,pt;q=0.9"), "pt");
        assert_eq!(negotiate("ja;q=0, ko;q=0.1"), "ko");
    }

    #[test]
    fn negotiate_defaults_to_english() {
        assert_eq!(negotiate(""), "en");
        assert_eq!(negotiate("*"), "en");
        assert_eq!(negotiate("sv-SE, nl;q=0.8"), "en");
    }
}

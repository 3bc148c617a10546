//! Interface translations. Dictionaries are nested JSON objects addressed by
//! dotted keys (`map.filters.beach`); leaves are strings or string arrays.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::assets::Asset;
use crate::constants::DEFAULT_LOCALE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub label: &'static str,
    pub name: &'static str,
}

/// Supported interface languages, in switcher order.
pub const LANGUAGES: [Language; 10] = [
    Language { code: "th", label: "TH", name: "ไทย" },
    Language { code: "en", label: "EN", name: "English" },
    Language { code: "ms", label: "MS", name: "Melayu" },
    Language { code: "zh", label: "ZH", name: "中文" },
    Language { code: "ja", label: "JA", name: "日本語" },
    Language { code: "ru", label: "RU", name: "Русский" },
    Language { code: "de", label: "DE", name: "Deutsch" },
    Language { code: "fr", label: "FR", name: "Français" },
    Language { code: "es", label: "ES", name: "Español" },
    Language { code: "hi", label: "HI", name: "हिन्दी" },
];

pub fn language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|lang| lang.code == code)
}

pub fn is_supported(code: &str) -> bool {
    language(code).is_some()
}

#[derive(Debug, Clone, Default)]
pub struct Translations {
    dictionaries: HashMap<String, Value>,
}

impl Translations {
    /// Loads `locales/<code>/translation.json` for every supported language
    /// from the embedded assets. Only the default locale is mandatory.
    pub fn load_embedded() -> Result<Self> {
        let mut dictionaries = HashMap::new();
        for lang in &LANGUAGES {
            let path = format!("locales/{}/translation.json", lang.code);
            let Some(file) = Asset::get(&path) else {
                tracing::warn!("No translation file for locale '{}'", lang.code);
                continue;
            };
            let dictionary: Value = serde_json::from_slice(&file.data)
                .with_context(|| format!("Failed to parse {}", path))?;
            dictionaries.insert(lang.code.to_string(), dictionary);
        }

        if !dictionaries.contains_key(DEFAULT_LOCALE) {
            anyhow::bail!("Missing translations for default locale '{}'", DEFAULT_LOCALE);
        }

        tracing::info!(locales = dictionaries.len(), "loaded translations");
        Ok(Translations { dictionaries })
    }

    pub fn from_dictionaries(dictionaries: HashMap<String, Value>) -> Self {
        Translations { dictionaries }
    }

    pub fn dictionary(&self, locale: &str) -> Option<&Value> {
        self.dictionaries.get(locale)
    }

    /// Full dictionary for a loaded locale with missing keys filled from the
    /// default locale. `None` when the locale has no dictionary.
    pub fn resolved(&self, locale: &str) -> Option<Value> {
        let dictionary = self.dictionaries.get(locale)?;
        let mut merged = self
            .dictionaries
            .get(DEFAULT_LOCALE)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        merge(&mut merged, dictionary);
        Some(merged)
    }

    /// Locale first, then the default locale.
    fn find(&self, locale: &str, key: &str) -> Option<&Value> {
        [locale, DEFAULT_LOCALE]
            .into_iter()
            .filter_map(|code| self.dictionaries.get(code))
            .find_map(|dict| lookup(dict, key).filter(|v| v.is_string() || v.is_array()))
    }

    /// Translated string, or the key itself when no dictionary has it.
    pub fn t(&self, locale: &str, key: &str) -> String {
        match self.find(locale, key) {
            Some(Value::String(text)) => text.clone(),
            _ => key.to_string(),
        }
    }

    /// Like [`Translations::t`] with `{{name}}` placeholders filled from `vars`.
    pub fn t_with(&self, locale: &str, key: &str, vars: &[(&str, &str)]) -> String {
        interpolate(&self.t(locale, key), vars)
    }

    /// Translated string array. Empty when missing or not an array.
    pub fn t_list(&self, locale: &str, key: &str) -> Vec<String> {
        match self.find(locale, key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Overlays `overlay` onto `base`, recursing into objects. Non-object leaves replace.
fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing, value);
                        continue;
                    }
                    _ => {}
                }
                base.insert(key.clone(), value.clone());
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

fn lookup<'a>(dictionary: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(dictionary, |node, part| node.as_object()?.get(part))
}

/// Replaces `{{name}}` placeholders. Unknown placeholders are left as they are.
pub fn interpolate(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (name, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", name), value);
    }
    result
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Fills a page template for `locale`. `{{lang}}` becomes the locale code,
/// `{{t:key}}` the translated string (with `vars` interpolated) and
/// `{{list:key}}` one `<li>` per entry of a string array. Values are HTML-escaped.
pub fn render_page(
    template: &str,
    translations: &Translations,
    locale: &str,
    vars: &[(&str, &str)],
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let token = &rest[start + 2..start + 2 + len];
        let replacement = if token == "lang" {
            Some(locale.to_string())
        } else if let Some(key) = token.strip_prefix("t:") {
            Some(escape_html(&translations.t_with(locale, key, vars)))
        } else if let Some(key) = token.strip_prefix("list:") {
            Some(
                translations
                    .t_list(locale, key)
                    .iter()
                    .map(|item| format!("<li>{}</li>", escape_html(item)))
                    .collect::<String>(),
            )
        } else {
            None
        };

        out.push_str(&rest[..start]);
        match replacement {
            Some(text) => out.push_str(&text),
            // Not ours, keep it for the client
            None => out.push_str(&rest[start..start + 4 + len]),
        }
        rest = &rest[start + 4 + len..];
    }

    out.push_str(rest);
    out
}

/// Language tags from an `Accept-Language` header, best first. Entries with
/// `q=0` are dropped; equal weights keep header order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();

    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

/// Picks the interface locale: a supported stored preference, else the first
/// supported base language the browser asks for, else the default.
pub fn resolve_locale(stored: Option<&str>, accept_language: Option<&str>) -> &'static str {
    if let Some(lang) = stored.and_then(language) {
        return lang.code;
    }

    accept_language
        .map(parse_accept_language)
        .unwrap_or_default()
        .iter()
        .filter_map(|tag| tag.split('-').next())
        .find_map(|base| language(&base.to_ascii_lowercase()))
        .map(|lang| lang.code)
        .unwrap_or(DEFAULT_LOCALE)
}

//! Per-locale extraction of translatable block fields
//!
//! A translatable field `title` is submitted twice: as `title` and as a
//! companion `title_i18n` payload holding `{"en": .., "de": ..}`. The
//! payloads are regrouped per locale, and the default locale's value is
//! folded back into the primary values.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::errors::{BlockError, BlockResult};

pub const I18N_SUFFIX: &str = "_i18n";
pub const LOCALE_SELECTOR: &str = "i18n_selector";

/// locale → (field → value)
pub type LocaleValues = IndexMap<String, Map<String, Value>>;

pub fn companion_key(field: &str) -> String {
    format!("{}{}", field, I18N_SUFFIX)
}

/// Pull the `<field>_i18n` payload of every translatable field out of `values`.
///
/// Fails with `InvalidTranslatableField` when a translatable field has no
/// companion payload at all.
pub fn extract_translations(
    translatable_fields: &[&str],
    values: &mut Map<String, Value>,
    default_locale: &str,
) -> BlockResult<LocaleValues> {
    let mut translations = LocaleValues::new();

    for field in translatable_fields {
        let payload = values
            .remove(&companion_key(field))
            .ok_or_else(|| BlockError::InvalidTranslatableField(field.to_string()))?;
        let per_locale = parse_payload(field, payload)?;

        for (locale, translation) in &per_locale {
            translations
                .entry(locale.clone())
                .or_default()
                .insert(field.to_string(), translation.clone());
        }

        if let Some(default_value) = per_locale.get(default_locale) {
            values.insert(field.to_string(), default_value.clone());
        }
    }

    values.remove(LOCALE_SELECTOR);
    Ok(translations)
}

fn parse_payload(field: &str, payload: Value) -> BlockResult<Map<String, Value>> {
    let invalid = || BlockError::InvalidTranslatableField(field.to_string());
    match payload {
        Value::Object(map) => Ok(map),
        Value::String(raw) if !raw.trim().is_empty() => {
            match serde_json::from_str::<Value>(&raw).map_err(|_| invalid())? {
                Value::Object(map) => Ok(map),
                _ => Err(invalid()),
            }
        }
        _ => Err(invalid()),
    }
}

/// The payload stored for `locale`: common values overlaid with that
/// locale's translations.
pub fn localize(
    common: &Map<String, Value>,
    translations: &LocaleValues,
    locale: &str,
) -> Map<String, Value> {
    let mut localized = common.clone();
    if let Some(overrides) = translations.get(locale) {
        for (field, value) in overrides {
            localized.insert(field.clone(), value.clone());
        }
    }
    localized
}

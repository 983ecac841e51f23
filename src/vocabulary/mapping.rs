use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    ExternalSystemId, ExternalSystemMapping, ExternalSystemMappingField, MappingKey,
    MappingValue, VocabularyValueInfo,
};

// A leading lower-case run, or an upper-case run with its trailing lower-case
// letters. Runs like "XMLFile" are split again in `camel_case_words`.
static CAMEL_CASE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+|[A-Z]+[a-z]*").expect("valid camel case regex"));

/// Split camel-case text into words: `"XMLFile"` gives `["XML", "File"]`,
/// `"birdDirective"` gives `["bird", "Directive"]`. Characters outside
/// ASCII letters are dropped.
pub fn camel_case_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    for m in CAMEL_CASE_WORD.find_iter(text) {
        let word = m.as_str();
        let upper = word.bytes().take_while(u8::is_ascii_uppercase).count();
        if upper > 1 && upper < word.len() {
            // The last capital starts the next word.
            words.push(&word[..upper - 1]);
            words.push(&word[upper - 1..]);
        } else {
            words.push(word);
        }
    }
    words
}

/// Space-joined camel-case split, or `None` when it equals the input or is
/// empty.
pub fn camel_case_variant(text: &str) -> Option<String> {
    let variant = camel_case_words(text).join(" ");
    (!variant.is_empty() && variant != text).then_some(variant)
}

/// Ordered key table where the first registration of a key wins.
#[derive(Debug, Default)]
struct MappingTable {
    values: Vec<MappingValue>,
    seen: HashSet<MappingKey>,
}

impl MappingTable {
    fn register(&mut self, key: MappingKey, sos_id: i32) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.values.push(MappingValue { value: key, sos_id });
        true
    }

    fn into_field(self, key: &str, description: Option<String>) -> ExternalSystemMappingField {
        ExternalSystemMappingField {
            key: key.to_string(),
            description,
            values: self.values,
        }
    }
}

/// Darwin Core field: each value text, then its camel-case variant, then the
/// synonyms. Synonyms never override a direct match.
pub fn dwc_mapping_field(
    term: &str,
    values: &[VocabularyValueInfo],
    synonyms: &[(&str, i32)],
) -> ExternalSystemMappingField {
    let mut table = MappingTable::default();
    for value in values {
        table.register(MappingKey::Text(value.value.clone()), value.id);
        if let Some(variant) = camel_case_variant(&value.value) {
            table.register(MappingKey::Text(variant), value.id);
        }
    }
    for (text, id) in synonyms {
        table.register(MappingKey::Text((*text).to_string()), *id);
    }
    table.into_field(
        term,
        Some(format!("http://rs.tdwg.org/dwc/terms/{}", term)),
    )
}

/// Artportalen field: identity on ids, skipping injected custom values.
pub fn artportalen_mapping_field(
    key: &str,
    values: &[VocabularyValueInfo],
) -> ExternalSystemMappingField {
    let mut table = MappingTable::default();
    for value in values.iter().filter(|v| !v.is_custom_value) {
        table.register(MappingKey::Id(value.id), value.id);
    }
    table.into_field(key, None)
}

pub fn dwc_mapping(
    term: &str,
    values: &[VocabularyValueInfo],
    synonyms: &[(&str, i32)],
) -> ExternalSystemMapping {
    ExternalSystemMapping {
        id: ExternalSystemId::DarwinCore,
        name: "Darwin Core".into(),
        description: Some("The Darwin Core format (https://dwc.tdwg.org/terms/)".into()),
        mappings: vec![dwc_mapping_field(term, values, synonyms)],
    }
}

pub fn artportalen_mapping(key: &str, values: &[VocabularyValueInfo]) -> ExternalSystemMapping {
    ExternalSystemMapping {
        id: ExternalSystemId::Artportalen,
        name: "Artportalen".into(),
        description: Some("The Artportalen system".into()),
        mappings: vec![artportalen_mapping_field(key, values)],
    }
}

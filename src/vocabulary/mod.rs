//! Localized, versioned controlled vocabularies with cross-system mappings.
//!
//! - `builder`: definitions and the strategy functions that produce a
//!   [`Vocabulary`] from source metadata or static tables.
//! - `mapping`: Darwin Core and Artportalen mapping generation.
//! - `dwc`: static Darwin Core values and synonym tables.
//! - `harvest`: the pass that builds every vocabulary and stores it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Document;

pub mod builder;
pub mod dwc;
pub mod harvest;
pub mod mapping;

pub use builder::{build_vocabulary, definitions, VocabularyDefinition};
pub use harvest::harvest_vocabularies;

pub const CULTURE_SV: &str = "sv-SE";
pub const CULTURE_EN: &str = "en-GB";

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("metadata id {id}: expected one {culture} translation, found {found}")]
    Translation {
        id: i32,
        culture: &'static str,
        found: usize,
    },
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VocabularyId {
    VerificationStatus = 1,
    LifeStage = 2,
    Sex = 3,
    Activity = 4,
    Biotope = 5,
    Substrate = 6,
    Unit = 7,
    Institution = 8,
    AreaType = 9,
    DeterminationMethod = 10,
    DiscoveryMethod = 11,
    BasisOfRecord = 12,
    Continent = 13,
    OccurrenceStatus = 14,
    AccessRights = 15,
    EstablishmentMeans = 16,
}

impl VocabularyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            VocabularyId::VerificationStatus => "VerificationStatus",
            VocabularyId::LifeStage => "LifeStage",
            VocabularyId::Sex => "Sex",
            VocabularyId::Activity => "Activity",
            VocabularyId::Biotope => "Biotope",
            VocabularyId::Substrate => "Substrate",
            VocabularyId::Unit => "Unit",
            VocabularyId::Institution => "Institution",
            VocabularyId::AreaType => "AreaType",
            VocabularyId::DeterminationMethod => "DeterminationMethod",
            VocabularyId::DiscoveryMethod => "DiscoveryMethod",
            VocabularyId::BasisOfRecord => "BasisOfRecord",
            VocabularyId::Continent => "Continent",
            VocabularyId::OccurrenceStatus => "OccurrenceStatus",
            VocabularyId::AccessRights => "AccessRights",
            VocabularyId::EstablishmentMeans => "EstablishmentMeans",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyValueTranslation {
    pub culture_code: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyCategory {
    pub id: i32,
    pub name: String,
    pub localized: bool,
    pub translations: Vec<VocabularyValueTranslation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyValueInfo {
    pub id: i32,
    pub value: String,
    pub localized: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<VocabularyValueTranslation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<VocabularyCategory>,
    pub is_custom_value: bool,
}

impl VocabularyValueInfo {
    /// A non-localized value, as used by the static Darwin Core tables.
    pub fn plain(id: i32, value: &str) -> Self {
        Self {
            id,
            value: value.to_string(),
            localized: false,
            translations: Vec::new(),
            category: None,
            is_custom_value: false,
        }
    }

    pub fn translate(&self, culture_code: &str) -> &str {
        self.translations
            .iter()
            .find(|t| t.culture_code == culture_code)
            .map(|t| t.value.as_str())
            .unwrap_or(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalSystemId {
    Artportalen,
    DarwinCore,
}

impl ExternalSystemId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalSystemId::Artportalen => "Artportalen",
            ExternalSystemId::DarwinCore => "DarwinCore",
        }
    }
}

/// Key in a foreign system: numeric ids for Artportalen, terms for Darwin Core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingKey {
    Id(i32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingValue {
    pub value: MappingKey,
    pub sos_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSystemMappingField {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<MappingValue>,
}

impl ExternalSystemMappingField {
    pub fn lookup(&self, key: &MappingKey) -> Option<i32> {
        self.values
            .iter()
            .find(|v| &v.value == key)
            .map(|v| v.sos_id)
    }

    pub fn lookup_text(&self, text: &str) -> Option<i32> {
        self.values.iter().find_map(|v| match &v.value {
            MappingKey::Text(t) if t == text => Some(v.sos_id),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSystemMapping {
    pub id: ExternalSystemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mappings: Vec<ExternalSystemMappingField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    pub id: VocabularyId,
    pub name: String,
    pub description: String,
    pub localized: bool,
    pub version: i32,
    pub values: Vec<VocabularyValueInfo>,
    pub external_system_mappings: Vec<ExternalSystemMapping>,
}

impl Vocabulary {
    pub fn mapping(&self, system: ExternalSystemId) -> Option<&ExternalSystemMapping> {
        self.external_system_mappings.iter().find(|m| m.id == system)
    }

    pub fn value(&self, id: i32) -> Option<&VocabularyValueInfo> {
        self.values.iter().find(|v| v.id == id)
    }
}

impl Document for Vocabulary {
    const COLLECTION: &'static str = "Vocabulary";

    fn document_id(&self) -> i64 {
        self.id as i64
    }
}

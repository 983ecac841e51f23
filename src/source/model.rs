//! Raw entities returned by the source gateway.
//!
//! These mirror the source system's rows one to one. Normalization happens in
//! `harvest::transform`; nothing here carries business logic.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One sighting row as stored by the source system.
#[derive(Debug, Clone, PartialEq)]
pub struct SightingEntity {
    pub id: i32,
    pub taxon_id: i32,
    pub site_id: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub quantity: Option<i32>,
    pub not_present: bool,
    pub unsure_determination: bool,
    pub hidden_by_provider: bool,
    pub protected: bool,
    pub gender_id: Option<i32>,
    pub stage_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub validation_status_id: Option<i32>,
    pub activity_id: Option<i32>,
    pub biotope_id: Option<i32>,
    pub substrate_id: Option<i32>,
    pub owner_organization_id: Option<i32>,
    pub rights_holder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonEntity {
    pub id: i32,
    pub user_id: i32,
    pub full_name: String,
}

impl PersonEntity {
    pub fn new(id: i32, user_id: i32, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            user_id,
            full_name: format!("{} {}", first_name, last_name).trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationEntity {
    pub id: i32,
    pub name: String,
}

/// Role a user plays for a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SightingRelationType {
    Observer,
    Reporter,
    Determiner,
    Confirmator,
}

impl SightingRelationType {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(SightingRelationType::Observer),
            2 => Some(SightingRelationType::Reporter),
            3 => Some(SightingRelationType::Determiner),
            4 => Some(SightingRelationType::Confirmator),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            SightingRelationType::Observer => 1,
            SightingRelationType::Reporter => 2,
            SightingRelationType::Determiner => 3,
            SightingRelationType::Confirmator => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightingRelationEntity {
    pub sighting_id: i32,
    pub user_id: i32,
    pub relation_type: SightingRelationType,
    pub sort: i32,
    pub is_public: bool,
    pub determination_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpeciesCollectionItemEntity {
    pub sighting_id: i32,
    pub collector_id: Option<i32>,
    pub organization_id: Option<i32>,
    pub determiner_text: Option<String>,
    pub determiner_year: Option<i32>,
    pub confirmator_text: Option<String>,
    pub confirmator_year: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntity {
    pub id: i32,
    pub name: String,
    pub owner: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub category: Option<String>,
    pub is_public: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParameterEntity {
    pub sighting_id: i32,
    pub project_id: i32,
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub data_type: String,
    pub value: Option<String>,
}

/// Association between a sighting and a project it was reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SightingProjectId {
    pub sighting_id: i32,
    pub project_id: i32,
}

/// One translation row from a metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub id: i32,
    pub culture_code: String,
    pub translation: String,
}

/// A metadata translation row that also names its grouping category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataWithCategoryRow {
    pub id: i32,
    pub culture_code: String,
    pub translation: String,
    pub category_id: i32,
    pub category_name: String,
}

impl From<MetadataWithCategoryRow> for MetadataRow {
    fn from(row: MetadataWithCategoryRow) -> Self {
        Self {
            id: row.id,
            culture_code: row.culture_code,
            translation: row.translation,
        }
    }
}

/// Metadata value with all its translations, grouped by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub id: i32,
    pub translations: Vec<(String, String)>,
}

impl Metadata {
    /// Translation for `culture_code`, falling back to the first one present.
    pub fn translate(&self, culture_code: &str) -> Option<&str> {
        self.translations
            .iter()
            .find(|(culture, _)| culture == culture_code)
            .or_else(|| self.translations.first())
            .map(|(_, value)| value.as_str())
    }
}

/// Source tables that expose localized metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataTable {
    Activity,
    Biotope,
    Gender,
    Organization,
    Stage,
    Substrate,
    Unit,
    ValidationStatus,
    AreaType,
    DeterminationMethod,
    DiscoveryMethod,
}

impl MetadataTable {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetadataTable::Activity => "Activity",
            MetadataTable::Biotope => "Biotope",
            MetadataTable::Gender => "Gender",
            MetadataTable::Organization => "Organization",
            MetadataTable::Stage => "Stage",
            MetadataTable::Substrate => "Substrate",
            MetadataTable::Unit => "Unit",
            MetadataTable::ValidationStatus => "ValidationStatus",
            MetadataTable::AreaType => "AreaType",
            MetadataTable::DeterminationMethod => "DeterminationMethod",
            MetadataTable::DiscoveryMethod => "DiscoveryMethod",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_type_ids_roundtrip() {
        for t in [
            SightingRelationType::Observer,
            SightingRelationType::Reporter,
            SightingRelationType::Determiner,
            SightingRelationType::Confirmator,
        ] {
            assert_eq!(SightingRelationType::from_id(t.id()), Some(t));
        }
        assert_eq!(SightingRelationType::from_id(9), None);
    }

    #[test]
    fn person_full_name_joins_parts() {
        let p = PersonEntity::new(1, 10, "Anna", "Berg");
        assert_eq!(p.full_name, "Anna Berg");
        let p = PersonEntity::new(2, 11, "Anna", "");
        assert_eq!(p.full_name, "Anna");
    }

    #[test]
    fn metadata_translate_falls_back_to_first() {
        let m = Metadata {
            id: 3,
            translations: vec![
                ("sv-SE".into(), "Hona".into()),
                ("en-GB".into(), "Female".into()),
            ],
        };
        assert_eq!(m.translate("en-GB"), Some("Female"));
        assert_eq!(m.translate("fi-FI"), Some("Hona"));
    }
}

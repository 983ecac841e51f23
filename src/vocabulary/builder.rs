use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::dwc;
use super::mapping::{artportalen_mapping, dwc_mapping};
use super::{
    ExternalSystemMapping, Vocabulary, VocabularyCategory, VocabularyError, VocabularyId,
    VocabularyValueInfo, VocabularyValueTranslation, CULTURE_EN, CULTURE_SV,
};
use crate::source::{MetadataRow, MetadataSource, MetadataTable, MetadataWithCategoryRow};

/// Source validation status that never reaches the vocabulary.
pub const REJECTED_VALIDATION_STATUS_ID: i32 = 50;
/// Injected custom validation statuses.
pub const VERIFIED_ID: i32 = 0;
pub const REPORTED_BY_EXPERT_ID: i32 = 1;

/// Display value used when the English translation is blank.
pub const EMPTY_VALUE: &str = "empty";

pub const VOCABULARY_VERSION: i32 = 1;

/// Where a vocabulary's values come from.
#[derive(Debug, Clone, Copy)]
pub enum ValueStrategy {
    Metadata(MetadataTable),
    MetadataWithCategory(MetadataTable),
    Static(&'static [(i32, &'static str)]),
}

/// Which external mappings a vocabulary carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingStrategy {
    /// Artportalen field key; the mapping is the identity on ids.
    pub artportalen: Option<&'static str>,
    /// Darwin Core term name.
    pub dwc_term: Option<&'static str>,
    pub synonyms: &'static [(&'static str, i32)],
}

#[derive(Debug, Clone, Copy)]
pub struct VocabularyDefinition {
    pub id: VocabularyId,
    pub description: &'static str,
    pub values: ValueStrategy,
    /// Post-fetch adjustment of the value list, applied before mappings.
    pub adjust: Option<fn(Vec<VocabularyValueInfo>) -> Vec<VocabularyValueInfo>>,
    pub mappings: MappingStrategy,
}

impl VocabularyDefinition {
    const fn metadata(id: VocabularyId, description: &'static str, table: MetadataTable) -> Self {
        Self {
            id,
            description,
            values: ValueStrategy::Metadata(table),
            adjust: None,
            mappings: MappingStrategy {
                artportalen: Some(table.as_str()),
                dwc_term: None,
                synonyms: &[],
            },
        }
    }

    const fn with_dwc(
        mut self,
        term: &'static str,
        synonyms: &'static [(&'static str, i32)],
    ) -> Self {
        self.mappings.dwc_term = Some(term);
        self.mappings.synonyms = synonyms;
        self
    }

    const fn fixed(
        id: VocabularyId,
        description: &'static str,
        values: &'static [(i32, &'static str)],
        term: &'static str,
        synonyms: &'static [(&'static str, i32)],
    ) -> Self {
        Self {
            id,
            description,
            values: ValueStrategy::Static(values),
            adjust: None,
            mappings: MappingStrategy {
                artportalen: None,
                dwc_term: Some(term),
                synonyms,
            },
        }
    }

    pub fn is_localized(&self) -> bool {
        !matches!(self.values, ValueStrategy::Static(_))
    }
}

static DEFINITIONS: [VocabularyDefinition; 16] = [
    VocabularyDefinition {
        adjust: Some(verification_status_values),
        ..VocabularyDefinition::metadata(
            VocabularyId::VerificationStatus,
            "The verification status of an observation.",
            MetadataTable::ValidationStatus,
        )
        .with_dwc("identificationVerificationStatus", dwc::VERIFICATION_STATUS_SYNONYMS)
    },
    VocabularyDefinition::metadata(
        VocabularyId::LifeStage,
        "The age class or life stage of the organism(s) at the time of observation.",
        MetadataTable::Stage,
    )
    .with_dwc("lifeStage", dwc::LIFE_STAGE_SYNONYMS),
    VocabularyDefinition::metadata(
        VocabularyId::Sex,
        "The sex of the biological individual(s) represented in the occurrence.",
        MetadataTable::Gender,
    )
    .with_dwc("sex", dwc::SEX_SYNONYMS),
    VocabularyDefinition {
        values: ValueStrategy::MetadataWithCategory(MetadataTable::Activity),
        ..VocabularyDefinition::metadata(
            VocabularyId::Activity,
            "A description of the behavior shown by the subject at the time of observation.",
            MetadataTable::Activity,
        )
        .with_dwc("behavior", &[])
    },
    VocabularyDefinition::metadata(
        VocabularyId::Biotope,
        "The biotope where the organism was observed.",
        MetadataTable::Biotope,
    ),
    VocabularyDefinition::metadata(
        VocabularyId::Substrate,
        "The substrate the organism was found on.",
        MetadataTable::Substrate,
    ),
    VocabularyDefinition::metadata(
        VocabularyId::Unit,
        "The type of quantification system used for the quantity of organisms.",
        MetadataTable::Unit,
    )
    .with_dwc("organismQuantityType", &[]),
    VocabularyDefinition::metadata(
        VocabularyId::Institution,
        "The institution having custody of the object(s) or information.",
        MetadataTable::Organization,
    )
    .with_dwc("institutionCode", &[]),
    VocabularyDefinition::metadata(
        VocabularyId::AreaType,
        "Type of administrative or natural area.",
        MetadataTable::AreaType,
    ),
    VocabularyDefinition::metadata(
        VocabularyId::DeterminationMethod,
        "The method used to determine the taxon.",
        MetadataTable::DeterminationMethod,
    )
    .with_dwc("identificationMethod", &[]),
    VocabularyDefinition::metadata(
        VocabularyId::DiscoveryMethod,
        "The method used to discover the organism.",
        MetadataTable::DiscoveryMethod,
    )
    .with_dwc("samplingProtocol", &[]),
    VocabularyDefinition::fixed(
        VocabularyId::BasisOfRecord,
        "The specific nature of the data record.",
        dwc::BASIS_OF_RECORD,
        "basisOfRecord",
        dwc::BASIS_OF_RECORD_SYNONYMS,
    ),
    VocabularyDefinition::fixed(
        VocabularyId::Continent,
        "The name of the continent in which the location occurs.",
        dwc::CONTINENT,
        "continent",
        dwc::CONTINENT_SYNONYMS,
    ),
    VocabularyDefinition::fixed(
        VocabularyId::OccurrenceStatus,
        "A statement about the presence or absence of a taxon at a location.",
        dwc::OCCURRENCE_STATUS,
        "occurrenceStatus",
        dwc::OCCURRENCE_STATUS_SYNONYMS,
    ),
    VocabularyDefinition::fixed(
        VocabularyId::AccessRights,
        "Information about who can access the resource or an indication of its security status.",
        dwc::ACCESS_RIGHTS,
        "accessRights",
        dwc::ACCESS_RIGHTS_SYNONYMS,
    ),
    VocabularyDefinition::fixed(
        VocabularyId::EstablishmentMeans,
        "The process by which the organism came to be established at a location.",
        dwc::ESTABLISHMENT_MEANS,
        "establishmentMeans",
        dwc::ESTABLISHMENT_MEANS_SYNONYMS,
    ),
];

/// Every vocabulary the crate builds, in harvest order.
pub fn definitions() -> &'static [VocabularyDefinition] {
    &DEFINITIONS
}

pub fn definition(id: VocabularyId) -> Option<&'static VocabularyDefinition> {
    DEFINITIONS.iter().find(|d| d.id == id)
}

/// Fetch a definition's values and build its document. `Ok(None)` means the
/// source produced nothing and no document should be written.
#[instrument(skip_all, fields(vocabulary = def.id.as_str()))]
pub async fn build_vocabulary(
    def: &VocabularyDefinition,
    source: &dyn MetadataSource,
) -> Result<Option<Vocabulary>, VocabularyError> {
    let values = fetch_values(def, source).await?;
    Ok(build_from_values(def, values))
}

/// Pure half of [`build_vocabulary`].
pub fn build_from_values(
    def: &VocabularyDefinition,
    values: Vec<VocabularyValueInfo>,
) -> Option<Vocabulary> {
    let values = match def.adjust {
        Some(adjust) => adjust(values),
        None => values,
    };
    if values.is_empty() {
        debug!("no values");
        return None;
    }
    let external_system_mappings = build_mappings(def, &values);
    Some(Vocabulary {
        id: def.id,
        name: def.id.as_str().to_string(),
        description: def.description.to_string(),
        localized: def.is_localized(),
        version: VOCABULARY_VERSION,
        values,
        external_system_mappings,
    })
}

pub async fn fetch_values(
    def: &VocabularyDefinition,
    source: &dyn MetadataSource,
) -> Result<Vec<VocabularyValueInfo>, VocabularyError> {
    match def.values {
        ValueStrategy::Metadata(table) => localized_values(&source.get_metadata(table).await?),
        ValueStrategy::MetadataWithCategory(table) => {
            values_with_category(&source.get_metadata_with_category(table).await?)
        }
        ValueStrategy::Static(table) => Ok(static_values(table)),
    }
}

pub fn build_mappings(
    def: &VocabularyDefinition,
    values: &[VocabularyValueInfo],
) -> Vec<ExternalSystemMapping> {
    let mut mappings = Vec::new();
    if let Some(key) = def.mappings.artportalen {
        mappings.push(artportalen_mapping(key, values));
    }
    if let Some(term) = def.mappings.dwc_term {
        mappings.push(dwc_mapping(term, values, &build_synonyms(def)));
    }
    mappings
}

pub fn build_synonyms(def: &VocabularyDefinition) -> Vec<(&'static str, i32)> {
    def.mappings.synonyms.to_vec()
}

pub fn static_values(table: &[(i32, &str)]) -> Vec<VocabularyValueInfo> {
    table
        .iter()
        .map(|(id, value)| VocabularyValueInfo::plain(*id, value))
        .collect()
}

trait CultureRow {
    fn culture_code(&self) -> &str;
}

impl CultureRow for MetadataRow {
    fn culture_code(&self) -> &str {
        &self.culture_code
    }
}

impl CultureRow for MetadataWithCategoryRow {
    fn culture_code(&self) -> &str {
        &self.culture_code
    }
}

fn single<'a, R: CultureRow>(
    id: i32,
    rows: &[&'a R],
    culture: &'static str,
) -> Result<&'a R, VocabularyError> {
    let matches: Vec<&'a R> = rows
        .iter()
        .copied()
        .filter(|r| r.culture_code() == culture)
        .collect();
    match matches.as_slice() {
        [row] => Ok(*row),
        _ => Err(VocabularyError::Translation {
            id,
            culture,
            found: matches.len(),
        }),
    }
}

fn display_value(english: &str) -> String {
    if english.trim().is_empty() {
        EMPTY_VALUE.to_string()
    } else {
        english.to_string()
    }
}

fn translations(sv: &str, en: &str) -> Vec<VocabularyValueTranslation> {
    vec![
        VocabularyValueTranslation {
            culture_code: CULTURE_SV.into(),
            value: sv.to_string(),
        },
        VocabularyValueTranslation {
            culture_code: CULTURE_EN.into(),
            value: en.to_string(),
        },
    ]
}

/// One localized value per distinct id, ordered by id. Every id needs
/// exactly one Swedish and one English row.
pub fn localized_values(rows: &[MetadataRow]) -> Result<Vec<VocabularyValueInfo>, VocabularyError> {
    let mut by_id: BTreeMap<i32, Vec<&MetadataRow>> = BTreeMap::new();
    for row in rows {
        by_id.entry(row.id).or_default().push(row);
    }

    by_id
        .into_iter()
        .map(|(id, rows)| {
            let sv = single(id, &rows, CULTURE_SV)?;
            let en = single(id, &rows, CULTURE_EN)?;
            Ok(VocabularyValueInfo {
                id,
                value: display_value(&en.translation),
                localized: true,
                translations: translations(&sv.translation, &en.translation),
                category: None,
                is_custom_value: false,
            })
        })
        .collect()
}

/// Like [`localized_values`], with a localized category taken from the
/// Swedish and English rows.
pub fn values_with_category(
    rows: &[MetadataWithCategoryRow],
) -> Result<Vec<VocabularyValueInfo>, VocabularyError> {
    let mut by_id: BTreeMap<i32, Vec<&MetadataWithCategoryRow>> = BTreeMap::new();
    for row in rows {
        by_id.entry(row.id).or_default().push(row);
    }

    by_id
        .into_iter()
        .map(|(id, rows)| {
            let sv = single(id, &rows, CULTURE_SV)?;
            let en = single(id, &rows, CULTURE_EN)?;
            Ok(VocabularyValueInfo {
                id,
                value: display_value(&en.translation),
                localized: true,
                translations: translations(&sv.translation, &en.translation),
                category: Some(VocabularyCategory {
                    id: en.category_id,
                    name: en.category_name.clone(),
                    localized: true,
                    translations: translations(&sv.category_name, &en.category_name),
                }),
                is_custom_value: false,
            })
        })
        .collect()
}

fn custom_value(id: i32, sv: &str, en: &str) -> VocabularyValueInfo {
    VocabularyValueInfo {
        id,
        value: en.to_string(),
        localized: true,
        translations: translations(sv, en),
        category: None,
        is_custom_value: true,
    }
}

/// Drop rejected statuses, then add the custom statuses. An empty source set
/// stays empty so that no document is produced.
pub fn verification_status_values(values: Vec<VocabularyValueInfo>) -> Vec<VocabularyValueInfo> {
    let mut values: Vec<_> = values
        .into_iter()
        .filter(|v| v.id != REJECTED_VALIDATION_STATUS_ID)
        .collect();
    if values.is_empty() {
        return values;
    }
    values.push(custom_value(VERIFIED_ID, "Verifierad", "Verified"));
    values.push(custom_value(
        REPORTED_BY_EXPERT_ID,
        "Rapporterad av expert",
        "Reported by expert",
    ));
    values.sort_by_key(|v| v.id);
    values
}

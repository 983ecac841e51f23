use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use species_harvest::model::{DataProvider, RunStatus};
use species_harvest::source::{MetadataRow, MetadataSource, MetadataTable, MetadataWithCategoryRow};
use species_harvest::store::DestinationStore;
use species_harvest::vocabulary::builder::definition;
use species_harvest::vocabulary::{
    build_vocabulary, harvest_vocabularies, ExternalSystemId, MappingKey, Vocabulary,
    VocabularyError, VocabularyId,
};

#[derive(Clone, Default)]
struct StaticMetadata {
    rows: HashMap<MetadataTable, Vec<(i32, &'static str, &'static str)>>,
    activities: Vec<MetadataWithCategoryRow>,
    failing: Option<MetadataTable>,
    requested: Arc<Mutex<Vec<MetadataTable>>>,
}

impl StaticMetadata {
    fn with(mut self, table: MetadataTable, rows: Vec<(i32, &'static str, &'static str)>) -> Self {
        self.rows.insert(table, rows);
        self
    }
}

#[async_trait::async_trait]
impl MetadataSource for StaticMetadata {
    async fn get_metadata(&self, table: MetadataTable) -> Result<Vec<MetadataRow>> {
        self.requested.lock().await.push(table);
        if self.failing == Some(table) {
            return Err(anyhow!("metadata table {} unavailable", table.as_str()));
        }
        Ok(self
            .rows
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .map(|(id, culture, translation)| MetadataRow {
                        id: *id,
                        culture_code: culture.to_string(),
                        translation: translation.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_metadata_with_category(
        &self,
        table: MetadataTable,
    ) -> Result<Vec<MetadataWithCategoryRow>> {
        self.requested.lock().await.push(table);
        Ok(self.activities.clone())
    }
}

#[derive(Clone, Default)]
struct RecordingStore {
    calls: Arc<Mutex<Vec<String>>>,
    written: Arc<Mutex<Vec<Vocabulary>>>,
}

#[async_trait::async_trait]
impl DestinationStore<Vocabulary> for RecordingStore {
    async fn delete_collection(&self) -> Result<()> {
        self.calls.lock().await.push("delete_collection".into());
        Ok(())
    }

    async fn add_collection(&self) -> Result<()> {
        self.calls.lock().await.push("add_collection".into());
        Ok(())
    }

    async fn add_many(&self, items: &[Vocabulary]) -> Result<usize> {
        self.calls.lock().await.push(format!("add_many:{}", items.len()));
        self.written.lock().await.extend_from_slice(items);
        Ok(items.len())
    }
}

fn sex_rows() -> Vec<(i32, &'static str, &'static str)> {
    vec![
        (1, "sv-SE", "Hane"),
        (1, "en-GB", "Male"),
        (2, "sv-SE", "Hona"),
        (2, "en-GB", "Female"),
    ]
}

#[tokio::test]
async fn localized_vocabulary_from_source() {
    let source = StaticMetadata::default().with(
        MetadataTable::Stage,
        vec![(7, "sv-SE", "Fisk"), (7, "en-GB", "Fish")],
    );
    let def = definition(VocabularyId::LifeStage).unwrap();
    let vocabulary = build_vocabulary(def, &source).await.unwrap().unwrap();

    assert_eq!(vocabulary.id, VocabularyId::LifeStage);
    assert!(vocabulary.localized);
    assert_eq!(vocabulary.values.len(), 1);
    let value = &vocabulary.values[0];
    assert_eq!(value.id, 7);
    assert_eq!(value.value, "Fish");
    assert_eq!(value.translations.len(), 2);
    assert_eq!(value.translations[0].culture_code, "sv-SE");
    assert_eq!(value.translations[0].value, "Fisk");
    assert_eq!(*source.requested.lock().await, vec![MetadataTable::Stage]);
}

#[tokio::test]
async fn dwc_mapping_includes_camel_case_variants() {
    let source = StaticMetadata::default().with(
        MetadataTable::Unit,
        vec![(7, "sv-SE", "Fågeldirektivet"), (7, "en-GB", "BirdDirective")],
    );
    let def = definition(VocabularyId::Unit).unwrap();
    let vocabulary = build_vocabulary(def, &source).await.unwrap().unwrap();

    let dwc = vocabulary.mapping(ExternalSystemId::DarwinCore).unwrap();
    let field = &dwc.mappings[0];
    assert_eq!(field.key, "organismQuantityType");
    assert_eq!(field.lookup_text("BirdDirective"), Some(7));
    assert_eq!(field.lookup_text("Bird Directive"), Some(7));

    let artportalen = vocabulary.mapping(ExternalSystemId::Artportalen).unwrap();
    assert_eq!(artportalen.mappings[0].lookup(&MappingKey::Id(7)), Some(7));
}

#[tokio::test]
async fn missing_culture_is_a_translation_error() {
    let source = StaticMetadata::default().with(MetadataTable::Gender, vec![(2, "sv-SE", "Hona")]);
    let def = definition(VocabularyId::Sex).unwrap();
    let err = build_vocabulary(def, &source).await.unwrap_err();
    assert!(matches!(
        err,
        VocabularyError::Translation { id: 2, found: 0, .. }
    ));
}

#[tokio::test]
async fn empty_source_produces_no_vocabulary() {
    let source = StaticMetadata::default();
    for id in [VocabularyId::VerificationStatus, VocabularyId::Biotope] {
        let def = definition(id).unwrap();
        assert!(build_vocabulary(def, &source).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn activity_values_carry_categories() {
    let row = |culture: &str, translation: &str, category: &str| MetadataWithCategoryRow {
        id: 18,
        culture_code: culture.into(),
        translation: translation.into(),
        category_id: 3,
        category_name: category.into(),
    };
    let source = StaticMetadata {
        activities: vec![
            row("sv-SE", "Spelande", "Häckning"),
            row("en-GB", "Displaying", "Breeding"),
        ],
        ..Default::default()
    };
    let def = definition(VocabularyId::Activity).unwrap();
    let vocabulary = build_vocabulary(def, &source).await.unwrap().unwrap();
    let category = vocabulary.values[0].category.as_ref().unwrap();
    assert_eq!(category.id, 3);
    assert_eq!(category.name, "Breeding");
    let dwc = vocabulary.mapping(ExternalSystemId::DarwinCore).unwrap();
    assert_eq!(dwc.mappings[0].key, "behavior");
}

#[tokio::test]
async fn harvest_replaces_collection_and_skips_empty_vocabularies() {
    let source = StaticMetadata::default()
        .with(MetadataTable::Gender, sex_rows())
        .with(
            MetadataTable::ValidationStatus,
            vec![
                (50, "sv-SE", "Underkänd"),
                (50, "en-GB", "Rejected"),
                (60, "sv-SE", "Godkänd"),
                (60, "en-GB", "Approved"),
            ],
        );
    let store = RecordingStore::default();

    let info = harvest_vocabularies(
        &source,
        &store,
        DataProvider::SpeciesPortal,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(info.status, Some(RunStatus::Success));
    assert_eq!(info.id, "Vocabulary");
    // Sex, VerificationStatus and the five static vocabularies.
    assert_eq!(info.count, 7);
    assert_eq!(
        *store.calls.lock().await,
        vec!["delete_collection", "add_collection", "add_many:7"]
    );

    let written = store.written.lock().await;
    let verification = written
        .iter()
        .find(|v| v.id == VocabularyId::VerificationStatus)
        .unwrap();
    let ids: Vec<_> = verification.values.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![0, 1, 60]);
    assert!(verification.value(50).is_none());
    assert_eq!(
        verification.value(1).map(|v| v.translate("sv-SE")),
        Some("Rapporterad av expert")
    );
    assert!(written.iter().any(|v| v.id == VocabularyId::BasisOfRecord));
    assert!(!written.iter().any(|v| v.id == VocabularyId::Biotope));
}

#[tokio::test]
async fn harvest_fails_on_source_error_without_writing() {
    let source = StaticMetadata {
        failing: Some(MetadataTable::Gender),
        ..Default::default()
    };
    let store = RecordingStore::default();

    let info = harvest_vocabularies(
        &source,
        &store,
        DataProvider::SpeciesPortal,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(info.status, Some(RunStatus::Failed));
    assert_eq!(info.count, 0);
    assert!(store.calls.lock().await.is_empty());
}

#[tokio::test]
async fn harvest_honors_cancellation() {
    let source = StaticMetadata::default().with(MetadataTable::Gender, sex_rows());
    let store = RecordingStore::default();
    let token = CancellationToken::new();
    token.cancel();

    let info =
        harvest_vocabularies(&source, &store, DataProvider::SpeciesPortal, &token).await;

    assert_eq!(info.status, Some(RunStatus::Canceled));
    assert!(store.calls.lock().await.is_empty());
}

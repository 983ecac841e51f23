//! SpeciesPortal source gateway over a sqlx SQLite mirror.
//!
//! Each query has its own row decoder so the column → field mapping is
//! explicit and covered by tests.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashSet;
use tracing::{debug, instrument};

use super::model::*;
use super::{MetadataSource, SightingSource};
use crate::db::Pool;

/// Sighting types included in a harvest (ordinary and aggregated).
const INCLUDED_SIGHTING_TYPES: &str = "0, 3";
/// Validation statuses that never leave the source ("Rejected").
const EXCLUDED_VALIDATION_STATUSES: &str = "50";
/// State type marking a sighting as published.
const PUBLISHED_STATE_TYPE: i32 = 30;

#[derive(Debug, Clone)]
pub struct SpeciesPortalSource {
    pool: Pool,
}

impl SpeciesPortalSource {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

pub fn decode_sighting(row: &SqliteRow) -> Result<SightingEntity> {
    Ok(SightingEntity {
        id: row.try_get("id")?,
        taxon_id: row.try_get("taxon_id")?,
        site_id: row.try_get("site_id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        quantity: row.try_get("quantity")?,
        not_present: row.try_get("not_present")?,
        unsure_determination: row.try_get("unsure_determination")?,
        hidden_by_provider: row.try_get("hidden_by_provider")?,
        protected: row.try_get("protected_by_system")?,
        gender_id: row.try_get("gender_id")?,
        stage_id: row.try_get("stage_id")?,
        unit_id: row.try_get("unit_id")?,
        validation_status_id: row.try_get("validation_status_id")?,
        activity_id: row.try_get("activity_id")?,
        biotope_id: row.try_get("biotope_id")?,
        substrate_id: row.try_get("substrate_id")?,
        owner_organization_id: row.try_get("owner_organization_id")?,
        rights_holder: row
            .try_get::<Option<String>, _>("rights_holder")?
            .filter(|s| !s.trim().is_empty()),
    })
}

pub fn decode_person(row: &SqliteRow) -> Result<PersonEntity> {
    let first_name: String = row.try_get("first_name")?;
    let last_name: String = row.try_get("last_name")?;
    Ok(PersonEntity::new(
        row.try_get("id")?,
        row.try_get("user_id")?,
        &first_name,
        &last_name,
    ))
}

pub fn decode_organization(row: &SqliteRow) -> Result<OrganizationEntity> {
    Ok(OrganizationEntity {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

pub fn decode_relation(row: &SqliteRow) -> Result<SightingRelationEntity> {
    let type_id: i32 = row.try_get("sighting_relation_type_id")?;
    let relation_type = SightingRelationType::from_id(type_id)
        .ok_or_else(|| anyhow!("unknown sighting relation type {}", type_id))?;
    Ok(SightingRelationEntity {
        sighting_id: row.try_get("sighting_id")?,
        user_id: row.try_get("user_id")?,
        relation_type,
        sort: row.try_get("sort")?,
        is_public: row.try_get("is_public")?,
        determination_year: row.try_get("determination_year")?,
    })
}

pub fn decode_collection_item(row: &SqliteRow) -> Result<SpeciesCollectionItemEntity> {
    Ok(SpeciesCollectionItemEntity {
        sighting_id: row.try_get("sighting_id")?,
        collector_id: row.try_get("collector_id")?,
        organization_id: row.try_get("organization_id")?,
        determiner_text: row.try_get("determiner_text")?,
        determiner_year: row.try_get("determiner_year")?,
        confirmator_text: row.try_get("confirmator_text")?,
        confirmator_year: row.try_get("confirmator_year")?,
        description: row.try_get("description")?,
    })
}

pub fn decode_project(row: &SqliteRow) -> Result<ProjectEntity> {
    Ok(ProjectEntity {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        owner: row.try_get("owner")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        category: row.try_get("category")?,
        is_public: row.try_get("is_public")?,
        description: row.try_get("description")?,
    })
}

pub fn decode_project_parameter(row: &SqliteRow) -> Result<ProjectParameterEntity> {
    Ok(ProjectParameterEntity {
        sighting_id: row.try_get("sighting_id")?,
        project_id: row.try_get("project_id")?,
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        unit: row.try_get("unit")?,
        data_type: row.try_get("data_type")?,
        value: row.try_get("value")?,
    })
}

pub fn decode_metadata(row: &SqliteRow) -> Result<MetadataRow> {
    Ok(MetadataRow {
        id: row.try_get("id")?,
        culture_code: row.try_get("culture_code")?,
        translation: row.try_get("translation")?,
    })
}

pub fn decode_metadata_with_category(row: &SqliteRow) -> Result<MetadataWithCategoryRow> {
    let id: i32 = row.try_get("id")?;
    let category_id: Option<i32> = row.try_get("category_id")?;
    let category_name: Option<String> = row.try_get("category_name")?;
    let (Some(category_id), Some(category_name)) = (category_id, category_name) else {
        return Err(anyhow!("metadata {} has no category", id));
    };
    Ok(MetadataWithCategoryRow {
        id,
        culture_code: row.try_get("culture_code")?,
        translation: row.try_get("translation")?,
        category_id,
        category_name,
    })
}

fn decode_all<T>(rows: &[SqliteRow], decode: fn(&SqliteRow) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(decode).collect()
}

#[async_trait]
impl SightingSource for SpeciesPortalSource {
    #[instrument(skip_all)]
    async fn get_id_span(&self) -> Result<(i32, i32)> {
        let row = sqlx::query("SELECT MIN(id) AS min_id, MAX(id) AS max_id FROM sighting")
            .fetch_one(&self.pool)
            .await
            .context("failed to query sighting id span")?;
        let min_id: Option<i32> = row.try_get("min_id")?;
        let max_id: Option<i32> = row.try_get("max_id")?;
        // An empty source yields an empty span: the chunk loop never runs.
        Ok((min_id.unwrap_or(0), max_id.unwrap_or(-1)))
    }

    #[instrument(skip(self))]
    async fn get_chunk(&self, start_id: i32, count: i32) -> Result<Vec<SightingEntity>> {
        let end_id = start_id.saturating_add(count - 1);
        let sql = format!(
            "SELECT s.id, s.taxon_id, s.site_id, s.start_date, s.end_date, s.quantity, \
                    s.not_present, s.unsure_determination, \
                    (s.hidden_by_provider IS NOT NULL) AS hidden_by_provider, \
                    s.protected_by_system, s.gender_id, s.stage_id, s.unit_id, \
                    s.validation_status_id, s.activity_id, s.biotope_id, s.substrate_id, \
                    s.owner_organization_id, s.rights_holder \
             FROM sighting s \
             JOIN sighting_state ss ON ss.sighting_id = s.id \
             WHERE s.id BETWEEN ? AND ? \
               AND s.taxon_id IS NOT NULL \
               AND s.sighting_type_id IN ({types}) \
               AND (s.hidden_by_provider IS NULL OR datetime(s.hidden_by_provider) < CURRENT_TIMESTAMP) \
               AND (s.validation_status_id IS NULL OR s.validation_status_id NOT IN ({excluded})) \
               AND s.is_published = 1 \
               AND ss.sighting_state_type_id = ? \
               AND ss.is_active = 1 \
               AND (ss.end_date IS NULL OR datetime(ss.end_date) > CURRENT_TIMESTAMP) \
             ORDER BY s.id",
            types = INCLUDED_SIGHTING_TYPES,
            excluded = EXCLUDED_VALIDATION_STATUSES,
        );
        let rows = sqlx::query(&sql)
            .bind(start_id)
            .bind(end_id)
            .bind(PUBLISHED_STATE_TYPE)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to fetch sightings {}..={}", start_id, end_id))?;
        debug!(start_id, end_id, rows = rows.len(), "fetched sighting chunk");
        decode_all(&rows, decode_sighting)
    }

    #[instrument(skip_all, fields(sightings = sighting_ids.len()))]
    async fn get_relations(
        &self,
        sighting_ids: &HashSet<i32>,
    ) -> Result<Vec<SightingRelationEntity>> {
        if sighting_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut ids: Vec<i32> = sighting_ids.iter().copied().collect();
        ids.sort_unstable();
        let ids_json = serde_json::to_string(&ids)?;
        let rows = sqlx::query(
            "SELECT sighting_id, user_id, sighting_relation_type_id, sort, is_public, determination_year \
             FROM sighting_relation \
             WHERE sighting_id IN (SELECT value FROM json_each(?)) \
               AND sighting_relation_type_id IN (1, 2, 3, 4) \
             ORDER BY sighting_id, sort, id",
        )
        .bind(ids_json)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch sighting relations")?;
        decode_all(&rows, decode_relation)
    }

    #[instrument(skip_all)]
    async fn get_collection_items(&self) -> Result<Vec<SpeciesCollectionItemEntity>> {
        let rows = sqlx::query(
            "SELECT sighting_id, collector_id, organization_id, determiner_text, determiner_year, \
                    confirmator_text, confirmator_year, description \
             FROM species_collection_item ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch species collection items")?;
        decode_all(&rows, decode_collection_item)
    }

    #[instrument(skip_all)]
    async fn get_persons(&self) -> Result<Vec<PersonEntity>> {
        let rows = sqlx::query("SELECT id, user_id, first_name, last_name FROM person ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch persons")?;
        decode_all(&rows, decode_person)
    }

    #[instrument(skip_all)]
    async fn get_organizations(&self) -> Result<Vec<OrganizationEntity>> {
        let rows = sqlx::query("SELECT id, name FROM organization ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch organizations")?;
        decode_all(&rows, decode_organization)
    }

    #[instrument(skip_all)]
    async fn get_projects(&self) -> Result<Vec<ProjectEntity>> {
        let rows = sqlx::query(
            "SELECT id, name, owner, start_date, end_date, category, is_public, description \
             FROM project ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch projects")?;
        decode_all(&rows, decode_project)
    }

    #[instrument(skip_all)]
    async fn get_project_parameters(&self) -> Result<Vec<ProjectParameterEntity>> {
        let rows = sqlx::query(
            "SELECT v.sighting_id, p.project_id, p.id, p.name, p.description, p.unit, p.data_type, v.value \
             FROM project_parameter_value v \
             JOIN project_parameter p ON p.id = v.project_parameter_id \
             ORDER BY v.sighting_id, p.project_id, p.id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch project parameters")?;
        decode_all(&rows, decode_project_parameter)
    }

    #[instrument(skip_all)]
    async fn get_sighting_project_ids(&self) -> Result<Vec<SightingProjectId>> {
        let rows = sqlx::query(
            "SELECT sighting_id, project_id FROM sighting_project ORDER BY sighting_id, project_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch sighting project ids")?;
        rows.iter()
            .map(|row| {
                Ok(SightingProjectId {
                    sighting_id: row.try_get("sighting_id")?,
                    project_id: row.try_get("project_id")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl MetadataSource for SpeciesPortalSource {
    #[instrument(skip(self))]
    async fn get_metadata(&self, table: MetadataTable) -> Result<Vec<MetadataRow>> {
        let rows = sqlx::query(
            "SELECT id, culture_code, translation FROM metadata_translation \
             WHERE table_name = ? ORDER BY id, culture_code",
        )
        .bind(table.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to fetch {} metadata", table.as_str()))?;
        decode_all(&rows, decode_metadata)
    }

    #[instrument(skip(self))]
    async fn get_metadata_with_category(
        &self,
        table: MetadataTable,
    ) -> Result<Vec<MetadataWithCategoryRow>> {
        let rows = sqlx::query(
            "SELECT id, culture_code, translation, category_id, category_name FROM metadata_translation \
             WHERE table_name = ? ORDER BY id, culture_code",
        )
        .bind(table.as_str())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to fetch {} metadata with category", table.as_str()))?;
        decode_all(&rows, decode_metadata_with_category)
    }
}

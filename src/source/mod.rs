//! Source gateway: query contracts the harvester depends on.
//!
//! This module is split into two submodules:
//! - `model`: raw entities returned by the gateway.
//! - `species_portal`: a sqlx-backed implementation over a SpeciesPortal mirror.
//!
//! Every method returns `anyhow::Result`. An empty `Vec` means the query
//! succeeded and found nothing; a failed query is always an `Err`.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

pub mod model;
pub mod species_portal;

pub use model::*;
pub use species_portal::SpeciesPortalSource;

#[async_trait]
pub trait SightingSource: Send + Sync {
    /// Smallest and largest sighting id present in the source.
    async fn get_id_span(&self) -> Result<(i32, i32)>;

    /// Sightings with id in `[start_id, start_id + count - 1]` that pass the
    /// source's publication rules.
    async fn get_chunk(&self, start_id: i32, count: i32) -> Result<Vec<SightingEntity>>;

    async fn get_relations(&self, sighting_ids: &HashSet<i32>)
        -> Result<Vec<SightingRelationEntity>>;

    async fn get_collection_items(&self) -> Result<Vec<SpeciesCollectionItemEntity>>;

    async fn get_persons(&self) -> Result<Vec<PersonEntity>>;

    async fn get_organizations(&self) -> Result<Vec<OrganizationEntity>>;

    async fn get_projects(&self) -> Result<Vec<ProjectEntity>>;

    async fn get_project_parameters(&self) -> Result<Vec<ProjectParameterEntity>>;

    async fn get_sighting_project_ids(&self) -> Result<Vec<SightingProjectId>>;
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn get_metadata(&self, table: MetadataTable) -> Result<Vec<MetadataRow>>;

    async fn get_metadata_with_category(
        &self,
        table: MetadataTable,
    ) -> Result<Vec<MetadataWithCategoryRow>>;

    async fn get_activities(&self) -> Result<Vec<MetadataWithCategoryRow>> {
        self.get_metadata_with_category(MetadataTable::Activity).await
    }

    async fn get_biotopes(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::Biotope).await
    }

    async fn get_genders(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::Gender).await
    }

    async fn get_organization_metadata(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::Organization).await
    }

    async fn get_stages(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::Stage).await
    }

    async fn get_substrates(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::Substrate).await
    }

    async fn get_units(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::Unit).await
    }

    async fn get_validation_status(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::ValidationStatus).await
    }

    async fn get_area_types(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::AreaType).await
    }

    async fn get_determination_methods(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::DeterminationMethod).await
    }

    async fn get_discovery_methods(&self) -> Result<Vec<MetadataRow>> {
        self.get_metadata(MetadataTable::DiscoveryMethod).await
    }
}

/// Everything an observation harvest reads: sightings plus metadata lookups.
pub trait HarvestSource: SightingSource + MetadataSource {}

impl<T: SightingSource + MetadataSource> HarvestSource for T {}

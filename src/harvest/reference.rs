use std::collections::{HashMap, HashSet};
use std::future::Future;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::source::{
    HarvestSource, Metadata, MetadataRow, OrganizationEntity, PersonEntity, ProjectEntity,
    ProjectParameterEntity, SpeciesCollectionItemEntity,
};

/// Lookup dictionaries fetched once per run and shared read-only by every
/// chunk task.
#[derive(Debug, Default)]
pub struct ReferenceData {
    pub activities: HashMap<i32, Metadata>,
    pub biotopes: HashMap<i32, Metadata>,
    pub genders: HashMap<i32, Metadata>,
    pub organizations: HashMap<i32, Metadata>,
    pub stages: HashMap<i32, Metadata>,
    pub substrates: HashMap<i32, Metadata>,
    pub units: HashMap<i32, Metadata>,
    pub validation_statuses: HashMap<i32, Metadata>,
    pub person_by_user_id: HashMap<i32, PersonEntity>,
    pub organization_by_id: HashMap<i32, OrganizationEntity>,
    pub collection_items_by_sighting_id: HashMap<i32, Vec<SpeciesCollectionItemEntity>>,
    pub project_by_id: HashMap<i32, ProjectEntity>,
    pub project_parameters_by_sighting_id: HashMap<i32, Vec<ProjectParameterEntity>>,
    pub project_ids_by_sighting_id: HashMap<i32, Vec<i32>>,
}

async fn fetch<T>(what: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
    fut.await.with_context(|| format!("failed to fetch {}", what))
}

impl ReferenceData {
    #[instrument(skip_all)]
    pub async fn fetch(source: &dyn HarvestSource) -> Result<Self> {
        let (
            activities,
            biotopes,
            genders,
            organizations,
            stages,
            substrates,
            units,
            validation_statuses,
            persons,
            organization_entities,
            collection_items,
            projects,
            project_parameters,
            sighting_project_ids,
        ) = tokio::try_join!(
            fetch("activities", source.get_activities()),
            fetch("biotopes", source.get_biotopes()),
            fetch("genders", source.get_genders()),
            fetch("organization metadata", source.get_organization_metadata()),
            fetch("stages", source.get_stages()),
            fetch("substrates", source.get_substrates()),
            fetch("units", source.get_units()),
            fetch("validation statuses", source.get_validation_status()),
            fetch("persons", source.get_persons()),
            fetch("organizations", source.get_organizations()),
            fetch("species collection items", source.get_collection_items()),
            fetch("projects", source.get_projects()),
            fetch("project parameters", source.get_project_parameters()),
            fetch("sighting projects", source.get_sighting_project_ids()),
        )?;

        let mut project_ids_by_sighting_id: HashMap<i32, Vec<i32>> = HashMap::new();
        for link in sighting_project_ids {
            project_ids_by_sighting_id
                .entry(link.sighting_id)
                .or_default()
                .push(link.project_id);
        }

        let reference = Self {
            activities: metadata_by_id(activities.into_iter().map(MetadataRow::from)),
            biotopes: metadata_by_id(biotopes),
            genders: metadata_by_id(genders),
            organizations: metadata_by_id(organizations),
            stages: metadata_by_id(stages),
            substrates: metadata_by_id(substrates),
            units: metadata_by_id(units),
            validation_statuses: metadata_by_id(validation_statuses),
            person_by_user_id: persons.into_iter().map(|p| (p.user_id, p)).collect(),
            organization_by_id: organization_entities
                .into_iter()
                .map(|o| (o.id, o))
                .collect(),
            collection_items_by_sighting_id: group_by(collection_items, |i| i.sighting_id),
            project_by_id: projects.into_iter().map(|p| (p.id, p)).collect(),
            project_parameters_by_sighting_id: group_by(project_parameters, |p| p.sighting_id),
            project_ids_by_sighting_id,
        };
        info!(
            persons = reference.person_by_user_id.len(),
            organizations = reference.organization_by_id.len(),
            projects = reference.project_by_id.len(),
            "reference data loaded"
        );
        Ok(reference)
    }

    /// Collection items for the given sightings, in source order per sighting.
    pub fn collection_items_for(
        &self,
        sighting_ids: &HashSet<i32>,
    ) -> Vec<SpeciesCollectionItemEntity> {
        let mut ids: Vec<_> = sighting_ids.iter().copied().collect();
        ids.sort_unstable();
        ids.iter()
            .filter_map(|id| self.collection_items_by_sighting_id.get(id))
            .flatten()
            .cloned()
            .collect()
    }
}

/// Group translation rows by id, keeping row order within each id.
pub fn metadata_by_id(rows: impl IntoIterator<Item = MetadataRow>) -> HashMap<i32, Metadata> {
    let mut by_id: HashMap<i32, Metadata> = HashMap::new();
    for row in rows {
        by_id
            .entry(row.id)
            .or_insert_with(|| Metadata {
                id: row.id,
                translations: Vec::new(),
            })
            .translations
            .push((row.culture_code, row.translation));
    }
    by_id
}

fn group_by<T>(items: Vec<T>, key: impl Fn(&T) -> i32) -> HashMap<i32, Vec<T>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for item in items {
        grouped.entry(key(&item)).or_default().push(item);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_groups_translations() {
        let rows = vec![
            MetadataRow {
                id: 1,
                culture_code: "sv-SE".into(),
                translation: "Hane".into(),
            },
            MetadataRow {
                id: 2,
                culture_code: "en-GB".into(),
                translation: "Female".into(),
            },
            MetadataRow {
                id: 1,
                culture_code: "en-GB".into(),
                translation: "Male".into(),
            },
        ];
        let by_id = metadata_by_id(rows);
        assert_eq!(by_id.len(), 2);
        assert_eq!(by_id[&1].translate("en-GB"), Some("Male"));
        assert_eq!(by_id[&1].translations.len(), 2);
    }

    #[test]
    fn collection_items_keep_source_order() {
        let item = |sighting_id, collector_id| SpeciesCollectionItemEntity {
            sighting_id,
            collector_id: Some(collector_id),
            ..Default::default()
        };
        let reference = ReferenceData {
            collection_items_by_sighting_id: group_by(
                vec![item(1, 10), item(2, 20), item(1, 11), item(3, 30)],
                |i| i.sighting_id,
            ),
            ..Default::default()
        };
        let ids: HashSet<i32> = [1, 2].into_iter().collect();
        let collectors: Vec<_> = reference
            .collection_items_for(&ids)
            .iter()
            .map(|i| i.collector_id)
            .collect();
        assert_eq!(collectors, vec![Some(10), Some(11), Some(20)]);
    }
}

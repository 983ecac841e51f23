//! Raw sighting plus attribution and reference data into the stored document.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::reference::ReferenceData;
use crate::attribution::PersonSighting;
use crate::source::{Metadata, ProjectParameterEntity, SightingEntity};
use crate::store::Document;
use crate::vocabulary::CULTURE_EN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub id: i32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParameter {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<ProjectParameter>,
}

/// Normalized observation as written to the destination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbatimObservation {
    pub id: i32,
    pub taxon_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    pub not_present: bool,
    pub unsure_determination: bool,
    pub hidden_by_provider: bool,
    pub protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biotope: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substrate: Option<MetadataValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights_holder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

impl Document for VerbatimObservation {
    const COLLECTION: &'static str = "SightingVerbatim";

    fn document_id(&self) -> i64 {
        i64::from(self.id)
    }
}

fn resolve(lookup: &HashMap<i32, Metadata>, id: Option<i32>) -> Option<MetadataValue> {
    let metadata = lookup.get(&id?)?;
    Some(MetadataValue {
        id: metadata.id,
        value: metadata.translate(CULTURE_EN)?.to_string(),
    })
}

/// Projects the sighting was reported in, each with the parameters recorded
/// for this sighting. `None` when there are none.
pub fn resolve_projects(sighting_id: i32, reference: &ReferenceData) -> Option<Vec<Project>> {
    let project_ids = reference.project_ids_by_sighting_id.get(&sighting_id)?;
    let parameters: &[ProjectParameterEntity] = reference
        .project_parameters_by_sighting_id
        .get(&sighting_id)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let projects: Vec<Project> = project_ids
        .iter()
        .filter_map(|id| reference.project_by_id.get(id))
        .map(|project| Project {
            id: project.id,
            name: project.name.clone(),
            owner: project.owner.clone(),
            start_date: project.start_date,
            end_date: project.end_date,
            category: project.category.clone(),
            is_public: project.is_public,
            description: project.description.clone(),
            parameters: parameters
                .iter()
                .filter(|p| p.project_id == project.id)
                .map(|p| ProjectParameter {
                    id: p.id,
                    name: p.name.clone(),
                    description: p.description.clone(),
                    unit: p.unit.clone(),
                    data_type: p.data_type.clone(),
                    value: p.value.clone(),
                })
                .collect(),
        })
        .collect();

    (!projects.is_empty()).then_some(projects)
}

pub fn to_verbatim(
    sighting: &SightingEntity,
    person_sighting: Option<&PersonSighting>,
    reference: &ReferenceData,
) -> VerbatimObservation {
    let rights_holder = sighting.rights_holder.clone().or_else(|| {
        resolve(&reference.organizations, sighting.owner_organization_id).map(|org| org.value)
    });
    let attribution = person_sighting.cloned().unwrap_or_default();

    VerbatimObservation {
        id: sighting.id,
        taxon_id: sighting.taxon_id,
        site_id: sighting.site_id,
        start_date: sighting.start_date,
        end_date: sighting.end_date,
        quantity: sighting.quantity,
        not_present: sighting.not_present,
        unsure_determination: sighting.unsure_determination,
        hidden_by_provider: sighting.hidden_by_provider,
        protected: sighting.protected,
        gender: resolve(&reference.genders, sighting.gender_id),
        stage: resolve(&reference.stages, sighting.stage_id),
        unit: resolve(&reference.units, sighting.unit_id),
        validation_status: resolve(&reference.validation_statuses, sighting.validation_status_id),
        activity: resolve(&reference.activities, sighting.activity_id),
        biotope: resolve(&reference.biotopes, sighting.biotope_id),
        substrate: resolve(&reference.substrates, sighting.substrate_id),
        rights_holder,
        species_collection: attribution.species_collection,
        observers: attribution.observers,
        verified_by: attribution.verified_by,
        reported_by: attribution.reported_by,
        projects: resolve_projects(sighting.id, reference),
    }
}

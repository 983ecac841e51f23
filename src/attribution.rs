//! Per-sighting attribution strings: who observed, reported, verified and
//! collected a sighting.
//!
//! Everything here is a pure function of its inputs. Unresolvable user and
//! organization ids are dropped without error.

use std::collections::{HashMap, HashSet};

use crate::source::model::{
    OrganizationEntity, PersonEntity, SightingRelationEntity, SightingRelationType,
    SpeciesCollectionItemEntity,
};

/// Maximum length, in characters, of the joined observers string.
pub const MAX_OBSERVERS_LENGTH: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonSighting {
    pub species_collection: Option<String>,
    pub observers: Option<String>,
    pub verified_by: Option<String>,
    pub reported_by: Option<String>,
}

/// Inputs for a sighting's verified-by string before it is flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedByData {
    pub determiner_name: Option<String>,
    pub determiner_text: Option<String>,
    pub determiner_year: Option<i32>,
    pub determination_description: Option<String>,
    pub confirmator_name: Option<String>,
    pub confirmator_text: Option<String>,
    pub confirmator_year: Option<i32>,
}

impl VerifiedByData {
    pub fn to_verified_by(&self) -> Option<String> {
        concatenate_verified_by(
            self.determiner_name.as_deref(),
            self.determiner_text.as_deref(),
            self.determiner_year,
            self.determination_description.as_deref(),
            self.confirmator_name.as_deref(),
            self.confirmator_text.as_deref(),
            self.confirmator_year,
        )
    }
}

/// Compute attribution for every sighting in `sighting_ids`.
///
/// Sightings without any attribution get no entry.
pub fn compute_attribution(
    sighting_ids: &HashSet<i32>,
    person_by_user_id: &HashMap<i32, PersonEntity>,
    organization_by_id: &HashMap<i32, OrganizationEntity>,
    collection_items: &[SpeciesCollectionItemEntity],
    relations: &[SightingRelationEntity],
) -> HashMap<i32, PersonSighting> {
    let mut result: HashMap<i32, PersonSighting> = HashMap::new();

    for (id, value) in species_collection_by_sighting_id(
        sighting_ids,
        person_by_user_id,
        organization_by_id,
        collection_items,
    ) {
        result.entry(id).or_default().species_collection = Some(value);
    }

    for (id, value) in observers_by_sighting_id(relations, person_by_user_id) {
        if sighting_ids.contains(&id) {
            result.entry(id).or_default().observers = Some(value);
        }
    }

    for (id, value) in verified_by_sighting_id(relations, person_by_user_id, collection_items) {
        if sighting_ids.contains(&id) {
            result.entry(id).or_default().verified_by = Some(value);
        }
    }

    for (id, value) in reported_by_sighting_id(relations, person_by_user_id) {
        if sighting_ids.contains(&id) {
            result.entry(id).or_default().reported_by = Some(value);
        }
    }

    for person_sighting in result.values_mut() {
        let observers_missing = person_sighting
            .observers
            .as_deref()
            .map_or(true, str::is_empty);
        if observers_missing {
            if let Some(reported_by) = person_sighting
                .reported_by
                .as_deref()
                .filter(|s| !s.is_empty())
            {
                person_sighting.observers = Some(format!("Via {}", reported_by));
            }
        }
    }

    result
}

/// Collector name, or owning organization name when the collector is
/// unknown. Later items for the same sighting replace earlier ones.
pub fn species_collection_by_sighting_id(
    sighting_ids: &HashSet<i32>,
    person_by_user_id: &HashMap<i32, PersonEntity>,
    organization_by_id: &HashMap<i32, OrganizationEntity>,
    collection_items: &[SpeciesCollectionItemEntity],
) -> HashMap<i32, String> {
    let mut by_sighting = HashMap::new();
    for item in collection_items
        .iter()
        .filter(|item| sighting_ids.contains(&item.sighting_id))
    {
        let collector = item
            .collector_id
            .and_then(|id| person_by_user_id.get(&id))
            .map(|person| person.full_name.clone());
        let name = collector.or_else(|| {
            item.organization_id
                .and_then(|id| organization_by_id.get(&id))
                .map(|org| org.name.clone())
        });
        if let Some(name) = name {
            by_sighting.insert(item.sighting_id, name);
        }
    }
    by_sighting
}

/// Public observers joined with `", "` in input order, cut at
/// [`MAX_OBSERVERS_LENGTH`] characters.
pub fn observers_by_sighting_id(
    relations: &[SightingRelationEntity],
    person_by_user_id: &HashMap<i32, PersonEntity>,
) -> HashMap<i32, String> {
    let mut names_by_sighting: HashMap<i32, Vec<&str>> = HashMap::new();
    for relation in relations
        .iter()
        .filter(|r| r.relation_type == SightingRelationType::Observer && r.is_public)
    {
        let names = names_by_sighting.entry(relation.sighting_id).or_default();
        if let Some(person) = person_by_user_id.get(&relation.user_id) {
            names.push(person.full_name.as_str());
        }
    }

    names_by_sighting
        .into_iter()
        .map(|(id, names)| (id, truncate(&names.join(", "), MAX_OBSERVERS_LENGTH)))
        .collect()
}

/// First resolvable public reporter per sighting.
pub fn reported_by_sighting_id(
    relations: &[SightingRelationEntity],
    person_by_user_id: &HashMap<i32, PersonEntity>,
) -> HashMap<i32, String> {
    let mut by_sighting = HashMap::new();
    for relation in relations
        .iter()
        .filter(|r| r.relation_type == SightingRelationType::Reporter && r.is_public)
    {
        if let Some(person) = person_by_user_id.get(&relation.user_id) {
            by_sighting
                .entry(relation.sighting_id)
                .or_insert_with(|| person.full_name.clone());
        }
    }
    by_sighting
}

/// Flattened verified-by strings. Collection items are applied last and
/// always overwrite determiner/confirmator text, year and description.
pub fn verified_by_sighting_id(
    relations: &[SightingRelationEntity],
    person_by_user_id: &HashMap<i32, PersonEntity>,
    collection_items: &[SpeciesCollectionItemEntity],
) -> HashMap<i32, String> {
    let mut data_by_sighting: HashMap<i32, VerifiedByData> = HashMap::new();

    for relation in relations.iter().filter(|r| r.is_public && r.sort == 0) {
        let Some(person) = person_by_user_id.get(&relation.user_id) else {
            continue;
        };
        match relation.relation_type {
            SightingRelationType::Determiner => {
                let data = data_by_sighting.entry(relation.sighting_id).or_default();
                data.determiner_name = Some(person.full_name.clone());
                data.determiner_year = relation.determination_year;
            }
            SightingRelationType::Confirmator => {
                let data = data_by_sighting.entry(relation.sighting_id).or_default();
                data.confirmator_name = Some(person.full_name.clone());
                data.confirmator_year = relation.determination_year;
            }
            _ => {}
        }
    }

    for item in collection_items {
        let data = data_by_sighting.entry(item.sighting_id).or_default();
        data.determiner_text = item.determiner_text.clone();
        data.determiner_year = item.determiner_year;
        data.determination_description = item.description.clone();
        data.confirmator_text = item.confirmator_text.clone();
        data.confirmator_year = item.confirmator_year;
    }

    data_by_sighting
        .into_iter()
        .filter_map(|(id, data)| data.to_verified_by().map(|s| (id, s)))
        .collect()
}

/// Build the human readable verified-by string, or `None` when every part is
/// empty.
///
/// Determiner parts are space separated, the determination description
/// follows after `" # "`, and confirmator parts follow after `"Conf."`.
pub fn concatenate_verified_by(
    determiner_name: Option<&str>,
    determiner_text: Option<&str>,
    determiner_year: Option<i32>,
    determination_description: Option<&str>,
    confirmator_name: Option<&str>,
    confirmator_text: Option<&str>,
    confirmator_year: Option<i32>,
) -> Option<String> {
    let mut out = String::new();
    let determiner_year = determiner_year.map(|y| y.to_string());
    for part in [
        present(determiner_name),
        present(determiner_text),
        determiner_year.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    }

    if let Some(description) = present(determination_description) {
        if !out.is_empty() {
            out.push_str(" # ");
        }
        out.push_str(description);
    }

    let confirmator_name = present(confirmator_name);
    let confirmator_text = present(confirmator_text);
    if confirmator_name.is_some() || confirmator_text.is_some() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str("Conf.");
        let confirmator_year = confirmator_year.map(|y| y.to_string());
        for part in [confirmator_name, confirmator_text, confirmator_year.as_deref()]
            .into_iter()
            .flatten()
        {
            out.push(' ');
            out.push_str(part);
        }
    }

    (!out.is_empty()).then_some(out)
}

fn present(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(user_id: i32, name: &str) -> (i32, PersonEntity) {
        (
            user_id,
            PersonEntity {
                id: user_id + 1000,
                user_id,
                full_name: name.to_string(),
            },
        )
    }

    fn relation(
        sighting_id: i32,
        user_id: i32,
        relation_type: SightingRelationType,
    ) -> SightingRelationEntity {
        SightingRelationEntity {
            sighting_id,
            user_id,
            relation_type,
            sort: 0,
            is_public: true,
            determination_year: None,
        }
    }

    fn persons() -> HashMap<i32, PersonEntity> {
        [
            person(1, "Alice Ek"),
            person(2, "Bo Ask"),
            person(3, "Cecilia Al"),
        ]
        .into_iter()
        .collect()
    }

    fn orgs() -> HashMap<i32, OrganizationEntity> {
        [(
            9,
            OrganizationEntity {
                id: 9,
                name: "Naturhistoriska riksmuseet".into(),
            },
        )]
        .into_iter()
        .collect()
    }

    fn ids(ids: &[i32]) -> HashSet<i32> {
        ids.iter().copied().collect()
    }

    #[test]
    fn verified_by_composition_law() {
        assert_eq!(
            concatenate_verified_by(None, None, None, None, None, None, None),
            None
        );
        assert_eq!(
            concatenate_verified_by(Some("Alice"), None, None, None, None, None, None),
            Some("Alice".into())
        );
        assert_eq!(
            concatenate_verified_by(Some("Alice"), None, None, None, Some("Bob"), None, None),
            Some("Alice Conf. Bob".into())
        );
    }

    #[test]
    fn verified_by_full_composition() {
        assert_eq!(
            concatenate_verified_by(
                Some("Alice"),
                Some("det. genitalia"),
                Some(2019),
                Some("Museum specimen"),
                Some("Bob"),
                Some("conf. DNA"),
                Some(2020),
            ),
            Some("Alice det. genitalia 2019 # Museum specimen Conf. Bob conf. DNA 2020".into())
        );
        assert_eq!(
            concatenate_verified_by(None, None, None, None, None, Some("by photo"), Some(2021)),
            Some("Conf. by photo 2021".into())
        );
        assert_eq!(
            concatenate_verified_by(None, None, None, Some("Museum"), None, None, None),
            Some("Museum".into())
        );
        // A confirmator year alone is not enough to add a confirmation part.
        assert_eq!(
            concatenate_verified_by(None, Some("  "), None, None, None, None, Some(2020)),
            None
        );
    }

    #[test]
    fn observers_are_joined_in_input_order_and_truncated() {
        let persons = persons();
        let relations = vec![
            relation(1, 2, SightingRelationType::Observer),
            relation(1, 99, SightingRelationType::Observer),
            relation(1, 1, SightingRelationType::Observer),
        ];
        let observers = observers_by_sighting_id(&relations, &persons);
        assert_eq!(observers.get(&1).map(String::as_str), Some("Bo Ask, Alice Ek"));

        let long_name = "Å".repeat(200);
        let persons: HashMap<i32, PersonEntity> =
            [person(1, &long_name), person(2, &long_name)].into_iter().collect();
        let relations = vec![
            relation(5, 1, SightingRelationType::Observer),
            relation(5, 2, SightingRelationType::Observer),
        ];
        let observers = observers_by_sighting_id(&relations, &persons);
        let value = observers.get(&5).unwrap();
        assert_eq!(value.chars().count(), MAX_OBSERVERS_LENGTH);
        assert!(value.starts_with(&long_name));
    }

    #[test]
    fn private_relations_are_ignored() {
        let mut hidden = relation(1, 1, SightingRelationType::Observer);
        hidden.is_public = false;
        let mut hidden_reporter = relation(1, 2, SightingRelationType::Reporter);
        hidden_reporter.is_public = false;
        let result = compute_attribution(
            &ids(&[1]),
            &persons(),
            &orgs(),
            &[],
            &[hidden, hidden_reporter],
        );
        assert!(result.get(&1).is_none());
    }

    #[test]
    fn reported_by_is_first_wins_and_species_collection_last_wins() {
        let relations = vec![
            relation(1, 99, SightingRelationType::Reporter),
            relation(1, 2, SightingRelationType::Reporter),
            relation(1, 3, SightingRelationType::Reporter),
        ];
        let reported = reported_by_sighting_id(&relations, &persons());
        assert_eq!(reported.get(&1).map(String::as_str), Some("Bo Ask"));

        let items = vec![
            SpeciesCollectionItemEntity {
                sighting_id: 1,
                collector_id: Some(1),
                ..Default::default()
            },
            SpeciesCollectionItemEntity {
                sighting_id: 1,
                collector_id: Some(404),
                organization_id: Some(9),
                ..Default::default()
            },
            SpeciesCollectionItemEntity {
                sighting_id: 1,
                collector_id: Some(404),
                ..Default::default()
            },
        ];
        let collected = species_collection_by_sighting_id(&ids(&[1]), &persons(), &orgs(), &items);
        assert_eq!(
            collected.get(&1).map(String::as_str),
            Some("Naturhistoriska riksmuseet")
        );
    }

    #[test]
    fn collection_items_overwrite_relation_years() {
        let mut determiner = relation(4, 1, SightingRelationType::Determiner);
        determiner.determination_year = Some(2015);
        let mut secondary = relation(4, 3, SightingRelationType::Determiner);
        secondary.sort = 1;
        let mut confirmator = relation(4, 2, SightingRelationType::Confirmator);
        confirmator.determination_year = Some(2016);

        let relations = vec![determiner, secondary, confirmator];
        let without_items = verified_by_sighting_id(&relations, &persons(), &[]);
        assert_eq!(
            without_items.get(&4).map(String::as_str),
            Some("Alice Ek 2015 Conf. Bo Ask 2016")
        );

        let items = vec![SpeciesCollectionItemEntity {
            sighting_id: 4,
            determiner_text: Some("det. mikroskop".into()),
            ..Default::default()
        }];
        let with_items = verified_by_sighting_id(&relations, &persons(), &items);
        assert_eq!(
            with_items.get(&4).map(String::as_str),
            Some("Alice Ek det. mikroskop Conf. Bo Ask")
        );
    }

    #[test]
    fn backfills_observers_from_reporter() {
        let relations = vec![
            relation(1, 2, SightingRelationType::Reporter),
            relation(2, 3, SightingRelationType::Reporter),
            relation(2, 1, SightingRelationType::Observer),
        ];
        let result = compute_attribution(&ids(&[1, 2]), &persons(), &orgs(), &[], &relations);

        let first = result.get(&1).unwrap();
        assert_eq!(first.reported_by.as_deref(), Some("Bo Ask"));
        assert_eq!(first.observers.as_deref(), Some("Via Bo Ask"));

        let second = result.get(&2).unwrap();
        assert_eq!(second.observers.as_deref(), Some("Alice Ek"));
        assert_eq!(second.reported_by.as_deref(), Some("Cecilia Al"));
    }

    #[test]
    fn unresolvable_observers_leave_an_empty_string_that_is_backfilled() {
        let relations = vec![
            relation(1, 404, SightingRelationType::Observer),
            relation(1, 2, SightingRelationType::Reporter),
        ];
        let result = compute_attribution(&ids(&[1]), &persons(), &orgs(), &[], &relations);
        assert_eq!(result[&1].observers.as_deref(), Some("Via Bo Ask"));
    }

    #[test]
    fn results_are_scoped_to_sighting_ids() {
        let relations = vec![
            relation(1, 1, SightingRelationType::Observer),
            relation(2, 2, SightingRelationType::Observer),
        ];
        let items = vec![SpeciesCollectionItemEntity {
            sighting_id: 3,
            collector_id: Some(3),
            determiner_text: Some("det.".into()),
            ..Default::default()
        }];
        let result = compute_attribution(&ids(&[1]), &persons(), &orgs(), &items, &relations);
        assert_eq!(result.len(), 1);
        assert!(result.contains_key(&1));
    }

    #[test]
    fn compute_attribution_is_deterministic() {
        let mut determiner = relation(7, 3, SightingRelationType::Determiner);
        determiner.determination_year = Some(2001);
        let relations = vec![
            relation(7, 1, SightingRelationType::Observer),
            relation(7, 2, SightingRelationType::Observer),
            relation(7, 2, SightingRelationType::Reporter),
            determiner,
            relation(8, 1, SightingRelationType::Reporter),
        ];
        let items = vec![SpeciesCollectionItemEntity {
            sighting_id: 8,
            organization_id: Some(9),
            description: Some("Skinn".into()),
            ..Default::default()
        }];
        let first = compute_attribution(&ids(&[7, 8]), &persons(), &orgs(), &items, &relations);
        let second = compute_attribution(&ids(&[7, 8]), &persons(), &orgs(), &items, &relations);
        assert_eq!(first, second);
        assert_eq!(first[&7].observers.as_deref(), Some("Alice Ek, Bo Ask"));
        assert_eq!(first[&7].verified_by.as_deref(), Some("Cecilia Al 2001"));
        assert_eq!(
            first[&8],
            PersonSighting {
                species_collection: Some("Naturhistoriska riksmuseet".into()),
                observers: Some("Via Alice Ek".into()),
                verified_by: Some("Skinn".into()),
                reported_by: Some("Alice Ek".into()),
            }
        );
    }
}

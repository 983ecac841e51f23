use std::sync::Arc;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use species_harvest::config::HarvestOptions;
use species_harvest::db;
use species_harvest::harvest::{SightingHarvester, VerbatimObservation};
use species_harvest::model::{DataProvider, RunStatus};
use species_harvest::source::SpeciesPortalSource;
use species_harvest::store::{self, SqliteCollection};
use species_harvest::vocabulary::{harvest_vocabularies, Vocabulary};

async fn seed_source(pool: &db::Pool) {
    sqlx::migrate!("./tests/fixtures/species_portal")
        .run(pool)
        .await
        .unwrap();

    for id in 1..=5 {
        sqlx::query(
            "INSERT INTO sighting (id, taxon_id, quantity, gender_id, owner_organization_id) VALUES (?, 100024, ?, 2, 9)",
        )
        .bind(id)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO sighting_state (sighting_id, sighting_state_type_id) VALUES (?, 30)")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }
    // Unpublished sightings never reach the destination.
    sqlx::query("UPDATE sighting SET is_published = 0 WHERE id = 4")
        .execute(pool)
        .await
        .unwrap();

    for stmt in [
        "INSERT INTO person (id, user_id, first_name, last_name) VALUES (1, 10, 'Anna', 'Berg')",
        "INSERT INTO person (id, user_id, first_name, last_name) VALUES (2, 11, 'Bo', 'Ask')",
        "INSERT INTO organization (id, name) VALUES (9, 'Artdatabanken')",
        "INSERT INTO sighting_relation (sighting_id, user_id, sighting_relation_type_id) VALUES (1, 10, 1)",
        "INSERT INTO sighting_relation (sighting_id, user_id, sighting_relation_type_id) VALUES (1, 11, 1)",
        "INSERT INTO sighting_relation (sighting_id, user_id, sighting_relation_type_id) VALUES (2, 11, 2)",
        "INSERT INTO sighting_relation (sighting_id, user_id, sighting_relation_type_id, determination_year) VALUES (3, 10, 3, 2020)",
        "INSERT INTO species_collection_item (sighting_id, organization_id, description) VALUES (5, 9, 'Museum')",
        "INSERT INTO metadata_translation (table_name, id, culture_code, translation) VALUES ('Gender', 2, 'sv-SE', 'Hona')",
        "INSERT INTO metadata_translation (table_name, id, culture_code, translation) VALUES ('Gender', 2, 'en-GB', 'Female')",
        "INSERT INTO metadata_translation (table_name, id, culture_code, translation) VALUES ('Organization', 9, 'sv-SE', 'Artdatabanken')",
        "INSERT INTO metadata_translation (table_name, id, culture_code, translation) VALUES ('Organization', 9, 'en-GB', 'Swedish Species Information Centre')",
    ] {
        sqlx::query(stmt).execute(pool).await.unwrap();
    }
}

#[tokio::test]
async fn harvest_from_sqlite_source_into_sqlite_destination() {
    let td = tempdir().unwrap();
    let source_url = format!("sqlite://{}", td.path().join("source.db").display());
    let destination_url = format!("sqlite://{}", td.path().join("out").join("dest.db").display());

    let source_pool = db::connect(&source_url).await.unwrap();
    seed_source(&source_pool).await;
    let destination_pool = db::connect(&destination_url).await.unwrap();
    db::run_migrations(&destination_pool).await.unwrap();

    let observations = SqliteCollection::<VerbatimObservation>::new(destination_pool.clone());
    let harvester = SightingHarvester::new(
        DataProvider::SpeciesPortal,
        HarvestOptions {
            chunk_size: 2,
            no_of_threads: 2,
            max_number_of_sightings_harvested: None,
        },
        Arc::new(SpeciesPortalSource::new(source_pool.clone())),
        Arc::new(observations.clone()),
    );

    let info = harvester.harvest(CancellationToken::new()).await;
    assert_eq!(info.status, Some(RunStatus::Success));
    assert_eq!(info.count, 4);
    assert_eq!(observations.count().await.unwrap(), 4);
    assert!(observations.get(4).await.unwrap().is_none());

    let first = observations.get(1).await.unwrap().unwrap();
    assert_eq!(first["observers"], "Anna Berg, Bo Ask");
    assert_eq!(first["gender"]["value"], "Female");
    assert_eq!(first["rightsHolder"], "Swedish Species Information Centre");

    let second = observations.get(2).await.unwrap().unwrap();
    assert_eq!(second["observers"], "Via Bo Ask");

    let third = observations.get(3).await.unwrap().unwrap();
    assert_eq!(third["verifiedBy"], "Anna Berg 2020");
    assert!(third.get("observers").is_none());

    let fifth = observations.get(5).await.unwrap().unwrap();
    assert_eq!(fifth["speciesCollection"], "Artdatabanken");
    assert_eq!(fifth["verifiedBy"], "Museum");

    store::save_harvest_info(&destination_pool, &info).await.unwrap();
    let stored = store::get_harvest_info(&destination_pool, "SightingVerbatim")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, Some(RunStatus::Success));
    assert_eq!(stored.count, 4);

    // A second run replaces rather than appends.
    let again = harvester.harvest(CancellationToken::new()).await;
    assert_eq!(again.status, Some(RunStatus::Success));
    assert_eq!(observations.count().await.unwrap(), 4);
}

#[tokio::test]
async fn vocabularies_from_sqlite_source() {
    let td = tempdir().unwrap();
    let source_pool = db::connect(&format!("sqlite://{}", td.path().join("source.db").display()))
        .await
        .unwrap();
    seed_source(&source_pool).await;
    let destination_pool = db::connect(&format!("sqlite://{}", td.path().join("dest.db").display()))
        .await
        .unwrap();
    db::run_migrations(&destination_pool).await.unwrap();

    let source = SpeciesPortalSource::new(source_pool);
    let vocabularies = SqliteCollection::<Vocabulary>::new(destination_pool);
    let info = harvest_vocabularies(
        &source,
        &vocabularies,
        DataProvider::SpeciesPortal,
        &CancellationToken::new(),
    )
    .await;

    // Sex, Institution and the five static vocabularies.
    assert_eq!(info.status, Some(RunStatus::Success));
    assert_eq!(info.count, 7);
    assert_eq!(vocabularies.count().await.unwrap(), 7);

    let sex = vocabularies.get(3).await.unwrap().unwrap();
    assert_eq!(sex["name"], "Sex");
    assert_eq!(sex["values"][0]["value"], "Female");
    assert_eq!(sex["externalSystemMappings"][0]["id"], "Artportalen");
}

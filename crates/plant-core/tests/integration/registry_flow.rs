//! Integration Tests: Device Registry Flow
//!
//! - Register, list and remove devices
//! - Duplicate id rejection
//! - Persistence across a reopened SQLite database
//! - Records written by older app versions

use plant_core::core::{DeviceRegistry, KeyValueStore, MemoryStore, SqliteStore};
use plant_core::models::{DeviceRecord, NewDevice};
use plant_core::{Error, PlantConfig};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

const KEY: &str = "@SmartPlantApp:plants";

fn fern() -> DeviceRecord {
    DeviceRecord {
        name: "Fern".to_string(),
        id: "101".to_string(),
        server_address: "192.168.0.5:5000".to_string(),
        initial_moisture: 5,
        initial_light: 5,
    }
}

fn device(id: &str) -> DeviceRecord {
    DeviceRecord {
        name: format!("Plant {}", id),
        id: id.to_string(),
        server_address: "10.0.0.2".to_string(),
        initial_moisture: 3,
        initial_light: 7,
    }
}

fn sqlite_registry(dir: &TempDir) -> DeviceRegistry<SqliteStore> {
    let store = SqliteStore::open(&dir.path().join("plants.db")).expect("Failed to open store");
    DeviceRegistry::new(store, KEY)
}

/// Test: register Fern, list it, remove it, list is empty
#[test]
fn test_fern_scenario() {
    super::init_tracing();
    let registry = DeviceRegistry::new(MemoryStore::new(), KEY);

    registry.add(fern()).expect("Failed to add Fern");
    assert_eq!(registry.list(), vec![fern()]);

    registry.remove("101").expect("Failed to remove Fern");
    assert_eq!(registry.list(), Vec::<DeviceRecord>::new());
}

/// Test: a duplicate id leaves the registry untouched
#[test]
fn test_duplicate_id_leaves_registry_unchanged() {
    let registry = DeviceRegistry::new(MemoryStore::new(), KEY);
    registry.add(fern()).unwrap();
    registry.add(device("202")).unwrap();
    let before = registry.list();

    let mut impostor = device("101");
    impostor.name = "Cactus".to_string();
    let result = registry.add(impostor);

    assert_eq!(result, Err(Error::DuplicateId("101".to_string())));
    assert_eq!(registry.list(), before);
}

/// Test: ids stay unique across any add/remove sequence
#[test]
fn test_ids_stay_unique() {
    let registry = DeviceRegistry::new(MemoryStore::new(), KEY);
    let ops = ["1", "2", "1", "-1", "3", "2", "1", "-2", "2", "-9", "3"];

    for op in ops {
        match op.strip_prefix('-') {
            Some(id) => registry.remove(id).unwrap(),
            None => {
                let _ = registry.add(device(op));
            }
        }

        let records = registry.list();
        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), records.len(), "duplicate id after {:?}", op);
    }

    let ids: Vec<_> = registry.list().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["3", "1", "2"]);
}

/// Test: removing an unknown id is a no-op
#[test]
fn test_remove_unknown_id() {
    let registry = DeviceRegistry::new(MemoryStore::new(), KEY);
    registry.add(fern()).unwrap();

    registry.remove("999").expect("remove of unknown id must not fail");
    assert_eq!(registry.list(), vec![fern()]);
}

/// Test: records survive closing and reopening the database
#[test]
fn test_sqlite_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    {
        let registry = sqlite_registry(&dir);
        registry.add(fern()).unwrap();
        registry.add(device("202")).unwrap();
    }

    let registry = sqlite_registry(&dir);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get("101"), Some(fern()));
    assert_eq!(registry.list()[1], device("202"));
}

/// Test: registries sharing one store see each other's writes
#[test]
fn test_shared_store() {
    let store = Arc::new(MemoryStore::new());
    let writer = DeviceRegistry::new(store.clone(), KEY);
    let reader = DeviceRegistry::new(store, KEY);

    writer.add(fern()).unwrap();
    assert_eq!(reader.get("101"), Some(fern()));
}

/// Test: blobs written with the old field names still load
#[test]
fn test_legacy_blob_loads() {
    let store = MemoryStore::new();
    store
        .set(
            KEY,
            r#"[{"name":"Basil","portNumber":"7","flaskServerIp":"192.168.1.20","initialMoisture":4,"initialLight":6}]"#,
        )
        .unwrap();
    let registry = DeviceRegistry::new(store, KEY);

    let basil = registry.get("7").expect("legacy record missing");
    assert_eq!(basil.server_address, "192.168.1.20");
    assert_eq!(basil.address(5000).unwrap().to_string(), "192.168.1.20:5000");

    // Rewritten with current field names.
    registry.add(device("8")).unwrap();
    assert_eq!(registry.len(), 2);
}

/// Test: a corrupt blob reads as empty and is replaced by the next write
#[test]
fn test_corrupt_blob_recovers_on_write() {
    let store = Arc::new(MemoryStore::new());
    store.set(KEY, "[{\"name\":").unwrap();
    let registry = DeviceRegistry::new(store.clone(), KEY);

    assert!(registry.is_empty());
    registry.add(fern()).unwrap();

    let raw = store.get(KEY).unwrap().unwrap();
    let stored: Vec<DeviceRecord> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, vec![fern()]);
}

/// Test: the add form feeds the registry
#[test]
fn test_form_to_registry() {
    let config = PlantConfig::default();
    let registry = DeviceRegistry::new(MemoryStore::new(), config.registry_key.clone());

    let form = NewDevice {
        name: " Fern ".to_string(),
        id: "101".to_string(),
        server_address: "192.168.0.5:5000".to_string(),
        initial_moisture: "5".to_string(),
        initial_light: "5".to_string(),
    };
    registry.add(form.validate().unwrap()).unwrap();

    assert_eq!(registry.list(), vec![fern()]);
    assert_eq!(registry.key(), "@SmartPlantApp:plants");
}

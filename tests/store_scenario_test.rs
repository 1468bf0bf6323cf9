//! Store behaviour against real files on disk.

use std::path::PathBuf;

use rackledger::resource::{Network, Server, Service, SystemResource};
use rackledger::{Kind, Resource, ResourceStore, StoreError};
use tempfile::TempDir;

fn read(path: &PathBuf) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_add_update_delete_round_trip_on_disk() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.yaml");
    std::fs::write(&config, "").unwrap();

    let store = ResourceStore::new();
    store.load_files([&config]).unwrap();
    store
        .add(Resource::Service(Service::named("immich")), &config)
        .unwrap();
    store.save_all().unwrap();

    let yaml: serde_yaml::Value = serde_yaml::from_str(&read(&config)).unwrap();
    let resources = yaml["resources"].as_sequence().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["kind"].as_str(), Some("Service"));
    assert_eq!(resources[0]["name"].as_str(), Some("immich"));

    let mut service = Service::named("IMMICH");
    service.network = Some(Network {
        ip: Some("192.168.10.14".to_string()),
        port: Some(80),
        ..Network::default()
    });
    store.update(Resource::Service(service)).unwrap();
    store.save_all().unwrap();

    let yaml: serde_yaml::Value = serde_yaml::from_str(&read(&config)).unwrap();
    let immich = &yaml["resources"][0];
    assert_eq!(immich["network"]["ip"].as_str(), Some("192.168.10.14"));
    assert_eq!(immich["network"]["port"].as_u64(), Some(80));

    store.delete("immich").unwrap();
    store.save_all().unwrap();
    assert_eq!(read(&config).trim(), "resources: []");
}

#[test]
fn test_each_file_keeps_its_own_records() {
    let temp = TempDir::new().unwrap();
    let hardware = temp.path().join("hardware.yaml");
    let systems = temp.path().join("systems.yaml");
    std::fs::write(
        &hardware,
        "resources:\n- kind: Server\n  name: srv01\n- kind: Switch\n  name: core-sw\n",
    )
    .unwrap();
    std::fs::write(
        &systems,
        "resources:\n- kind: System\n  name: proxmox01\n  runsOn: srv01\n",
    )
    .unwrap();

    let store = ResourceStore::new();
    assert_eq!(store.load_files([&hardware, &systems]).unwrap(), 3);

    store
        .add(Resource::System(SystemResource::named("truenas")), &systems)
        .unwrap();
    store.save_all().unwrap();

    let reloaded = ResourceStore::new();
    reloaded.load_files([&hardware, &systems]).unwrap();
    assert_eq!(reloaded.len(), 4);
    assert_eq!(reloaded.get_entry("truenas").unwrap().file, systems);
    assert_eq!(reloaded.get_entry("core-sw").unwrap().file, hardware);
    assert_eq!(reloaded.systems_on_host("SRV01").len(), 1);
    assert_eq!(reloaded.by_kind(Kind::Switch).len(), 1);

    // An edit elsewhere replaces that file's records rather than merging.
    std::fs::write(&hardware, "resources:\n- kind: Router\n  name: edge\n").unwrap();
    assert_eq!(reloaded.reload_file(&hardware).unwrap(), 1);
    assert!(!reloaded.contains("srv01"));
    assert!(reloaded.contains("edge"));
    assert!(reloaded.contains("proxmox01"));
}

#[test]
fn test_names_are_unique_across_files() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.yaml");
    let b = temp.path().join("b.yaml");
    std::fs::write(&a, "resources:\n- kind: Server\n  name: srv01\n").unwrap();
    std::fs::write(&b, "resources:\n- kind: Desktop\n  name: SRV01\n").unwrap();

    let store = ResourceStore::new();
    store.load_files([&a]).unwrap();
    let err = store.load_files([&b]).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { .. }));
    assert_eq!(store.len(), 1);

    let err = store
        .add(Resource::Server(Server::named("Srv01")), &b)
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName { ref file, .. } if *file == a));
}

#[test]
fn test_unknown_kind_leaves_store_and_file_alone() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("config.yaml");
    std::fs::write(&file, "resources:\n- kind: Server\n  name: srv01\n").unwrap();

    let store = ResourceStore::new();
    store.load_files([&file]).unwrap();

    let broken = "resources:\n- kind: Server\n  name: srv02\n- kind: Toaster\n  name: t\n";
    std::fs::write(&file, broken).unwrap();
    assert!(matches!(
        store.reload_file(&file),
        Err(StoreError::Codec { .. })
    ));
    assert!(store.contains("srv01"));
    assert!(!store.contains("srv02"));
}

#[test]
fn test_elements_without_kind_are_skipped() {
    let store = ResourceStore::new();
    let loaded = store
        .load(
            "resources:\n- name: orphan\n- kind: ups\n  name: ups01\n  va: 1500\n",
            "power.yaml",
        )
        .unwrap();
    assert_eq!(loaded, 1);
    assert_eq!(store.get_by_name("UPS01").unwrap().kind(), Kind::Ups);
    assert!(!store.contains("orphan"));
}

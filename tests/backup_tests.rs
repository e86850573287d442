// Backup store: file layout, persistence and contract artifacts
use std::fs;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use minibiz::backup::{slugify, BackupStore};
use minibiz::business::Business;
use minibiz::crypto::KdfParams;
use minibiz::identity::Identity;
use minibiz::product::example_products;
use minibiz::Error;
use tempfile::TempDir;
use zeroize::Zeroizing;

fn business(name: &str) -> Business {
    let kdf = KdfParams::new(1024, 1);
    let governor = Identity::create("governor", "governor", Zeroizing::new("pw".into()), kdf).unwrap();
    let cto = Identity::create("Ada Lovelace", "ada", Zeroizing::new("ada-pw".into()), kdf).unwrap();
    Business::new(name, governor, vec![cto], example_products(), false).unwrap()
}

#[test]
fn missing_root_fails_immediately() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nowhere");
    match BackupStore::open(&missing, "Acme") {
        Err(Error::Storage { path, .. }) => assert_eq!(path, missing),
        Err(other) => panic!("unexpected error {other:?}"),
        Ok(_) => panic!("opening under a missing directory must fail"),
    }
}

#[test]
fn save_without_business_is_a_misconfiguration() {
    let tmp = TempDir::new().unwrap();
    let store = BackupStore::open(tmp.path(), "Acme").unwrap();
    assert!(!store.exists());
    match store.save() {
        Err(Error::Configuration(msg)) => assert_eq!(msg, "digital business misconfiguration"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn business_round_trips_through_the_backup_file() {
    let tmp = TempDir::new().unwrap();
    let mut store = BackupStore::open(tmp.path(), "My Coffee Shop.json").unwrap();
    assert_eq!(store.file_path(), tmp.path().join("my-coffee-shop.json"));
    assert_eq!(store.contracts_path(), tmp.path().join("my-coffee-shop-contracts"));

    let original = business("My Coffee Shop");
    store.set_business(original.clone());
    let path = store.save().unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    let reopened = BackupStore::open(tmp.path(), "My Coffee Shop").unwrap();
    assert!(reopened.exists());
    let restored = reopened.business().expect("business loaded from backup");
    assert_eq!(restored, &original);
    restored.unlock_governor("pw").unwrap();
    restored.find_identity("Ada Lovelace").unwrap().unlock("ada-pw", None).unwrap();
}

#[test]
fn corrupt_backup_is_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("acme.json"), "{ not json").unwrap();
    assert!(matches!(BackupStore::open(tmp.path(), "Acme"), Err(Error::Serialization(_))));
}

#[test]
fn artifacts_are_written_once() {
    let tmp = TempDir::new().unwrap();
    let store = BackupStore::open(tmp.path(), "Acme").unwrap();
    let first = format!("data:image/png;base64,{}", B64.encode(b"first image"));
    let second = format!("data:image/png;base64,{}", B64.encode(b"second image"));

    let name = format!("Reward-{}", slugify("Ada Lovelace"));
    let path = store.save_artifact(&name, &first).unwrap();
    assert_eq!(path, tmp.path().join("acme-contracts").join("Reward-ada-lovelace.png"));
    assert_eq!(fs::read(&path).unwrap(), b"first image");

    let again = store.save_artifact(&name, &second).unwrap();
    assert_eq!(again, path);
    assert_eq!(fs::read(&path).unwrap(), b"first image");
}

#[test]
fn invalid_artifact_data_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = BackupStore::open(tmp.path(), "Acme").unwrap();
    let err = store.save_artifact("Broken", "data:image/png;base64,@@@").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(!store.artifact_path("Broken").exists());
}

use super::*;

#[tokio::test]
async fn put_get_and_overwrite() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(storage.get("history").await.expect("get"), None);

    storage.put("history", "[]").await.expect("put");
    storage.put("history", "[1]").await.expect("overwrite");
    assert_eq!(
        storage.get("history").await.expect("get").as_deref(),
        Some("[1]")
    );
}

#[tokio::test]
async fn delete_reports_presence() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.put("history", "[]").await.expect("put");

    assert!(storage.delete("history").await.expect("delete"));
    assert!(!storage.delete("history").await.expect("second delete"));
    assert_eq!(storage.get("history").await.expect("get"), None);
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = sqlite_url_for_path(&db_path);

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn memory_store_behaves_like_sqlite_store() {
    let store = MemoryStore::with_entry("history", "seed");
    assert_eq!(store.get("history").await.expect("get").as_deref(), Some("seed"));
    store.put("history", "next").await.expect("put");
    assert_eq!(store.get("history").await.expect("get").as_deref(), Some("next"));
    assert!(store.delete("history").await.expect("delete"));
    assert_eq!(store.get("history").await.expect("get"), None);
}

#[test]
fn memory_urls_have_no_file_path() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("sqlite:file:veru?mode=memory&cache=shared"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/history.db"),
        Some(PathBuf::from("./data/history.db"))
    );
}

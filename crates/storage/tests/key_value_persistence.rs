use storage::{sqlite_url_for_path, KeyValueStore, Storage};

#[tokio::test]
async fn values_survive_reopening_the_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let database_url = sqlite_url_for_path(&temp_root.path().join("history.sqlite3"));

    {
        let storage = Storage::new(&database_url).await.expect("open");
        storage
            .put("veru.audit_history", r#"[{"id":"1"}]"#)
            .await
            .expect("put");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened
            .get("veru.audit_history")
            .await
            .expect("get")
            .as_deref(),
        Some(r#"[{"id":"1"}]"#)
    );
}

#[tokio::test]
async fn store_is_usable_as_trait_object() {
    let storage: std::sync::Arc<dyn KeyValueStore> =
        std::sync::Arc::new(Storage::new("sqlite::memory:").await.expect("db"));
    storage.put("k", "v").await.expect("put");
    assert_eq!(storage.get("k").await.expect("get").as_deref(), Some("v"));
}

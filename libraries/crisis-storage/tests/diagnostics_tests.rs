use crisis_storage::diagnostics::{self, Severity};
use crisis_storage::{create_pool, run_migrations};

#[tokio::test]
async fn test_append_and_recent() {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    diagnostics::append(&pool, "enforcement", Severity::Error, "verification exhausted")
        .await
        .unwrap();
    diagnostics::append(&pool, "actuator", Severity::Warning, "handle lost")
        .await
        .unwrap();

    let entries = diagnostics::recent(&pool, 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    // Newest first
    assert_eq!(entries[0].category, "actuator");
    assert_eq!(entries[0].severity, Severity::Warning);
    assert_eq!(entries[1].category, "enforcement");
    assert_eq!(entries[1].message, "verification exhausted");
}

#[tokio::test]
async fn test_recent_respects_limit() {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    for i in 0..5 {
        diagnostics::append(&pool, "enforcement", Severity::Info, &format!("cycle {i}"))
            .await
            .unwrap();
    }

    let entries = diagnostics::recent(&pool, 3).await.unwrap();
    assert_eq!(entries.len(), 3);
}

#[tokio::test]
async fn test_prune_keeps_newest() {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    for i in 0..10 {
        diagnostics::append(&pool, "enforcement", Severity::Info, &format!("cycle {i}"))
            .await
            .unwrap();
    }

    diagnostics::prune(&pool, 4).await.unwrap();

    let entries = diagnostics::recent(&pool, 100).await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].message, "cycle 9");
    assert_eq!(entries[3].message, "cycle 6");
}

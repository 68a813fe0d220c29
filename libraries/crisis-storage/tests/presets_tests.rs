use crisis_core::types::CreatePreset;
use crisis_storage::{create_pool, presets, profiles, run_migrations, StorageError};

async fn setup() -> sqlx::SqlitePool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn test_create_and_get_profile() {
    let pool = setup().await;

    let profile = profiles::create(&pool, "Kids").await.unwrap();
    assert_eq!(profile.name, "Kids");

    let fetched = profiles::get(&pool, profile.id).await.unwrap();
    assert_eq!(fetched, profile);
}

#[tokio::test]
async fn test_get_missing_profile() {
    let pool = setup().await;

    let err = profiles::get(&pool, 42).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_rename_profile() {
    let pool = setup().await;

    let profile = profiles::create(&pool, "Default").await.unwrap();
    profiles::rename(&pool, profile.id, "Main").await.unwrap();

    let fetched = profiles::get(&pool, profile.id).await.unwrap();
    assert_eq!(fetched.name, "Main");
}

#[tokio::test]
async fn test_create_and_list_presets() {
    let pool = setup().await;
    let profile = profiles::create(&pool, "Default").await.unwrap();

    presets::create(
        &pool,
        CreatePreset {
            profile_id: profile.id,
            name: "Night".to_string(),
            level: 0.25,
        },
    )
    .await
    .unwrap();
    presets::create(
        &pool,
        CreatePreset {
            profile_id: profile.id,
            name: "Commute".to_string(),
            level: 0.6,
        },
    )
    .await
    .unwrap();

    let list = presets::get_for_profile(&pool, profile.id).await.unwrap();
    assert_eq!(list.len(), 2);
    // Ordered by name
    assert_eq!(list[0].name, "Commute");
    assert_eq!(list[0].level, 0.6);
    assert_eq!(list[1].name, "Night");
    assert_eq!(list[1].level, 0.25);
}

#[tokio::test]
async fn test_preset_level_clamped() {
    let pool = setup().await;
    let profile = profiles::create(&pool, "Default").await.unwrap();

    let preset = presets::create(
        &pool,
        CreatePreset {
            profile_id: profile.id,
            name: "Loud".to_string(),
            level: 2.4,
        },
    )
    .await
    .unwrap();
    assert_eq!(preset.level, 1.0);

    presets::update_level(&pool, preset.id, -1.0).await.unwrap();
    let fetched = presets::get(&pool, preset.id).await.unwrap();
    assert_eq!(fetched.level, 0.0);
}

#[tokio::test]
async fn test_update_missing_preset() {
    let pool = setup().await;

    let err = presets::update_level(&pool, 999, 0.5).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_preset() {
    let pool = setup().await;
    let profile = profiles::create(&pool, "Default").await.unwrap();

    let preset = presets::create(
        &pool,
        CreatePreset {
            profile_id: profile.id,
            name: "Night".to_string(),
            level: 0.25,
        },
    )
    .await
    .unwrap();

    presets::delete(&pool, preset.id).await.unwrap();

    let err = presets::get(&pool, preset.id).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

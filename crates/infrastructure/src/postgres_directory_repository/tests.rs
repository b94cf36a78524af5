use serde_json::Value;
use tessera_application::DirectoryRepository;
use tessera_core::{AppError, DirectoryId, FieldId};
use tessera_domain::{Directory, DirectoryField, DirectoryType, FieldMetadata, FieldType};

use crate::postgres_test_support::{seed_directory, test_pool};

use super::PostgresDirectoryRepository;

#[tokio::test]
async fn save_directory_rejects_duplicate_names() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresDirectoryRepository::new(pool.clone());
    let seeded = seed_directory(&pool, "Customers").await;

    let duplicate = Directory::new(
        DirectoryId::new(),
        seeded.directory.name().as_str(),
        None,
        DirectoryType::Module,
        Value::Null,
    )
    .unwrap_or_else(|_| unreachable!());
    let result = repository.save_directory(duplicate).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn field_metadata_round_trips_through_jsonb() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresDirectoryRepository::new(pool.clone());
    let accounts = seed_directory(&pool, "Accounts").await;
    let payments = seed_directory(&pool, "Payments").await;

    let trigger = payments
        .status
        .with_metadata(FieldMetadata {
            is_cascading_trigger: true,
            cascading_directory_id: Some(accounts.directory.id()),
            cascading_target_field: Some("status".to_owned()),
            field_order: Some(2),
            ..FieldMetadata::default()
        })
        .unwrap_or_else(|_| unreachable!());
    assert!(repository.save_field(trigger.clone()).await.is_ok());

    let stored = repository
        .find_field(trigger.id())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(stored, Some(trigger.clone()));

    let referencing = repository
        .list_referencing_fields(accounts.directory.id())
        .await
        .unwrap_or_default();
    assert_eq!(referencing.len(), 1);
    assert_eq!(referencing[0].id(), trigger.id());

    let triggers = repository
        .list_cascading_trigger_fields()
        .await
        .unwrap_or_default();
    assert!(triggers.iter().any(|field| field.id() == trigger.id()));
}

#[tokio::test]
async fn fields_list_in_creation_order() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresDirectoryRepository::new(pool.clone());
    let seeded = seed_directory(&pool, "Orders").await;

    let amount = DirectoryField::new(
        FieldId::new(),
        seeded.directory.id(),
        "amount",
        FieldType::Decimal,
        None,
        FieldMetadata::default(),
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(repository.save_field(amount.clone()).await.is_ok());

    let duplicate = DirectoryField::new(
        FieldId::new(),
        seeded.directory.id(),
        "amount",
        FieldType::Integer,
        None,
        FieldMetadata::default(),
    )
    .unwrap_or_else(|_| unreachable!());
    assert!(matches!(
        repository.save_field(duplicate).await,
        Err(AppError::Conflict(_))
    ));

    let fields = repository
        .list_fields(seeded.directory.id())
        .await
        .unwrap_or_default();
    let ids: Vec<FieldId> = fields.iter().map(DirectoryField::id).collect();
    assert_eq!(ids, vec![seeded.status.id(), amount.id()]);
}

#[tokio::test]
async fn delete_directory_removes_enablements() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresDirectoryRepository::new(pool.clone());
    let seeded = seed_directory(&pool, "Archive").await;

    assert!(repository.delete_directory(seeded.directory.id()).await.is_ok());
    assert_eq!(
        repository.find_directory(seeded.directory.id()).await.ok(),
        Some(None)
    );
    assert_eq!(
        repository.find_field(seeded.status.id()).await.ok(),
        Some(None)
    );
}

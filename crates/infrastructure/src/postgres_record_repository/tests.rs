use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tessera_application::{CompanyRepository, RecordFilter, RecordRepository};
use tessera_core::{AppError, FieldId, RecordId, ValueId};
use tessera_domain::{DirectoryRecord, DirectoryValue};

use crate::PostgresCompanyRepository;
use crate::postgres_test_support::{SeededDirectory, seed_directory, test_pool};

use super::PostgresRecordRepository;

async fn insert_record(
    repository: &PostgresRecordRepository,
    seeded: &SeededDirectory,
    status: &str,
    created_at: chrono::DateTime<Utc>,
) -> RecordId {
    let record = DirectoryRecord::new(
        RecordId::new(),
        seeded.enablement.id,
        Value::Null,
        created_at,
    )
    .unwrap_or_else(|_| unreachable!());
    let value = DirectoryValue::for_field(
        ValueId::new(),
        record.id(),
        &seeded.status,
        &json!(status),
    )
    .unwrap_or_else(|_| unreachable!());
    let record_id = record.id();
    assert!(repository.create_record(record, vec![value]).await.is_ok());
    record_id
}

#[tokio::test]
async fn list_records_filters_on_canonical_values() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRecordRepository::new(pool.clone());
    let seeded = seed_directory(&pool, "Orders").await;
    let now = Utc::now();
    let newer = insert_record(&repository, &seeded, "open", now).await;
    let older = insert_record(&repository, &seeded, "closed", now - Duration::minutes(1)).await;

    let all = repository
        .list_records(seeded.enablement.id, &[])
        .await
        .unwrap_or_default();
    let ids: Vec<RecordId> = all.iter().map(DirectoryRecord::id).collect();
    assert_eq!(ids, vec![older, newer]);

    let closed = repository
        .list_records(
            seeded.enablement.id,
            &[RecordFilter {
                field_id: seeded.status.id(),
                values: vec!["closed".to_owned(), "void".to_owned()],
            }],
        )
        .await
        .unwrap_or_default();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].id(), older);
}

#[tokio::test]
async fn create_record_rejects_foreign_fields() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRecordRepository::new(pool.clone());
    let orders = seed_directory(&pool, "Orders").await;
    let customers = seed_directory(&pool, "Customers").await;

    let record = DirectoryRecord::new(
        RecordId::new(),
        orders.enablement.id,
        Value::Null,
        Utc::now(),
    )
    .unwrap_or_else(|_| unreachable!());
    let foreign = DirectoryValue::for_field(
        ValueId::new(),
        record.id(),
        &customers.status,
        &json!("active"),
    )
    .unwrap_or_else(|_| unreachable!());

    let result = repository.create_record(record.clone(), vec![foreign]).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(repository.find_record(record.id()).await.ok(), Some(None));
}

#[tokio::test]
async fn update_value_reports_missing_values() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRecordRepository::new(pool.clone());
    let seeded = seed_directory(&pool, "Orders").await;
    let record_id = insert_record(&repository, &seeded, "open", Utc::now()).await;

    assert!(
        repository
            .update_value(record_id, seeded.status.id(), "closed".to_owned())
            .await
            .is_ok()
    );
    let values = repository.list_values(&[record_id]).await.unwrap_or_default();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, "closed");

    let missing = repository
        .update_value(record_id, FieldId::new(), "x".to_owned())
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn deleting_a_company_removes_its_records() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRecordRepository::new(pool.clone());
    let companies = PostgresCompanyRepository::new(pool.clone());
    let seeded = seed_directory(&pool, "Orders").await;
    let record_id = insert_record(&repository, &seeded, "open", Utc::now()).await;

    assert!(
        companies
            .delete_company(seeded.enablement.company_id)
            .await
            .is_ok()
    );
    assert_eq!(repository.find_record(record_id).await.ok(), Some(None));
    assert_eq!(
        companies
            .find_company_directory(seeded.enablement.id)
            .await
            .ok(),
        Some(None)
    );
    assert_eq!(
        repository
            .record_exists_in_directory(
                record_id,
                seeded.directory.id(),
                seeded.enablement.company_id,
            )
            .await
            .ok(),
        Some(false)
    );
}

#[tokio::test]
async fn relation_targets_resolve_within_one_company() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRecordRepository::new(pool.clone());
    let orders = seed_directory(&pool, "Orders").await;
    let customers = seed_directory(&pool, "Customers").await;
    let record_id = insert_record(&repository, &orders, "open", Utc::now()).await;

    let cases = [
        (orders.directory.id(), orders.enablement.company_id, true),
        (customers.directory.id(), orders.enablement.company_id, false),
        (orders.directory.id(), customers.enablement.company_id, false),
    ];
    for (directory_id, company_id, expected) in cases {
        assert_eq!(
            repository
                .record_exists_in_directory(record_id, directory_id, company_id)
                .await
                .ok(),
            Some(expected)
        );
    }
}

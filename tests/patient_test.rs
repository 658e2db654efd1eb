//! Patient catalog tests: validation, per-owner scoping, archive/delete and
//! the email link index.

mod common;

use healthscript::errors::AppError;
use healthscript::models::patient::{self, PatientFilter, PatientStatus};
use common::*;

#[tokio::test]
async fn test_create_and_list_patient() {
    let db = setup_test_db();

    let created = create_patient(&db, PRACTITIONER_ID).await;
    assert!(created.id.starts_with("pat_"));
    assert_eq!(created.status, PatientStatus::Active);
    assert_eq!(created.practitioner_id, PRACTITIONER_ID);
    assert_eq!(created.full_name(), "Alice Smith");

    let patients = patient::list(&db, PRACTITIONER_ID).await.unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0], created);
}

#[tokio::test]
async fn test_empty_email_rejected_before_write() {
    let db = setup_test_db();

    let form = patient_form("Bob", "Jones", "");
    let err = patient::upsert(&db, PRACTITIONER_ID, &form).await.unwrap_err();
    match err {
        AppError::Validation(errors) => assert!(errors.iter().any(|e| e.contains("Email"))),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(patient::list(&db, PRACTITIONER_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_validation_collects_every_problem() {
    let db = setup_test_db();

    let mut form = patient_form("", "", "not-an-email");
    form.date_of_birth = Some("31/12/1990".to_string());
    let err = patient::upsert(&db, PRACTITIONER_ID, &form).await.unwrap_err();
    let AppError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.len(), 4);
}

#[tokio::test]
async fn test_writes_visible_only_to_owner() {
    let db = setup_test_db();

    let created = create_patient(&db, PRACTITIONER_ID).await;
    assert!(patient::list(&db, OTHER_PRACTITIONER_ID).await.unwrap().is_empty());
    assert!(patient::find(&db, OTHER_PRACTITIONER_ID, &created.id).await.unwrap().is_none());

    // Another owner cannot update by id
    let mut form = patient_form("Eve", "Smith", "eve@example.com");
    form.id = Some(created.id.clone());
    assert!(matches!(
        patient::upsert(&db, OTHER_PRACTITIONER_ID, &form).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        patient::delete(&db, OTHER_PRACTITIONER_ID, &created.id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_update_keeps_id_and_moves_email_link() {
    let db = setup_test_db();

    let created = create_patient(&db, PRACTITIONER_ID).await;
    assert_eq!(patient::find_links_by_email(&db, PATIENT_EMAIL).await.unwrap().len(), 1);

    let mut form = patient_form("Alice", "Brown", "alice.brown@example.com");
    form.id = Some(created.id.clone());
    let updated = patient::upsert(&db, PRACTITIONER_ID, &form).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.last_name, "Brown");
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(patient::list(&db, PRACTITIONER_ID).await.unwrap().len(), 1);

    assert!(patient::find_links_by_email(&db, PATIENT_EMAIL).await.unwrap().is_empty());
    let links = patient::find_links_by_email(&db, "ALICE.BROWN@example.com").await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].patient_id, created.id);
}

#[tokio::test]
async fn test_archive_and_filter() {
    let db = setup_test_db();

    let alice = create_patient(&db, PRACTITIONER_ID).await;
    patient::upsert(&db, PRACTITIONER_ID, &patient_form("Bob", "Jones", "bob@example.com"))
        .await
        .unwrap();

    let archived = patient::archive(&db, PRACTITIONER_ID, &alice.id).await.unwrap();
    assert_eq!(archived.status, PatientStatus::Archived);
    assert!(!archived.is_active());

    let active = PatientFilter {
        status: Some(PatientStatus::Active),
        ..Default::default()
    };
    let found = patient::list_filtered(&db, PRACTITIONER_ID, &active).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Bob");

    let search = PatientFilter {
        search: Some("SMITH".to_string()),
        ..Default::default()
    };
    let found = patient::list_filtered(&db, PRACTITIONER_ID, &search).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, alice.id);
}

#[tokio::test]
async fn test_delete_removes_record_and_link() {
    let db = setup_test_db();

    let created = create_patient(&db, PRACTITIONER_ID).await;
    patient::delete(&db, PRACTITIONER_ID, &created.id).await.unwrap();

    assert!(patient::list(&db, PRACTITIONER_ID).await.unwrap().is_empty());
    assert!(patient::find_links_by_email(&db, PATIENT_EMAIL).await.unwrap().is_empty());
    assert!(matches!(
        patient::delete(&db, PRACTITIONER_ID, &created.id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_same_email_under_two_practitioners() {
    let db = setup_test_db();

    create_patient(&db, PRACTITIONER_ID).await;
    create_patient(&db, OTHER_PRACTITIONER_ID).await;

    let links = patient::find_links_by_email(&db, PATIENT_EMAIL).await.unwrap();
    assert_eq!(links.len(), 2);
}

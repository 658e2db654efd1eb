//! Protocol catalog tests: validation, line ordering, duplicate, templates
//! and filters.

mod common;

use healthscript::errors::AppError;
use healthscript::models::protocol::{self, ProtocolFilter, ProtocolStatus};
use common::*;

#[tokio::test]
async fn test_create_protocol_with_lines() {
    let db = setup_test_db();

    let created = create_protocol(&db, PRACTITIONER_ID).await;
    assert!(created.id.starts_with("prot_"));
    assert!(created.is_active());
    assert_eq!(created.duration_weeks, 8);
    assert_eq!(created.supplements.len(), 2);

    let orders: Vec<u32> = created.supplements.iter().map(|l| l.sort_order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(created.supplements[0].supplement.name, "Vitamin D3");
    assert!((created.total_price() - (24.99 + 29.99)).abs() < 1e-9);

    let found = protocol::find(&db, PRACTITIONER_ID, &created.id).await.unwrap();
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn test_new_protocol_defaults_to_draft() {
    let db = setup_test_db();

    let mut form = protocol_form("Sleep", ProtocolStatus::Draft);
    form.status = None;
    let created = protocol::upsert(&db, PRACTITIONER_ID, &form).await.unwrap();
    assert_eq!(created.status, ProtocolStatus::Draft);
}

#[tokio::test]
async fn test_name_and_category_required() {
    let db = setup_test_db();

    let mut form = protocol_form("", ProtocolStatus::Active);
    form.category = "  ".to_string();
    let err = protocol::upsert(&db, PRACTITIONER_ID, &form).await.unwrap_err();
    let AppError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.len(), 2);
    assert!(protocol::list(&db, PRACTITIONER_ID).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_supplement_rejected() {
    let db = setup_test_db();

    let mut form = protocol_form("Bad", ProtocolStatus::Active);
    form.supplements.push(line("supp_999", "1"));
    assert!(matches!(
        protocol::upsert(&db, PRACTITIONER_ID, &form).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_inactive_supplement_rejected() {
    let db = setup_test_db();

    let mut form = protocol_form("Calm", ProtocolStatus::Active);
    form.supplements.push(line("supp_009", "1 capsule"));
    let err = protocol::upsert(&db, PRACTITIONER_ID, &form).await.unwrap_err();
    let AppError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors, vec!["Supplement 'supp_009' is no longer available".to_string()]);

    let created = create_protocol(&db, PRACTITIONER_ID).await;
    assert!(matches!(
        protocol::add_line(&db, PRACTITIONER_ID, &created.id, &line("supp_009", "1 capsule")).await,
        Err(AppError::Validation(_))
    ));
    let stored = protocol::find(&db, PRACTITIONER_ID, &created.id).await.unwrap().unwrap();
    assert_eq!(stored.supplements.len(), 2);
}

#[tokio::test]
async fn test_add_and_remove_lines_renumbers() {
    let db = setup_test_db();
    let created = create_protocol(&db, PRACTITIONER_ID).await;

    let with_three = protocol::add_line(&db, PRACTITIONER_ID, &created.id, &line("supp_007", "1 capsule"))
        .await
        .unwrap();
    assert_eq!(with_three.supplements.len(), 3);
    assert_eq!(with_three.supplements[2].sort_order, 3);

    let first_line = with_three.supplements[0].id.clone();
    let with_two = protocol::remove_line(&db, PRACTITIONER_ID, &created.id, &first_line)
        .await
        .unwrap();
    let orders: Vec<u32> = with_two.supplements.iter().map(|l| l.sort_order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(with_two.supplements[1].supplement_id, "supp_007");

    assert!(matches!(
        protocol::remove_line(&db, PRACTITIONER_ID, &created.id, &first_line).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_duplicate_makes_draft_copy() {
    let db = setup_test_db();
    let created = create_protocol(&db, PRACTITIONER_ID).await;

    let copy = protocol::duplicate(&db, PRACTITIONER_ID, &created.id).await.unwrap();
    assert_ne!(copy.id, created.id);
    assert_eq!(copy.name, "Gut Reset (Copy)");
    assert_eq!(copy.status, ProtocolStatus::Draft);
    assert_eq!(copy.supplements.len(), created.supplements.len());
    assert_ne!(copy.supplements[0].id, created.supplements[0].id);

    assert_eq!(protocol::list(&db, PRACTITIONER_ID).await.unwrap().len(), 2);
    assert!(matches!(
        protocol::duplicate(&db, OTHER_PRACTITIONER_ID, &created.id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_templates_categories_and_filters() {
    let db = setup_test_db();
    create_protocol(&db, PRACTITIONER_ID).await;

    let mut template = protocol_form("Immune Boost", ProtocolStatus::Active);
    template.is_template = true;
    template.category = "Immunity".to_string();
    protocol::upsert(&db, PRACTITIONER_ID, &template).await.unwrap();

    let templates = protocol::list_templates(&db, PRACTITIONER_ID).await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "Immune Boost");

    let categories = protocol::categories(&db, PRACTITIONER_ID).await.unwrap();
    assert_eq!(categories, vec!["General", "Immunity"]);

    let by_category = ProtocolFilter {
        category: Some("Immunity".to_string()),
        ..Default::default()
    };
    assert_eq!(protocol::list_filtered(&db, PRACTITIONER_ID, &by_category).await.unwrap().len(), 1);

    let by_search = ProtocolFilter {
        search: Some("gut".to_string()),
        ..Default::default()
    };
    let found = protocol::list_filtered(&db, PRACTITIONER_ID, &by_search).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Gut Reset");
}

#[tokio::test]
async fn test_delete_protocol_scoped_to_owner() {
    let db = setup_test_db();
    let created = create_protocol(&db, PRACTITIONER_ID).await;

    assert!(matches!(
        protocol::delete(&db, OTHER_PRACTITIONER_ID, &created.id).await,
        Err(AppError::NotFound)
    ));
    protocol::delete(&db, PRACTITIONER_ID, &created.id).await.unwrap();
    assert!(protocol::list(&db, PRACTITIONER_ID).await.unwrap().is_empty());
}

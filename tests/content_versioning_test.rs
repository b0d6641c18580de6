use chrono::Utc;
use kasih::db;
use kasih::domain::DomainError;
use kasih::models::content::{ChangeType, ContentType};
use kasih::models::content_version;
use kasih::models::donation::{self, Environment, PaymentStatus};
use kasih::models::{blog_post, project};
use kasih::services::content_service;
use kasih::services::version_service::{self, ActivityFilter};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};

const EDITOR: &str = "editor@kasih.org.my";

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_post(db: &DatabaseConnection) -> i32 {
    content_service::create_content(
        db,
        ContentType::BlogPost,
        json!({
            "slug": "ramadan-2026",
            "title_en": "Ramadan food drive",
            "title_ms": "Program makanan Ramadan",
            "body_en": "We packed 500 boxes."
        }),
        EDITOR,
    )
    .await
    .expect("Failed to create post")
    .id
}

async fn set_title(db: &DatabaseConnection, id: i32, title: &str) {
    content_service::update_content(
        db,
        ContentType::BlogPost,
        id,
        json!({ "title_en": title }),
        EDITOR,
    )
    .await
    .expect("Failed to update post");
}

async fn version_id(db: &DatabaseConnection, content_type: ContentType, id: i32, number: i32) -> i32 {
    content_version::Entity::find()
        .filter(content_version::Column::ContentType.eq(content_type.as_str()))
        .filter(content_version::Column::ContentId.eq(id))
        .filter(content_version::Column::VersionNumber.eq(number))
        .one(db)
        .await
        .unwrap()
        .expect("version missing")
        .id
}

fn data(version: &content_version::Model) -> Value {
    serde_json::from_str(&version.data).unwrap()
}

#[tokio::test]
async fn test_every_mutation_gets_the_next_version_number() {
    let db = setup_test_db().await;
    let id = create_post(&db).await;
    set_title(&db, id, "Ramadan food drive: week 2").await;
    set_title(&db, id, "Ramadan food drive: final report").await;

    let history = version_service::get_version_history(&db, ContentType::BlogPost, id, None)
        .await
        .unwrap();

    let numbers: Vec<i32> = history.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![3, 2, 1]);
    assert_eq!(history[2].change_type, ChangeType::Create);
    assert_eq!(history[0].change_type, ChangeType::Update);
    assert_eq!(history[0].created_by.as_deref(), Some(EDITOR));

    // Update versions hold the state after the change and the one before it
    assert_eq!(data(&history[0])["title_en"], "Ramadan food drive: final report");
    let previous: Value = serde_json::from_str(history[0].previous_data.as_deref().unwrap()).unwrap();
    assert_eq!(previous["title_en"], "Ramadan food drive: week 2");

    // Partial update keeps untouched fields
    assert_eq!(data(&history[0])["title_ms"], "Program makanan Ramadan");

    content_service::delete_content(&db, ContentType::BlogPost, id, EDITOR)
        .await
        .unwrap();

    let history = version_service::get_version_history(&db, ContentType::BlogPost, id, None)
        .await
        .unwrap();
    assert_eq!(history[0].version_number, 4);
    assert_eq!(history[0].change_type, ChangeType::Delete);
    assert_eq!(data(&history[0])["title_en"], "Ramadan food drive: final report");
}

#[tokio::test]
async fn test_restore_after_delete_recreates_with_same_id() {
    let db = setup_test_db().await;
    let id = create_post(&db).await;
    set_title(&db, id, "Second title").await;
    set_title(&db, id, "Third title").await;
    content_service::delete_content(&db, ContentType::BlogPost, id, EDITOR)
        .await
        .unwrap();

    let v2 = version_id(&db, ContentType::BlogPost, id, 2).await;
    let restored = version_service::restore_version(&db, v2, Some(EDITOR))
        .await
        .unwrap();

    assert!(restored.recreated);
    assert_eq!(restored.content_id, id);
    assert_eq!(restored.restored_from_version, 2);
    assert_eq!(restored.new_version_number, 5);
    assert_eq!(restored.title, "Second title");

    let live = blog_post::Entity::find_by_id(id)
        .one(&db)
        .await
        .unwrap()
        .expect("post re-created");
    assert_eq!(live.title_en, "Second title");
    assert_eq!(live.slug, "ramadan-2026");

    let latest = version_service::get_version_history(&db, ContentType::BlogPost, id, Some(1))
        .await
        .unwrap();
    assert_eq!(latest[0].change_type, ChangeType::Restore);
    assert_eq!(latest[0].restored_from_version, Some(2));
    assert!(latest[0].previous_data.is_none());
}

#[tokio::test]
async fn test_restore_live_record_overwrites_content_fields() {
    let db = setup_test_db().await;
    let id = create_post(&db).await;
    set_title(&db, id, "Edited title").await;

    let v1 = version_id(&db, ContentType::BlogPost, id, 1).await;
    let restored = version_service::restore_version(&db, v1, Some(EDITOR))
        .await
        .unwrap();

    assert!(!restored.recreated);
    assert_eq!(restored.new_version_number, 3);

    let snapshot = version_service::get_version(&db, v1).await.unwrap();
    let live = content_service::get_content(&db, ContentType::BlogPost, id)
        .await
        .unwrap();

    // Round trip: content fields equal the snapshot, identity fields excluded
    assert_eq!(
        version_service::strip_identity(live.data.clone())
            .as_object()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.as_str() != "updated_at")
            .count(),
        version_service::strip_identity(data(&snapshot))
            .as_object()
            .unwrap()
            .len()
    );
    for (key, value) in version_service::strip_identity(data(&snapshot))
        .as_object()
        .unwrap()
    {
        assert_eq!(&live.data[key], value, "field {}", key);
    }

    let latest = version_service::get_version_history(&db, ContentType::BlogPost, id, Some(1))
        .await
        .unwrap();
    let previous: Value = serde_json::from_str(latest[0].previous_data.as_deref().unwrap()).unwrap();
    assert_eq!(previous["title_en"], "Edited title");
}

#[tokio::test]
async fn test_restore_keeps_project_total_raised() {
    let db = setup_test_db().await;
    let created = content_service::create_content(
        &db,
        ContentType::Project,
        json!({
            "slug": "sekolah-orang-asli",
            "title_en": "Orang Asli school supplies",
            "description_en": "Books and uniforms",
            "goal_amount": 1_000_000
        }),
        EDITOR,
    )
    .await
    .unwrap();
    let id = created.id;

    content_service::update_content(
        &db,
        ContentType::Project,
        id,
        json!({ "goal_amount": 2_000_000 }),
        EDITOR,
    )
    .await
    .unwrap();

    // Money arrives through the reconciler, outside content versioning
    project::Entity::update_many()
        .col_expr(project::Column::TotalRaised, Expr::value(7000))
        .filter(project::Column::Id.eq(id))
        .exec(&db)
        .await
        .unwrap();

    let v1 = version_id(&db, ContentType::Project, id, 1).await;
    version_service::restore_version(&db, v1, Some(EDITOR))
        .await
        .unwrap();

    let live = project::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
    assert_eq!(live.goal_amount, Some(1_000_000));
    assert_eq!(live.total_raised, 7000);
}

#[tokio::test]
async fn test_recreated_project_recomputes_total_from_donations() {
    let db = setup_test_db().await;
    let id = content_service::create_content(
        &db,
        ContentType::Project,
        json!({
            "slug": "air-bersih",
            "title_en": "Clean water",
            "description_en": "Wells for Sabah villages"
        }),
        EDITOR,
    )
    .await
    .unwrap()
    .id;

    let now = Utc::now().to_rfc3339();
    for (reference, status) in [
        ("DON-W1", PaymentStatus::Completed),
        ("DON-W2", PaymentStatus::Completed),
        ("DON-W3", PaymentStatus::Pending),
    ] {
        donation::ActiveModel {
            amount: Set(2500),
            donor_name: Set("Lim Wei".to_string()),
            donor_email: Set("lim@example.my".to_string()),
            payment_status: Set(status),
            payment_reference: Set(reference.to_string()),
            project_id: Set(Some(id)),
            environment: Set(Environment::Sandbox),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
    }

    content_service::delete_content(&db, ContentType::Project, id, EDITOR)
        .await
        .unwrap();

    let v1 = version_id(&db, ContentType::Project, id, 1).await;
    let restored = version_service::restore_version(&db, v1, Some(EDITOR))
        .await
        .unwrap();
    assert!(restored.recreated);

    let live = project::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
    assert_eq!(live.total_raised, 5000);
}

#[tokio::test]
async fn test_restore_rejects_unknown_version_and_type() {
    let db = setup_test_db().await;

    let missing = version_service::restore_version(&db, 999, Some(EDITOR)).await;
    assert!(matches!(missing, Err(DomainError::NotFound(ref m)) if m == "Version not found"));

    let stray = content_version::ActiveModel {
        content_type: Set("newsletter".to_string()),
        content_id: Set(1),
        version_number: Set(1),
        data: Set(json!({ "subject": "Hello" }).to_string()),
        change_type: Set(ChangeType::Create),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let unsupported = version_service::restore_version(&db, stray.id, Some(EDITOR)).await;
    assert!(matches!(
        unsupported,
        Err(DomainError::Precondition(ref m)) if m.contains("newsletter")
    ));
}

#[tokio::test]
async fn test_invalid_content_is_rejected_without_a_version() {
    let db = setup_test_db().await;

    let bad_status = content_service::create_content(
        &db,
        ContentType::BlogPost,
        json!({ "slug": "x", "title_en": "X", "body_en": "...", "status": "live" }),
        EDITOR,
    )
    .await;
    assert!(matches!(bad_status, Err(DomainError::Validation(_))));

    let bad_fields = content_service::create_content(
        &db,
        ContentType::Form,
        json!({ "slug": "volunteer", "title_en": "Volunteer", "fields": "{\"name\": 1}" }),
        EDITOR,
    )
    .await;
    assert!(matches!(bad_fields, Err(DomainError::Validation(_))));

    let missing_body = content_service::create_content(
        &db,
        ContentType::SiteContent,
        json!({ "section_key": "about" }),
        EDITOR,
    )
    .await;
    assert!(matches!(missing_body, Err(DomainError::Validation(_))));

    let stats = version_service::get_version_stats(&db).await.unwrap();
    assert_eq!(stats.total_versions, 0);

    let not_there =
        content_service::update_content(&db, ContentType::Form, 42, json!({}), EDITOR).await;
    assert!(matches!(not_there, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_activity_log_and_stats() {
    let db = setup_test_db().await;
    let post = create_post(&db).await;
    set_title(&db, post, "Updated").await;

    let form = content_service::create_content(
        &db,
        ContentType::Form,
        json!({
            "slug": "volunteer",
            "title_en": "Volunteer sign-up",
            "fields": "[{\"name\": \"full_name\", \"type\": \"text\"}]"
        }),
        "another@kasih.org.my",
    )
    .await
    .unwrap();
    assert_eq!(form.version_number, Some(1));

    let all = version_service::get_activity_log(&db, ActivityFilter::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.entries[0].action, "form_create");
    assert_eq!(all.entries[2].action, "blog_post_create");
    assert_eq!(all.entries[1].description, "Updated blog post \"Updated\"");

    let by_actor = version_service::get_activity_log(
        &db,
        ActivityFilter {
            actor: Some(EDITOR.to_string()),
            limit: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_actor.total, 2);
    assert_eq!(by_actor.entries.len(), 1);

    let stats = version_service::get_version_stats(&db).await.unwrap();
    assert_eq!(stats.total_versions, 3);
    assert_eq!(stats.tracked_items, 2);
    assert_eq!(stats.versions_by_content_type.get("blog_post"), Some(&2));
    assert_eq!(stats.versions_by_change_type.get("update"), Some(&1));
    assert_eq!(stats.activity_entries, 3);
    assert!(stats.latest_version_at.is_some());
}

#[tokio::test]
async fn test_history_limit_is_capped() {
    let db = setup_test_db().await;
    let id = create_post(&db).await;
    for n in 0..4 {
        set_title(&db, id, &format!("Revision {}", n)).await;
    }

    let two = version_service::get_version_history(&db, ContentType::BlogPost, id, Some(2))
        .await
        .unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].version_number, 5);

    let all = version_service::get_version_history(&db, ContentType::BlogPost, id, Some(10_000))
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn test_restore_rejects_snapshot_that_fails_validation() {
    let db = setup_test_db().await;
    let id = create_post(&db).await;

    let v1 = version_service::get_version(&db, version_id(&db, ContentType::BlogPost, id, 1).await)
        .await
        .unwrap();
    let mut snapshot = data(&v1);
    snapshot["title_en"] = json!("   ");

    let invalid = content_version::ActiveModel {
        content_type: Set(ContentType::BlogPost.as_str().to_string()),
        content_id: Set(id),
        version_number: Set(2),
        data: Set(snapshot.to_string()),
        change_type: Set(ChangeType::Update),
        created_by: Set(Some(EDITOR.to_string())),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let result = version_service::restore_version(&db, invalid.id, Some(EDITOR)).await;
    assert!(matches!(result, Err(DomainError::Precondition(_))));

    let live = blog_post::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
    assert_eq!(live.title_en, "Ramadan food drive");

    let history = version_service::get_version_history(&db, ContentType::BlogPost, id, None)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

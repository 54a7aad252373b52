use std::sync::Arc;

use api::auth::{AuthConfig, CurrentUser, Role};
use api::schema::{build_schema, AppSchema};
use async_graphql::{Request, Variables};
use chrono::{NaiveDate, Utc};
use entity::{app_user, department, designation, employee, employee_profile};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, EntityTrait, QueryFilter, Statement,
};
use serde_json::json;
use uuid::Uuid;

type TestSchema = async_graphql::Schema<
    api::schema::QueryRoot,
    api::schema::MutationRoot,
    async_graphql::EmptySubscription,
>;

async fn setup() -> (Arc<DatabaseConnection>, TestSchema) {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(conn);
    bootstrap_sqlite(db.as_ref()).await;
    let auth = Arc::new(AuthConfig {
        jwt_secret: "test-secret".into(),
        local_auth_enabled: true,
        session_ttl_minutes: 60,
    });
    let AppSchema(schema) = build_schema(db.clone(), auth);
    (db, schema)
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE app_user (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE user_credential (
            user_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE department (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            manager_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(manager_id) REFERENCES employee(id) ON DELETE SET NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE designation (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE employee (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            department_id TEXT NOT NULL,
            designation_id TEXT NOT NULL,
            date_of_joining TEXT NOT NULL,
            basic_salary_cents INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE,
            FOREIGN KEY(department_id) REFERENCES department(id),
            FOREIGN KEY(designation_id) REFERENCES designation(id)
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE employee_profile (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            phone TEXT,
            address TEXT,
            city TEXT,
            emergency_contact TEXT,
            date_of_birth TEXT,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES app_user(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();
}

struct Fixture {
    admin: app_user::Model,
    manager: app_user::Model,
    staff: app_user::Model,
    outsider: app_user::Model,
    staff_record: employee::Model,
    outsider_record: employee::Model,
}

/// Manager and staff share a department; the outsider sits in another one.
async fn seed_people(db: &DatabaseConnection) -> Fixture {
    let admin = insert_user(db, "admin", app_user::Role::Admin).await;
    let manager = insert_user(db, "manager", app_user::Role::Manager).await;
    let staff = insert_user(db, "staff", app_user::Role::Employee).await;
    let outsider = insert_user(db, "outsider", app_user::Role::Employee).await;

    let engineering = insert_department(db, "Engineering").await;
    let design = insert_department(db, "Design").await;
    let desig = insert_designation(db, "Software Engineer").await;

    insert_employee(db, manager.id, engineering.id, desig.id).await;
    let staff_record = insert_employee(db, staff.id, engineering.id, desig.id).await;
    let outsider_record = insert_employee(db, outsider.id, design.id, desig.id).await;

    Fixture {
        admin,
        manager,
        staff,
        outsider,
        staff_record,
        outsider_record,
    }
}

async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    role: app_user::Role,
) -> app_user::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        first_name: Set(username.to_string()),
        last_name: Set("Test".to_string()),
        email: Set(format!("{}@staffdir.test", username)),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_department(db: &DatabaseConnection, name: &str) -> department::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        manager_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_designation(db: &DatabaseConnection, title: &str) -> designation::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    designation::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_employee(
    db: &DatabaseConnection,
    user_id: Uuid,
    department_id: Uuid,
    designation_id: Uuid,
) -> employee::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        department_id: Set(department_id),
        designation_id: Set(designation_id),
        date_of_joining: Set(NaiveDate::from_ymd_opt(2022, 5, 2).unwrap()),
        basic_salary_cents: Set(500_000),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_profile(
    db: &DatabaseConnection,
    user_id: Uuid,
    verified: bool,
) -> employee_profile::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    employee_profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        emergency_contact: Set(None),
        date_of_birth: Set(None),
        verified: Set(verified),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

fn as_viewer(user: &app_user::Model) -> CurrentUser {
    CurrentUser {
        user_id: user.id,
        role: Role::from(user.role),
    }
}

fn error_codes(resp: &async_graphql::Response) -> Vec<String> {
    resp.errors
        .iter()
        .filter_map(|err| err.extensions.as_ref())
        .filter_map(|ext| ext.get("code"))
        .map(|value| format!("{}", value))
        .collect()
}

const VIEW_PROFILE: &str = r#"
    query View($employeeId: ID) {
        directory {
            viewProfile(employeeId: $employeeId) {
                employee { id user { username } }
                profile { verified }
            }
        }
    }
"#;

#[tokio::test]
async fn my_profile_is_created_on_first_access() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;

    let query = r#"
        query {
            directory {
                myProfile {
                    profile { verified phone }
                    employeeRecord { id }
                }
            }
        }
    "#;
    let resp = schema
        .execute(Request::new(query).data(as_viewer(&fixture.staff)))
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let payload = &data["directory"]["myProfile"];
    assert_eq!(payload["profile"]["verified"], false);
    assert_eq!(
        payload["employeeRecord"]["id"],
        fixture.staff_record.id.to_string()
    );

    let stored = employee_profile::Entity::find()
        .filter(employee_profile::Column::UserId.eq(fixture.staff.id))
        .one(db.as_ref())
        .await
        .unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn my_profile_works_without_an_employee_record() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;

    let query = r#"
        query {
            directory {
                myProfile {
                    profile { verified }
                    employeeRecord { id }
                }
            }
        }
    "#;
    let resp = schema
        .execute(Request::new(query).data(as_viewer(&fixture.admin)))
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert!(data["directory"]["myProfile"]["employeeRecord"].is_null());
}

#[tokio::test]
async fn self_edit_resets_verification() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;
    insert_profile(db.as_ref(), fixture.staff.id, true).await;

    let mutation = r#"
        mutation Update($input: ProfileInput!) {
            directory {
                updateMyProfile(input: $input) { verified phone city }
            }
        }
    "#;
    let vars = Variables::from_json(json!({
        "input": { "phone": "+1-555-0142", "city": "Lagos" }
    }));
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(vars)
                .data(as_viewer(&fixture.staff)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let node = &data["directory"]["updateMyProfile"];
    assert_eq!(node["verified"], false);
    assert_eq!(node["phone"], "+1-555-0142");

    let stored = employee_profile::Entity::find()
        .filter(employee_profile::Column::UserId.eq(fixture.staff.id))
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.verified);
    assert_eq!(stored.city.as_deref(), Some("Lagos"));
}

#[tokio::test]
async fn no_op_self_edit_still_resets_verification() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;
    insert_profile(db.as_ref(), fixture.staff.id, true).await;

    let mutation = r#"
        mutation Update($input: ProfileInput!) {
            directory { updateMyProfile(input: $input) { verified } }
        }
    "#;
    let vars = Variables::from_json(json!({ "input": {} }));
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(vars)
                .data(as_viewer(&fixture.staff)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let stored = employee_profile::Entity::find()
        .filter(employee_profile::Column::UserId.eq(fixture.staff.id))
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.verified);
}

#[tokio::test]
async fn manager_views_profiles_in_own_department_only() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;

    let vars = Variables::from_json(json!({ "employeeId": fixture.staff_record.id }));
    let resp = schema
        .execute(
            Request::new(VIEW_PROFILE)
                .variables(vars)
                .data(as_viewer(&fixture.manager)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(
        data["directory"]["viewProfile"]["employee"]["user"]["username"],
        "staff"
    );

    let vars = Variables::from_json(json!({ "employeeId": fixture.outsider_record.id }));
    let resp = schema
        .execute(
            Request::new(VIEW_PROFILE)
                .variables(vars)
                .data(as_viewer(&fixture.manager)),
        )
        .await;
    assert!(!resp.errors.is_empty());
    assert!(error_codes(&resp).iter().any(|c| c.contains("FORBIDDEN")));
    assert_eq!(resp.errors[0].message, "Permission denied");
}

#[tokio::test]
async fn employee_views_self_but_not_colleagues() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;

    // No employeeId resolves to the caller's own record.
    let resp = schema
        .execute(Request::new(VIEW_PROFILE).data(as_viewer(&fixture.staff)))
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(
        data["directory"]["viewProfile"]["employee"]["id"],
        fixture.staff_record.id.to_string()
    );

    let manager_record = employee::Entity::find()
        .filter(employee::Column::UserId.eq(fixture.manager.id))
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    let vars = Variables::from_json(json!({ "employeeId": manager_record.id }));
    let resp = schema
        .execute(
            Request::new(VIEW_PROFILE)
                .variables(vars)
                .data(as_viewer(&fixture.staff)),
        )
        .await;
    assert!(!resp.errors.is_empty());
    assert!(error_codes(&resp).iter().any(|c| c.contains("FORBIDDEN")));
}

#[tokio::test]
async fn admin_views_any_profile_and_missing_target_is_not_found() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;

    let vars = Variables::from_json(json!({ "employeeId": fixture.outsider_record.id }));
    let resp = schema
        .execute(
            Request::new(VIEW_PROFILE)
                .variables(vars)
                .data(as_viewer(&fixture.admin)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let vars = Variables::from_json(json!({ "employeeId": Uuid::new_v4() }));
    let resp = schema
        .execute(
            Request::new(VIEW_PROFILE)
                .variables(vars)
                .data(as_viewer(&fixture.admin)),
        )
        .await;
    assert!(!resp.errors.is_empty());
    assert!(error_codes(&resp).iter().any(|c| c.contains("NOT_FOUND")));
}

#[tokio::test]
async fn pending_queue_lists_unverified_employee_profiles_only() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;
    insert_profile(db.as_ref(), fixture.staff.id, false).await;
    insert_profile(db.as_ref(), fixture.outsider.id, true).await;
    insert_profile(db.as_ref(), fixture.manager.id, false).await;

    let query = r#"
        query {
            directory {
                pendingProfiles {
                    owner { username role }
                    profile { verified }
                }
            }
        }
    "#;
    let resp = schema
        .execute(Request::new(query).data(as_viewer(&fixture.admin)))
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let rows = data["directory"]["pendingProfiles"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["owner"]["username"], "staff");

    let denied = schema
        .execute(Request::new(query).data(as_viewer(&fixture.manager)))
        .await;
    assert!(!denied.errors.is_empty());
    assert!(error_codes(&denied).iter().any(|c| c.contains("FORBIDDEN")));
}

#[tokio::test]
async fn approving_a_profile_is_idempotent() {
    let (db, schema) = setup().await;
    let fixture = seed_people(db.as_ref()).await;
    let profile = insert_profile(db.as_ref(), fixture.staff.id, false).await;

    let mutation = r#"
        mutation Approve($profileId: ID!) {
            directory { approveProfile(profileId: $profileId) { verified } }
        }
    "#;
    let vars = Variables::from_json(json!({ "profileId": profile.id }));
    let resp = schema
        .execute(
            Request::new(mutation)
                .variables(vars.clone())
                .data(as_viewer(&fixture.admin)),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["directory"]["approveProfile"]["verified"], true);

    let again = schema
        .execute(
            Request::new(mutation)
                .variables(vars.clone())
                .data(as_viewer(&fixture.admin)),
        )
        .await;
    assert!(again.errors.is_empty(), "unexpected errors: {:?}", again.errors);
    let data = again.data.into_json().unwrap();
    assert_eq!(data["directory"]["approveProfile"]["verified"], true);

    let denied = schema
        .execute(
            Request::new(mutation)
                .variables(vars)
                .data(as_viewer(&fixture.manager)),
        )
        .await;
    assert!(!denied.errors.is_empty());
    assert!(error_codes(&denied).iter().any(|c| c.contains("FORBIDDEN")));
}

use crate::auth::{issue_token, AuthConfig, CurrentUser, Role, SESSION_COOKIE};
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;
use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, InputObject, Object, Schema, SimpleObject,
    ID,
};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{app_user, department, designation, employee, employee_profile, user_credential};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter,
};
use tracing::info_span;
use uuid::Uuid;

use crate::directory::{
    self, hash_password, DirectoryError, EmployeeUpdate, NewEmployee, ProfileUpdate,
};
use crate::policy::Actor;

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

pub fn build_schema(db: Arc<DatabaseConnection>, auth: Arc<AuthConfig>) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    async fn directory(&self) -> DirectoryQuery {
        DirectoryQuery
    }
}

#[Object]
impl MutationRoot {
    async fn directory(&self) -> DirectoryMutation {
        DirectoryMutation
    }
}

#[derive(Default)]
pub struct DirectoryQuery;

#[derive(Default)]
pub struct DirectoryMutation;

#[Object]
impl DirectoryQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserNode> {
        let viewer = current_user(ctx)?;
        let db = database(ctx)?;
        let model = app_user::Entity::find_by_id(viewer.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("UNAUTHENTICATED", "Login required"))?;
        Ok(UserNode::from(model))
    }

    async fn employees(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<EmployeeNode>> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let span = info_span!("directory.employees.list", role = actor.role.as_str());
        let _guard = span.enter();
        let rows = directory::list_employees(db.as_ref(), &actor)
            .await
            .map_err(directory_error)?;
        Ok(rows
            .into_iter()
            .map(|(record, owner)| EmployeeNode::from_parts(record, owner))
            .collect())
    }

    async fn employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<EmployeeNode> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let employee_id = parse_uuid(&id)?;
        let (record, owner) = directory::get_employee(db.as_ref(), &actor, employee_id)
            .await
            .map_err(directory_error)?;
        Ok(EmployeeNode::from_parts(record, owner))
    }

    async fn departments(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<DepartmentNode>> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let rows = directory::list_departments(db.as_ref(), &actor)
            .await
            .map_err(directory_error)?;
        Ok(rows.into_iter().map(DepartmentNode::from).collect())
    }

    async fn designations(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<DesignationNode>> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let rows = directory::list_designations(db.as_ref(), &actor)
            .await
            .map_err(directory_error)?;
        Ok(rows.into_iter().map(DesignationNode::from).collect())
    }

    #[graphql(name = "myProfile")]
    async fn my_profile(&self, ctx: &Context<'_>) -> async_graphql::Result<ProfilePayload> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let view = directory::my_profile(db.as_ref(), &actor)
            .await
            .map_err(directory_error)?;
        Ok(ProfilePayload {
            profile: ProfileNode::from(view.profile),
            employee_record: view
                .employee
                .map(|record| EmployeeNode::from_parts(record, None)),
        })
    }

    #[graphql(name = "viewProfile")]
    async fn view_profile(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "employeeId")] employee_id: Option<ID>,
    ) -> async_graphql::Result<ProfileViewPayload> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let target_id = match employee_id {
            Some(id) => Some(parse_uuid(&id)?),
            None => None,
        };
        let (record, owner, profile) = directory::view_profile(db.as_ref(), &actor, target_id)
            .await
            .map_err(directory_error)?;
        Ok(ProfileViewPayload {
            employee: EmployeeNode::from_parts(record, owner),
            profile: ProfileNode::from(profile),
        })
    }

    #[graphql(name = "pendingProfiles")]
    async fn pending_profiles(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<PendingProfile>> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let rows = directory::pending_profiles(db.as_ref(), &actor)
            .await
            .map_err(directory_error)?;
        Ok(rows
            .into_iter()
            .map(|(profile, owner)| PendingProfile {
                profile: ProfileNode::from(profile),
                owner: UserNode::from(owner),
            })
            .collect())
    }
}

#[Object]
impl DirectoryMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        if !auth.local_auth_enabled {
            return Err(error_with_code(
                "FORBIDDEN",
                "Local authentication is disabled",
            ));
        }
        let db = database(ctx)?;
        let normalized = username.trim().to_string();
        let user = app_user::Entity::find()
            .filter(app_user::Column::Username.eq(normalized))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(user) = user else {
            return Ok(AuthPayload {
                ok: false,
                user: None,
                error: Some("Invalid credentials".into()),
            });
        };
        if !user.is_active {
            return Ok(AuthPayload {
                ok: false,
                user: None,
                error: Some("Account disabled".into()),
            });
        }
        let credential = user_credential::Entity::find_by_id(user.id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(credential) = credential else {
            return Ok(AuthPayload {
                ok: false,
                user: None,
                error: Some("Invalid credentials".into()),
            });
        };
        let parsed_hash = PasswordHash::new(&credential.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(AuthPayload {
                ok: false,
                user: None,
                error: Some("Invalid credentials".into()),
            });
        }
        let role = Role::from(user.role);
        let token = issue_token(user.id, role, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue session token"))?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);
        Ok(AuthPayload {
            ok: true,
            user: Some(UserNode::from(user)),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        append_session_cookie(ctx, "", -1);
        Ok(true)
    }

    #[graphql(name = "createEmployee")]
    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let span = info_span!("directory.employees.create", role = actor.role.as_str());
        let _guard = span.enter();
        let username = validate_username(&input.username)?;
        let password = validate_password(&input.password)?;
        let first_name = validate_name("firstName", &input.first_name)?;
        let last_name = validate_name("lastName", &input.last_name)?;
        let email = normalize_email(&input.email)?;
        let (record, owner) = directory::create_employee(
            db.as_ref(),
            &actor,
            NewEmployee {
                username,
                password,
                first_name,
                last_name,
                email,
                department_id: parse_uuid(&input.department_id)?,
                designation_id: parse_uuid(&input.designation_id)?,
                date_of_joining: input.date_of_joining,
                basic_salary_cents: input.basic_salary_cents,
            },
        )
        .await
        .map_err(directory_error)?;
        Ok(EmployeeNode::from_parts(record, Some(owner)))
    }

    #[graphql(name = "updateEmployee")]
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        input: UpdateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let employee_id = parse_uuid(&input.id)?;
        let changes = EmployeeUpdate {
            department_id: parse_optional_id("departmentId", &input.department_id)?,
            designation_id: parse_optional_id("designationId", &input.designation_id)?,
            date_of_joining: input.date_of_joining,
            basic_salary_cents: input.basic_salary_cents,
        };
        let record = directory::update_employee(db.as_ref(), &actor, employee_id, changes)
            .await
            .map_err(directory_error)?;
        let owner = app_user::Entity::find_by_id(record.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(EmployeeNode::from_parts(record, owner))
    }

    #[graphql(name = "deleteEmployee")]
    async fn delete_employee(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let employee_id = parse_uuid(&id)?;
        directory::delete_employee(db.as_ref(), &actor, employee_id)
            .await
            .map_err(directory_error)?;
        Ok(true)
    }

    #[graphql(name = "assignDepartmentManager")]
    async fn assign_department_manager(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "departmentId")] department_id: ID,
        #[graphql(name = "managerId")] manager_id: Option<ID>,
    ) -> async_graphql::Result<DepartmentNode> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let dept_id = parse_uuid(&department_id)?;
        let manager = match manager_id {
            Some(id) => Some(parse_uuid(&id)?),
            None => None,
        };
        let updated = directory::assign_department_manager(db.as_ref(), &actor, dept_id, manager)
            .await
            .map_err(directory_error)?;
        Ok(DepartmentNode::from(updated))
    }

    #[graphql(name = "updateMyProfile")]
    async fn update_my_profile(
        &self,
        ctx: &Context<'_>,
        input: ProfileInput,
    ) -> async_graphql::Result<ProfileNode> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let changes = ProfileUpdate {
            phone: input.phone,
            address: input.address,
            city: input.city,
            emergency_contact: input.emergency_contact,
            date_of_birth: input.date_of_birth,
        };
        let profile = directory::update_my_profile(db.as_ref(), &actor, changes)
            .await
            .map_err(directory_error)?;
        Ok(ProfileNode::from(profile))
    }

    #[graphql(name = "approveProfile")]
    async fn approve_profile(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "profileId")] profile_id: ID,
    ) -> async_graphql::Result<ProfileNode> {
        let db = database(ctx)?;
        let actor = resolve_actor_ctx(ctx, db.as_ref()).await?;
        let id = parse_uuid(&profile_id)?;
        let profile = directory::approve_profile(db.as_ref(), &actor, id)
            .await
            .map_err(directory_error)?;
        Ok(ProfileNode::from(profile))
    }
}

#[derive(InputObject, Clone)]
pub struct NewEmployeeInput {
    pub username: String,
    pub password: String,
    #[graphql(name = "firstName")]
    pub first_name: String,
    #[graphql(name = "lastName")]
    pub last_name: String,
    pub email: String,
    #[graphql(name = "departmentId")]
    pub department_id: ID,
    #[graphql(name = "designationId")]
    pub designation_id: ID,
    #[graphql(name = "dateOfJoining")]
    pub date_of_joining: NaiveDate,
    #[graphql(name = "basicSalaryCents")]
    pub basic_salary_cents: i64,
}

#[derive(InputObject, Clone)]
pub struct UpdateEmployeeInput {
    pub id: ID,
    #[graphql(name = "departmentId")]
    pub department_id: Option<ID>,
    #[graphql(name = "designationId")]
    pub designation_id: Option<ID>,
    #[graphql(name = "dateOfJoining")]
    pub date_of_joining: Option<NaiveDate>,
    #[graphql(name = "basicSalaryCents")]
    pub basic_salary_cents: Option<i64>,
}

#[derive(InputObject, Clone, Default)]
pub struct ProfileInput {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[graphql(name = "emergencyContact")]
    pub emergency_contact: Option<String>,
    #[graphql(name = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub username: String,
    #[graphql(name = "firstName")]
    pub first_name: String,
    #[graphql(name = "lastName")]
    pub last_name: String,
    pub email: String,
    pub role: String,
    #[graphql(name = "isActive")]
    pub is_active: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<app_user::Model> for UserNode {
    fn from(model: app_user::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            role: Role::from(model.role).as_str().to_string(),
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Employee")]
pub struct EmployeeNode {
    pub id: ID,
    #[graphql(name = "userId")]
    pub user_id: ID,
    pub user: Option<UserNode>,
    #[graphql(name = "departmentId")]
    pub department_id: ID,
    #[graphql(name = "designationId")]
    pub designation_id: ID,
    #[graphql(name = "dateOfJoining")]
    pub date_of_joining: NaiveDate,
    #[graphql(name = "basicSalaryCents")]
    pub basic_salary_cents: i64,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl EmployeeNode {
    fn from_parts(model: employee::Model, owner: Option<app_user::Model>) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            user_id: ID::from(model.user_id.to_string()),
            user: owner.map(UserNode::from),
            department_id: ID::from(model.department_id.to_string()),
            designation_id: ID::from(model.designation_id.to_string()),
            date_of_joining: model.date_of_joining,
            basic_salary_cents: model.basic_salary_cents,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Department")]
pub struct DepartmentNode {
    pub id: ID,
    pub name: String,
    #[graphql(name = "managerId")]
    pub manager_id: Option<ID>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<department::Model> for DepartmentNode {
    fn from(model: department::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            manager_id: model.manager_id.map(|id| ID::from(id.to_string())),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Designation")]
pub struct DesignationNode {
    pub id: ID,
    pub title: String,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<designation::Model> for DesignationNode {
    fn from(model: designation::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Profile")]
pub struct ProfileNode {
    pub id: ID,
    #[graphql(name = "userId")]
    pub user_id: ID,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[graphql(name = "emergencyContact")]
    pub emergency_contact: Option<String>,
    #[graphql(name = "dateOfBirth")]
    pub date_of_birth: Option<NaiveDate>,
    pub verified: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<employee_profile::Model> for ProfileNode {
    fn from(model: employee_profile::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            user_id: ID::from(model.user_id.to_string()),
            phone: model.phone,
            address: model.address,
            city: model.city,
            emergency_contact: model.emergency_contact,
            date_of_birth: model.date_of_birth,
            verified: model.verified,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Default)]
pub struct AuthPayload {
    pub ok: bool,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ProfilePayload {
    pub profile: ProfileNode,
    #[graphql(name = "employeeRecord")]
    pub employee_record: Option<EmployeeNode>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ProfileViewPayload {
    pub employee: EmployeeNode,
    pub profile: ProfileNode,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct PendingProfile {
    pub profile: ProfileNode,
    pub owner: UserNode,
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn current_user(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data::<CurrentUser>()
        .cloned()
        .map_err(|_| error_with_code("UNAUTHENTICATED", "Login required"))
}

async fn resolve_actor_ctx(
    ctx: &Context<'_>,
    db: &DatabaseConnection,
) -> async_graphql::Result<Actor> {
    let viewer = current_user(ctx)?;
    directory::resolve_actor(db, &viewer)
        .await
        .map_err(directory_error)
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn parse_optional_id(field: &str, value: &Option<ID>) -> async_graphql::Result<Option<Uuid>> {
    match value {
        Some(id) => Uuid::parse_str(id.as_str())
            .map(Some)
            .map_err(|_| validation_error(format!("{} is not a valid ID", field))),
        None => Ok(None),
    }
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

/// Denials stay opaque on the wire; the reason never leaves the policy
/// module.
fn directory_error(err: DirectoryError) -> Error {
    match err {
        DirectoryError::PermissionDenied => error_with_code("FORBIDDEN", "Permission denied"),
        DirectoryError::NotFound(what) => {
            error_with_code("NOT_FOUND", format!("{} not found", capitalize(what)))
        }
        DirectoryError::Conflict(message) => error_with_code("CONFLICT", message),
        DirectoryError::Validation(message) => validation_error(message),
        DirectoryError::Internal(message) => error_with_code("INTERNAL", message),
        DirectoryError::Db(err) => db_error(err),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let max_age = (ttl_minutes.max(0) * 60).to_string();
    let cookie = if ttl_minutes < 0 {
        format!(
            "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE
        )
    } else {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, token, max_age
        )
    };
    ctx.append_http_header("Set-Cookie", cookie);
}

fn normalize_email(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation_error("Invalid email address"));
    }
    Ok(trimmed)
}

fn validate_username(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error("username is required"));
    }
    if trimmed.chars().count() > 64 {
        return Err(validation_error("username must be <= 64 characters"));
    }
    Ok(trimmed.to_string())
}

fn validate_password(value: &str) -> async_graphql::Result<String> {
    if value.chars().count() < 8 {
        return Err(validation_error("password must be >= 8 characters"));
    }
    Ok(value.to_string())
}

fn validate_name(field: &str, value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error(format!("{} is required", field)));
    }
    if trimmed.chars().count() > 100 {
        return Err(validation_error(format!(
            "{} must be <= 100 characters",
            field
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct SeededDirectoryRecords {
    pub users: Vec<app_user::Model>,
    pub departments: Vec<department::Model>,
    pub designations: Vec<designation::Model>,
    pub employees: Vec<employee::Model>,
}

impl SeededDirectoryRecords {
    pub fn user_named(&self, username: &str) -> Option<&app_user::Model> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn department_named(&self, name: &str) -> Option<&department::Model> {
        self.departments.iter().find(|d| d.name == name)
    }

    pub fn designation_titled(&self, title: &str) -> Option<&designation::Model> {
        self.designations.iter().find(|d| d.title == title)
    }

    pub fn employee_of(&self, username: &str) -> Option<&employee::Model> {
        let user = self.user_named(username)?;
        self.employees.iter().find(|e| e.user_id == user.id)
    }
}

pub async fn seed_directory_demo(
    db: &DatabaseConnection,
) -> Result<SeededDirectoryRecords, DbErr> {
    let seeded_at: DateTimeWithTimeZone = Utc::now().into();
    let admin = insert_seed_user(
        db,
        "admin",
        "Ada",
        "Admin",
        "admin@staffdir.test",
        app_user::Role::Admin,
        "adminpass",
    )
    .await?;
    let hr = insert_seed_user(
        db,
        "hr",
        "Hana",
        "Reyes",
        "hr@staffdir.test",
        app_user::Role::Hr,
        "hrpass123",
    )
    .await?;
    let manager = insert_seed_user(
        db,
        "manager",
        "Mori",
        "Tanaka",
        "manager@staffdir.test",
        app_user::Role::Manager,
        "managerpass",
    )
    .await?;
    let staff = insert_seed_user(
        db,
        "employee",
        "Eli",
        "Okafor",
        "employee@staffdir.test",
        app_user::Role::Employee,
        "employeepass",
    )
    .await?;
    let outsider = insert_seed_user(
        db,
        "contractor",
        "Casey",
        "Nguyen",
        "contractor@staffdir.test",
        app_user::Role::Employee,
        "contractorpass",
    )
    .await?;

    let engineering = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Engineering".into()),
        manager_id: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;
    let people_ops = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("People Operations".into()),
        manager_id: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let engineer = designation::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Software Engineer".into()),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;
    let eng_manager = designation::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Engineering Manager".into()),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;
    let generalist = designation::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("HR Generalist".into()),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let manager_record = insert_seed_employee(
        db,
        manager.id,
        engineering.id,
        eng_manager.id,
        NaiveDate::from_ymd_opt(2021, 3, 1).unwrap_or_default(),
        950_000,
        seeded_at,
    )
    .await?;
    let staff_record = insert_seed_employee(
        db,
        staff.id,
        engineering.id,
        engineer.id,
        NaiveDate::from_ymd_opt(2023, 7, 17).unwrap_or_default(),
        620_000,
        seeded_at,
    )
    .await?;
    let outsider_record = insert_seed_employee(
        db,
        outsider.id,
        people_ops.id,
        generalist.id,
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap_or_default(),
        540_000,
        seeded_at,
    )
    .await?;

    let mut engineering_active: department::ActiveModel = engineering.into();
    engineering_active.manager_id = Set(Some(manager_record.id));
    engineering_active.updated_at = Set(seeded_at);
    let engineering = engineering_active.update(db).await?;

    Ok(SeededDirectoryRecords {
        users: vec![admin, hr, manager, staff, outsider],
        departments: vec![engineering, people_ops],
        designations: vec![engineer, eng_manager, generalist],
        employees: vec![manager_record, staff_record, outsider_record],
    })
}

async fn insert_seed_user(
    db: &DatabaseConnection,
    username: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    role: app_user::Role,
    password: &str,
) -> Result<app_user::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        email: Set(email.to_string()),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    user_credential::ActiveModel {
        user_id: Set(model.id),
        password_hash: Set(hash_password(password)
            .map_err(|err| DbErr::Custom(format!("hash error: {}", err)))?),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model)
}

async fn insert_seed_employee(
    db: &DatabaseConnection,
    user_id: Uuid,
    department_id: Uuid,
    designation_id: Uuid,
    date_of_joining: NaiveDate,
    basic_salary_cents: i64,
    now: DateTimeWithTimeZone,
) -> Result<employee::Model, DbErr> {
    let record = employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        department_id: Set(department_id),
        designation_id: Set(designation_id),
        date_of_joining: Set(date_of_joining),
        basic_salary_cents: Set(basic_salary_cents),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    employee_profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        phone: Set(None),
        address: Set(None),
        city: Set(None),
        emergency_contact: Set(None),
        date_of_birth: Set(None),
        verified: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(record)
}

//! Directory service orchestration.
//!
//! Every use case resolves the acting principal, asks the policy engine,
//! and only then touches the store. A denied request fails before any
//! read or write happens.

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{NaiveDate, Utc};
use entity::{app_user, department, designation, employee, employee_profile, user_credential};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{CurrentUser, Role};
use crate::policy::{decide, Action, Actor, Decision, EmployeeScope};
use crate::verification::{awaits_approval, VerificationState};

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Deliberately opaque; callers never learn which rule failed.
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Internal(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Fields for onboarding one principal + employee + profile as a unit.
#[derive(Clone, Debug)]
pub struct NewEmployee {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: Uuid,
    pub designation_id: Uuid,
    pub date_of_joining: NaiveDate,
    pub basic_salary_cents: i64,
}

/// Partial update: absent fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct EmployeeUpdate {
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub date_of_joining: Option<NaiveDate>,
    pub basic_salary_cents: Option<i64>,
}

/// Partial update of the owner-editable profile fields.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub emergency_contact: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

/// A profile together with the employee summary, when one exists.
#[derive(Clone, Debug)]
pub struct ProfileView {
    pub profile: employee_profile::Model,
    pub employee: Option<employee::Model>,
}

pub fn scope_of(model: &employee::Model) -> EmployeeScope {
    EmployeeScope {
        employee_id: model.id,
        user_id: model.user_id,
        department_id: model.department_id,
    }
}

/// Identity and role context: one lookup, and absence of an employee
/// record is not an error.
pub async fn resolve_actor(
    db: &DatabaseConnection,
    current: &CurrentUser,
) -> DirectoryResult<Actor> {
    let own = employee::Entity::find()
        .filter(employee::Column::UserId.eq(current.user_id))
        .one(db)
        .await?;
    Ok(Actor {
        user_id: current.user_id,
        role: current.role,
        own_employee: own.as_ref().map(scope_of),
    })
}

fn ensure_allowed(actor: &Actor, action: Action) -> DirectoryResult<()> {
    match decide(actor, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(DirectoryError::PermissionDenied),
    }
}

pub async fn list_employees(
    db: &DatabaseConnection,
    actor: &Actor,
) -> DirectoryResult<Vec<(employee::Model, Option<app_user::Model>)>> {
    ensure_allowed(actor, Action::ListEmployees)?;
    Ok(employee::Entity::find()
        .find_also_related(app_user::Entity)
        .order_by_asc(employee::Column::DateOfJoining)
        .all(db)
        .await?)
}

pub async fn get_employee(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> DirectoryResult<(employee::Model, Option<app_user::Model>)> {
    ensure_allowed(actor, Action::ManageEmployee)?;
    employee::Entity::find_by_id(id)
        .find_also_related(app_user::Entity)
        .one(db)
        .await?
        .ok_or(DirectoryError::NotFound("employee"))
}

/// Onboards principal + credential + employee + profile in one
/// transaction; any failing step rolls the whole unit back so no orphan
/// principal survives.
pub async fn create_employee(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewEmployee,
) -> DirectoryResult<(employee::Model, app_user::Model)> {
    ensure_allowed(actor, Action::CreateEmployee)?;
    if input.basic_salary_cents <= 0 {
        return Err(DirectoryError::Validation(
            "basicSalaryCents must be positive".into(),
        ));
    }
    let taken = app_user::Entity::find()
        .filter(app_user::Column::Username.eq(input.username.clone()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(DirectoryError::Conflict(format!(
            "username {} is already taken",
            input.username
        )));
    }
    let password_hash = hash_password(&input.password)?;

    let txn = db.begin().await?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let user_id = Uuid::new_v4();
    let user = app_user::ActiveModel {
        id: Set(user_id),
        username: Set(input.username),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        email: Set(input.email),
        role: Set(app_user::Role::Employee),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    user_credential::ActiveModel {
        user_id: Set(user_id),
        password_hash: Set(password_hash),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    // Resolved inside the transaction; a dangling reference aborts the
    // whole onboarding unit.
    department::Entity::find_by_id(input.department_id)
        .one(&txn)
        .await?
        .ok_or(DirectoryError::NotFound("department"))?;
    designation::Entity::find_by_id(input.designation_id)
        .one(&txn)
        .await?
        .ok_or(DirectoryError::NotFound("designation"))?;

    let record = employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        department_id: Set(input.department_id),
        designation_id: Set(input.designation_id),
        date_of_joining: Set(input.date_of_joining),
        basic_salary_cents: Set(input.basic_salary_cents),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
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
    .insert(&txn)
    .await?;
    txn.commit().await?;
    Ok((record, user))
}

pub async fn update_employee(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    changes: EmployeeUpdate,
) -> DirectoryResult<employee::Model> {
    ensure_allowed(actor, Action::ManageEmployee)?;
    let existing = employee::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DirectoryError::NotFound("employee"))?;
    if let Some(salary) = changes.basic_salary_cents {
        if salary <= 0 {
            return Err(DirectoryError::Validation(
                "basicSalaryCents must be positive".into(),
            ));
        }
    }
    if let Some(department_id) = changes.department_id {
        department::Entity::find_by_id(department_id)
            .one(db)
            .await?
            .ok_or(DirectoryError::NotFound("department"))?;
    }
    if let Some(designation_id) = changes.designation_id {
        designation::Entity::find_by_id(designation_id)
            .one(db)
            .await?
            .ok_or(DirectoryError::NotFound("designation"))?;
    }
    let mut active: employee::ActiveModel = existing.into();
    if let Some(department_id) = changes.department_id {
        active.department_id = Set(department_id);
    }
    if let Some(designation_id) = changes.designation_id {
        active.designation_id = Set(designation_id);
    }
    if let Some(date_of_joining) = changes.date_of_joining {
        active.date_of_joining = Set(date_of_joining);
    }
    if let Some(salary) = changes.basic_salary_cents {
        active.basic_salary_cents = Set(salary);
    }
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

/// Removes an employee by deleting the owning principal; the cascade
/// takes the employee row, credential and profile with it.
pub async fn delete_employee(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> DirectoryResult<()> {
    ensure_allowed(actor, Action::ManageEmployee)?;
    let record = employee::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DirectoryError::NotFound("employee"))?;
    app_user::Entity::delete_by_id(record.user_id)
        .exec(db)
        .await?;
    Ok(())
}

pub async fn list_departments(
    db: &DatabaseConnection,
    actor: &Actor,
) -> DirectoryResult<Vec<department::Model>> {
    ensure_allowed(actor, Action::ListDepartments)?;
    Ok(department::Entity::find()
        .order_by_asc(department::Column::Name)
        .all(db)
        .await?)
}

pub async fn list_designations(
    db: &DatabaseConnection,
    actor: &Actor,
) -> DirectoryResult<Vec<designation::Model>> {
    ensure_allowed(actor, Action::ListDesignations)?;
    Ok(designation::Entity::find()
        .order_by_asc(designation::Column::Title)
        .all(db)
        .await?)
}

/// A null manager id clears the assignment. Membership of the manager in
/// the department is not validated; cross-department managers are
/// accepted as in the source data model.
pub async fn assign_department_manager(
    db: &DatabaseConnection,
    actor: &Actor,
    department_id: Uuid,
    manager_id: Option<Uuid>,
) -> DirectoryResult<department::Model> {
    ensure_allowed(actor, Action::AssignDepartmentManager)?;
    let dept = department::Entity::find_by_id(department_id)
        .one(db)
        .await?
        .ok_or(DirectoryError::NotFound("department"))?;
    if let Some(id) = manager_id {
        employee::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DirectoryError::NotFound("employee"))?;
    }
    let mut active: department::ActiveModel = dept.into();
    active.manager_id = Set(manager_id);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

/// Get-or-create keyed on the principal. Concurrent first accesses are
/// serialized by the unique index on `user_id`; the loser re-reads.
pub async fn ensure_profile(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> DirectoryResult<employee_profile::Model> {
    if let Some(profile) = employee_profile::Entity::find()
        .filter(employee_profile::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(profile);
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let inserted = employee_profile::ActiveModel {
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
    .await;
    match inserted {
        Ok(profile) => Ok(profile),
        Err(_) => employee_profile::Entity::find()
            .filter(employee_profile::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(DirectoryError::NotFound("profile")),
    }
}

/// Own profile; never an error for principals without employee records.
pub async fn my_profile(db: &DatabaseConnection, actor: &Actor) -> DirectoryResult<ProfileView> {
    ensure_allowed(actor, Action::ViewOwnProfile)?;
    let profile = ensure_profile(db, actor.user_id).await?;
    let record = employee::Entity::find()
        .filter(employee::Column::UserId.eq(actor.user_id))
        .one(db)
        .await?;
    Ok(ProfileView {
        profile,
        employee: record,
    })
}

/// Target-scoped profile view. The target resolves to self when no id is
/// given; the policy table then decides.
pub async fn view_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    target_id: Option<Uuid>,
) -> DirectoryResult<(employee::Model, Option<app_user::Model>, employee_profile::Model)> {
    let resolved_id = match target_id {
        Some(id) => id,
        None => match &actor.own_employee {
            Some(own) => own.employee_id,
            None => return Err(DirectoryError::PermissionDenied),
        },
    };
    let (target, owner) = employee::Entity::find_by_id(resolved_id)
        .find_also_related(app_user::Entity)
        .one(db)
        .await?
        .ok_or(DirectoryError::NotFound("employee"))?;
    ensure_allowed(actor, Action::ViewProfile(scope_of(&target)))?;
    let profile = ensure_profile(db, target.user_id).await?;
    Ok((target, owner, profile))
}

/// Applies the submitted fields and unconditionally resets verification,
/// even when nothing actually changed.
pub async fn update_my_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    changes: ProfileUpdate,
) -> DirectoryResult<employee_profile::Model> {
    ensure_allowed(actor, Action::UpdateOwnProfile)?;
    let profile = ensure_profile(db, actor.user_id).await?;
    let state = VerificationState::from_flag(profile.verified);
    let mut active: employee_profile::ActiveModel = profile.into();
    if let Some(phone) = changes.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(address) = changes.address {
        active.address = Set(Some(address));
    }
    if let Some(city) = changes.city {
        active.city = Set(Some(city));
    }
    if let Some(emergency_contact) = changes.emergency_contact {
        active.emergency_contact = Set(Some(emergency_contact));
    }
    if let Some(date_of_birth) = changes.date_of_birth {
        active.date_of_birth = Set(Some(date_of_birth));
    }
    active.verified = Set(state.after_owner_edit().as_flag());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub async fn pending_profiles(
    db: &DatabaseConnection,
    actor: &Actor,
) -> DirectoryResult<Vec<(employee_profile::Model, app_user::Model)>> {
    ensure_allowed(actor, Action::ListPendingProfiles)?;
    let rows = employee_profile::Entity::find()
        .filter(employee_profile::Column::Verified.eq(false))
        .find_also_related(app_user::Entity)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(profile, owner)| {
            let owner = owner?;
            let state = VerificationState::from_flag(profile.verified);
            awaits_approval(state, Role::from(owner.role)).then(|| (profile, owner))
        })
        .collect())
}

pub async fn approve_profile(
    db: &DatabaseConnection,
    actor: &Actor,
    profile_id: Uuid,
) -> DirectoryResult<employee_profile::Model> {
    ensure_allowed(actor, Action::ApproveProfile)?;
    let profile = employee_profile::Entity::find_by_id(profile_id)
        .one(db)
        .await?
        .ok_or(DirectoryError::NotFound("profile"))?;
    let state = VerificationState::from_flag(profile.verified);
    if state == VerificationState::Verified {
        return Ok(profile);
    }
    let mut active: employee_profile::ActiveModel = profile.into();
    active.verified = Set(state.approve().as_flag());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub fn hash_password(password: &str) -> DirectoryResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| DirectoryError::Internal(format!("hash error: {}", err)))
}

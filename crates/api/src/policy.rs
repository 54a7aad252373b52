//! Access-control decisions for the directory.
//!
//! One pure function owns every rule so the handlers cannot drift apart.
//! Decisions are computed over data the caller has already resolved;
//! nothing here performs a lookup.

use uuid::Uuid;

use crate::auth::Role;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Allow,
    Deny,
}

/// The slice of an employee record the policy needs for self and
/// department comparisons.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EmployeeScope {
    pub employee_id: Uuid,
    pub user_id: Uuid,
    pub department_id: Uuid,
}

/// The acting principal. `own_employee` is absent for principals without
/// a staffing record (typical for ADMIN and HR accounts).
#[derive(Clone, Debug)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub own_employee: Option<EmployeeScope>,
}

#[derive(Clone, Copy, Debug)]
pub enum Action {
    ListEmployees,
    CreateEmployee,
    /// Read, update or delete an arbitrary employee record by id.
    ManageEmployee,
    ListDepartments,
    ListDesignations,
    AssignDepartmentManager,
    ViewOwnProfile,
    /// View the profile of a resolved target employee.
    ViewProfile(EmployeeScope),
    ListPendingProfiles,
    ApproveProfile,
    UpdateOwnProfile,
}

pub fn decide(actor: &Actor, action: Action) -> Decision {
    match action {
        Action::ListEmployees
        | Action::CreateEmployee
        | Action::ManageEmployee
        | Action::AssignDepartmentManager
        | Action::ListPendingProfiles
        | Action::ApproveProfile => administrative(actor.role),
        Action::ListDepartments
        | Action::ListDesignations
        | Action::ViewOwnProfile
        | Action::UpdateOwnProfile => Decision::Allow,
        Action::ViewProfile(target) => view_profile(actor, target),
    }
}

fn administrative(role: Role) -> Decision {
    if role.is_admin() {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

fn view_profile(actor: &Actor, target: EmployeeScope) -> Decision {
    if actor.role.is_admin() {
        return Decision::Allow;
    }
    // Fail closed: without an employee record of their own there is no
    // self or department to compare against.
    let Some(own) = actor.own_employee else {
        return Decision::Deny;
    };
    if own.employee_id == target.employee_id {
        return Decision::Allow;
    }
    match actor.role {
        Role::Manager if own.department_id == target.department_id => Decision::Allow,
        _ => Decision::Deny,
    }
}

//! Profile verification workflow.
//!
//! Two states, two transitions. Approval is an explicit HR/ADMIN action;
//! any successful edit by the owner drops the profile back to
//! `Unverified`, whether or not a field actually changed.

use crate::auth::Role;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerificationState {
    Unverified,
    Verified,
}

impl VerificationState {
    pub fn from_flag(verified: bool) -> Self {
        if verified {
            VerificationState::Verified
        } else {
            VerificationState::Unverified
        }
    }

    pub fn as_flag(self) -> bool {
        matches!(self, VerificationState::Verified)
    }

    /// Administrative approval. Approving an already verified profile is
    /// a no-op, not an error.
    pub fn approve(self) -> Self {
        VerificationState::Verified
    }

    /// Unconditional reset on every successful owner self-edit.
    pub fn after_owner_edit(self) -> Self {
        VerificationState::Unverified
    }
}

/// A profile sits in the approval queue only while unverified and owned
/// by a plain EMPLOYEE; unverified MANAGER/HR/ADMIN profiles never queue.
pub fn awaits_approval(state: VerificationState, owner_role: Role) -> bool {
    state == VerificationState::Unverified && owner_role == Role::Employee
}

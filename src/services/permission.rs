//! Ownership checks for mutating operations

use crate::models::UserRole;

/// Whether `requester_id` may modify a resource owned by `owner_id`.
///
/// Owners may always modify their own resources; admins may modify any.
pub fn can_modify(owner_id: i64, requester_id: i64, requester_role: UserRole) -> bool {
    owner_id == requester_id || requester_role == UserRole::Admin
}

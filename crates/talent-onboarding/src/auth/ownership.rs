use super::session::{Principal, UserId};
use crate::error::ServiceError;

/// True iff the principal is an admin or the user that owns the resource.
pub fn can_mutate(principal: &Principal, owner: UserId) -> bool {
    principal.is_admin() || principal.user_id() == Some(owner)
}

pub fn ensure_can_mutate(
    principal: &Principal,
    owner: UserId,
    noun: &str,
) -> Result<(), ServiceError> {
    if can_mutate(principal, owner) {
        Ok(())
    } else {
        Err(ServiceError::forbidden(format!(
            "You can only modify your own {noun}"
        )))
    }
}

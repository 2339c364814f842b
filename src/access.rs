//! Access-control boundary
//!
//! Services ask an [`AccessControl`] implementation before every gated
//! operation. The default implementation trusts the capabilities carried
//! in the caller's verified token.

use crate::{
    error::{AppError, AppResult},
    models::{Capability, UserClaims},
};

#[cfg_attr(test, mockall::automock)]
pub trait AccessControl: Send + Sync {
    fn has_capability(&self, caller: &UserClaims, capability: Capability) -> bool;
}

/// Grants exactly the capabilities listed in the token claims
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsAccessControl;

impl AccessControl for ClaimsAccessControl {
    fn has_capability(&self, caller: &UserClaims, capability: Capability) -> bool {
        caller.has(capability)
    }
}

/// Fail with `PermissionDenied` unless the caller holds `capability`
pub fn require(
    access: &dyn AccessControl,
    caller: &UserClaims,
    capability: Capability,
) -> AppResult<()> {
    if access.has_capability(caller, capability) {
        Ok(())
    } else {
        tracing::debug!(user = %caller.sub, %capability, "capability check failed");
        Err(AppError::PermissionDenied(format!(
            "Capability '{}' required",
            capability
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_access_control() {
        let librarian = UserClaims::new(1, "lib", vec![Capability::CanMarkReturned], 1);
        let member = UserClaims::new(2, "member", vec![], 1);
        let access = ClaimsAccessControl;

        assert!(require(&access, &librarian, Capability::CanMarkReturned).is_ok());
        assert!(matches!(
            require(&access, &member, Capability::CanMarkReturned),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_require_consults_provider() {
        let mut access = MockAccessControl::new();
        access
            .expect_has_capability()
            .withf(|caller, cap| caller.user_id == 2 && *cap == Capability::CanMarkReturned)
            .times(1)
            .return_const(true);

        let member = UserClaims::new(2, "member", vec![], 1);
        assert!(require(&access, &member, Capability::CanMarkReturned).is_ok());
    }
}

use serde::{Deserialize, Serialize};

use crate::{CompanyId, UserId};

/// Caller identity supplied by the external authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    display_name: String,
    company_id: Option<CompanyId>,
}

impl UserIdentity {
    /// Creates an identity from authentication and session data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        company_id: Option<CompanyId>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            company_id,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the company selected in the session, if any.
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }
}

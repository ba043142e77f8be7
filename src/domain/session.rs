use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Requester,
    Reviewer,
    Viewer,
}

/// Role-gated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateRequest,
    EditQuantity,
    WithdrawRequest,
    ReviewItem,
    ReviewRequest,
    ManageRacks,
    ManageSettings,
}

/// Landing view for a freshly authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeView {
    Dashboard,
    CreateRequest,
    ReviewQueue,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Requester => "Requester",
            Role::Reviewer => "Reviewer",
            Role::Viewer => "viewer",
        }
    }

    pub fn permits(self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Requester => matches!(
                action,
                Action::CreateRequest | Action::EditQuantity | Action::WithdrawRequest
            ),
            Role::Reviewer => matches!(action, Action::ReviewItem | Action::ReviewRequest),
            Role::Viewer => false,
        }
    }

    pub fn authorize(self, action: Action) -> Result<(), DomainError> {
        if self.permits(action) {
            Ok(())
        } else {
            Err(DomainError::Forbidden { role: self, action })
        }
    }

    pub fn home_view(self) -> Option<HomeView> {
        match self {
            Role::Admin => Some(HomeView::Dashboard),
            Role::Requester => Some(HomeView::CreateRequest),
            Role::Reviewer => Some(HomeView::ReviewQueue),
            Role::Viewer => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Requester" => Ok(Role::Requester),
            "Reviewer" => Ok(Role::Reviewer),
            "viewer" | "Viewer" => Ok(Role::Viewer),
            other => Err(DomainError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::CreateRequest => "create requests",
            Action::EditQuantity => "edit requested quantities",
            Action::WithdrawRequest => "withdraw requests",
            Action::ReviewItem => "review line items",
            Action::ReviewRequest => "review whole requests",
            Action::ManageRacks => "manage rack slots",
            Action::ManageSettings => "manage settings",
        };
        f.write_str(s)
    }
}

/// An authenticated user. Held by the session manager and handed to whatever
/// needs the bearer token or the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
}

impl Session {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

use super::errors::DomainError;
use super::session::Role;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    pub system_mail: String,
    pub smtp_password: String,
    pub request_creator: String,
    pub viewer_mail: String,
    pub low_stock_mail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), DomainError> {
        let missing: Vec<&str> = [
            ("user_name", &self.user_name),
            ("email", &self.email),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidInput(format!(
                "missing fields: {}",
                missing.join(", ")
            )))
        }
    }
}

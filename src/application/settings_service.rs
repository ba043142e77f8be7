use crate::domain::ports::SettingsGateway;
use crate::domain::session::{Action, Session};
use crate::domain::settings::{MailSettings, NewUser, UserAccount};
use crate::errors::AppError;

/// Mail and user administration. Everything except the reviewer list is
/// admin-only.
pub struct SettingsService<G> {
    gateway: G,
    session: Session,
}

impl<G: SettingsGateway> SettingsService<G> {
    pub fn new(gateway: G, session: Session) -> Self {
        Self { gateway, session }
    }

    pub async fn mail_settings(&self) -> Result<MailSettings, AppError> {
        self.session.role.authorize(Action::ManageSettings)?;
        self.gateway.mail_settings(&self.session).await
    }

    pub async fn save_mail_settings(&self, settings: &MailSettings) -> Result<(), AppError> {
        self.session.role.authorize(Action::ManageSettings)?;
        self.gateway.update_mail_settings(&self.session, settings).await?;
        log::info!("Mail settings saved");
        Ok(())
    }

    pub async fn users(&self) -> Result<Vec<UserAccount>, AppError> {
        self.session.role.authorize(Action::ManageSettings)?;
        self.gateway.users(&self.session).await
    }

    pub async fn save_users(&self, users: &[UserAccount]) -> Result<(), AppError> {
        self.session.role.authorize(Action::ManageSettings)?;
        self.gateway.update_users(&self.session, users).await
    }

    pub async fn add_user(&self, user: &NewUser) -> Result<UserAccount, AppError> {
        self.session.role.authorize(Action::ManageSettings)?;
        user.validate()?;
        let created = self.gateway.add_user(&self.session, user).await?;
        log::info!("Added user {} ({})", created.user_name, created.role);
        Ok(created)
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.session.role.authorize(Action::ManageSettings)?;
        self.gateway.delete_user(&self.session, user_id).await?;
        log::info!("Deleted user {user_id}");
        Ok(())
    }

    /// Reviewers a requester can address a request to.
    pub async fn reviewers(&self) -> Result<Vec<UserAccount>, AppError> {
        self.gateway.reviewers(&self.session).await
    }
}

use async_trait::async_trait;

use crate::errors::AppError;

use super::builder::DraftLineItem;
use super::inventory::{CatalogQuery, CatalogResult, DashboardTile, RackSlot, RackSlotUpdate};
use super::request::{LineKey, RequestId, RequestLineItem};
use super::session::Session;
use super::settings::{MailSettings, NewUser, UserAccount};
use super::status::LineStatus;

/// Which request list a view polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFeed {
    /// Every request visible to the signed-in user.
    All,
    /// Requests the review queue still has to act on.
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[async_trait]
pub trait AuthGateway: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> Result<Session, AppError>;
}

#[async_trait]
pub trait CatalogPort: Send + Sync + 'static {
    async fn search(&self, session: &Session, query: &CatalogQuery) -> Result<CatalogResult, AppError>;
}

#[async_trait]
pub trait RequestGateway: Send + Sync + 'static {
    /// Creates one request holding every line of `lines`.
    async fn create_request(
        &self,
        session: &Session,
        lines: &[DraftLineItem],
    ) -> Result<RequestId, AppError>;

    async fn list_requests(&self, session: &Session, feed: RequestFeed) -> Result<Vec<RequestLineItem>, AppError>;

    async fn update_item_status(
        &self,
        session: &Session,
        key: &LineKey,
        status: LineStatus,
    ) -> Result<(), AppError>;

    async fn update_item_quantity(
        &self,
        session: &Session,
        key: &LineKey,
        requested_quantity: u32,
    ) -> Result<(), AppError>;

    /// Applies `status` to every line item of the request in one call.
    async fn update_request_status(
        &self,
        session: &Session,
        id: RequestId,
        status: LineStatus,
    ) -> Result<(), AppError>;

    async fn delete_request(&self, session: &Session, id: RequestId) -> Result<(), AppError>;
}

#[async_trait]
pub trait RackGateway: Send + Sync + 'static {
    async fn list_slots(&self, session: &Session) -> Result<Vec<RackSlot>, AppError>;
    async fn create_slot(&self, session: &Session, slot: &RackSlot) -> Result<(), AppError>;
    async fn update_slot(&self, session: &Session, id: &str, update: &RackSlotUpdate) -> Result<(), AppError>;
    async fn delete_slot(&self, session: &Session, id: &str) -> Result<(), AppError>;
    async fn flash_slot(&self, session: &Session, id: &str, on: bool) -> Result<(), AppError>;
    async fn dashboard(&self, session: &Session) -> Result<Vec<DashboardTile>, AppError>;
}

#[async_trait]
pub trait SettingsGateway: Send + Sync + 'static {
    async fn mail_settings(&self, session: &Session) -> Result<MailSettings, AppError>;
    async fn update_mail_settings(&self, session: &Session, settings: &MailSettings) -> Result<(), AppError>;
    async fn users(&self, session: &Session) -> Result<Vec<UserAccount>, AppError>;
    async fn update_users(&self, session: &Session, users: &[UserAccount]) -> Result<(), AppError>;
    async fn add_user(&self, session: &Session, user: &NewUser) -> Result<UserAccount, AppError>;
    async fn delete_user(&self, session: &Session, user_id: &str) -> Result<(), AppError>;
    async fn reviewers(&self, session: &Session) -> Result<Vec<UserAccount>, AppError>;
}

/// Persistence for the signed-in session across restarts.
pub trait SessionStore: Send + Sync + 'static {
    fn load(&self) -> Result<Option<Session>, AppError>;
    fn save(&self, session: &Session) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// Asks the user to confirm a state-changing action.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything. For unattended use.
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

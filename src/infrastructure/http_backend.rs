use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use crate::domain::builder::DraftLineItem;
use crate::domain::inventory::{
    CatalogQuery, CatalogResult, DashboardTile, InventorySlot, RackSlot, RackSlotUpdate,
};
use crate::domain::ports::{
    AuthGateway, CatalogPort, Credentials, RackGateway, RequestFeed, RequestGateway,
    SettingsGateway,
};
use crate::domain::request::{LineKey, RequestId, RequestLineItem};
use crate::domain::session::{Role, Session};
use crate::domain::settings::{MailSettings, NewUser, UserAccount};
use crate::domain::status::LineStatus;
use crate::errors::AppError;

use super::dto::{
    CreateRequestBody, CreateRequestResponse, DashboardTileDto, DraftLineDto, ErrorBody, FlashBody,
    LoginBody, LoginResponseDto, MailSettingsDto, NewUserBody, NewUserResponse, NoticeDto,
    ProductDto, ProductQueryBody, QuantityBody, RackSlotDto, RackSlotUpdateBody, RequestRowDto,
    StatusBody, UserDto,
};

// ── Response checks (transport concern only) ─────────────────────────────────

async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::BAD_REQUEST => {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            Err(AppError::ServerValidation(
                body.into_message()
                    .unwrap_or_else(|| "The request was rejected.".to_string()),
            ))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Network(format!("HTTP {}: {}", status.as_u16(), body)))
        }
    }
}

async fn send(request: RequestBuilder) -> Result<Response, AppError> {
    check(request.send().await?).await
}

// ── Backend ──────────────────────────────────────────────────────────────────

/// reqwest implementation of every backend port.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` is `scheme://host:port`, without the `/api` suffix.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn get(&self, session: &Session, path: &str) -> RequestBuilder {
        self.client.get(self.api(path)).bearer_auth(&session.token)
    }

    fn post(&self, session: &Session, path: &str) -> RequestBuilder {
        self.client.post(self.api(path)).bearer_auth(&session.token)
    }

    fn put(&self, session: &Session, path: &str) -> RequestBuilder {
        self.client.put(self.api(path)).bearer_auth(&session.token)
    }

    fn delete(&self, session: &Session, path: &str) -> RequestBuilder {
        self.client.delete(self.api(path)).bearer_auth(&session.token)
    }

    /// `{base}/api/{prefix}` followed by `segments`, each percent-encoded so
    /// ids containing `/`, `#` or `?` stay in their own path segment.
    fn segment_url(&self, prefix: &str, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.api(prefix))
            .map_err(|e| AppError::Config(format!("invalid backend URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| AppError::Config(format!("backend URL cannot carry a path: {}", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    fn item_url(&self, prefix: &str, key: &LineKey) -> Result<Url, AppError> {
        let request = key.request_id.to_string();
        let line = key.line_id.to_string();
        self.segment_url(prefix, &[request.as_str(), key.product_code.as_str(), line.as_str()])
    }

    fn put_item(&self, session: &Session, prefix: &str, key: &LineKey) -> Result<RequestBuilder, AppError> {
        Ok(self
            .client
            .put(self.item_url(prefix, key)?)
            .bearer_auth(&session.token))
    }

    async fn users_from(&self, session: &Session, path: &str, default_role: Role) -> Result<Vec<UserAccount>, AppError> {
        let rows: Vec<UserDto> = send(self.get(session, path)).await?.json().await?;
        rows.into_iter()
            .map(|row| row.into_account(default_role))
            .collect()
    }
}

#[async_trait]
impl AuthGateway for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let response = send(
            self.client
                .post(format!("{}/auth/login", self.base_url))
                .json(&LoginBody {
                    username: &credentials.username,
                    password: &credentials.password,
                }),
        )
        .await?;
        let dto: LoginResponseDto = response.json().await?;
        dto.into_session(&credentials.username)
    }
}

#[async_trait]
impl CatalogPort for HttpBackend {
    async fn search(&self, session: &Session, query: &CatalogQuery) -> Result<CatalogResult, AppError> {
        let response = send(self.post(session, "product_detail").json(&ProductQueryBody {
            product_code: &query.product_code,
            product_description: &query.description,
            product_standard: &query.standard,
        }))
        .await?;

        if response.status() == StatusCode::ACCEPTED {
            let notice: NoticeDto = response.json().await?;
            return Ok(CatalogResult::Notice(notice.message));
        }

        let rows: Vec<ProductDto> = response.json().await?;
        let slots = rows
            .into_iter()
            .map(InventorySlot::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CatalogResult::Slots(slots))
    }
}

#[async_trait]
impl RequestGateway for HttpBackend {
    async fn create_request(
        &self,
        session: &Session,
        lines: &[DraftLineItem],
    ) -> Result<RequestId, AppError> {
        let body = CreateRequestBody {
            input: lines.iter().map(DraftLineDto::from).collect(),
            user_id: &session.user_id,
        };
        let created: CreateRequestResponse = send(self.post(session, "requests").json(&body))
            .await?
            .json()
            .await?;
        Ok(RequestId(created.request_id.as_u64("request_id")?))
    }

    async fn list_requests(&self, session: &Session, feed: RequestFeed) -> Result<Vec<RequestLineItem>, AppError> {
        let path = match feed {
            RequestFeed::All => "requests",
            RequestFeed::Active => "getactivereqeusts",
        };
        let rows: Vec<RequestRowDto> = send(self.get(session, path)).await?.json().await?;
        rows.into_iter().map(RequestLineItem::try_from).collect()
    }

    async fn update_item_status(
        &self,
        session: &Session,
        key: &LineKey,
        status: LineStatus,
    ) -> Result<(), AppError> {
        send(
            self.put_item(session, "updaterequests", key)?
                .json(&StatusBody { status }),
        )
        .await?;
        Ok(())
    }

    async fn update_item_quantity(
        &self,
        session: &Session,
        key: &LineKey,
        requested_quantity: u32,
    ) -> Result<(), AppError> {
        send(
            self.put_item(session, "updaterequestquantity", key)?
                .json(&QuantityBody { requested_quantity }),
        )
        .await?;
        Ok(())
    }

    async fn update_request_status(
        &self,
        session: &Session,
        id: RequestId,
        status: LineStatus,
    ) -> Result<(), AppError> {
        send(
            self.put(session, &format!("requests/{id}"))
                .json(&StatusBody { status }),
        )
        .await?;
        Ok(())
    }

    async fn delete_request(&self, session: &Session, id: RequestId) -> Result<(), AppError> {
        send(self.delete(session, &format!("requests/{id}"))).await?;
        Ok(())
    }
}

#[async_trait]
impl RackGateway for HttpBackend {
    async fn list_slots(&self, session: &Session) -> Result<Vec<RackSlot>, AppError> {
        let rows: Vec<RackSlotDto> = send(self.get(session, "rack_data")).await?.json().await?;
        rows.into_iter().map(RackSlot::try_from).collect()
    }

    async fn create_slot(&self, session: &Session, slot: &RackSlot) -> Result<(), AppError> {
        send(self.post(session, "rack_data").json(&RackSlotDto::from(slot))).await?;
        Ok(())
    }

    async fn update_slot(&self, session: &Session, id: &str, update: &RackSlotUpdate) -> Result<(), AppError> {
        send(
            self.client
                .put(self.segment_url("rack_data", &[id])?)
                .bearer_auth(&session.token)
                .json(&RackSlotUpdateBody::from(update)),
        )
        .await?;
        Ok(())
    }

    async fn delete_slot(&self, session: &Session, id: &str) -> Result<(), AppError> {
        send(
            self.client
                .delete(self.segment_url("rack_data", &[id])?)
                .bearer_auth(&session.token),
        )
        .await?;
        Ok(())
    }

    async fn flash_slot(&self, session: &Session, id: &str, on: bool) -> Result<(), AppError> {
        send(self.post(session, "get_flash_light").json(&FlashBody { id, flash: on })).await?;
        Ok(())
    }

    async fn dashboard(&self, session: &Session) -> Result<Vec<DashboardTile>, AppError> {
        let tiles: Vec<DashboardTileDto> = send(self.get(session, "dashboard_data")).await?.json().await?;
        Ok(tiles.into_iter().map(DashboardTile::from).collect())
    }
}

#[async_trait]
impl SettingsGateway for HttpBackend {
    async fn mail_settings(&self, session: &Session) -> Result<MailSettings, AppError> {
        let rows: Vec<MailSettingsDto> = send(self.get(session, "mail_settings")).await?.json().await?;
        Ok(rows.into_iter().next().unwrap_or_default().into())
    }

    async fn update_mail_settings(&self, session: &Session, settings: &MailSettings) -> Result<(), AppError> {
        let body = vec![MailSettingsDto::from(settings)];
        send(self.put(session, "mail_settings").json(&body)).await?;
        Ok(())
    }

    async fn users(&self, session: &Session) -> Result<Vec<UserAccount>, AppError> {
        self.users_from(session, "password_settings", Role::Viewer).await
    }

    async fn update_users(&self, session: &Session, users: &[UserAccount]) -> Result<(), AppError> {
        let body: Vec<UserDto> = users.iter().map(UserDto::from).collect();
        send(self.put(session, "password_settings").json(&body)).await?;
        Ok(())
    }

    async fn add_user(&self, session: &Session, user: &NewUser) -> Result<UserAccount, AppError> {
        let created: NewUserResponse = send(
            self.post(session, "add_new_user")
                .json(&NewUserBody::from(user)),
        )
        .await?
        .json()
        .await?;
        created.new_user.into_account(user.role)
    }

    async fn delete_user(&self, session: &Session, user_id: &str) -> Result<(), AppError> {
        send(
            self.client
                .delete(self.segment_url("deleteuser", &[user_id])?)
                .bearer_auth(&session.token),
        )
        .await?;
        Ok(())
    }

    async fn reviewers(&self, session: &Session) -> Result<Vec<UserAccount>, AppError> {
        self.users_from(session, "getreviewers", Role::Reviewer).await
    }
}

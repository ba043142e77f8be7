//! Wire shapes of the warehouse backend and their conversion into domain types.
//!
//! Every conversion is fallible: a payload with a negative quantity, an
//! unknown status or an unreadable timestamp is rejected with
//! [`AppError::MalformedResponse`] instead of leaking into the views.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::builder::DraftLineItem;
use crate::domain::inventory::{DashboardTile, InventorySlot, RackSlot, RackSlotUpdate, SlotFill};
use crate::domain::request::{LineTimestamps, RequestId, RequestLineItem};
use crate::domain::session::{Role, Session};
use crate::domain::settings::{MailSettings, NewUser, UserAccount};
use crate::domain::status::LineStatus;
use crate::errors::AppError;

fn malformed(msg: impl Into<String>) -> AppError {
    AppError::MalformedResponse(msg.into())
}

// ── Scalars ──────────────────────────────────────────────────────────────────

/// The backend sends ids and counts either as JSON numbers or as strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_i64(&self, field: &str) -> Result<i64, AppError> {
        match self {
            Scalar::Int(n) => Ok(*n),
            Scalar::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            Scalar::Float(f) => Err(malformed(format!("{field}: expected an integer, got {f}"))),
            Scalar::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| malformed(format!("{field}: expected an integer, got '{s}'"))),
        }
    }

    pub fn as_f64(&self, field: &str) -> Result<f64, AppError> {
        match self {
            Scalar::Int(n) => Ok(*n as f64),
            Scalar::Float(f) => Ok(*f),
            Scalar::Text(s) if s.trim().is_empty() => Ok(0.0),
            Scalar::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| malformed(format!("{field}: expected a number, got '{s}'"))),
        }
    }

    pub fn as_u64(&self, field: &str) -> Result<u64, AppError> {
        let n = self.as_i64(field)?;
        u64::try_from(n).map_err(|_| malformed(format!("{field}: must not be negative, got {n}")))
    }

    pub fn as_u32(&self, field: &str) -> Result<u32, AppError> {
        let n = self.as_i64(field)?;
        u32::try_from(n).map_err(|_| malformed(format!("{field}: out of range, got {n}")))
    }

    pub fn to_id_string(&self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

fn opt_u32(value: &Option<Scalar>, field: &str) -> Result<u32, AppError> {
    value.as_ref().map_or(Ok(0), |v| v.as_u32(field))
}

fn opt_f64(value: &Option<Scalar>, field: &str) -> Result<f64, AppError> {
    value.as_ref().map_or(Ok(0.0), |v| v.as_f64(field))
}

/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` (taken as UTC). Blank means unset.
pub fn parse_timestamp(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| malformed(format!("{field}: unreadable timestamp '{raw}'")))
}

/// Error payload of a rejected call.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginUserDto {
    pub id: Scalar,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponseDto {
    pub token: String,
    pub user: LoginUserDto,
}

impl LoginResponseDto {
    pub fn into_session(self, user_name: &str) -> Result<Session, AppError> {
        if self.token.trim().is_empty() {
            return Err(malformed("login: empty token"));
        }
        let role = self
            .user
            .role
            .parse::<Role>()
            .map_err(|e| malformed(format!("login: {e}")))?;
        Ok(Session {
            token: self.token,
            user_id: self.user.id.to_id_string(),
            user_name: user_name.to_string(),
            role,
        })
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProductQueryBody<'a> {
    pub product_code: &'a str,
    pub product_description: &'a str,
    pub product_standard: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ProductDto {
    pub id: Option<Scalar>,
    pub product_code: String,
    pub quantity: Scalar,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub standard: Option<String>,
}

impl TryFrom<ProductDto> for InventorySlot {
    type Error = AppError;

    fn try_from(dto: ProductDto) -> Result<Self, Self::Error> {
        Ok(InventorySlot {
            id: dto.id.as_ref().map(Scalar::to_id_string),
            available_quantity: dto.quantity.as_u32("quantity")?,
            product_code: dto.product_code,
            description: dto.description.unwrap_or_default(),
            standard: dto.standard.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NoticeDto {
    pub message: String,
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DraftLineDto<'a> {
    #[serde(rename = "productCode")]
    pub product_code: &'a str,
    #[serde(rename = "requestedQuantity")]
    pub requested_quantity: u32,
    pub description: &'a str,
    pub standard: &'a str,
    #[serde(rename = "availableQty")]
    pub available_qty: u32,
}

impl<'a> From<&'a DraftLineItem> for DraftLineDto<'a> {
    fn from(line: &'a DraftLineItem) -> Self {
        Self {
            product_code: &line.product_code,
            requested_quantity: line.requested_quantity,
            description: &line.description,
            standard: &line.standard,
            available_qty: line.available_quantity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRequestBody<'a> {
    pub input: Vec<DraftLineDto<'a>>,
    #[serde(rename = "userId")]
    pub user_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestResponse {
    pub request_id: Scalar,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: LineStatus,
}

#[derive(Debug, Serialize)]
pub struct QuantityBody {
    #[serde(rename = "requestedQuantity")]
    pub requested_quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestRowDto {
    pub id: Scalar,
    pub adding_number: Scalar,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, rename = "selectedViewer")]
    pub selected_viewer: Option<String>,
    #[serde(rename = "productCode")]
    pub product_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(rename = "requestedQuantity")]
    pub requested_quantity: Scalar,
    #[serde(default, rename = "availableQuantity")]
    pub available_quantity: Option<Scalar>,
    pub status: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub preparing_at: Option<String>,
    #[serde(default)]
    pub ready_at: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
}

impl TryFrom<RequestRowDto> for RequestLineItem {
    type Error = AppError;

    fn try_from(dto: RequestRowDto) -> Result<Self, Self::Error> {
        let requested_quantity = dto.requested_quantity.as_u32("requestedQuantity")?;
        if requested_quantity == 0 {
            return Err(malformed("requestedQuantity: must be positive"));
        }
        let status = dto
            .status
            .parse::<LineStatus>()
            .map_err(|e| malformed(format!("status: {e}")))?;

        Ok(RequestLineItem {
            id: dto.id.as_u64("id")?,
            request_id: RequestId(dto.adding_number.as_u64("adding_number")?),
            product_code: dto.product_code,
            description: dto.description.unwrap_or_default(),
            standard: dto.standard.unwrap_or_default(),
            requested_quantity,
            available_quantity: opt_u32(&dto.available_quantity, "availableQuantity")?,
            status,
            requester_name: dto.user_name,
            reviewer: dto.selected_viewer,
            timestamps: LineTimestamps {
                updated: parse_timestamp("updated_at", dto.updated_at.as_deref())?,
                preparing: parse_timestamp("preparing_at", dto.preparing_at.as_deref())?,
                ready: parse_timestamp("ready_at", dto.ready_at.as_deref())?,
                cancelled: parse_timestamp("cancelled_at", dto.cancelled_at.as_deref())?,
            },
        })
    }
}

// ── Racks ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RackSlotDto {
    pub id: Scalar,
    pub rack: Scalar,
    pub level: Scalar,
    #[serde(default)]
    pub box_width_mm: Option<Scalar>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub quantity: Option<Scalar>,
    #[serde(default)]
    pub unit_weight_gram: Option<Scalar>,
    #[serde(default)]
    pub total_weight_kg: Option<Scalar>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub rfid: Option<String>,
}

fn parse_fill(raw: Option<&str>) -> Result<Option<SlotFill>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some("full") => Ok(Some(SlotFill::Full)),
        Some("medium") => Ok(Some(SlotFill::Medium)),
        Some("empty") => Ok(Some(SlotFill::Empty)),
        Some(other) => Err(malformed(format!("status: unknown slot fill '{other}'"))),
    }
}

fn fill_name(fill: SlotFill) -> &'static str {
    match fill {
        SlotFill::Full => "full",
        SlotFill::Medium => "medium",
        SlotFill::Empty => "empty",
    }
}

impl TryFrom<RackSlotDto> for RackSlot {
    type Error = AppError;

    fn try_from(dto: RackSlotDto) -> Result<Self, Self::Error> {
        Ok(RackSlot {
            id: dto.id.to_id_string(),
            rack: dto.rack.as_u32("rack")?,
            level: dto.level.as_u32("level")?,
            box_width_mm: opt_f64(&dto.box_width_mm, "box_width_mm")?,
            product_code: dto.product_code.unwrap_or_default(),
            description: dto.description.unwrap_or_default(),
            standard: dto.standard.unwrap_or_default(),
            quantity: opt_u32(&dto.quantity, "quantity")?,
            unit_weight_gram: opt_f64(&dto.unit_weight_gram, "unit_weight_gram")?,
            total_weight_kg: opt_f64(&dto.total_weight_kg, "total_weight_kg")?,
            fill: parse_fill(dto.status.as_deref())?,
            color: dto.color.unwrap_or_default(),
            rfid: dto.rfid.unwrap_or_default(),
        })
    }
}

impl From<&RackSlot> for RackSlotDto {
    fn from(slot: &RackSlot) -> Self {
        RackSlotDto {
            id: Scalar::Text(slot.id.clone()),
            rack: Scalar::Int(i64::from(slot.rack)),
            level: Scalar::Int(i64::from(slot.level)),
            box_width_mm: Some(Scalar::Float(slot.box_width_mm)),
            product_code: Some(slot.product_code.clone()),
            description: Some(slot.description.clone()),
            standard: Some(slot.standard.clone()),
            quantity: Some(Scalar::Int(i64::from(slot.quantity))),
            unit_weight_gram: Some(Scalar::Float(slot.unit_weight_gram)),
            total_weight_kg: Some(Scalar::Float(slot.total_weight_kg)),
            status: slot.fill.map(|f| fill_name(f).to_string()),
            color: Some(slot.color.clone()),
            rfid: Some(slot.rfid.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RackSlotUpdateBody<'a> {
    pub product_code: &'a str,
    pub description: &'a str,
    pub standard: &'a str,
    pub unit_weight_gram: f64,
    pub quantity: u32,
    pub total_weight_kg: f64,
}

impl<'a> From<&'a RackSlotUpdate> for RackSlotUpdateBody<'a> {
    fn from(update: &'a RackSlotUpdate) -> Self {
        Self {
            product_code: &update.product_code,
            description: &update.description,
            standard: &update.standard,
            unit_weight_gram: update.unit_weight_gram,
            quantity: update.quantity,
            total_weight_kg: update.total_weight_kg,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlashBody<'a> {
    pub id: &'a str,
    pub flash: bool,
}

#[derive(Debug, Deserialize)]
pub struct DashboardTileDto {
    pub id: Scalar,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "buttonLabel")]
    pub button_label: Option<String>,
}

impl From<DashboardTileDto> for DashboardTile {
    fn from(dto: DashboardTileDto) -> Self {
        DashboardTile {
            id: dto.id.to_id_string(),
            title: dto.title,
            description: dto.description.unwrap_or_default(),
            img: dto.img.unwrap_or_default(),
            online: dto.status.as_deref() == Some("ONLINE"),
            path: dto.path.unwrap_or_default(),
            button_label: dto.button_label.unwrap_or_default(),
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSettingsDto {
    #[serde(default)]
    pub system_mail: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default)]
    pub request_creator: String,
    #[serde(default)]
    pub viewer_mail: String,
    #[serde(default)]
    pub low_stock_mail: String,
}

impl From<MailSettingsDto> for MailSettings {
    fn from(dto: MailSettingsDto) -> Self {
        MailSettings {
            system_mail: dto.system_mail,
            smtp_password: dto.smtp_password,
            request_creator: dto.request_creator,
            viewer_mail: dto.viewer_mail,
            low_stock_mail: dto.low_stock_mail,
        }
    }
}

impl From<&MailSettings> for MailSettingsDto {
    fn from(settings: &MailSettings) -> Self {
        MailSettingsDto {
            system_mail: settings.system_mail.clone(),
            smtp_password: settings.smtp_password.clone(),
            request_creator: settings.request_creator.clone(),
            viewer_mail: settings.viewer_mail.clone(),
            low_stock_mail: settings.low_stock_mail.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserDto {
    pub user_id: Scalar,
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}

impl UserDto {
    /// `default_role` applies when the backend omits `user_role`.
    pub fn into_account(self, default_role: Role) -> Result<UserAccount, AppError> {
        let role = match self.user_role.as_deref() {
            None | Some("") => default_role,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| malformed(format!("user_role: {e}")))?,
        };
        Ok(UserAccount {
            user_id: self.user_id.to_id_string(),
            user_name: self.user_name,
            email: self.email,
            password: self.password,
            role,
        })
    }
}

impl From<&UserAccount> for UserDto {
    fn from(user: &UserAccount) -> Self {
        UserDto {
            user_id: Scalar::Text(user.user_id.clone()),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            user_role: Some(user.role.as_str().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewUserBody<'a> {
    pub user_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub user_role: &'a str,
}

impl<'a> From<&'a NewUser> for NewUserBody<'a> {
    fn from(user: &'a NewUser) -> Self {
        Self {
            user_name: &user.user_name,
            email: &user.email,
            password: &user.password,
            user_role: user.role.as_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewUserResponse {
    #[serde(rename = "newUser")]
    pub new_user: UserDto,
}

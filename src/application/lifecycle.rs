use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::errors::DomainError;
use crate::domain::ports::{Confirmation, RequestFeed, RequestGateway};
use crate::domain::request::{group_rows, Request, RequestId, RequestLineItem};
use crate::domain::session::{Action, Session};
use crate::domain::status::{ItemAction, LineStatus};
use crate::errors::AppError;

use super::lock;
use super::sync::{spawn_poller, EditOverlay, SyncHandle, SyncedView};

const QUANTITY_PROMPT: &str = "Are you sure you want to update the requested quantity?";
const CANCEL_REQUEST_PROMPT: &str = "Are you sure you want to cancel this request?";
const COMPLETE_REQUEST_PROMPT: &str = "Are you sure you want to mark this request as Ready?";
const WITHDRAW_PROMPT: &str = "Are you sure you want to withdraw this request?";

/// What happened to a confirmed-or-declined action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Declined,
}

/// Drives line items and whole requests through their status transitions.
///
/// Local state is never mutated optimistically: every accepted action is one
/// backend call followed by a re-fetch of the feed, and a failed call leaves
/// the last observed rows as they were.
pub struct LifecycleEngine<G> {
    gateway: G,
    session: Session,
    feed: RequestFeed,
    confirm: Box<dyn Confirmation>,
    rows: SyncedView<Vec<RequestLineItem>>,
    edits: Mutex<EditOverlay<u64, u32>>,
}

impl<G: RequestGateway> LifecycleEngine<G> {
    pub fn new(
        gateway: G,
        session: Session,
        feed: RequestFeed,
        confirm: Box<dyn Confirmation>,
    ) -> Self {
        Self {
            gateway,
            session,
            feed,
            confirm,
            rows: SyncedView::new(),
            edits: Mutex::new(EditOverlay::new()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch the feed and replace the rows if they changed.
    pub async fn refresh(&self) -> Result<bool, AppError> {
        let rows = self.gateway.list_requests(&self.session, self.feed).await?;
        lock(&self.edits).retain(|id| {
            rows.iter()
                .any(|row| row.id == *id && row.status.is_editable())
        });
        Ok(self.rows.apply(rows))
    }

    pub fn rows(&self) -> Vec<RequestLineItem> {
        self.rows
            .snapshot()
            .map(|rows| rows.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.rows
            .snapshot()
            .map(|rows| group_rows(&rows))
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Vec<RequestLineItem>>>> {
        self.rows.subscribe()
    }

    pub fn spawn_sync(self: &Arc<Self>, period: Duration) -> SyncHandle {
        let engine = Arc::clone(self);
        let label = match self.feed {
            RequestFeed::All => "requests",
            RequestFeed::Active => "active requests",
        };
        spawn_poller(label, period, move || {
            let engine = Arc::clone(&engine);
            async move { engine.refresh().await }
        })
    }

    // ── Per-item actions ────────────────────────────────────────────────────

    pub async fn begin_prepare(&self, line_id: u64) -> Result<ActionOutcome, AppError> {
        self.apply_item_action(line_id, ItemAction::BeginPrepare).await
    }

    pub async fn cancel_item(&self, line_id: u64) -> Result<ActionOutcome, AppError> {
        self.apply_item_action(line_id, ItemAction::Cancel).await
    }

    pub async fn mark_item_ready(&self, line_id: u64) -> Result<ActionOutcome, AppError> {
        self.apply_item_action(line_id, ItemAction::MarkReady).await
    }

    pub async fn apply_item_action(
        &self,
        line_id: u64,
        action: ItemAction,
    ) -> Result<ActionOutcome, AppError> {
        self.session.role.authorize(Action::ReviewItem)?;
        let line = self.line(line_id)?;
        let target = action.target();
        line.status.check_transition(target)?;

        if !self.confirm.confirm(action.prompt()) {
            return Ok(ActionOutcome::Declined);
        }

        let key = line.key();
        if let Err(e) = self.gateway.update_item_status(&self.session, &key, target).await {
            log::error!(
                "Updating line {} of request {} to {target} failed: {e}",
                key.line_id,
                key.request_id
            );
            return Err(e);
        }
        log::info!(
            "Line {} of request {} moved {} -> {target}",
            key.line_id,
            key.request_id,
            line.status
        );
        self.refresh_after_action().await;
        Ok(ActionOutcome::Applied)
    }

    // ── Quantity edits ──────────────────────────────────────────────────────

    /// Stage a new requested quantity for a Pending line.
    pub fn edit_quantity(&self, line_id: u64, quantity: u32) -> Result<(), AppError> {
        self.session.role.authorize(Action::EditQuantity)?;
        let line = self.line(line_id)?;
        if !line.status.is_editable() {
            return Err(DomainError::EditNotAllowed(line.status).into());
        }
        lock(&self.edits).set(line_id, quantity);
        Ok(())
    }

    /// Quantity to display: the staged edit if any, the server value otherwise.
    pub fn displayed_quantity(&self, line_id: u64) -> Option<u32> {
        let line = self.line(line_id).ok()?;
        Some(lock(&self.edits).value_or(&line_id, line.requested_quantity))
    }

    pub fn discard_edit(&self, line_id: u64) {
        lock(&self.edits).remove(&line_id);
    }

    pub async fn commit_quantity(&self, line_id: u64) -> Result<ActionOutcome, AppError> {
        self.session.role.authorize(Action::EditQuantity)?;
        let line = self.line(line_id)?;
        if !line.status.is_editable() {
            return Err(DomainError::EditNotAllowed(line.status).into());
        }
        let quantity = lock(&self.edits)
            .get(&line_id)
            .copied()
            .ok_or_else(|| DomainError::InvalidInput(format!("no pending edit for line {line_id}")))?;
        if quantity == 0 {
            return Err(DomainError::InvalidInput(
                "Requested quantity must be greater than zero".to_string(),
            )
            .into());
        }
        if quantity > line.available_quantity {
            return Err(DomainError::QuantityExceedsAvailability {
                product_code: line.product_code.clone(),
                requested: quantity,
                available: line.available_quantity,
            }
            .into());
        }

        if !self.confirm.confirm(QUANTITY_PROMPT) {
            return Ok(ActionOutcome::Declined);
        }

        let key = line.key();
        if let Err(e) = self
            .gateway
            .update_item_quantity(&self.session, &key, quantity)
            .await
        {
            log::error!("Updating quantity of line {line_id} failed: {e}");
            return Err(e);
        }
        lock(&self.edits).remove(&line_id);
        log::info!(
            "Line {line_id} of request {} now requests {quantity}",
            key.request_id
        );
        self.refresh_after_action().await;
        Ok(ActionOutcome::Applied)
    }

    // ── Request-level actions ───────────────────────────────────────────────

    pub async fn cancel_request(&self, id: RequestId) -> Result<ActionOutcome, AppError> {
        self.bulk_update(id, LineStatus::Cancelled, CANCEL_REQUEST_PROMPT)
            .await
    }

    pub async fn complete_request(&self, id: RequestId) -> Result<ActionOutcome, AppError> {
        self.bulk_update(id, LineStatus::Ready, COMPLETE_REQUEST_PROMPT)
            .await
    }

    /// One request-level call; the backend applies `status` to every item.
    async fn bulk_update(
        &self,
        id: RequestId,
        status: LineStatus,
        prompt: &str,
    ) -> Result<ActionOutcome, AppError> {
        self.session.role.authorize(Action::ReviewRequest)?;
        let request = self.request(id)?;
        if !request.has_open_items() {
            return Err(DomainError::InvalidTransition {
                from: request.overall_status(),
                to: status,
            }
            .into());
        }

        if !self.confirm.confirm(prompt) {
            return Ok(ActionOutcome::Declined);
        }

        if let Err(e) = self
            .gateway
            .update_request_status(&self.session, id, status)
            .await
        {
            log::error!("Updating request {id} to {status} failed: {e}");
            return Err(e);
        }
        log::info!("Request {id} set to {status}");
        self.refresh_after_action().await;
        Ok(ActionOutcome::Applied)
    }

    /// Requester-side withdrawal. Deletes the request while nothing in it has
    /// been picked up yet.
    pub async fn withdraw_request(&self, id: RequestId) -> Result<ActionOutcome, AppError> {
        self.session.role.authorize(Action::WithdrawRequest)?;
        let request = self.request(id)?;
        if !request.all_pending() {
            return Err(DomainError::InvalidTransition {
                from: request.overall_status(),
                to: LineStatus::Cancelled,
            }
            .into());
        }

        if !self.confirm.confirm(WITHDRAW_PROMPT) {
            return Ok(ActionOutcome::Declined);
        }

        if let Err(e) = self.gateway.delete_request(&self.session, id).await {
            log::error!("Withdrawing request {id} failed: {e}");
            return Err(e);
        }
        log::info!("Request {id} withdrawn");
        self.refresh_after_action().await;
        Ok(ActionOutcome::Applied)
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn line(&self, line_id: u64) -> Result<RequestLineItem, AppError> {
        self.rows
            .snapshot()
            .and_then(|rows| rows.iter().find(|row| row.id == line_id).cloned())
            .ok_or_else(|| DomainError::NotFound(format!("line item {line_id}")).into())
    }

    fn request(&self, id: RequestId) -> Result<Request, AppError> {
        self.requests()
            .into_iter()
            .find(|request| request.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("request {id}")).into())
    }

    async fn refresh_after_action(&self) {
        if let Err(e) = self.refresh().await {
            log::warn!("Re-fetch after action failed, waiting for next poll: {e}");
        }
    }
}

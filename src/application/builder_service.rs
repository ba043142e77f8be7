use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::builder::{DraftLineItem, RequestBuilder, Selection};
use crate::domain::errors::DomainError;
use crate::domain::inventory::{CatalogQuery, CatalogResult};
use crate::domain::ports::{CatalogPort, RequestGateway};
use crate::domain::request::RequestId;
use crate::domain::session::{Action, Session};
use crate::errors::AppError;

use super::lock;
use super::sync::{spawn_poller, SyncHandle, SyncedView};

/// Composes a multi-line request against live catalog availability and
/// submits it in one call.
pub struct RequestBuilderService<C, R> {
    catalog: C,
    requests: R,
    session: Session,
    builder: Mutex<RequestBuilder>,
    query: Mutex<CatalogQuery>,
    results: SyncedView<CatalogResult>,
}

impl<C: CatalogPort, R: RequestGateway> RequestBuilderService<C, R> {
    pub fn new(catalog: C, requests: R, session: Session) -> Self {
        Self {
            catalog,
            requests,
            session,
            builder: Mutex::new(RequestBuilder::new()),
            query: Mutex::new(CatalogQuery::default()),
            results: SyncedView::new(),
        }
    }

    /// Run a catalog search and remember it as the query to keep polling.
    pub async fn search(&self, query: CatalogQuery) -> Result<CatalogResult, AppError> {
        *lock(&self.query) = query.clone();
        let result = self.catalog.search(&self.session, &query).await?;
        if let CatalogResult::Notice(message) = &result {
            log::info!("Catalog search returned a notice: {message}");
        }
        self.results.apply(result.clone());
        lock(&self.builder).apply_availability(result.slots());
        Ok(result)
    }

    pub fn last_result(&self) -> Option<Arc<CatalogResult>> {
        self.results.snapshot()
    }

    pub fn subscribe_results(
        &self,
    ) -> tokio::sync::watch::Receiver<Option<Arc<CatalogResult>>> {
        self.results.subscribe()
    }

    pub fn selections(&self) -> Vec<Selection> {
        lock(&self.builder).selections().to_vec()
    }

    pub fn batch(&self) -> Vec<DraftLineItem> {
        lock(&self.builder).batch().to_vec()
    }

    /// Stage or unstage a product from the last catalog result.
    pub fn set_selection(&self, product_code: &str, selected: bool) -> Result<(), AppError> {
        let results = self.results.snapshot();
        let slot = results
            .as_deref()
            .and_then(|r| r.slots().iter().find(|s| s.product_code == product_code))
            .ok_or_else(|| DomainError::UnknownProduct(product_code.to_string()))?;
        lock(&self.builder).set_selection(slot, selected);
        Ok(())
    }

    pub fn set_requested_quantity(&self, product_code: &str, qty: u32) -> Result<(), AppError> {
        lock(&self.builder)
            .set_requested_quantity(product_code, qty)
            .map_err(AppError::from)
    }

    pub fn add_selected_to_list(&self) -> Result<usize, AppError> {
        let added = lock(&self.builder).add_selected_to_list()?;
        log::debug!("Added {added} line(s) to the request list");
        Ok(added)
    }

    pub fn remove_from_batch(&self, index: usize) -> Result<DraftLineItem, AppError> {
        lock(&self.builder)
            .remove_from_batch(index)
            .map_err(AppError::from)
    }

    /// Submit the whole batch as one request.
    ///
    /// Nothing is sent unless every line is within its latest availability.
    /// Once the backend accepted it, only the lines that were sent leave the
    /// batch.
    pub async fn submit_batch(&self) -> Result<RequestId, AppError> {
        self.session.role.authorize(Action::CreateRequest)?;

        let lines = {
            let builder = lock(&self.builder);
            if let Err(e) = builder.validate_batch() {
                log::warn!("Request list rejected before submit: {e}");
                return Err(e.into());
            }
            builder.batch().to_vec()
        };

        match self.requests.create_request(&self.session, &lines).await {
            Ok(id) => {
                lock(&self.builder).remove_submitted(&lines);
                log::info!(
                    "Created request {id} with {} line(s) for {}",
                    lines.len(),
                    self.session.user_name
                );
                Ok(id)
            }
            Err(e) => {
                log::error!("Request submission failed: {e}");
                Err(e)
            }
        }
    }

    /// Re-run the current catalog query and refresh availability snapshots.
    /// Returns whether anything visible changed.
    pub async fn refresh_availability(&self) -> Result<bool, AppError> {
        let query = lock(&self.query).clone();
        if query.is_empty() {
            return Ok(false);
        }
        let result = self.catalog.search(&self.session, &query).await?;
        let changed = lock(&self.builder).apply_availability(result.slots());
        let replaced = self.results.apply(result);
        Ok(replaced || changed > 0)
    }

    pub fn spawn_availability_sync(self: &Arc<Self>, period: Duration) -> SyncHandle {
        let service = Arc::clone(self);
        spawn_poller("catalog", period, move || {
            let service = Arc::clone(&service);
            async move { service.refresh_availability().await }
        })
    }
}

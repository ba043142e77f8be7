use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::DomainError;
use crate::domain::inventory::{DashboardTile, RackLayout, RackSlot};
use crate::domain::ports::RackGateway;
use crate::domain::session::{Action, Session};
use crate::errors::AppError;

use super::sync::{spawn_poller, SyncHandle, SyncedView};

/// Rack slot inventory as the admin screens see it.
pub struct RackService<G> {
    gateway: G,
    session: Session,
    slots: SyncedView<Vec<RackSlot>>,
}

impl<G: RackGateway> RackService<G> {
    pub fn new(gateway: G, session: Session) -> Self {
        Self {
            gateway,
            session,
            slots: SyncedView::new(),
        }
    }

    pub async fn refresh(&self) -> Result<bool, AppError> {
        let slots = self.gateway.list_slots(&self.session).await?;
        Ok(self.slots.apply(slots))
    }

    pub fn slots(&self) -> Vec<RackSlot> {
        self.slots
            .snapshot()
            .map(|slots| slots.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn layout(&self) -> RackLayout {
        RackLayout::from_slots(self.slots())
    }

    pub fn spawn_sync(self: &Arc<Self>, period: Duration) -> SyncHandle {
        let service = Arc::clone(self);
        spawn_poller("racks", period, move || {
            let service = Arc::clone(&service);
            async move { service.refresh().await }
        })
    }

    pub async fn create_slot(&self, slot: &RackSlot) -> Result<(), AppError> {
        self.session.role.authorize(Action::ManageRacks)?;
        self.gateway.create_slot(&self.session, slot).await?;
        log::info!("Created slot {} in rack {}", slot.id, slot.rack);
        self.refresh_after_write().await;
        Ok(())
    }

    /// Save an edited slot. The total weight is recomputed before sending.
    pub async fn save_slot(&self, slot: &RackSlot) -> Result<(), AppError> {
        self.session.role.authorize(Action::ManageRacks)?;
        if !self.slots().iter().any(|s| s.id == slot.id) {
            return Err(DomainError::NotFound(format!("rack slot {}", slot.id)).into());
        }
        let update = slot.update_payload();
        if let Err(e) = self.gateway.update_slot(&self.session, &slot.id, &update).await {
            log::error!("Updating rack slot {} failed: {e}", slot.id);
            return Err(e);
        }
        self.refresh_after_write().await;
        Ok(())
    }

    pub async fn delete_slot(&self, id: &str) -> Result<(), AppError> {
        self.session.role.authorize(Action::ManageRacks)?;
        self.gateway.delete_slot(&self.session, id).await?;
        log::info!("Deleted rack slot {id}");
        self.refresh_after_write().await;
        Ok(())
    }

    /// Switch the locator light of a slot on or off.
    pub async fn flash(&self, id: &str, on: bool) -> Result<(), AppError> {
        self.gateway.flash_slot(&self.session, id, on).await
    }

    pub async fn dashboard(&self) -> Result<Vec<DashboardTile>, AppError> {
        self.gateway.dashboard(&self.session).await
    }

    /// The write already landed, so a failed re-fetch is left to the poller.
    async fn refresh_after_write(&self) {
        if let Err(e) = self.refresh().await {
            log::warn!("Re-fetch after rack write failed, waiting for next poll: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inventory::{RackSlotUpdate, SlotFill};
    use crate::domain::session::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRacks {
        listing_down: AtomicBool,
        slots: Mutex<Vec<RackSlot>>,
        updates: Mutex<Vec<(String, RackSlotUpdate)>>,
    }

    #[async_trait]
    impl RackGateway for Arc<FakeRacks> {
        async fn list_slots(&self, _: &Session) -> Result<Vec<RackSlot>, AppError> {
            if self.listing_down.load(Ordering::SeqCst) {
                return Err(AppError::Network("timeout".into()));
            }
            Ok(self.slots.lock().unwrap().clone())
        }

        async fn create_slot(&self, _: &Session, slot: &RackSlot) -> Result<(), AppError> {
            self.slots.lock().unwrap().push(slot.clone());
            Ok(())
        }

        async fn update_slot(&self, _: &Session, id: &str, update: &RackSlotUpdate) -> Result<(), AppError> {
            self.updates
                .lock()
                .unwrap()
                .push((id.to_string(), update.clone()));
            for slot in self.slots.lock().unwrap().iter_mut() {
                if slot.id == id {
                    slot.apply(update);
                }
            }
            Ok(())
        }

        async fn delete_slot(&self, _: &Session, id: &str) -> Result<(), AppError> {
            self.slots.lock().unwrap().retain(|s| s.id != id);
            Ok(())
        }

        async fn flash_slot(&self, _: &Session, _: &str, _: bool) -> Result<(), AppError> {
            Ok(())
        }

        async fn dashboard(&self, _: &Session) -> Result<Vec<DashboardTile>, AppError> {
            Ok(Vec::new())
        }
    }

    fn slot(id: &str, rack: u32, level: u32) -> RackSlot {
        RackSlot {
            id: id.to_string(),
            rack,
            level,
            box_width_mm: 120.0,
            product_code: "M12".into(),
            description: "hex bolt".into(),
            standard: "ISO 4014".into(),
            quantity: 10,
            unit_weight_gram: 30.0,
            total_weight_kg: 0.3,
            fill: Some(SlotFill::Full),
            color: "#00ff00".into(),
            rfid: "E200".into(),
        }
    }

    fn session(role: Role) -> Session {
        Session {
            token: "t".into(),
            user_id: "1".into(),
            user_name: "admin".into(),
            role,
        }
    }

    #[tokio::test]
    async fn save_recomputes_total_weight() {
        let gateway = Arc::new(FakeRacks::default());
        gateway.slots.lock().unwrap().extend([slot("a", 1, 1), slot("b", 2, 1)]);
        let service = RackService::new(gateway.clone(), session(Role::Admin));
        service.refresh().await.unwrap();

        let mut edited = service.slots()[0].clone();
        edited.quantity = 50;
        service.save_slot(&edited).await.unwrap();

        let updates = gateway.updates.lock().unwrap();
        assert_eq!(updates[0].0, "a");
        assert!((updates[0].1.total_weight_kg - 1.5).abs() < 1e-9);
        assert_eq!(service.layout().slots_in_rack(1)[0].quantity, 50);
    }

    #[tokio::test]
    async fn only_admins_manage_racks() {
        let gateway = Arc::new(FakeRacks::default());
        let service = RackService::new(gateway.clone(), session(Role::Reviewer));
        let err = service.create_slot(&slot("a", 1, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(DomainError::Forbidden { .. })
        ));
        assert!(gateway.slots.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_and_delete_refresh_the_layout() {
        let gateway = Arc::new(FakeRacks::default());
        let service = RackService::new(gateway, session(Role::Admin));

        service.create_slot(&slot("a", 3, 2)).await.unwrap();
        assert_eq!(service.layout().rack_numbers().collect::<Vec<_>>(), vec![3]);

        service.delete_slot("a").await.unwrap();
        assert_eq!(service.layout().rack_numbers().count(), 0);
    }

    #[tokio::test]
    async fn failed_refetch_after_create_still_reports_success() {
        let gateway = Arc::new(FakeRacks::default());
        gateway.listing_down.store(true, Ordering::SeqCst);
        let service = RackService::new(gateway.clone(), session(Role::Admin));

        service.create_slot(&slot("a", 3, 2)).await.unwrap();
        assert_eq!(gateway.slots.lock().unwrap().len(), 1);
        assert!(service.slots().is_empty());

        gateway.listing_down.store(false, Ordering::SeqCst);
        assert!(service.refresh().await.unwrap());
        assert_eq!(service.slots().len(), 1);
    }

    #[tokio::test]
    async fn failed_refetch_after_delete_still_reports_success() {
        let gateway = Arc::new(FakeRacks::default());
        gateway.slots.lock().unwrap().push(slot("a", 1, 1));
        let service = RackService::new(gateway.clone(), session(Role::Admin));
        service.refresh().await.unwrap();

        gateway.listing_down.store(true, Ordering::SeqCst);
        service.delete_slot("a").await.unwrap();
        assert!(gateway.slots.lock().unwrap().is_empty());
    }
}

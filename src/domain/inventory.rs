use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Availability of one product as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySlot {
    pub id: Option<String>,
    pub product_code: String,
    pub description: String,
    pub standard: String,
    pub available_quantity: u32,
}

/// Free-text catalog search. Every field is matched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub product_code: String,
    pub description: String,
    pub standard: String,
}

impl CatalogQuery {
    pub fn by_code(code: impl Into<String>) -> Self {
        Self {
            product_code: code.into(),
            ..Self::default()
        }
    }

    /// Nothing is polled while every field is blank.
    pub fn is_empty(&self) -> bool {
        self.product_code.trim().is_empty()
            && self.description.trim().is_empty()
            && self.standard.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResult {
    Slots(Vec<InventorySlot>),
    /// Informational answer from the backend instead of a product list.
    Notice(String),
}

impl CatalogResult {
    pub fn slots(&self) -> &[InventorySlot] {
        match self {
            CatalogResult::Slots(slots) => slots,
            CatalogResult::Notice(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotFill {
    Full,
    Medium,
    Empty,
}

/// A physical tray in a rack.
#[derive(Debug, Clone, PartialEq)]
pub struct RackSlot {
    pub id: String,
    pub rack: u32,
    pub level: u32,
    pub box_width_mm: f64,
    pub product_code: String,
    pub description: String,
    pub standard: String,
    pub quantity: u32,
    pub unit_weight_gram: f64,
    pub total_weight_kg: f64,
    pub fill: Option<SlotFill>,
    pub color: String,
    pub rfid: String,
}

/// Editable part of a rack slot, as sent on update.
#[derive(Debug, Clone, PartialEq)]
pub struct RackSlotUpdate {
    pub product_code: String,
    pub description: String,
    pub standard: String,
    pub unit_weight_gram: f64,
    pub quantity: u32,
    pub total_weight_kg: f64,
}

pub fn total_weight_kg(unit_weight_gram: f64, quantity: u32) -> f64 {
    unit_weight_gram * f64::from(quantity) / 1000.0
}

impl RackSlot {
    /// Update payload with the total weight recomputed from unit weight and quantity.
    pub fn update_payload(&self) -> RackSlotUpdate {
        RackSlotUpdate {
            product_code: self.product_code.clone(),
            description: self.description.clone(),
            standard: self.standard.clone(),
            unit_weight_gram: self.unit_weight_gram,
            quantity: self.quantity,
            total_weight_kg: total_weight_kg(self.unit_weight_gram, self.quantity),
        }
    }

    pub fn apply(&mut self, update: &RackSlotUpdate) {
        self.product_code = update.product_code.clone();
        self.description = update.description.clone();
        self.standard = update.standard.clone();
        self.unit_weight_gram = update.unit_weight_gram;
        self.quantity = update.quantity;
        self.total_weight_kg = update.total_weight_kg;
    }
}

/// Slots grouped by rack number, then level. Both keys iterate in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RackLayout {
    racks: BTreeMap<u32, BTreeMap<u32, Vec<RackSlot>>>,
}

impl RackLayout {
    pub fn from_slots(slots: impl IntoIterator<Item = RackSlot>) -> Self {
        let mut racks: BTreeMap<u32, BTreeMap<u32, Vec<RackSlot>>> = BTreeMap::new();
        for slot in slots {
            racks
                .entry(slot.rack)
                .or_default()
                .entry(slot.level)
                .or_default()
                .push(slot);
        }
        Self { racks }
    }

    pub fn rack_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.racks.keys().copied()
    }

    pub fn levels(&self, rack: u32) -> Option<&BTreeMap<u32, Vec<RackSlot>>> {
        self.racks.get(&rack)
    }

    pub fn slots_in_rack(&self, rack: u32) -> Vec<&RackSlot> {
        self.racks
            .get(&rack)
            .map(|levels| levels.values().flatten().collect())
            .unwrap_or_default()
    }

    /// Rack numbers whose decimal form contains `term`.
    pub fn search(&self, term: &str) -> Vec<u32> {
        let term = term.trim().to_lowercase();
        self.racks
            .keys()
            .copied()
            .filter(|rack| rack.to_string().contains(&term))
            .collect()
    }
}

/// One card on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardTile {
    pub id: String,
    pub title: String,
    pub description: String,
    pub img: String,
    pub online: bool,
    pub path: String,
    pub button_label: String,
}

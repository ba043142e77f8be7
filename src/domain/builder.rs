use super::errors::DomainError;
use super::inventory::InventorySlot;

/// A catalog entry the user is working with, plus the availability seen when
/// it was last toggled or refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub product_code: String,
    pub description: String,
    pub standard: String,
    pub requested_quantity: u32,
    pub available_quantity: u32,
    pub selected: bool,
}

/// One line of the batch waiting to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLineItem {
    pub product_code: String,
    pub description: String,
    pub standard: String,
    pub requested_quantity: u32,
    pub available_quantity: u32,
}

impl DraftLineItem {
    fn same_line(&self, other: &DraftLineItem) -> bool {
        self.product_code == other.product_code
            && self.standard == other.standard
            && self.requested_quantity == other.requested_quantity
    }

    fn check(&self) -> Result<(), DomainError> {
        check_quantity(&self.product_code, self.requested_quantity, self.available_quantity)
    }
}

fn check_quantity(product_code: &str, requested: u32, available: u32) -> Result<(), DomainError> {
    if requested > available {
        return Err(DomainError::QuantityExceedsAvailability {
            product_code: product_code.to_string(),
            requested,
            available,
        });
    }
    Ok(())
}

/// Working set of a request being composed: staged catalog selections and the
/// batch of line items that will be submitted together.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    selections: Vec<Selection>,
    batch: Vec<DraftLineItem>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn selection(&self, product_code: &str) -> Option<&Selection> {
        self.selections
            .iter()
            .find(|s| s.product_code == product_code)
    }

    pub fn batch(&self) -> &[DraftLineItem] {
        &self.batch
    }

    /// Stage or unstage `slot`, snapshotting its description, standard and
    /// availability. A previously entered quantity is kept.
    pub fn set_selection(&mut self, slot: &InventorySlot, selected: bool) {
        match self
            .selections
            .iter_mut()
            .find(|s| s.product_code == slot.product_code)
        {
            Some(entry) => {
                entry.selected = selected;
                entry.description = slot.description.clone();
                entry.standard = slot.standard.clone();
                entry.available_quantity = slot.available_quantity;
            }
            None => self.selections.push(Selection {
                product_code: slot.product_code.clone(),
                description: slot.description.clone(),
                standard: slot.standard.clone(),
                requested_quantity: 0,
                available_quantity: slot.available_quantity,
                selected,
            }),
        }
    }

    /// Zero is accepted and means "nothing requested yet".
    pub fn set_requested_quantity(&mut self, product_code: &str, qty: u32) -> Result<(), DomainError> {
        let entry = self
            .selections
            .iter_mut()
            .find(|s| s.product_code == product_code)
            .ok_or_else(|| DomainError::UnknownProduct(product_code.to_string()))?;
        check_quantity(product_code, qty, entry.available_quantity)?;
        entry.requested_quantity = qty;
        Ok(())
    }

    /// Append every selected entry with a non-zero quantity to the batch.
    ///
    /// All selected entries are validated first; if any one exceeds its
    /// snapshot nothing is appended. Returns the number of appended lines.
    pub fn add_selected_to_list(&mut self) -> Result<usize, DomainError> {
        for entry in self.selections.iter().filter(|s| s.selected) {
            check_quantity(&entry.product_code, entry.requested_quantity, entry.available_quantity)?;
        }

        let before = self.batch.len();
        self.batch.extend(
            self.selections
                .iter()
                .filter(|s| s.selected && s.requested_quantity > 0)
                .map(|s| DraftLineItem {
                    product_code: s.product_code.clone(),
                    description: s.description.clone(),
                    standard: s.standard.clone(),
                    requested_quantity: s.requested_quantity,
                    available_quantity: s.available_quantity,
                }),
        );
        Ok(self.batch.len() - before)
    }

    pub fn remove_from_batch(&mut self, index: usize) -> Result<DraftLineItem, DomainError> {
        if index >= self.batch.len() {
            return Err(DomainError::IndexOutOfRange(index));
        }
        Ok(self.batch.remove(index))
    }

    /// Check the whole batch against the latest availability snapshots.
    pub fn validate_batch(&self) -> Result<(), DomainError> {
        if self.batch.is_empty() {
            return Err(DomainError::EmptyBatch);
        }
        self.batch.iter().try_for_each(DraftLineItem::check)
    }

    /// Drop the lines a successful submission carried. Lines added while the
    /// submission was in flight stay in the batch. Availability may have been
    /// refreshed in the meantime, so it is not part of the match.
    pub fn remove_submitted(&mut self, sent: &[DraftLineItem]) -> usize {
        let mut removed = 0;
        for line in sent {
            if let Some(pos) = self.batch.iter().position(|l| l.same_line(line)) {
                self.batch.remove(pos);
                removed += 1;
            }
        }
        removed
    }

    /// Drop all selections and the batch.
    pub fn reset(&mut self) {
        self.selections.clear();
        self.batch.clear();
    }

    /// Refresh availability snapshots from a fresh catalog read.
    ///
    /// Only `available_quantity` changes; requested quantities are left as
    /// they are even if they now exceed availability. Returns how many
    /// snapshots changed.
    pub fn apply_availability(&mut self, slots: &[InventorySlot]) -> usize {
        let mut changed = 0;
        for slot in slots {
            for entry in self
                .selections
                .iter_mut()
                .filter(|s| s.product_code == slot.product_code)
            {
                if entry.available_quantity != slot.available_quantity {
                    entry.available_quantity = slot.available_quantity;
                    changed += 1;
                }
            }
            for line in self
                .batch
                .iter_mut()
                .filter(|l| l.product_code == slot.product_code)
            {
                if line.available_quantity != slot.available_quantity {
                    line.available_quantity = slot.available_quantity;
                    changed += 1;
                }
            }
        }
        changed
    }
}

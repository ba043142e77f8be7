use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use super::inventory::RackSlot;
use super::request::RequestLineItem;

/// A single table cell, compared numerically when both sides are numbers.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<u32> for Cell {
    fn from(n: u32) -> Self {
        Cell::Number(f64::from(n))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Empty, Into::into)
    }
}

/// Rows that can be filtered and sorted by column name.
pub trait Tabular {
    fn cell(&self, column: &str) -> Cell;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Per-column substring filters plus an optional sort column.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    filters: BTreeMap<String, String>,
    sort: Option<(String, SortDirection)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty value removes the filter for that column.
    pub fn set_filter(&mut self, column: &str, value: &str) {
        if value.is_empty() {
            self.filters.remove(column);
        } else {
            self.filters.insert(column.to_string(), value.to_lowercase());
        }
    }

    /// Sorting the same column twice in a row flips it to descending.
    pub fn toggle_sort(&mut self, column: &str) {
        let direction = match &self.sort {
            Some((current, SortDirection::Asc)) if current == column => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        self.sort = Some((column.to_string(), direction));
    }

    pub fn sort(&self) -> Option<(&str, SortDirection)> {
        self.sort.as_ref().map(|(c, d)| (c.as_str(), *d))
    }

    pub fn apply<'a, T: Tabular>(&self, rows: &'a [T]) -> Vec<&'a T> {
        let mut out: Vec<&T> = rows
            .iter()
            .filter(|row| {
                self.filters.iter().all(|(column, needle)| {
                    row.cell(column).to_string().to_lowercase().contains(needle)
                })
            })
            .collect();

        if let Some((column, direction)) = &self.sort {
            out.sort_by(|a, b| {
                let ord = a
                    .cell(column)
                    .partial_cmp(&b.cell(column))
                    .unwrap_or(Ordering::Equal);
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        out
    }
}

impl Tabular for RequestLineItem {
    fn cell(&self, column: &str) -> Cell {
        let timestamp = |t: &Option<chrono::DateTime<chrono::Utc>>| {
            t.map_or(Cell::Empty, |t| Cell::Text(t.to_rfc3339()))
        };
        match column {
            "request_id" => Cell::Number(self.request_id.0 as f64),
            "requester" => self.requester_name.as_deref().into(),
            "reviewer" => self.reviewer.as_deref().into(),
            "product_code" => self.product_code.as_str().into(),
            "description" => self.description.as_str().into(),
            "standard" => self.standard.as_str().into(),
            "requested_quantity" => self.requested_quantity.into(),
            "available_quantity" => self.available_quantity.into(),
            "status" => self.status.as_str().into(),
            "updated_at" => timestamp(&self.timestamps.updated),
            "preparing_at" => timestamp(&self.timestamps.preparing),
            "ready_at" => timestamp(&self.timestamps.ready),
            "cancelled_at" => timestamp(&self.timestamps.cancelled),
            _ => Cell::Empty,
        }
    }
}

impl Tabular for RackSlot {
    fn cell(&self, column: &str) -> Cell {
        match column {
            "id" => self.id.as_str().into(),
            "rack" => self.rack.into(),
            "level" => self.level.into(),
            "product_code" => self.product_code.as_str().into(),
            "description" => self.description.as_str().into(),
            "standard" => self.standard.as_str().into(),
            "quantity" => self.quantity.into(),
            "unit_weight_gram" => Cell::Number(self.unit_weight_gram),
            "total_weight_kg" => Cell::Number(self.total_weight_kg),
            "rfid" => self.rfid.as_str().into(),
            _ => Cell::Empty,
        }
    }
}

use std::fmt;

use chrono::{DateTime, Utc};

use super::status::LineStatus;

/// Server-issued request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one line item for the per-item update endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub request_id: RequestId,
    pub product_code: String,
    pub line_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTimestamps {
    pub updated: Option<DateTime<Utc>>,
    pub preparing: Option<DateTime<Utc>>,
    pub ready: Option<DateTime<Utc>>,
    pub cancelled: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLineItem {
    pub id: u64,
    pub request_id: RequestId,
    pub product_code: String,
    pub description: String,
    pub standard: String,
    pub requested_quantity: u32,
    pub available_quantity: u32,
    pub status: LineStatus,
    pub requester_name: Option<String>,
    pub reviewer: Option<String>,
    pub timestamps: LineTimestamps,
}

impl RequestLineItem {
    pub fn key(&self) -> LineKey {
        LineKey {
            request_id: self.request_id,
            product_code: self.product_code.clone(),
            line_id: self.id,
        }
    }

    pub fn exceeds_availability(&self) -> bool {
        self.requested_quantity > self.available_quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub requester_name: Option<String>,
    pub reviewer: Option<String>,
    pub line_items: Vec<RequestLineItem>,
}

impl Request {
    /// Status of the request as a whole, derived from its line items.
    pub fn overall_status(&self) -> LineStatus {
        let statuses = || self.line_items.iter().map(|item| item.status);

        if self.line_items.is_empty() {
            return LineStatus::Pending;
        }
        if statuses().all(|s| s == LineStatus::Cancelled) {
            return LineStatus::Cancelled;
        }
        if statuses().all(LineStatus::is_terminal) {
            return LineStatus::Ready;
        }
        if statuses().any(|s| matches!(s, LineStatus::Preparing | LineStatus::Ready)) {
            return LineStatus::Preparing;
        }
        LineStatus::Pending
    }

    pub fn has_open_items(&self) -> bool {
        self.line_items.iter().any(|item| !item.status.is_terminal())
    }

    pub fn all_pending(&self) -> bool {
        !self.line_items.is_empty()
            && self
                .line_items
                .iter()
                .all(|item| item.status == LineStatus::Pending)
    }

    pub fn line(&self, line_id: u64) -> Option<&RequestLineItem> {
        self.line_items.iter().find(|item| item.id == line_id)
    }
}

/// Group flat line-item rows into requests.
///
/// Requests keep the order in which their first row appears; line items keep
/// their row order within a request.
pub fn group_rows(rows: &[RequestLineItem]) -> Vec<Request> {
    let mut requests: Vec<Request> = Vec::new();
    for row in rows {
        match requests.iter_mut().find(|r| r.id == row.request_id) {
            Some(request) => request.line_items.push(row.clone()),
            None => requests.push(Request {
                id: row.request_id,
                requester_name: row.requester_name.clone(),
                reviewer: row.reviewer.clone(),
                line_items: vec![row.clone()],
            }),
        }
    }
    requests
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn line(request: u64, id: u64, code: &str, status: LineStatus) -> RequestLineItem {
        RequestLineItem {
            id,
            request_id: RequestId(request),
            product_code: code.to_string(),
            description: format!("{code} description"),
            standard: "DIN 933".to_string(),
            requested_quantity: 2,
            available_quantity: 10,
            status,
            requester_name: Some("requester".to_string()),
            reviewer: Some("reviewer".to_string()),
            timestamps: LineTimestamps::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::line;
    use super::*;

    fn request(statuses: &[LineStatus]) -> Request {
        Request {
            id: RequestId(1),
            requester_name: None,
            reviewer: None,
            line_items: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| line(1, i as u64, "P", *s))
                .collect(),
        }
    }

    #[test]
    fn overall_status_is_derived_from_items() {
        use LineStatus::*;
        assert_eq!(request(&[Pending, Pending]).overall_status(), Pending);
        assert_eq!(request(&[Pending, Preparing]).overall_status(), Preparing);
        assert_eq!(request(&[Pending, Ready]).overall_status(), Preparing);
        assert_eq!(request(&[Ready, Cancelled]).overall_status(), Ready);
        assert_eq!(request(&[Cancelled, Cancelled]).overall_status(), Cancelled);
    }

    #[test]
    fn open_items_and_all_pending() {
        use LineStatus::*;
        assert!(request(&[Ready, Preparing]).has_open_items());
        assert!(!request(&[Ready, Cancelled]).has_open_items());
        assert!(request(&[Pending, Pending]).all_pending());
        assert!(!request(&[Pending, Preparing]).all_pending());
        assert!(!request(&[]).all_pending());
    }

    #[test]
    fn group_rows_keeps_submission_order() {
        let rows = vec![
            line(5, 1, "A", LineStatus::Pending),
            line(3, 2, "B", LineStatus::Pending),
            line(5, 3, "C", LineStatus::Preparing),
        ];

        let grouped = group_rows(&rows);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].id, RequestId(5));
        let codes: Vec<_> = grouped[0]
            .line_items
            .iter()
            .map(|l| l.product_code.as_str())
            .collect();
        assert_eq!(codes, vec!["A", "C"]);
        assert_eq!(grouped[1].id, RequestId(3));
        assert_eq!(grouped[0].line(3).map(|l| l.status), Some(LineStatus::Preparing));
    }

    #[test]
    fn line_key_addresses_item_endpoint() {
        let key = line(9, 4, "M8", LineStatus::Pending).key();
        assert_eq!(key.request_id, RequestId(9));
        assert_eq!(key.product_code, "M8");
        assert_eq!(key.line_id, 4);
    }
}

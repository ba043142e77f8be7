use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Status of a single request line item.
///
/// `Pending` is the initial state, `Ready` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineStatus {
    Pending,
    Preparing,
    Ready,
    Cancelled,
}

impl LineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStatus::Pending => "Pending",
            LineStatus::Preparing => "Preparing",
            LineStatus::Ready => "Ready",
            LineStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LineStatus::Ready | LineStatus::Cancelled)
    }

    /// Whether `self -> next` is an accepted edge of the line item state machine.
    pub fn can_transition_to(self, next: LineStatus) -> bool {
        use LineStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Pending, Cancelled)
                | (Pending, Ready)
                | (Preparing, Ready)
                | (Preparing, Cancelled)
        )
    }

    pub fn check_transition(self, next: LineStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_editable(self) -> bool {
        self == LineStatus::Pending
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(LineStatus::Pending),
            "Preparing" => Ok(LineStatus::Preparing),
            "Ready" => Ok(LineStatus::Ready),
            "Cancelled" => Ok(LineStatus::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown line status '{other}'"
            ))),
        }
    }
}

/// Per-item reviewer actions and the status each one requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    BeginPrepare,
    Cancel,
    MarkReady,
}

impl ItemAction {
    pub fn target(self) -> LineStatus {
        match self {
            ItemAction::BeginPrepare => LineStatus::Preparing,
            ItemAction::Cancel => LineStatus::Cancelled,
            ItemAction::MarkReady => LineStatus::Ready,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            ItemAction::BeginPrepare => "Are you sure you want to mark this item as Preparing?",
            ItemAction::Cancel => "Are you sure you want to cancel this item?",
            ItemAction::MarkReady => "Are you sure you want to mark this item as Ready?",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LineStatus; 4] = [
        LineStatus::Pending,
        LineStatus::Preparing,
        LineStatus::Ready,
        LineStatus::Cancelled,
    ];

    #[test]
    fn terminal_states_accept_no_transition() {
        for from in [LineStatus::Ready, LineStatus::Cancelled] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn pending_can_begin_prepare_cancel_or_be_marked_ready() {
        assert!(LineStatus::Pending.can_transition_to(LineStatus::Preparing));
        assert!(LineStatus::Pending.can_transition_to(LineStatus::Cancelled));
        assert!(LineStatus::Pending.can_transition_to(LineStatus::Ready));
        assert!(!LineStatus::Pending.can_transition_to(LineStatus::Pending));
    }

    #[test]
    fn preparing_cannot_go_back_to_pending() {
        assert!(!LineStatus::Preparing.can_transition_to(LineStatus::Pending));
        assert!(!LineStatus::Preparing.can_transition_to(LineStatus::Preparing));
        assert!(LineStatus::Preparing.can_transition_to(LineStatus::Ready));
        assert!(LineStatus::Preparing.can_transition_to(LineStatus::Cancelled));
    }

    #[test]
    fn check_transition_reports_both_ends() {
        let err = LineStatus::Ready
            .check_transition(LineStatus::Cancelled)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: LineStatus::Ready,
                to: LineStatus::Cancelled
            }
        );
    }

    #[test]
    fn only_pending_is_editable() {
        let editable: Vec<_> = ALL.into_iter().filter(|s| s.is_editable()).collect();
        assert_eq!(editable, vec![LineStatus::Pending]);
    }

    #[test]
    fn parses_wire_names() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<LineStatus>().unwrap(), status);
        }
        assert!("Done".parse::<LineStatus>().is_err());
    }
}

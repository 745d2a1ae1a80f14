//! Order status state machine.
//!
//! ```text
//! pending -> processing -> shipped -> completed
//!    |           |
//!    +-----------+--> cancelled
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CommerceError;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    #[default]
    Pending,
    /// Paid and being prepared.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Delivered.
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Whether `next` is exactly one legal step from here.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Completed)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    /// `next`, or `InvalidOrderStatusTransition`.
    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, CommerceError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CommerceError::InvalidOrderStatusTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl FromStr for OrderStatus {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CommerceError::validation(format!("unknown order status '{}'", s)))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_happy_path() {
        let status = Pending
            .transition(Processing)
            .and_then(|s| s.transition(Shipped))
            .and_then(|s| s.transition(Completed))
            .unwrap();
        assert_eq!(status, Completed);
        assert!(status.is_terminal());
    }

    #[test]
    fn test_no_skipping() {
        assert!(matches!(
            Pending.transition(Shipped),
            Err(CommerceError::InvalidOrderStatusTransition {
                from: Pending,
                to: Shipped
            })
        ));
        assert!(Pending.transition(Completed).is_err());
        assert!(Processing.transition(Completed).is_err());
    }

    #[test]
    fn test_cancellation_window() {
        assert!(Pending.can_cancel());
        assert!(Processing.can_cancel());
        assert!(!Shipped.can_cancel());
        assert!(!Completed.can_cancel());
        assert!(!Cancelled.can_cancel());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Completed, Cancelled] {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}

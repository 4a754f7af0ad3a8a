//! Order lifecycle.
//!
//! The transition table below is the only place order status rules live.
//! Route handlers, the CLI and tests all go through [`OrderStatus::transition`].
//!
//! ```text
//! pending ──► processing ──► shipped ──► delivered
//!    │             │
//!    └─────────────┴──► cancelled
//! ```
//!
//! `delivered` and `cancelled` are terminal. Requesting the status an order
//! already has is an idempotent no-op rather than an error.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// A requested status string that is not one of the known states.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status '{value}'; valid values: {}", OrderStatus::valid_values())]
pub struct ParseOrderStatusError {
    /// The rejected input.
    pub value: String,
}

/// A transition that is not an edge of the lifecycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot change status from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Result of a legal transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order already has the requested status; nothing to write.
    Unchanged(OrderStatus),
    /// The order moves along an edge of the table.
    Changed { from: OrderStatus, to: OrderStatus },
}

impl OrderStatus {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire and database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Destinations reachable from this status in one step.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Whether `next` is an edge out of this status.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether no transitions leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Validate a move from this status to `requested`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if `requested` differs from the current
    /// status and is not an allowed destination.
    pub fn transition(self, requested: Self) -> Result<Transition, TransitionError> {
        if self == requested {
            return Ok(Transition::Unchanged(self));
        }

        if self.can_transition_to(requested) {
            Ok(Transition::Changed {
                from: self,
                to: requested,
            })
        } else {
            Err(TransitionError {
                from: self,
                to: requested,
            })
        }
    }

    /// Comma-separated list of every valid status, for error messages.
    #[must_use]
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseOrderStatusError {
                value: s.to_owned(),
            })
    }
}

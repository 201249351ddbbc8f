//! Escrow lifecycle of a single transaction.
//!
//! ```text
//!              system          seller          buyer            buyer
//!   pending ──────────► secured ──────► shipped ──────► delivered ──────► completed (term.)
//!                          │                                                  ▲
//!                          │ buyer                                      admin │
//!                          ▼                                                  │
//!                      disputed ──────────────────────────────────────────────┘
//!                          │ admin
//!                          ▼
//!                      refunded (term.)
//! ```
//!
//! Under [`StatusPolicy::Enforced`] every update is checked against the
//! table above, both the edge and the actor driving it. Under
//! [`StatusPolicy::Permissive`] any status may follow any status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dto::Role;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Payment initiated but not yet captured.
    Pending,
    /// Payment held in escrow.
    Secured,
    /// Product shipped, awaiting delivery.
    Shipped,
    /// Product delivered, awaiting buyer confirmation.
    Delivered,
    /// Funds released to the seller. **Terminal.**
    Completed,
    /// Buyer reported an issue, awaiting admin review.
    Disputed,
    /// Funds returned to the buyer. **Terminal.**
    Refunded,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 7] = [
        Self::Pending,
        Self::Secured,
        Self::Shipped,
        Self::Delivered,
        Self::Completed,
        Self::Disputed,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Secured => "secured",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Disputed => "disputed",
            Self::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded)
    }

    /// Funds are in escrow and the order is moving toward delivery.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Secured | Self::Shipped | Self::Delivered)
    }

    /// Statuses reachable from this one in a single legal step.
    pub fn successors(&self) -> &'static [TransactionStatus] {
        match self {
            Self::Pending => &[Self::Secured],
            Self::Secured => &[Self::Shipped, Self::Disputed],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Completed],
            Self::Disputed => &[Self::Completed, Self::Refunded],
            Self::Completed | Self::Refunded => &[],
        }
    }

    /// Message shown to the user when a transaction enters this status.
    pub fn notice(&self) -> &'static str {
        match self {
            Self::Pending => "Transaction status updated",
            Self::Secured => "Payment secured in escrow",
            Self::Shipped => "Product has been shipped",
            Self::Delivered => "Product has been delivered",
            Self::Completed => "Transaction completed successfully",
            Self::Disputed => "Dispute filed for this transaction",
            Self::Refunded => "Payment has been refunded",
        }
    }

    /// Progress through the happy path, in percent.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Pending | Self::Refunded => 0,
            Self::Secured => 25,
            Self::Shipped => 50,
            Self::Delivered => 75,
            Self::Completed | Self::Disputed => 100,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown transaction status '{s}'")))
    }
}

/// Who is driving a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// The marketplace itself, e.g. the payment capture timer.
    System,
    Buyer,
    Seller,
    Admin,
}

impl From<Role> for Actor {
    fn from(role: Role) -> Self {
        match role {
            Role::Buyer => Actor::Buyer,
            Role::Seller => Actor::Seller,
            Role::Admin => Actor::Admin,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Actor::System => "system",
            Actor::Buyer => "buyer",
            Actor::Seller => "seller",
            Actor::Admin => "admin",
        })
    }
}

/// The actor allowed to drive `from -> to`, or `None` if the edge is illegal.
pub fn required_actor(from: TransactionStatus, to: TransactionStatus) -> Option<Actor> {
    use TransactionStatus::*;
    match (from, to) {
        (Pending, Secured) => Some(Actor::System),
        (Secured, Shipped) => Some(Actor::Seller),
        (Secured, Disputed) => Some(Actor::Buyer),
        (Shipped, Delivered) => Some(Actor::Buyer),
        (Delivered, Completed) => Some(Actor::Buyer),
        (Disputed, Completed) | (Disputed, Refunded) => Some(Actor::Admin),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Only the edges of the escrow graph, driven by their owning actor.
    #[default]
    Enforced,
    /// Any status may follow any status.
    Permissive,
}

impl StatusPolicy {
    pub fn check(
        &self,
        actor: Actor,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), Error> {
        if *self == StatusPolicy::Permissive {
            return Ok(());
        }
        match required_actor(from, to) {
            None => Err(Error::IllegalTransition { from, to }),
            Some(required) if required != actor => Err(Error::ActorNotPermitted { actor, to }),
            Some(_) => Ok(()),
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforced" => Ok(StatusPolicy::Enforced),
            "permissive" => Ok(StatusPolicy::Permissive),
            other => Err(Error::Config(format!("unknown status policy '{other}'"))),
        }
    }
}

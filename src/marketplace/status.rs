//! Offer and listing status state machines.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Status enums with a fixed set of legal transitions.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// All valid target states from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs the transition, or fails with `InvalidState`.
    fn transition_to(&self, target: Self) -> Result<Self> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(AppError::InvalidState(format!(
                "Cannot transition from {:?} to {:?}",
                self, target
            )))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// Negotiation status of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    /// Waiting for the seller.
    Pending,
    /// Deal closed.
    Accepted,
    /// Seller declined.
    Rejected,
    /// Seller proposed a different price; waiting for the buyer.
    Countered,
    /// Buyer pulled out.
    Withdrawn,
}

impl OfferStatus {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Countered => "COUNTERED",
            OfferStatus::Withdrawn => "WITHDRAWN",
        }
    }

    /// Parse the storage form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OfferStatus::Pending),
            "ACCEPTED" => Some(OfferStatus::Accepted),
            "REJECTED" => Some(OfferStatus::Rejected),
            "COUNTERED" => Some(OfferStatus::Countered),
            "WITHDRAWN" => Some(OfferStatus::Withdrawn),
            _ => None,
        }
    }

    /// Still negotiable.
    pub fn is_open(&self) -> bool {
        matches!(self, OfferStatus::Pending | OfferStatus::Countered)
    }
}

impl StateMachine for OfferStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use OfferStatus::*;
        match self {
            Pending => vec![Accepted, Rejected, Countered, Withdrawn],
            // Pending again when the buyer counters back
            Countered => vec![Accepted, Rejected, Countered, Withdrawn, Pending],
            Accepted | Rejected | Withdrawn => vec![],
        }
    }
}

/// Status of a marketplace listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    /// Open for offers.
    Available,
    /// Under negotiation.
    Pending,
    /// Sold to a buyer.
    Sold,
    /// Listing ran out.
    Expired,
    /// Hidden by the owner or an admin.
    Hidden,
}

impl PostStatus {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Available => "AVAILABLE",
            PostStatus::Pending => "PENDING",
            PostStatus::Sold => "SOLD",
            PostStatus::Expired => "EXPIRED",
            PostStatus::Hidden => "HIDDEN",
        }
    }

    /// Parse the storage form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(PostStatus::Available),
            "PENDING" => Some(PostStatus::Pending),
            "SOLD" => Some(PostStatus::Sold),
            "EXPIRED" => Some(PostStatus::Expired),
            "HIDDEN" => Some(PostStatus::Hidden),
            _ => None,
        }
    }
}

impl StateMachine for PostStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use PostStatus::*;
        match self {
            Available => vec![Pending, Sold, Expired, Hidden],
            Pending => vec![Available, Sold, Expired, Hidden],
            Hidden => vec![Available],
            Expired => vec![Available],
            Sold => vec![],
        }
    }
}

/// Which party is expected to act next on an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    /// Seller must respond.
    Seller,
    /// Buyer must answer a counter.
    Buyer,
    /// Negotiation is over.
    Closed,
}

impl Turn {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Turn::Seller => "seller",
            Turn::Buyer => "buyer",
            Turn::Closed => "closed",
        }
    }

    /// Parse the storage form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "seller" => Some(Turn::Seller),
            "buyer" => Some(Turn::Buyer),
            "closed" => Some(Turn::Closed),
            _ => None,
        }
    }
}

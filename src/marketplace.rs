//! Used-book marketplace: listings and offer negotiation.

mod service;
mod status;

pub use service::{MarketplaceService, SellerAction};
pub use status::{OfferStatus, PostStatus, StateMachine, Turn};

use serde::{Deserialize, Serialize};

/// Fate of other open offers on a listing once one offer is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetingOffers {
    /// Leave them open; they fail later because the listing is sold.
    #[default]
    Keep,
    /// Reject them in the same transaction as the acceptance.
    Reject,
}

//! Offer negotiation over marketplace listings.

use super::status::{OfferStatus, PostStatus, StateMachine, Turn};
use super::CompetingOffers;
use crate::auth::Actor;
use crate::config::MarketplaceConfig;
use crate::db::{Database, Offer, SellPost, Store, now_timestamp};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Seller's answer to an open offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerAction {
    /// Close the deal at the current price.
    Accept,
    /// Decline the offer.
    Reject,
    /// Propose a different price.
    Counter,
}

/// Marketplace service.
pub struct MarketplaceService {
    db: Database,
    mark_pending_on_offer: bool,
    competing_offers: CompetingOffers,
}

impl MarketplaceService {
    /// Create a new marketplace service.
    pub fn new(db: Database, config: &MarketplaceConfig) -> Self {
        Self {
            db,
            mark_pending_on_offer: config.mark_pending_on_offer,
            competing_offers: config.competing_offers,
        }
    }

    // ========== LISTINGS ==========

    /// Create an AVAILABLE listing owned by `seller`.
    pub fn create_post(
        &self,
        seller: &Actor,
        title: &str,
        price_cents: i64,
        book_id: Option<&str>,
    ) -> Result<SellPost> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        validate_price(price_cents)?;

        let now = now_timestamp();
        let post = SellPost {
            id: uuid::Uuid::new_v4().to_string(),
            seller_id: seller.user_id.clone(),
            book_id: book_id.map(str::to_string),
            title: title.to_string(),
            price_cents,
            status: PostStatus::Available,
            created_at: now,
            updated_at: now,
        };

        self.db.transaction(|s| {
            if let Some(book_id) = book_id
                && s.get_book(book_id)?.is_none()
            {
                return Err(AppError::NotFound(format!("Book not found: {}", book_id)));
            }
            s.create_post(&post)
        })?;

        tracing::info!(
            post_id = %post.id,
            seller_id = %post.seller_id,
            price_cents,
            "Sell post created"
        );
        Ok(post)
    }

    /// Get a listing.
    pub fn get_post(&self, post_id: &str) -> Result<SellPost> {
        self.db.run(|s| load_post(s, post_id))
    }

    /// Listings open for offers.
    pub fn list_available_posts(&self) -> Result<Vec<SellPost>> {
        self.db
            .run(|s| s.list_posts_by_status(PostStatus::Available))
    }

    /// Change a listing's status. Owner or admin only.
    pub fn update_post_status(
        &self,
        post_id: &str,
        actor: &Actor,
        status: PostStatus,
    ) -> Result<SellPost> {
        let post = self.db.transaction(|s| {
            let mut post = load_post(s, post_id)?;
            if !actor.can_manage(&post.seller_id) {
                return Err(AppError::Forbidden(
                    "Only the seller or an admin can change this listing".to_string(),
                ));
            }

            post.status = post.status.transition_to(status)?;
            post.updated_at = now_timestamp();
            s.update_post_status(&post.id, post.status)?;
            Ok(post)
        })?;

        tracing::info!(
            post_id = %post.id,
            actor = %actor.user_id,
            status = post.status.as_str(),
            "Sell post status changed"
        );
        Ok(post)
    }

    // ========== OFFERS ==========

    /// Place an offer on an AVAILABLE listing.
    pub fn create_offer(
        &self,
        buyer: &Actor,
        post_id: &str,
        price_cents: i64,
        message: Option<String>,
    ) -> Result<Offer> {
        validate_price(price_cents)?;

        let offer = self.db.transaction(|s| {
            let post = load_post(s, post_id)?;
            if post.seller_id == buyer.user_id {
                return Err(AppError::Forbidden(
                    "Sellers cannot make offers on their own listing".to_string(),
                ));
            }
            if post.status != PostStatus::Available {
                return Err(AppError::InvalidState(format!(
                    "Listing is {} and not accepting offers",
                    post.status.as_str()
                )));
            }
            if s.find_open_offer(&post.id, &buyer.user_id)?.is_some() {
                return Err(AppError::Validation(
                    "You already have an open offer on this listing".to_string(),
                ));
            }

            let now = now_timestamp();
            let offer = Offer {
                id: uuid::Uuid::new_v4().to_string(),
                post_id: post.id.clone(),
                buyer_id: buyer.user_id.clone(),
                price_cents,
                status: OfferStatus::Pending,
                counter_price_cents: None,
                message,
                response_message: None,
                turn: Turn::Seller,
                created_at: now,
                updated_at: now,
                final_price_cents: None,
            };
            s.create_offer(&offer)?;

            if self.mark_pending_on_offer {
                let status = post.status.transition_to(PostStatus::Pending)?;
                s.update_post_status(&post.id, status)?;
            }

            Ok(offer)
        })?;

        tracing::info!(
            offer_id = %offer.id,
            post_id = %offer.post_id,
            buyer_id = %offer.buyer_id,
            price_cents,
            "Offer created"
        );
        Ok(offer)
    }

    /// Seller accepts, rejects or counters an open offer.
    pub fn respond_to_offer(
        &self,
        offer_id: &str,
        seller: &Actor,
        action: SellerAction,
        counter_price_cents: Option<i64>,
        message: Option<String>,
    ) -> Result<Offer> {
        let offer = self.db.transaction(|s| {
            let mut offer = load_offer(s, offer_id)?;
            let post = load_post(s, &offer.post_id)?;

            if post.seller_id != seller.user_id {
                return Err(AppError::Forbidden(
                    "Only the seller can respond to this offer".to_string(),
                ));
            }
            if !offer.status.is_open() {
                return Err(AppError::InvalidState(format!(
                    "Offer is {} and can no longer be answered",
                    offer.status.as_str()
                )));
            }

            if message.is_some() {
                offer.response_message = message;
            }

            match action {
                SellerAction::Accept => self.close_deal(s, &mut offer, &post)?,
                SellerAction::Reject => {
                    offer.status = offer.status.transition_to(OfferStatus::Rejected)?;
                    offer.turn = Turn::Closed;
                    offer.updated_at = now_timestamp();
                    s.update_offer(&offer)?;
                    release_post_if_idle(s, &post)?;
                }
                SellerAction::Counter => {
                    let counter = counter_price_cents.ok_or_else(|| {
                        AppError::Validation("Counter price is required".to_string())
                    })?;
                    validate_price(counter)?;

                    offer.status = offer.status.transition_to(OfferStatus::Countered)?;
                    offer.counter_price_cents = Some(counter);
                    offer.turn = Turn::Buyer;
                    offer.updated_at = now_timestamp();
                    s.update_offer(&offer)?;
                }
            }

            Ok(offer)
        })?;

        tracing::info!(
            offer_id = %offer.id,
            action = ?action,
            status = offer.status.as_str(),
            "Seller responded to offer"
        );
        Ok(offer)
    }

    /// Buyer accepts the seller's counter price.
    pub fn accept_counter(&self, offer_id: &str, buyer: &Actor) -> Result<Offer> {
        let offer = self.db.transaction(|s| {
            let mut offer = load_offer(s, offer_id)?;
            ensure_buyer(&offer, buyer)?;
            if offer.status != OfferStatus::Countered {
                return Err(AppError::InvalidState(
                    "Only a countered offer can be accepted by the buyer".to_string(),
                ));
            }

            let post = load_post(s, &offer.post_id)?;
            self.close_deal(s, &mut offer, &post)?;
            Ok(offer)
        })?;

        tracing::info!(
            offer_id = %offer.id,
            final_price_cents = offer.final_price_cents,
            "Buyer accepted counter offer"
        );
        Ok(offer)
    }

    /// Buyer answers a counter with a new price; the seller is up again.
    pub fn counter_back(&self, offer_id: &str, buyer: &Actor, price_cents: i64) -> Result<Offer> {
        validate_price(price_cents)?;

        let offer = self.db.transaction(|s| {
            let mut offer = load_offer(s, offer_id)?;
            ensure_buyer(&offer, buyer)?;
            if offer.status != OfferStatus::Countered {
                return Err(AppError::InvalidState(
                    "Can only counter back after the seller countered".to_string(),
                ));
            }

            offer.status = offer.status.transition_to(OfferStatus::Pending)?;
            offer.price_cents = price_cents;
            offer.counter_price_cents = None;
            offer.turn = Turn::Seller;
            offer.updated_at = now_timestamp();
            s.update_offer(&offer)?;
            Ok(offer)
        })?;

        tracing::info!(offer_id = %offer.id, price_cents, "Buyer countered back");
        Ok(offer)
    }

    /// Buyer withdraws an open offer. Accepted offers stay accepted.
    pub fn withdraw_offer(&self, offer_id: &str, buyer: &Actor) -> Result<Offer> {
        let offer = self.db.transaction(|s| {
            let mut offer = load_offer(s, offer_id)?;
            ensure_buyer(&offer, buyer)?;

            offer.status = offer.status.transition_to(OfferStatus::Withdrawn)?;
            offer.turn = Turn::Closed;
            offer.updated_at = now_timestamp();
            s.update_offer(&offer)?;

            let post = load_post(s, &offer.post_id)?;
            release_post_if_idle(s, &post)?;
            Ok(offer)
        })?;

        tracing::info!(offer_id = %offer.id, buyer_id = %offer.buyer_id, "Offer withdrawn");
        Ok(offer)
    }

    /// Get an offer visible to the buyer, the seller or an admin.
    pub fn get_offer(&self, offer_id: &str, actor: &Actor) -> Result<Offer> {
        self.db.run(|s| {
            let offer = load_offer(s, offer_id)?;
            if offer.buyer_id == actor.user_id {
                return Ok(offer);
            }
            let post = load_post(s, &offer.post_id)?;
            if actor.can_manage(&post.seller_id) {
                Ok(offer)
            } else {
                Err(AppError::Forbidden(
                    "Not a participant in this offer".to_string(),
                ))
            }
        })
    }

    /// All offers on a listing. Seller or admin only.
    pub fn list_post_offers(&self, post_id: &str, actor: &Actor) -> Result<Vec<Offer>> {
        self.db.run(|s| {
            let post = load_post(s, post_id)?;
            if !actor.can_manage(&post.seller_id) {
                return Err(AppError::Forbidden(
                    "Only the seller or an admin can list offers".to_string(),
                ));
            }
            s.list_post_offers(&post.id)
        })
    }

    /// Offers placed by a buyer.
    pub fn list_buyer_offers(&self, buyer: &Actor) -> Result<Vec<Offer>> {
        self.db.run(|s| s.list_buyer_offers(&buyer.user_id))
    }

    /// Accept `offer` at its agreed price and mark the listing SOLD.
    fn close_deal(&self, s: &Store<'_>, offer: &mut Offer, post: &SellPost) -> Result<()> {
        if post.status == PostStatus::Sold {
            return Err(AppError::InvalidState(
                "Listing has already been sold".to_string(),
            ));
        }
        let post_status = post.status.transition_to(PostStatus::Sold)?;

        offer.final_price_cents = Some(offer.agreed_price_cents());
        offer.status = offer.status.transition_to(OfferStatus::Accepted)?;
        offer.turn = Turn::Closed;
        offer.updated_at = now_timestamp();
        s.update_offer(offer)?;
        s.update_post_status(&post.id, post_status)?;

        if self.competing_offers == CompetingOffers::Reject {
            let rejected = s.reject_open_offers_except(&post.id, &offer.id)?;
            if rejected > 0 {
                tracing::info!(post_id = %post.id, rejected, "Rejected competing offers");
            }
        }

        Ok(())
    }
}

fn validate_price(price_cents: i64) -> Result<()> {
    if price_cents <= 0 {
        return Err(AppError::Validation(
            "Price must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn ensure_buyer(offer: &Offer, buyer: &Actor) -> Result<()> {
    if offer.buyer_id != buyer.user_id {
        return Err(AppError::Forbidden(
            "Only the buyer can act on this offer".to_string(),
        ));
    }
    Ok(())
}

fn load_post(s: &Store<'_>, post_id: &str) -> Result<SellPost> {
    s.get_post(post_id)?
        .ok_or_else(|| AppError::NotFound(format!("Sell post not found: {}", post_id)))
}

fn load_offer(s: &Store<'_>, offer_id: &str) -> Result<Offer> {
    s.get_offer(offer_id)?
        .ok_or_else(|| AppError::NotFound(format!("Offer not found: {}", offer_id)))
}

/// Put a PENDING listing back on the market once nobody is negotiating.
fn release_post_if_idle(s: &Store<'_>, post: &SellPost) -> Result<()> {
    if post.status == PostStatus::Pending && s.count_open_offers(&post.id)? == 0 {
        s.update_post_status(&post.id, PostStatus::Available)?;
        tracing::debug!(post_id = %post.id, "Sell post back to AVAILABLE");
    }
    Ok(())
}

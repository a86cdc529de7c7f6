mod schema;

pub use schema::{Database, Store};

use crate::auth::Role;
use crate::error::{AppError, Result};
use crate::marketplace::{OfferStatus, PostStatus, Turn};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// User account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Username for login.
    pub username: String,
    /// Argon2 password hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Account role.
    pub role: Role,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// Catalog book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Book ID.
    pub id: String,
    /// Book title.
    pub title: String,
    /// Primary author.
    pub author: Option<String>,
    /// Total page count, filled in by the first progress report that knows it.
    pub page_count: Option<i64>,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

impl Book {
    /// Build a new catalog book from user input.
    pub fn new(title: &str, author: Option<String>, page_count: Option<i64>) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }
        if page_count.is_some_and(|p| p <= 0) {
            return Err(AppError::Validation(
                "Page count must be greater than zero".to_string(),
            ));
        }

        let now = now_timestamp();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            author,
            page_count,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Marketplace listing for a used book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellPost {
    /// Listing ID.
    pub id: String,
    /// Owner of the listing.
    pub seller_id: String,
    /// Catalog book being sold, if linked.
    pub book_id: Option<String>,
    /// Listing title.
    pub title: String,
    /// Asking price in cents.
    pub price_cents: i64,
    /// Listing status.
    pub status: PostStatus,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
}

/// A buyer's proposed price against a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Offer ID.
    pub id: String,
    /// Listing the offer targets.
    pub post_id: String,
    /// Buyer who made the offer.
    pub buyer_id: String,
    /// Proposed price in cents.
    pub price_cents: i64,
    /// Negotiation status.
    pub status: OfferStatus,
    /// Seller's counter price in cents.
    pub counter_price_cents: Option<i64>,
    /// Buyer's note attached to the offer.
    pub message: Option<String>,
    /// Seller's note attached to the last response.
    pub response_message: Option<String>,
    /// Who is expected to act next.
    pub turn: Turn,
    /// Creation timestamp.
    pub created_at: i64,
    /// Last update timestamp.
    pub updated_at: i64,
    /// Price the deal closed at, set on acceptance.
    pub final_price_cents: Option<i64>,
}

impl Offer {
    /// Price the deal closes at if accepted now: the seller's counter
    /// while one stands, otherwise the buyer's proposal.
    pub fn agreed_price_cents(&self) -> i64 {
        self.final_price_cents.unwrap_or_else(|| match self.status {
            OfferStatus::Countered => self.counter_price_cents.unwrap_or(self.price_cents),
            _ => self.price_cents,
        })
    }
}

/// Reading progress for one (user, book) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// User ID.
    pub user_id: String,
    /// Book ID.
    pub book_id: String,
    /// Current page number.
    pub current_page: i64,
    /// Total pages in book.
    pub total_pages: Option<i64>,
    /// Reading percentage (0.0 - 100.0).
    pub progress: f64,
    /// Whether the book counts as finished.
    pub is_completed: bool,
    /// Last report timestamp.
    pub last_read_at: i64,
    /// Write counter, incremented on every update.
    pub version: i64,
}

/// One reading session. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressHistory {
    /// Row ID.
    pub id: i64,
    /// User ID.
    pub user_id: String,
    /// Book ID.
    pub book_id: String,
    /// Session timestamp.
    pub session_at: i64,
    /// Pages read during the session.
    pub pages_read: i64,
    /// Time spent in seconds.
    pub time_spent_seconds: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

/// Store a text-coded enum as TEXT.
macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let text = value.as_str()?;
                    <$ty>::parse(text).ok_or(FromSqlError::InvalidType)
                }
            }
        )+
    };
}

sql_text_enum!(Role, PostStatus, OfferStatus, Turn);

use crate::db::*;
use crate::error::{AppError, Result};
use crate::marketplace::PostStatus;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Run work against the store outside a transaction. Each statement
    /// commits on its own.
    pub fn run<T>(&self, f: impl FnOnce(&Store<'_>) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&Store { conn: &conn })
    }

    /// Run `f` inside one transaction. Any error rolls everything back.
    pub fn transaction<T>(&self, f: impl FnOnce(&Store<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Internal(format!("Failed to begin transaction: {}", e)))?;

        let out = f(&Store { conn: &tx })?;

        tx.commit()
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;
        Ok(out)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                display_name TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                created_at INTEGER NOT NULL,
                last_login INTEGER
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT,
                page_count INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Marketplace listings
            CREATE TABLE IF NOT EXISTS sell_posts (
                id TEXT PRIMARY KEY,
                seller_id TEXT NOT NULL,
                book_id TEXT,
                title TEXT NOT NULL,
                price_cents INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'AVAILABLE',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (seller_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE SET NULL
            );

            -- Offers on listings
            CREATE TABLE IF NOT EXISTS offers (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL,
                buyer_id TEXT NOT NULL,
                price_cents INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                counter_price_cents INTEGER,
                message TEXT,
                response_message TEXT,
                turn TEXT NOT NULL DEFAULT 'seller',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                final_price_cents INTEGER,
                FOREIGN KEY (post_id) REFERENCES sell_posts(id) ON DELETE CASCADE,
                FOREIGN KEY (buyer_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Reading progress table, one row per (user, book)
            CREATE TABLE IF NOT EXISTS reading_progress (
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                current_page INTEGER NOT NULL DEFAULT 0,
                total_pages INTEGER,
                progress REAL NOT NULL DEFAULT 0,
                is_completed INTEGER NOT NULL DEFAULT 0,
                last_read_at INTEGER NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (user_id, book_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Reading sessions, append-only
            CREATE TABLE IF NOT EXISTS progress_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                session_at INTEGER NOT NULL,
                pages_read INTEGER NOT NULL DEFAULT 0,
                time_spent_seconds INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            CREATE INDEX IF NOT EXISTS idx_posts_status ON sell_posts(status);
            CREATE INDEX IF NOT EXISTS idx_offers_post_status ON offers(post_id, status);
            CREATE INDEX IF NOT EXISTS idx_offers_buyer ON offers(buyer_id);
            CREATE INDEX IF NOT EXISTS idx_history_user_book ON progress_history(user_id, book_id, session_at);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }
}

/// Query surface over a connection or an open transaction.
pub struct Store<'c> {
    conn: &'c Connection,
}

const USER_COLUMNS: &str =
    "id, username, password_hash, display_name, role, created_at, last_login";
const POST_COLUMNS: &str =
    "id, seller_id, book_id, title, price_cents, status, created_at, updated_at";
const OFFER_COLUMNS: &str = "id, post_id, buyer_id, price_cents, status, counter_price_cents, \
     message, response_message, turn, created_at, updated_at, final_price_cents";
const PROGRESS_COLUMNS: &str =
    "user_id, book_id, current_page, total_pages, progress, is_completed, last_read_at, version";
const HISTORY_COLUMNS: &str =
    "id, user_id, book_id, session_at, pages_read, time_spent_seconds";

impl Store<'_> {
    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, username, password_hash, display_name, role, created_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id,
                    user.username,
                    user.password_hash,
                    user.display_name,
                    user.role,
                    user.created_at,
                    user.last_login,
                ],
            )
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint") {
                    AppError::Validation(format!("Username '{}' already exists", user.username))
                } else {
                    AppError::Internal(format!("Failed to create user: {}", e))
                }
            })?;
        Ok(())
    }

    /// Get user by username.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                row_to_user,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY username"
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    /// Update user password.
    pub fn update_user_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![password_hash, username],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update password: {}", e)))?;
        Ok(rows > 0)
    }

    /// Update user last login.
    pub fn update_user_last_login(&self, user_id: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE users SET last_login = ?1 WHERE id = ?2",
                params![now_timestamp(), user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    /// Delete user.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== SESSION OPERATIONS ==========

    /// Create session.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![session.token, session.user_id, session.expires_at],
            )
            .map_err(|e| AppError::Internal(format!("Failed to create session: {}", e)))?;
        Ok(())
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT token, user_id, expires_at FROM sessions WHERE token = ?1",
                params![token],
                |row| {
                    Ok(Session {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        expires_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get session: {}", e)))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| AppError::Internal(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    /// Cleanup expired sessions.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![now_timestamp()],
            )
            .map_err(|e| AppError::Internal(format!("Failed to cleanup sessions: {}", e)))?;
        Ok(rows)
    }

    // ========== BOOK OPERATIONS ==========

    /// Insert a catalog book.
    pub fn create_book(&self, book: &Book) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO books (id, title, author, page_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    book.id,
                    book.title,
                    book.author,
                    book.page_count,
                    book.created_at,
                    book.updated_at,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to create book: {}", e)))?;
        Ok(())
    }

    /// Get book by ID.
    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        self.conn
            .query_row(
                "SELECT id, title, author, page_count, created_at, updated_at
                 FROM books WHERE id = ?1",
                params![id],
                row_to_book,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// List all books ordered by title.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, author, page_count, created_at, updated_at
                 FROM books ORDER BY title",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map([], row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Set the page count only if it has never been set.
    pub fn backfill_book_pages(&self, id: &str, page_count: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE books SET page_count = ?1, updated_at = ?2
                 WHERE id = ?3 AND page_count IS NULL",
                params![page_count, now_timestamp(), id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update page count: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== SELL POST OPERATIONS ==========

    /// Insert a listing.
    pub fn create_post(&self, post: &SellPost) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sell_posts (id, seller_id, book_id, title, price_cents, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    post.id,
                    post.seller_id,
                    post.book_id,
                    post.title,
                    post.price_cents,
                    post.status,
                    post.created_at,
                    post.updated_at,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to create sell post: {}", e)))?;
        Ok(())
    }

    /// Get listing by ID.
    pub fn get_post(&self, id: &str) -> Result<Option<SellPost>> {
        self.conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM sell_posts WHERE id = ?1"),
                params![id],
                row_to_post,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get sell post: {}", e)))
    }

    /// List listings in a given status, newest first.
    pub fn list_posts_by_status(&self, status: PostStatus) -> Result<Vec<SellPost>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {POST_COLUMNS} FROM sell_posts WHERE status = ?1
                 ORDER BY created_at DESC, id"
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let posts = stmt
            .query_map(params![status], row_to_post)
            .map_err(|e| AppError::Internal(format!("Failed to list sell posts: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect sell posts: {}", e)))?;

        Ok(posts)
    }

    /// Update listing status.
    pub fn update_post_status(&self, id: &str, status: PostStatus) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE sell_posts SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, now_timestamp(), id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update sell post: {}", e)))?;
        Ok(rows > 0)
    }

    // ========== OFFER OPERATIONS ==========

    /// Insert an offer.
    pub fn create_offer(&self, offer: &Offer) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO offers ({OFFER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    offer.id,
                    offer.post_id,
                    offer.buyer_id,
                    offer.price_cents,
                    offer.status,
                    offer.counter_price_cents,
                    offer.message,
                    offer.response_message,
                    offer.turn,
                    offer.created_at,
                    offer.updated_at,
                    offer.final_price_cents,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to create offer: {}", e)))?;
        Ok(())
    }

    /// Get offer by ID.
    pub fn get_offer(&self, id: &str) -> Result<Option<Offer>> {
        self.conn
            .query_row(
                &format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = ?1"),
                params![id],
                row_to_offer,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get offer: {}", e)))
    }

    /// Persist the mutable negotiation fields of an offer.
    pub fn update_offer(&self, offer: &Offer) -> Result<()> {
        self.conn
            .execute(
                "UPDATE offers SET
                    price_cents = ?1,
                    status = ?2,
                    counter_price_cents = ?3,
                    response_message = ?4,
                    turn = ?5,
                    updated_at = ?6,
                    final_price_cents = ?7
                 WHERE id = ?8",
                params![
                    offer.price_cents,
                    offer.status,
                    offer.counter_price_cents,
                    offer.response_message,
                    offer.turn,
                    offer.updated_at,
                    offer.final_price_cents,
                    offer.id,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update offer: {}", e)))?;
        Ok(())
    }

    /// All offers on a listing, oldest first.
    pub fn list_post_offers(&self, post_id: &str) -> Result<Vec<Offer>> {
        self.query_offers(
            &format!(
                "SELECT {OFFER_COLUMNS} FROM offers WHERE post_id = ?1
                 ORDER BY created_at, id"
            ),
            post_id,
        )
    }

    /// All offers made by a buyer, newest first.
    pub fn list_buyer_offers(&self, buyer_id: &str) -> Result<Vec<Offer>> {
        self.query_offers(
            &format!(
                "SELECT {OFFER_COLUMNS} FROM offers WHERE buyer_id = ?1
                 ORDER BY created_at DESC, id"
            ),
            buyer_id,
        )
    }

    fn query_offers(&self, sql: &str, key: &str) -> Result<Vec<Offer>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let offers = stmt
            .query_map(params![key], row_to_offer)
            .map_err(|e| AppError::Internal(format!("Failed to list offers: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect offers: {}", e)))?;

        Ok(offers)
    }

    /// Open (PENDING or COUNTERED) offer by this buyer on this listing.
    pub fn find_open_offer(&self, post_id: &str, buyer_id: &str) -> Result<Option<Offer>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {OFFER_COLUMNS} FROM offers
                     WHERE post_id = ?1 AND buyer_id = ?2 AND status IN ('PENDING', 'COUNTERED')
                     LIMIT 1"
                ),
                params![post_id, buyer_id],
                row_to_offer,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to find open offer: {}", e)))
    }

    /// Number of open offers on a listing.
    pub fn count_open_offers(&self, post_id: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM offers
                 WHERE post_id = ?1 AND status IN ('PENDING', 'COUNTERED')",
                params![post_id],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Internal(format!("Failed to count offers: {}", e)))
    }

    /// Reject every open offer on a listing except `keep_id`.
    pub fn reject_open_offers_except(&self, post_id: &str, keep_id: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute(
                "UPDATE offers SET status = 'REJECTED', turn = 'closed', updated_at = ?1
                 WHERE post_id = ?2 AND id != ?3 AND status IN ('PENDING', 'COUNTERED')",
                params![now_timestamp(), post_id, keep_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to reject offers: {}", e)))?;
        Ok(rows)
    }

    // ========== PROGRESS OPERATIONS ==========

    /// Get reading progress for a book.
    pub fn get_progress(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {PROGRESS_COLUMNS} FROM reading_progress
                     WHERE user_id = ?1 AND book_id = ?2"
                ),
                params![user_id, book_id],
                row_to_progress,
            )
            .optional()
            .map_err(|e| AppError::Internal(format!("Failed to get progress: {}", e)))
    }

    /// Insert or replace the progress row for (user, book).
    pub fn upsert_progress(&self, progress: &ReadingProgress) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO reading_progress ({PROGRESS_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT (user_id, book_id) DO UPDATE SET
                        current_page = excluded.current_page,
                        total_pages = COALESCE(excluded.total_pages, reading_progress.total_pages),
                        progress = excluded.progress,
                        is_completed = excluded.is_completed,
                        last_read_at = excluded.last_read_at,
                        version = excluded.version"
                ),
                params![
                    progress.user_id,
                    progress.book_id,
                    progress.current_page,
                    progress.total_pages,
                    progress.progress,
                    progress.is_completed,
                    progress.last_read_at,
                    progress.version,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to save progress: {}", e)))?;
        Ok(())
    }

    /// Append a history row and return its ID.
    pub fn insert_history(&self, entry: &ProgressHistory) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO progress_history (user_id, book_id, session_at, pages_read, time_spent_seconds)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.user_id,
                    entry.book_id,
                    entry.session_at,
                    entry.pages_read,
                    entry.time_spent_seconds,
                ],
            )
            .map_err(|e| AppError::Internal(format!("Failed to append history: {}", e)))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// History rows for (user, book) at or after `since`, oldest first.
    pub fn list_history(
        &self,
        user_id: &str,
        book_id: &str,
        since: i64,
    ) -> Result<Vec<ProgressHistory>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM progress_history
                 WHERE user_id = ?1 AND book_id = ?2 AND session_at >= ?3
                 ORDER BY session_at, id"
            ))
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let history = stmt
            .query_map(params![user_id, book_id, since], |row| {
                Ok(ProgressHistory {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    book_id: row.get(2)?,
                    session_at: row.get(3)?,
                    pages_read: row.get(4)?,
                    time_spent_seconds: row.get(5)?,
                })
            })
            .map_err(|e| AppError::Internal(format!("Failed to get history: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect history: {}", e)))?;

        Ok(history)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        display_name: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
        last_login: row.get(6)?,
    })
}

fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        page_count: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<SellPost> {
    Ok(SellPost {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        book_id: row.get(2)?,
        title: row.get(3)?,
        price_cents: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_offer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Offer> {
    Ok(Offer {
        id: row.get(0)?,
        post_id: row.get(1)?,
        buyer_id: row.get(2)?,
        price_cents: row.get(3)?,
        status: row.get(4)?,
        counter_price_cents: row.get(5)?,
        message: row.get(6)?,
        response_message: row.get(7)?,
        turn: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        final_price_cents: row.get(11)?,
    })
}

fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReadingProgress> {
    Ok(ReadingProgress {
        user_id: row.get(0)?,
        book_id: row.get(1)?,
        current_page: row.get(2)?,
        total_pages: row.get(3)?,
        progress: row.get(4)?,
        is_completed: row.get(5)?,
        last_read_at: row.get(6)?,
        version: row.get(7)?,
    })
}

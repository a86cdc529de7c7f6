use crate::marketplace::CompetingOffers;
use crate::reading::ConflictPolicy;
use crate::reading::stats::MAX_HEATMAP_DAYS;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Book Heaven backend: marketplace negotiation and reading progress.
#[derive(Parser, Debug, Clone)]
#[command(name = "book-heaven")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "BOOK_HEAVEN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the server (default if no command given).
    Serve {
        /// Address to bind the server to.
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// User management commands.
    User {
        /// User subcommand action.
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Book catalog commands.
    Book {
        /// Book subcommand action.
        #[command(subcommand)]
        action: BookCommand,
    },

    /// Initialize database and create default config.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// User management subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Add a new user.
    Add {
        /// Username.
        username: String,
        /// Password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
        /// User role (admin or user).
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// Delete a user.
    Del {
        /// Username to delete.
        username: String,
    },

    /// List all users.
    List,

    /// Change user password.
    Passwd {
        /// Username.
        username: String,
        /// New password (will prompt if not provided).
        #[arg(short, long)]
        password: Option<String>,
    },
}

/// Book catalog subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BookCommand {
    /// Add a book to the catalog.
    Add {
        /// Book title.
        title: String,
        /// Author name.
        #[arg(short, long)]
        author: Option<String>,
        /// Total page count, if known.
        #[arg(long)]
        pages: Option<i64>,
    },

    /// List catalog books.
    List,
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Marketplace negotiation policy.
    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    /// Reading progress policy.
    #[serde(default)]
    pub reading: ReadingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(
        std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        8080,
    )
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/book-heaven.db")
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Registration mode: "open", "disabled".
    #[serde(default = "default_registration")]
    pub registration: String,

    /// Session token duration in days.
    #[serde(default = "default_session_days")]
    pub session_days: u32,

    /// Expired session cleanup interval in seconds (0 to disable).
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            registration: default_registration(),
            session_days: default_session_days(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

fn default_registration() -> String {
    "open".to_string()
}

fn default_session_days() -> u32 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl AuthConfig {
    /// Check if registration is enabled.
    pub fn registration_enabled(&self) -> bool {
        self.registration == "open"
    }
}

/// Marketplace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Move a listing to PENDING when it receives an offer.
    #[serde(default = "default_mark_pending")]
    pub mark_pending_on_offer: bool,

    /// What happens to other open offers when one is accepted.
    #[serde(default)]
    pub competing_offers: CompetingOffers,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            mark_pending_on_offer: default_mark_pending(),
            competing_offers: CompetingOffers::default(),
        }
    }
}

fn default_mark_pending() -> bool {
    true
}

/// Reading progress configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingConfig {
    /// How concurrent progress reports for the same book are resolved.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Largest heatmap window accepted, in days.
    #[serde(default = "default_heatmap_max_days")]
    pub heatmap_max_days: u32,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            heatmap_max_days: default_heatmap_max_days(),
        }
    }
}

fn default_heatmap_max_days() -> u32 {
    MAX_HEATMAP_DAYS
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> crate::error::Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot honour.
    fn validate(&self) -> crate::error::Result<()> {
        let days = self.reading.heatmap_max_days;
        if days == 0 || days > MAX_HEATMAP_DAYS {
            return Err(crate::error::AppError::Config(format!(
                "reading.heatmap_max_days must be between 1 and {}, got {}",
                MAX_HEATMAP_DAYS, days
            )));
        }
        Ok(())
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("book-heaven.toml"),
            dirs::config_dir()
                .map(|p| p.join("book-heaven").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/book-heaven/config.toml"),
        ];

        candidates
            .into_iter()
            .find(|p| !p.as_os_str().is_empty() && p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# book-heaven configuration

[server]
bind = "0.0.0.0:8080"

[database]
# path = "/var/lib/book-heaven/book-heaven.db"

[auth]
# Registration mode: "open" or "disabled"
registration = "open"
# Session duration in days
session_days = 30
# Expired session cleanup interval in seconds (0 to disable)
cleanup_interval_seconds = 3600

[marketplace]
# Move a listing to PENDING as soon as it receives an offer
mark_pending_on_offer = true
# Other open offers when one is accepted: "keep" or "reject"
competing_offers = "keep"

[reading]
# Concurrent progress reports: "last_write_wins" or "version_checked"
conflict_policy = "last_write_wins"
heatmap_max_days = 366
"#
        .to_string()
    }
}

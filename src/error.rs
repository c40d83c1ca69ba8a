//! Error types and result handling for Hondana operations.
//!
//! This module defines the error handling system used throughout Hondana.
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! - **Empty Fetch**: a source returned no chapters; nothing was changed
//! - **Store Errors**: a chapter store operation failed; the transaction was rolled back
//! - **Normalization Errors**: per-chapter metadata refresh failed; the sync was aborted
//! - **Source Errors**: fetching a chapter list failed
//! - **Not Found**: missing manga or sources
//! - **IO / JSON Errors**: download directory and snapshot operations
//!
//! # Examples
//!
//! ```rust
//! use hondana::error::{Error, Result};
//!
//! fn check(result: Result<()>) {
//!     match result {
//!         Ok(()) => println!("synced"),
//!         Err(Error::EmptyFetch { manga }) => println!("{} returned no chapters", manga),
//!         Err(e) => println!("sync failed: {}", e),
//!     }
//! }
//! ```

use thiserror::Error;

/// Type alias for Results with Hondana errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all Hondana operations.
///
/// # Variants
///
/// * [`EmptyFetch`](Error::EmptyFetch) - A source returned an empty chapter list
/// * [`Store`](Error::Store) - Chapter store failures
/// * [`Normalization`](Error::Normalization) - Per-chapter normalization failures
/// * [`Source`](Error::Source) - Source-specific errors with context
/// * [`NotFound`](Error::NotFound) - Missing resources
/// * [`Config`](Error::Config) - Invalid configuration
/// * [`Io`](Error::Io) - File system and IO errors
/// * [`Json`](Error::Json) - JSON serialization errors
/// * [`Other`](Error::Other) - Generic error messages
#[derive(Error, Debug)]
pub enum Error {
    /// The source returned no chapters for a manga.
    ///
    /// An empty chapter list is always treated as a source failure. The
    /// stored chapters of the manga are left untouched.
    #[error("No chapters found for '{manga}'")]
    EmptyFetch { manga: String },

    /// A chapter store operation failed.
    ///
    /// When raised inside a transaction, nothing of the transaction is
    /// visible afterwards.
    #[error("Store error: {0}")]
    Store(String),

    /// Database driver errors from the SQLite-backed store.
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Per-chapter metadata refresh or number recognition failed.
    ///
    /// # Fields
    ///
    /// * `src` - The identifier of the source whose normalizer failed
    /// * `message` - Descriptive error message
    #[error("Normalization error [{src}]: {message}")]
    Normalization { src: String, message: String },

    /// Source-specific errors with contextual information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::source("mangadex", "API rate limit exceeded");
    /// assert_eq!(error.to_string(), "Source error [mangadex]: API rate limit exceeded");
    /// ```
    #[error("Source error [{src}]: {message}")]
    Source { src: String, message: String },

    /// Resource not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// File system and IO operation errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization and deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error messages.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an empty fetch error for the manga with the given title.
    pub fn empty_fetch(manga: impl Into<String>) -> Self {
        Error::EmptyFetch {
            manga: manga.into(),
        }
    }

    /// Creates a store error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::store("chapter 42 does not exist");
    /// assert!(matches!(error, Error::Store(_)));
    /// ```
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Creates a normalization error with source ID and message.
    pub fn normalization(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Normalization {
            src: src.into(),
            message: msg.into(),
        }
    }

    /// Creates a source-specific error with source ID and message.
    pub fn source(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Source {
            src: src.into(),
            message: msg.into(),
        }
    }

    /// Creates a not found error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hondana::Error;
    ///
    /// let error = Error::not_found("Source: nonexistent-source");
    /// assert_eq!(error.to_string(), "Not found: Source: nonexistent-source");
    /// ```
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

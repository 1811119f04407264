//! Service layer for hive-core.
//!
//! Provides typed, high-level APIs for article, rating, reply,
//! moderation, and profile operations. Every mutation goes through a
//! single store transaction; the services never touch the documents
//! outside that contract.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use hive_core::core::HiveServices;
//!
//! let services = HiveServices::open(Path::new(".hive/store.db")).unwrap();
//! let session = services.session("u-1", "Dana").unwrap();
//! let articles = services.articles().list(&Default::default()).unwrap();
//! ```

pub mod articles;
pub mod errors;
pub mod identity;
pub mod moderation;
pub mod profiles;
pub mod replies;
pub mod reviews;

pub use errors::{CoreError, CoreResult};

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::store::DocumentStore;

/// Facade providing all hive service APIs.
///
/// Owns the document store and hands out domain-specific service
/// objects borrowing it.
pub struct HiveServices {
    store: DocumentStore,
}

impl HiveServices {
    /// Open (or create) the store at `db_path` and initialize its schema.
    pub fn open(db_path: &Path) -> CoreResult<Self> {
        let store = DocumentStore::open(db_path)?;
        store.init_schema()?;
        Ok(Self { store })
    }

    /// Open an in-memory store (tests and demos).
    pub fn open_in_memory() -> CoreResult<Self> {
        let store = DocumentStore::open_in_memory()?;
        store.init_schema()?;
        Ok(Self { store })
    }

    /// Access the underlying document store.
    #[must_use]
    pub const fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Access article operations.
    #[must_use]
    pub fn articles(&self) -> articles::ArticleService<'_> {
        articles::ArticleService::new(&self.store)
    }

    /// Access rating-ledger and review operations.
    #[must_use]
    pub fn reviews(&self) -> reviews::ReviewService<'_> {
        reviews::ReviewService::new(&self.store)
    }

    /// Access reply operations.
    #[must_use]
    pub fn replies(&self) -> replies::ReplyService<'_> {
        replies::ReplyService::new(&self.store)
    }

    /// Access the moderation queue.
    #[must_use]
    pub fn moderation(&self) -> moderation::ModerationService<'_> {
        moderation::ModerationService::new(&self.store)
    }

    /// Access user profile operations.
    #[must_use]
    pub fn profiles(&self) -> profiles::ProfileService<'_> {
        profiles::ProfileService::new(&self.store)
    }

    /// Resolve a session for an authenticated user.
    ///
    /// Creates a default profile on first contact and loads the
    /// admin/banned flags once, the way the UI boundary resolves them
    /// at session start.
    pub fn session(&self, user_id: &str, user_name: &str) -> CoreResult<Session> {
        let profile = self.profiles().ensure(user_id)?;
        Ok(Session {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            is_admin: profile.is_admin,
            is_banned: profile.is_banned,
        })
    }
}

/// An authenticated caller: identity plus the moderation flags
/// resolved at session start.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub user_name: String,
    pub is_admin: bool,
    pub is_banned: bool,
}

impl Session {
    /// Reject writes from banned accounts.
    pub(crate) fn require_active(&self) -> CoreResult<()> {
        if self.is_banned {
            return Err(CoreError::unauthorized(&self.user_id, "write (account banned)"));
        }
        Ok(())
    }

    /// Owner-or-admin authorization for edits and deletions.
    #[must_use]
    pub(crate) fn may_touch(&self, owner_id: &str) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// Decode a stored document into a typed model.
pub(crate) fn decode<T: DeserializeOwned>(path: &str, value: Value) -> CoreResult<T> {
    Ok(serde_json::from_value(value).with_context(|| format!("Malformed document at {path}"))?)
}

/// Encode a typed model into its stored JSON form.
pub(crate) fn encode<T: Serialize>(doc: &T) -> CoreResult<Value> {
    Ok(serde_json::to_value(doc).context("Failed to encode document")?)
}

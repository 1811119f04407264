//! Threaded replies under reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{decode, encode, CoreError, CoreResult, Session};
use crate::ids::new_reply_id;
use crate::model::{replies_parent, reply_path, review_path, Reply};
use crate::store::{DocumentStore, Order};

/// One row of a reply listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub reply_id: String,
    pub user_id: String,
    pub user_name: String,
    pub reply_text: String,
    pub timestamp: DateTime<Utc>,
}

/// Service for reply operations.
pub struct ReplyService<'a> {
    store: &'a DocumentStore,
}

impl<'a> ReplyService<'a> {
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Post a reply under a review. Returns the new reply id.
    pub fn post(
        &self,
        session: &Session,
        item_id: &str,
        review_id: &str,
        text: String,
    ) -> CoreResult<String> {
        session.require_active()?;
        if text.trim().is_empty() {
            return Err(CoreError::EmptyReplyText);
        }

        let reply_id = new_reply_id();
        let review_p = review_path(item_id, review_id);
        let reply_p = reply_path(item_id, review_id, &reply_id);
        self.store.in_transaction(|txn| {
            if txn.get(&review_p)?.is_none() {
                return Err(CoreError::not_found(&review_p));
            }
            let reply = Reply {
                user_id: session.user_id.clone(),
                user_name: session.user_name.clone(),
                reply_text: text,
                timestamp: Utc::now(),
            };
            txn.set(&reply_p, &encode(&reply)?)?;
            Ok(())
        })?;
        info!(item_id, review_id, reply_id, "reply posted");
        Ok(reply_id)
    }

    /// Edit a reply's text (owner or admin).
    pub fn edit(
        &self,
        session: &Session,
        item_id: &str,
        review_id: &str,
        reply_id: &str,
        text: String,
    ) -> CoreResult<()> {
        session.require_active()?;
        if text.trim().is_empty() {
            return Err(CoreError::EmptyReplyText);
        }

        let reply_p = reply_path(item_id, review_id, reply_id);
        self.store.in_transaction(|txn| {
            let value = txn
                .get(&reply_p)?
                .ok_or_else(|| CoreError::not_found(&reply_p))?;
            let mut reply: Reply = decode(&reply_p, value)?;
            if !session.may_touch(&reply.user_id) {
                return Err(CoreError::unauthorized(&session.user_id, "edit this reply"));
            }
            reply.reply_text = text;
            txn.set(&reply_p, &encode(&reply)?)?;
            Ok(())
        })
    }

    /// Delete a reply (owner or admin).
    pub fn delete(
        &self,
        session: &Session,
        item_id: &str,
        review_id: &str,
        reply_id: &str,
    ) -> CoreResult<()> {
        session.require_active()?;

        let reply_p = reply_path(item_id, review_id, reply_id);
        self.store.in_transaction(|txn| {
            let value = txn
                .get(&reply_p)?
                .ok_or_else(|| CoreError::not_found(&reply_p))?;
            let reply: Reply = decode(&reply_p, value)?;
            if !session.may_touch(&reply.user_id) {
                return Err(CoreError::unauthorized(
                    &session.user_id,
                    "delete this reply",
                ));
            }
            txn.delete(&reply_p)?;
            Ok(())
        })
    }

    /// List a review's replies, oldest first (thread order).
    pub fn list(&self, item_id: &str, review_id: &str) -> CoreResult<Vec<ReplyView>> {
        let docs = self
            .store
            .list(&replies_parent(item_id, review_id), "timestamp", Order::Asc)?;

        let mut out = Vec::new();
        for (path, value) in docs {
            let reply: Reply = decode(&path, value)?;
            let reply_id = path.rsplit('/').next().unwrap_or(&path).to_string();
            out.push(ReplyView {
                reply_id,
                user_id: reply.user_id,
                user_name: reply.user_name,
                reply_text: reply.reply_text,
                timestamp: reply.timestamp,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::articles::NewArticle;
    use crate::core::{CoreError, HiveServices};

    fn setup() -> (HiveServices, String) {
        let services = HiveServices::open_in_memory().unwrap();
        services.profiles().set_admin("mod", true).unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        let item_id = services
            .articles()
            .submit(
                &admin,
                NewArticle {
                    title: "On Bees".to_string(),
                    author: "A. Keeper".to_string(),
                    year: 2024,
                    article_url: "https://example.com/a.pdf".to_string(),
                },
            )
            .unwrap();
        let eli = services.session("u-2", "Eli").unwrap();
        services
            .reviews()
            .submit_rating(&eli, &item_id, 4.0, "Good".to_string())
            .unwrap();
        (services, item_id)
    }

    #[test]
    fn test_post_and_list_thread_order() {
        let (services, item_id) = setup();
        let fay = services.session("u-3", "Fay").unwrap();

        services
            .replies()
            .post(&fay, &item_id, "u-2", "First".to_string())
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        services
            .replies()
            .post(&fay, &item_id, "u-2", "Second".to_string())
            .unwrap();

        let replies = services.replies().list(&item_id, "u-2").unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].reply_text, "First");
        assert_eq!(replies[1].reply_text, "Second");
    }

    #[test]
    fn test_reply_requires_existing_review() {
        let (services, item_id) = setup();
        let fay = services.session("u-3", "Fay").unwrap();

        let err = services
            .replies()
            .post(&fay, &item_id, "u-nobody", "Hello?".to_string())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_blank_reply_rejected() {
        let (services, item_id) = setup();
        let fay = services.session("u-3", "Fay").unwrap();

        let err = services
            .replies()
            .post(&fay, &item_id, "u-2", "   ".to_string())
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyReplyText));
    }

    #[test]
    fn test_edit_and_delete_authorization() {
        let (services, item_id) = setup();
        let fay = services.session("u-3", "Fay").unwrap();
        let gil = services.session("u-4", "Gil").unwrap();

        let reply_id = services
            .replies()
            .post(&fay, &item_id, "u-2", "Agreed".to_string())
            .unwrap();

        let err = services
            .replies()
            .edit(&gil, &item_id, "u-2", &reply_id, "Hijack".to_string())
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized { .. }));

        services
            .replies()
            .edit(&fay, &item_id, "u-2", &reply_id, "Strongly agreed".to_string())
            .unwrap();

        let admin = services.session("mod", "Mod").unwrap();
        services
            .replies()
            .delete(&admin, &item_id, "u-2", &reply_id)
            .unwrap();
        assert!(services.replies().list(&item_id, "u-2").unwrap().is_empty());
    }
}

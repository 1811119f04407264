//! Edge-triggered notification dispatch.
//!
//! Drains the store's change feed from a durable cursor and runs each
//! record through the routing rules. Rules fire on transitions, not on
//! states: an approval notifies only on the false-to-true flip, so
//! re-saving an approved article stays silent. Dispatch failures never
//! touch the documents; a rule that errors is logged and skipped, and
//! the cursor still advances.

pub mod messenger;

pub use messenger::{FileSpool, MemoryMessenger, Messenger, Notification};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::core::{decode, CoreResult};
use crate::model::{item_path, review_path, user_path, Article, DocPath, Reply, Report, Review, UserProfile};
use crate::store::{ChangeRecord, DocumentStore};

/// What one dispatch run did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    /// Change records consumed (cursor advanced past them).
    pub processed: usize,
    /// Notifications composed and handed to the messenger.
    pub notifications: usize,
    /// Tokens delivered to across all sends.
    pub delivered: usize,
    /// Tokens that failed across all sends.
    pub failed: usize,
}

/// Drains the change feed and routes records to notification rules.
pub struct NotificationDispatcher<'a> {
    store: &'a DocumentStore,
    messenger: &'a dyn Messenger,
}

impl<'a> NotificationDispatcher<'a> {
    #[must_use]
    pub fn new(store: &'a DocumentStore, messenger: &'a dyn Messenger) -> Self {
        Self { store, messenger }
    }

    /// Process every change record past the cursor, advancing the
    /// cursor as each record is consumed.
    ///
    /// Each record is consumed exactly once across runs: a record that
    /// produced a notification is never revisited, and one whose rule
    /// failed is logged and left behind rather than retried forever.
    pub fn run(&self) -> CoreResult<DispatchSummary> {
        let mut summary = DispatchSummary::default();

        let cursor = self.store.last_dispatched_seq()?;
        let changes = self.store.changes_after(cursor)?;
        debug!(cursor, pending = changes.len(), "dispatch run starting");

        for change in &changes {
            if let Err(err) = self.route(change, &mut summary) {
                warn!(seq = change.seq, path = %change.path, error = %err, "notification rule failed");
            }
            self.store.set_last_dispatched_seq(change.seq)?;
            summary.processed += 1;
        }
        Ok(summary)
    }

    fn route(&self, change: &ChangeRecord, summary: &mut DispatchSummary) -> CoreResult<()> {
        let Some(doc_path) = DocPath::parse(&change.path) else {
            trace!(path = %change.path, "change outside known collections");
            return Ok(());
        };

        match doc_path {
            DocPath::Item { .. } if change.is_update() => self.on_article_update(change, summary),
            DocPath::Review { item_id, .. } if change.is_create() => {
                self.on_new_review(change, &item_id, summary)
            }
            DocPath::Reply {
                item_id, review_id, ..
            } if change.is_create() => self.on_new_reply(change, &item_id, &review_id, summary),
            DocPath::Report { .. } if change.is_create() => self.on_new_report(change, summary),
            DocPath::User { .. } if change.is_update() => self.on_user_update(change, summary),
            _ => Ok(()),
        }
    }

    /// Approval rule: fires only on the `approved` false-to-true flip.
    fn on_article_update(
        &self,
        change: &ChangeRecord,
        summary: &mut DispatchSummary,
    ) -> CoreResult<()> {
        let before_approved = change
            .before
            .as_ref()
            .and_then(|v| v["approved"].as_bool());
        let after = change.after.as_ref();
        let after_approved = after.and_then(|v| v["approved"].as_bool());
        if before_approved != Some(false) || after_approved != Some(true) {
            return Ok(());
        }

        let Some(after) = after else { return Ok(()) };
        let article: Article = decode(&change.path, after.clone())?;
        let tokens = self.tokens_for(&article.author_id)?;
        self.deliver(
            &tokens,
            Notification {
                title: "✅ Article Approved!".to_string(),
                body: format!(
                    "Your article \"{}\" has been approved and is now live.",
                    article.title
                ),
            },
            summary,
        );
        Ok(())
    }

    /// New-review rule: notify the article's author, never the
    /// reviewer about their own review.
    fn on_new_review(
        &self,
        change: &ChangeRecord,
        item_id: &str,
        summary: &mut DispatchSummary,
    ) -> CoreResult<()> {
        let Some(after) = change.after.as_ref() else {
            return Ok(());
        };
        let review: Review = decode(&change.path, after.clone())?;

        let article_p = item_path(item_id);
        let Some(value) = self.store.get(&article_p)? else {
            trace!(path = %article_p, "reviewed article already gone");
            return Ok(());
        };
        let article: Article = decode(&article_p, value)?;
        if article.author_id.is_empty() || article.author_id == review.user_id {
            return Ok(());
        }

        let tokens = self.tokens_for(&article.author_id)?;
        self.deliver(
            &tokens,
            Notification {
                title: "⭐ New Review!".to_string(),
                body: format!(
                    "{} left a review on your article \"{}\".",
                    review.user_name, article.title
                ),
            },
            summary,
        );
        Ok(())
    }

    /// New-reply rule: notify the review's owner, never the replier
    /// about their own reply.
    fn on_new_reply(
        &self,
        change: &ChangeRecord,
        item_id: &str,
        review_id: &str,
        summary: &mut DispatchSummary,
    ) -> CoreResult<()> {
        let Some(after) = change.after.as_ref() else {
            return Ok(());
        };
        let reply: Reply = decode(&change.path, after.clone())?;

        let review_p = review_path(item_id, review_id);
        let Some(value) = self.store.get(&review_p)? else {
            trace!(path = %review_p, "replied-to review already gone");
            return Ok(());
        };
        let review: Review = decode(&review_p, value)?;
        if review.user_id == reply.user_id {
            return Ok(());
        }

        let title = self
            .store
            .get(&item_path(item_id))?
            .map(|v| decode::<Article>(&item_path(item_id), v))
            .transpose()?
            .map_or_else(|| "an article".to_string(), |a| a.title);

        let tokens = self.tokens_for(&review.user_id)?;
        self.deliver(
            &tokens,
            Notification {
                title: "💬 New Reply!".to_string(),
                body: format!(
                    "{} replied to your review on \"{}\".",
                    reply.user_name, title
                ),
            },
            summary,
        );
        Ok(())
    }

    /// New-report rule: fan out to every admin's tokens in one send.
    fn on_new_report(
        &self,
        change: &ChangeRecord,
        summary: &mut DispatchSummary,
    ) -> CoreResult<()> {
        let Some(after) = change.after.as_ref() else {
            return Ok(());
        };
        let report: Report = decode(&change.path, after.clone())?;

        let mut tokens = Vec::new();
        for admin_path in self.store.find_by_flag("users", "isAdmin", true)? {
            if let Some(value) = self.store.get(&admin_path)? {
                let profile: UserProfile = decode(&admin_path, value)?;
                tokens.extend(profile.fcm_tokens);
            }
        }

        self.deliver(
            &tokens,
            Notification {
                title: "⚠️ New Content Report".to_string(),
                body: format!(
                    "{} reported a {}: \"{}\"",
                    report.reporter_name, report.content_type, report.reason
                ),
            },
            summary,
        );
        Ok(())
    }

    /// Ban rule: fires only on the `isBanned` false-to-true flip, and
    /// reads tokens from the change's own after-snapshot, since the
    /// live profile may have changed by dispatch time.
    fn on_user_update(
        &self,
        change: &ChangeRecord,
        summary: &mut DispatchSummary,
    ) -> CoreResult<()> {
        let before_banned = change.before.as_ref().and_then(|v| v["isBanned"].as_bool());
        let after = change.after.as_ref();
        let after_banned = after.and_then(|v| v["isBanned"].as_bool());
        if before_banned != Some(false) || after_banned != Some(true) {
            return Ok(());
        }

        let Some(after) = after else { return Ok(()) };
        let profile: UserProfile = decode(&change.path, after.clone())?;
        self.deliver(
            &profile.fcm_tokens,
            Notification {
                title: "⚠️ Account Suspended".to_string(),
                body: "Your account has been suspended due to repeated violations of our community guidelines."
                    .to_string(),
            },
            summary,
        );
        Ok(())
    }

    fn tokens_for(&self, user_id: &str) -> CoreResult<Vec<String>> {
        let path = user_path(user_id);
        match self.store.get(&path)? {
            Some(value) => {
                let profile: UserProfile = decode(&path, value)?;
                Ok(profile.fcm_tokens)
            }
            None => Ok(Vec::new()),
        }
    }

    fn deliver(&self, tokens: &[String], notification: Notification, summary: &mut DispatchSummary) {
        if tokens.is_empty() {
            trace!(title = %notification.title, "no registered tokens; skipping send");
            return;
        }
        let outcome = self.messenger.send(tokens, &notification);
        for failure in &outcome.failures {
            warn!(token = %failure.token, reason = %failure.reason, "token delivery failed");
        }
        summary.notifications += 1;
        summary.delivered += outcome.delivered;
        summary.failed += outcome.failures.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::articles::{ArticleFilter, NewArticle};
    use crate::core::HiveServices;
    use crate::model::{ContentRef, ContentType};

    fn new_article(title: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            author: "A. Keeper".to_string(),
            year: 2024,
            article_url: "https://example.com/a.pdf".to_string(),
        }
    }

    /// Run a fresh dispatcher over everything pending.
    fn drain(services: &HiveServices, messenger: &MemoryMessenger) -> DispatchSummary {
        NotificationDispatcher::new(services.store(), messenger)
            .run()
            .unwrap()
    }

    fn setup() -> HiveServices {
        let services = HiveServices::open_in_memory().unwrap();
        services.profiles().set_admin("mod", true).unwrap();
        services
    }

    #[test]
    fn test_approval_fires_exactly_once() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        services.profiles().register_token("u-1", "tok-dana").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let messenger = MemoryMessenger::new();
        let summary = drain(&services, &messenger);
        assert_eq!(summary.notifications, 1);

        let batches = messenger.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, vec!["tok-dana"]);
        assert!(batches[0].1.body.contains("On Bees"));

        // A second run consumes nothing.
        let summary = drain(&services, &messenger);
        assert_eq!(summary.processed, 0);
        assert_eq!(messenger.batches().len(), 1);
    }

    #[test]
    fn test_title_edit_does_not_fire_approval() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        services.profiles().register_token("u-1", "tok-dana").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let messenger = MemoryMessenger::new();
        drain(&services, &messenger);
        assert_eq!(messenger.batches().len(), 1);

        // Editing an approved article updates it without a flip.
        services
            .articles()
            .edit(&admin, &item_id, Some("On Bees, Revised".to_string()), None, None)
            .unwrap();
        let summary = drain(&services, &messenger);
        assert!(summary.processed > 0);
        assert_eq!(summary.notifications, 0);
        assert_eq!(messenger.batches().len(), 1);
    }

    #[test]
    fn test_reapproval_after_unapproval_fires_again() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        services.profiles().register_token("u-1", "tok-dana").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let messenger = MemoryMessenger::new();
        drain(&services, &messenger);
        assert_eq!(messenger.batches().len(), 1);

        // Pull the approval back, then grant it again: the second
        // false-to-true flip is a fresh edge.
        let path = crate::model::item_path(&item_id);
        services
            .store()
            .in_transaction(|txn| {
                let mut doc = txn.get(&path)?.unwrap();
                doc["approved"] = serde_json::Value::Bool(false);
                txn.set(&path, &doc)
            })
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        drain(&services, &messenger);
        assert_eq!(messenger.batches().len(), 2);
    }

    #[test]
    fn test_new_review_notifies_author_but_not_self() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        services.profiles().register_token("u-1", "tok-dana").unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let messenger = MemoryMessenger::new();
        drain(&services, &messenger);
        let baseline = messenger.batches().len();

        // Author reviews their own article: silence.
        services
            .reviews()
            .submit_rating(&author, &item_id, 5.0, "I like it".to_string())
            .unwrap();
        drain(&services, &messenger);
        assert_eq!(messenger.batches().len(), baseline);

        // Someone else reviews it: the author hears about it.
        let eli = services.session("u-2", "Eli").unwrap();
        services
            .reviews()
            .submit_rating(&eli, &item_id, 4.0, "Good".to_string())
            .unwrap();
        drain(&services, &messenger);

        let batches = messenger.batches();
        assert_eq!(batches.len(), baseline + 1);
        let last = batches.last().unwrap();
        assert_eq!(last.0, vec!["tok-dana"]);
        assert!(last.1.body.contains("Eli"));
    }

    #[test]
    fn test_new_reply_notifies_review_owner() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let eli = services.session("u-2", "Eli").unwrap();
        services.profiles().register_token("u-2", "tok-eli").unwrap();
        services
            .reviews()
            .submit_rating(&eli, &item_id, 4.0, "Good".to_string())
            .unwrap();

        let messenger = MemoryMessenger::new();
        drain(&services, &messenger);
        let baseline = messenger.batches().len();

        let fay = services.session("u-3", "Fay").unwrap();
        services
            .replies()
            .post(&fay, &item_id, "u-2", "Agreed".to_string())
            .unwrap();
        drain(&services, &messenger);

        let batches = messenger.batches();
        assert_eq!(batches.len(), baseline + 1);
        let last = batches.last().unwrap();
        assert_eq!(last.0, vec!["tok-eli"]);
        assert!(last.1.body.contains("Fay"));
        assert!(last.1.body.contains("On Bees"));
    }

    #[test]
    fn test_report_fans_out_to_all_admins() {
        let services = setup();
        services.profiles().register_token("mod", "tok-mod").unwrap();
        services.profiles().set_admin("mod2", true).unwrap();
        services.profiles().register_token("mod2", "tok-mod2").unwrap();

        let author = services.session("u-1", "Dana").unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();
        let eli = services.session("u-2", "Eli").unwrap();
        services
            .reviews()
            .submit_rating(&eli, &item_id, 1.0, "Rubbish".to_string())
            .unwrap();

        let messenger = MemoryMessenger::new();
        drain(&services, &messenger);
        let baseline = messenger.batches().len();

        let fay = services.session("u-3", "Fay").unwrap();
        services
            .moderation()
            .submit_report(
                &fay,
                ContentType::Review,
                &ContentRef {
                    item_id: item_id.clone(),
                    review_id: "u-2".to_string(),
                    reply_id: None,
                },
                "Abusive".to_string(),
            )
            .unwrap();
        drain(&services, &messenger);

        let batches = messenger.batches();
        assert_eq!(batches.len(), baseline + 1);
        let last = batches.last().unwrap();
        let mut tokens = last.0.clone();
        tokens.sort();
        assert_eq!(tokens, vec!["tok-mod", "tok-mod2"]);
        assert!(last.1.body.contains("Fay"));
        assert!(last.1.body.contains("review"));
    }

    #[test]
    fn test_ban_notifies_from_snapshot_and_only_once() {
        let services = setup();
        services.session("u-2", "Eli").unwrap();
        services.profiles().register_token("u-2", "tok-eli").unwrap();

        services.moderation().resolve_by_ban("u-2").unwrap();

        let messenger = MemoryMessenger::new();
        let summary = drain(&services, &messenger);
        assert_eq!(summary.notifications, 1);
        assert_eq!(messenger.batches()[0].0, vec!["tok-eli"]);

        // Re-running the ban writes nothing, so nothing new to dispatch.
        services.moderation().resolve_by_ban("u-2").unwrap();
        let summary = drain(&services, &messenger);
        assert_eq!(summary.notifications, 0);
        assert_eq!(messenger.batches().len(), 1);
    }

    #[test]
    fn test_zero_tokens_is_a_quiet_no_op() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let messenger = MemoryMessenger::new();
        let summary = drain(&services, &messenger);
        assert_eq!(summary.notifications, 0);
        assert!(messenger.batches().is_empty());
        // The records were still consumed.
        assert!(summary.processed > 0);
    }

    #[test]
    fn test_dead_token_does_not_block_batch() {
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        services.profiles().register_token("u-1", "tok-dead").unwrap();
        services.profiles().register_token("u-1", "tok-live").unwrap();
        let admin = services.session("mod", "Mod").unwrap();
        let item_id = services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();
        services.articles().approve(&admin, &item_id).unwrap();

        let messenger = MemoryMessenger::new().failing("tok-dead");
        let summary = drain(&services, &messenger);
        assert_eq!(summary.notifications, 1);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_unlisted_articles_still_dispatch() {
        // Sanity check that the listing filter and dispatch are
        // independent: a pending article produces no approval event
        // and does not appear in the default listing.
        let services = setup();
        let author = services.session("u-1", "Dana").unwrap();
        services
            .articles()
            .submit(&author, new_article("On Bees"))
            .unwrap();

        assert!(services
            .articles()
            .list(&ArticleFilter::default())
            .unwrap()
            .is_empty());

        let messenger = MemoryMessenger::new();
        let summary = drain(&services, &messenger);
        assert_eq!(summary.notifications, 0);
    }
}

//! The moderation queue: filing reports, resolving them, and the ban
//! cascade.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::reviews::remove_review;
use super::{decode, encode, CoreError, CoreResult, Session};
use crate::ids::new_report_id;
use crate::model::{
    report_path, reply_path, review_path, user_path, ContentRef, ContentType, DocPath, Reply,
    Report, Review, UserProfile,
};
use crate::store::{DocumentStore, Order};

/// How many paths the ban cascade processes per group query.
const BAN_SWEEP_BATCH: usize = 100;

/// One row of the moderation queue listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub report_id: String,
    pub content_type: ContentType,
    pub content_text: String,
    pub content_owner_id: String,
    pub item_id: String,
    pub review_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<String>,
    pub reporter_id: String,
    pub reporter_name: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// What a ban swept away.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanOutcome {
    /// False when the user was already banned (the flag was not
    /// touched again).
    pub newly_banned: bool,
    pub reviews_removed: usize,
    pub replies_removed: usize,
    pub reports_pruned: usize,
}

/// Service for the moderation queue.
pub struct ModerationService<'a> {
    store: &'a DocumentStore,
}

impl<'a> ModerationService<'a> {
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// File a report against a review or reply.
    ///
    /// The offending text and its owner are captured at filing time,
    /// so the report still reads sensibly after the content changes or
    /// disappears. Users cannot report their own content.
    pub fn submit_report(
        &self,
        session: &Session,
        content_type: ContentType,
        content: &ContentRef,
        reason: String,
    ) -> CoreResult<String> {
        session.require_active()?;
        if reason.trim().is_empty() {
            return Err(CoreError::EmptyReportReason);
        }

        let report_id = new_report_id();
        let report_p = report_path(&report_id);
        self.store.in_transaction(|txn| {
            let (content_text, content_owner_id) = match content_type {
                ContentType::Review => {
                    let path = review_path(&content.item_id, &content.review_id);
                    let value = txn.get(&path)?.ok_or_else(|| CoreError::not_found(&path))?;
                    let review: Review = decode(&path, value)?;
                    (review.comment, review.user_id)
                }
                ContentType::Reply => {
                    let reply_id = content.reply_id.as_deref().unwrap_or_default();
                    let path = reply_path(&content.item_id, &content.review_id, reply_id);
                    let value = txn.get(&path)?.ok_or_else(|| CoreError::not_found(&path))?;
                    let reply: Reply = decode(&path, value)?;
                    (reply.reply_text, reply.user_id)
                }
            };

            if content_owner_id == session.user_id {
                return Err(CoreError::unauthorized(
                    &session.user_id,
                    "report their own content",
                ));
            }

            let report = Report {
                content_type,
                content_text,
                content_owner_id,
                item_id: content.item_id.clone(),
                review_id: content.review_id.clone(),
                reply_id: content.reply_id.clone(),
                reporter_id: session.user_id.clone(),
                reporter_name: session.user_name.clone(),
                reason,
                timestamp: Utc::now(),
            };
            txn.set(&report_p, &encode(&report)?)?;
            Ok(())
        })?;
        info!(report_id, "report filed");
        Ok(report_id)
    }

    /// List open reports, newest first.
    pub fn list_reports(&self) -> CoreResult<Vec<ReportView>> {
        let docs = self.store.list("reports", "timestamp", Order::Desc)?;

        let mut out = Vec::new();
        for (path, value) in docs {
            let report: Report = decode(&path, value)?;
            let report_id = path.rsplit('/').next().unwrap_or(&path).to_string();
            out.push(ReportView {
                report_id,
                content_type: report.content_type,
                content_text: report.content_text,
                content_owner_id: report.content_owner_id,
                item_id: report.item_id,
                review_id: report.review_id,
                reply_id: report.reply_id,
                reporter_id: report.reporter_id,
                reporter_name: report.reporter_name,
                reason: report.reason,
                timestamp: report.timestamp,
            });
        }
        Ok(out)
    }

    /// Resolve a report by deleting the content it points at.
    ///
    /// Content removal and report closure commit together: both happen
    /// or neither does. Content that is already gone is benign; the
    /// report still closes.
    pub fn resolve_by_deletion(&self, report_id: &str) -> CoreResult<()> {
        let report_p = report_path(report_id);
        self.store.in_transaction(|txn| -> CoreResult<()> {
            let value = txn
                .get(&report_p)?
                .ok_or_else(|| CoreError::not_found(&report_p))?;
            let report: Report = decode(&report_p, value)?;

            match report.content_type {
                ContentType::Review => {
                    remove_review(txn, &report.item_id, &report.review_id)?;
                }
                ContentType::Reply => {
                    let reply_id = report.reply_id.as_deref().unwrap_or_default();
                    txn.delete(&reply_path(&report.item_id, &report.review_id, reply_id))?;
                }
            }
            txn.delete(&report_p)?;
            Ok(())
        })?;
        info!(report_id, "report resolved by deletion");
        Ok(())
    }

    /// Ban a user and sweep away everything they wrote.
    ///
    /// The ban flag flips at most once, so re-running the cascade on an
    /// already-banned user produces no second ban event. The sweep runs
    /// in bounded batches, each review/reply removal in its own
    /// transaction through the same ledger-unwinding path as a manual
    /// delete; a crash mid-sweep leaves a state a re-run completes.
    pub fn resolve_by_ban(&self, user_id: &str) -> CoreResult<BanOutcome> {
        let mut outcome = BanOutcome::default();

        let path = user_path(user_id);
        outcome.newly_banned = self.store.in_transaction(|txn| -> CoreResult<bool> {
            let mut profile: UserProfile = match txn.get(&path)? {
                Some(value) => decode(&path, value)?,
                None => UserProfile::default(),
            };
            if profile.is_banned {
                return Ok(false);
            }
            profile.is_banned = true;
            txn.set(&path, &encode(&profile)?)?;
            Ok(true)
        })?;
        if !outcome.newly_banned {
            debug!(user_id, "user already banned; sweeping remnants");
        }

        // Their reviews, unwound through the ledger.
        loop {
            let batch = self
                .store
                .find_by_field("reviews", "userId", user_id, BAN_SWEEP_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for doc_path in &batch {
                let Some(DocPath::Review { item_id, review_id }) = DocPath::parse(doc_path) else {
                    warn!(path = %doc_path, "skipping unparseable review path");
                    continue;
                };
                if self
                    .store
                    .in_transaction(|txn| remove_review(txn, &item_id, &review_id))?
                {
                    outcome.reviews_removed += 1;
                }
            }
        }

        // Their replies under other users' reviews.
        loop {
            let batch = self
                .store
                .find_by_field("replies", "userId", user_id, BAN_SWEEP_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for doc_path in &batch {
                if self.store.in_transaction(|txn| txn.delete(doc_path))? {
                    outcome.replies_removed += 1;
                }
            }
        }

        // Reports against their content are now moot.
        loop {
            let batch =
                self.store
                    .find_by_field("reports", "contentOwnerId", user_id, BAN_SWEEP_BATCH)?;
            if batch.is_empty() {
                break;
            }
            for doc_path in &batch {
                if self.store.in_transaction(|txn| txn.delete(doc_path))? {
                    outcome.reports_pruned += 1;
                }
            }
        }

        info!(
            user_id,
            reviews = outcome.reviews_removed,
            replies = outcome.replies_removed,
            reports = outcome.reports_pruned,
            "ban cascade complete"
        );
        Ok(outcome)
    }
}

//! The rating ledger: reviews and the aggregate counters they drive.
//!
//! Every mutation here touches the item document and the review record
//! in one transaction, so `ratingCount`/`ratingSum` can never drift
//! from the review collection they summarize.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{decode, encode, CoreError, CoreResult, Session};
use crate::model::{item_path, replies_parent, review_path, reviews_parent, Article, Review};
use crate::store::{DocumentStore, Order, Txn};

/// Accepted rating bounds, inclusive.
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// One row of a review listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub review_id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: f64,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// Service for rating and review operations.
pub struct ReviewService<'a> {
    store: &'a DocumentStore,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Submit a rating + comment on an item.
    ///
    /// The review is stored under the caller's user id, so a second
    /// submission from the same user fails with `AlreadyRated` rather
    /// than double-counting the ledger.
    pub fn submit_rating(
        &self,
        session: &Session,
        item_id: &str,
        rating: f64,
        comment: String,
    ) -> CoreResult<()> {
        session.require_active()?;
        validate_rating(rating)?;

        let article_path = item_path(item_id);
        let review_p = review_path(item_id, &session.user_id);
        self.store.in_transaction(|txn| {
            let value = txn
                .get(&article_path)?
                .ok_or_else(|| CoreError::not_found(&article_path))?;
            let mut article: Article = decode(&article_path, value)?;

            if txn.get(&review_p)?.is_some() {
                return Err(CoreError::AlreadyRated {
                    item_id: item_id.to_string(),
                    user_id: session.user_id.clone(),
                });
            }

            article.rating_count += 1;
            article.rating_sum += rating;
            txn.set(&article_path, &encode(&article)?)?;

            let review = Review {
                user_id: session.user_id.clone(),
                user_name: session.user_name.clone(),
                rating,
                comment,
                timestamp: Utc::now(),
            };
            txn.set(&review_p, &encode(&review)?)?;
            Ok(())
        })?;
        info!(item_id, user_id = %session.user_id, rating, "rating submitted");
        Ok(())
    }

    /// Change an existing review's rating and comment.
    ///
    /// The ledger moves by the rating delta in the same commit, so the
    /// aggregate stays exact (e.g. editing 2.0 to 5.0 adds 3.0 to the
    /// sum and leaves the count alone).
    pub fn edit_rating(
        &self,
        session: &Session,
        item_id: &str,
        review_id: &str,
        rating: f64,
        comment: String,
    ) -> CoreResult<()> {
        session.require_active()?;
        validate_rating(rating)?;

        let article_path = item_path(item_id);
        let review_p = review_path(item_id, review_id);
        self.store.in_transaction(|txn| {
            let value = txn
                .get(&review_p)?
                .ok_or_else(|| CoreError::not_found(&review_p))?;
            let mut review: Review = decode(&review_p, value)?;
            if !session.may_touch(&review.user_id) {
                return Err(CoreError::unauthorized(&session.user_id, "edit this review"));
            }

            let value = txn
                .get(&article_path)?
                .ok_or_else(|| CoreError::not_found(&article_path))?;
            let mut article: Article = decode(&article_path, value)?;
            article.rating_sum += rating - review.rating;
            txn.set(&article_path, &encode(&article)?)?;

            review.rating = rating;
            review.comment = comment;
            txn.set(&review_p, &encode(&review)?)?;
            Ok(())
        })
    }

    /// Delete a review, unwinding its rating from the ledger and
    /// removing its replies in the same commit.
    pub fn delete_rating(
        &self,
        session: &Session,
        item_id: &str,
        review_id: &str,
    ) -> CoreResult<()> {
        session.require_active()?;

        let review_p = review_path(item_id, review_id);
        self.store.in_transaction(|txn| {
            let value = txn
                .get(&review_p)?
                .ok_or_else(|| CoreError::not_found(&review_p))?;
            let review: Review = decode(&review_p, value)?;
            if !session.may_touch(&review.user_id) {
                return Err(CoreError::unauthorized(
                    &session.user_id,
                    "delete this review",
                ));
            }
            remove_review(txn, item_id, review_id)?;
            Ok(())
        })?;
        info!(item_id, review_id, "review deleted");
        Ok(())
    }

    /// List an item's reviews, newest first.
    pub fn list(&self, item_id: &str) -> CoreResult<Vec<ReviewView>> {
        let docs = self
            .store
            .list(&reviews_parent(item_id), "timestamp", Order::Desc)?;

        let mut out = Vec::new();
        for (path, value) in docs {
            let review: Review = decode(&path, value)?;
            let review_id = path.rsplit('/').next().unwrap_or(&path).to_string();
            out.push(ReviewView {
                review_id,
                user_id: review.user_id,
                user_name: review.user_name,
                rating: review.rating,
                comment: review.comment,
                timestamp: review.timestamp,
            });
        }
        Ok(out)
    }
}

/// Remove a review inside an open transaction: unwind the ledger,
/// delete the review's replies, then the review itself.
///
/// Benign when the review is already gone (returns `false`), which is
/// what the ban cascade and report resolution rely on. The count guard
/// keeps a double-unwind from driving the ledger negative.
pub(crate) fn remove_review(txn: &Txn<'_>, item_id: &str, review_id: &str) -> CoreResult<bool> {
    let review_p = review_path(item_id, review_id);
    let Some(value) = txn.get(&review_p)? else {
        return Ok(false);
    };
    let review: Review = decode(&review_p, value)?;

    let article_path = item_path(item_id);
    if let Some(value) = txn.get(&article_path)? {
        let mut article: Article = decode(&article_path, value)?;
        if article.rating_count > 0 {
            article.rating_count -= 1;
            article.rating_sum -= review.rating;
            txn.set(&article_path, &encode(&article)?)?;
        }
    }

    for (reply_path, _) in txn.list(&replies_parent(item_id, review_id), "timestamp", Order::Asc)? {
        txn.delete(&reply_path)?;
    }
    txn.delete(&review_p)?;
    Ok(true)
}

fn validate_rating(rating: f64) -> CoreResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CoreError::InvalidRating {
            rating,
            min: MIN_RATING,
            max: MAX_RATING,
        });
    }
    Ok(())
}

//! Article submission, listing, and the approval workflow.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::{decode, encode, CoreError, CoreResult, Session};
use crate::ids::new_article_id;
use crate::model::{item_path, replies_parent, reviews_parent, Article};
use crate::store::{DocumentStore, Order};

/// Which articles a listing should include.
///
/// Readers only see approved articles; the pending queue is the
/// admin's review backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleFilter {
    #[default]
    Approved,
    Pending,
    All,
}

/// Fields accepted when submitting a new article.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub author: String,
    pub year: i32,
    pub article_url: String,
}

/// One row of an article listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    pub item_id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub approved: bool,
    pub year: i32,
    pub article_url: String,
    pub rating_count: i64,
    pub average_rating: f64,
}

impl ArticleView {
    fn from_doc(item_id: String, article: &Article) -> Self {
        Self {
            item_id,
            title: article.title.clone(),
            author: article.author.clone(),
            author_id: article.author_id.clone(),
            approved: article.approved,
            year: article.year,
            article_url: article.article_url.clone(),
            rating_count: article.rating_count,
            average_rating: article.average_rating(),
        }
    }
}

/// Service for article operations.
pub struct ArticleService<'a> {
    store: &'a DocumentStore,
}

impl<'a> ArticleService<'a> {
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// Submit a new article. Admin submissions go live immediately;
    /// everyone else's wait in the pending queue until approved.
    ///
    /// Returns the new item id.
    pub fn submit(&self, session: &Session, new: NewArticle) -> CoreResult<String> {
        session.require_active()?;

        let item_id = new_article_id();
        let article = Article {
            title: new.title,
            author: new.author,
            author_id: session.user_id.clone(),
            approved: session.is_admin,
            year: new.year,
            rating_count: 0,
            rating_sum: 0.0,
            article_url: new.article_url,
            created_at: Utc::now(),
        };

        let path = item_path(&item_id);
        self.store
            .in_transaction(|txn| txn.set(&path, &encode(&article)?))?;
        info!(item_id, user_id = %session.user_id, "article submitted");
        Ok(item_id)
    }

    /// Fetch one article with its derived average rating.
    pub fn get(&self, item_id: &str) -> CoreResult<ArticleView> {
        let path = item_path(item_id);
        let value = self
            .store
            .get(&path)?
            .ok_or_else(|| CoreError::not_found(&path))?;
        let article: Article = decode(&path, value)?;
        Ok(ArticleView::from_doc(item_id.to_string(), &article))
    }

    /// List articles, newest first.
    pub fn list(&self, filter: &ArticleFilter) -> CoreResult<Vec<ArticleView>> {
        let docs = self.store.list("items", "createdAt", Order::Desc)?;

        let mut out = Vec::new();
        for (path, value) in docs {
            let article: Article = decode(&path, value)?;
            let keep = match filter {
                ArticleFilter::Approved => article.approved,
                ArticleFilter::Pending => !article.approved,
                ArticleFilter::All => true,
            };
            if !keep {
                continue;
            }
            let item_id = path.rsplit('/').next().unwrap_or(&path).to_string();
            out.push(ArticleView::from_doc(item_id, &article));
        }
        Ok(out)
    }

    /// Approve a pending article (admin only).
    ///
    /// Flipping `approved` from false to true is what the notification
    /// rules watch for; re-approving an already-approved article still
    /// writes but produces no flip.
    pub fn approve(&self, session: &Session, item_id: &str) -> CoreResult<()> {
        if !session.is_admin {
            return Err(CoreError::unauthorized(
                &session.user_id,
                "approve articles",
            ));
        }

        let path = item_path(item_id);
        self.store.in_transaction(|txn| -> CoreResult<()> {
            let value = txn
                .get(&path)?
                .ok_or_else(|| CoreError::not_found(&path))?;
            let mut article: Article = decode(&path, value)?;
            article.approved = true;
            txn.set(&path, &encode(&article)?)?;
            Ok(())
        })?;
        info!(item_id, "article approved");
        Ok(())
    }

    /// Edit an article's descriptive fields (admin or author).
    ///
    /// Leaves the approval flag and the rating ledger untouched.
    pub fn edit(
        &self,
        session: &Session,
        item_id: &str,
        title: Option<String>,
        year: Option<i32>,
        article_url: Option<String>,
    ) -> CoreResult<()> {
        session.require_active()?;

        let path = item_path(item_id);
        self.store.in_transaction(|txn| {
            let value = txn
                .get(&path)?
                .ok_or_else(|| CoreError::not_found(&path))?;
            let mut article: Article = decode(&path, value)?;
            if !session.may_touch(&article.author_id) {
                return Err(CoreError::unauthorized(
                    &session.user_id,
                    "edit this article",
                ));
            }
            if let Some(title) = title {
                article.title = title;
            }
            if let Some(year) = year {
                article.year = year;
            }
            if let Some(url) = article_url {
                article.article_url = url;
            }
            txn.set(&path, &encode(&article)?)?;
            Ok(())
        })
    }

    /// Reject (delete) an article and everything under it (admin only).
    pub fn reject(&self, session: &Session, item_id: &str) -> CoreResult<()> {
        if !session.is_admin {
            return Err(CoreError::unauthorized(&session.user_id, "reject articles"));
        }

        let path = item_path(item_id);
        self.store.in_transaction(|txn| {
            if txn.get(&path)?.is_none() {
                return Err(CoreError::not_found(&path));
            }
            // Reviews and their replies go with the article.
            for (review_path, _) in txn.list(&reviews_parent(item_id), "timestamp", Order::Asc)? {
                let review_id = review_path.rsplit('/').next().unwrap_or("");
                for (reply_path, _) in
                    txn.list(&replies_parent(item_id, review_id), "timestamp", Order::Asc)?
                {
                    txn.delete(&reply_path)?;
                }
                txn.delete(&review_path)?;
            }
            txn.delete(&path)?;
            Ok(())
        })?;
        debug!(item_id, "article rejected and removed");
        Ok(())
    }
}

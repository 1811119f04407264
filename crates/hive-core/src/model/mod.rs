//! Document model for the hive content-review service.
//!
//! All documents serialize as camelCase JSON objects matching the
//! persisted collection layout:
//!
//! - `items/{itemId}` — [`Article`]
//! - `items/{itemId}/reviews/{userId}` — [`Review`]
//! - `items/{itemId}/reviews/{reviewId}/replies/{replyId}` — [`Reply`]
//! - `reports/{reportId}` — [`Report`]
//! - `users/{uid}` — [`UserProfile`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFC3339 serialization at a fixed six fractional digits.
///
/// Listings order collections by comparing these strings, so every
/// stored timestamp must have the same width: variable-precision
/// output would sort `...:00.5Z` before `...:00Z` within a second.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::deserialize(de)
    }
}

/// A reviewable submitted article.
///
/// `rating_count`/`rating_sum` form the aggregate ledger: they are
/// only ever mutated together, inside the same transaction as the
/// review record they account for. The average is derived, never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    /// Display name of the article's author (free text on submission)
    pub author: String,
    /// User id of the submitter
    pub author_id: String,
    pub approved: bool,
    pub year: i32,
    pub rating_count: i64,
    pub rating_sum: f64,
    pub article_url: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Derived mean rating; 0.0 when there are no ratings (never NaN).
    pub fn average_rating(&self) -> f64 {
        if self.rating_count > 0 {
            self.rating_sum / self.rating_count as f64
        } else {
            0.0
        }
    }
}

/// A user's rating + comment on an article.
///
/// Stored at `items/{itemId}/reviews/{userId}` — the authoring user's
/// id is the document id, which is what enforces one rating per user
/// per item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: String,
    pub user_name: String,
    pub rating: f64,
    pub comment: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// A threaded reply to a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub user_id: String,
    pub user_name: String,
    pub reply_text: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Kind of content a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Review,
    Reply,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Review => write!(f, "review"),
            Self::Reply => write!(f, "reply"),
        }
    }
}

/// Non-owning reference to the content a report is about.
///
/// The referenced content may already be gone when the report is
/// resolved; resolution paths must treat that as benign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub item_id: String,
    pub review_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<String>,
}

/// A moderation report filed against a review or reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub content_type: ContentType,
    /// Excerpt of the offending content, captured at filing time
    pub content_text: String,
    pub content_owner_id: String,
    pub item_id: String,
    pub review_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<String>,
    pub reporter_id: String,
    pub reporter_name: String,
    pub reason: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Per-user moderation flags and registered delivery tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub is_admin: bool,
    pub is_banned: bool,
    #[serde(default)]
    pub fcm_tokens: Vec<String>,
}

// ============================================================================
// Document paths
// ============================================================================

/// Path of an article document.
pub fn item_path(item_id: &str) -> String {
    format!("items/{item_id}")
}

/// Collection path holding an article's reviews.
pub fn reviews_parent(item_id: &str) -> String {
    format!("items/{item_id}/reviews")
}

/// Path of a review document (review id == authoring user id).
pub fn review_path(item_id: &str, review_id: &str) -> String {
    format!("items/{item_id}/reviews/{review_id}")
}

/// Collection path holding a review's replies.
pub fn replies_parent(item_id: &str, review_id: &str) -> String {
    format!("items/{item_id}/reviews/{review_id}/replies")
}

/// Path of a reply document.
pub fn reply_path(item_id: &str, review_id: &str, reply_id: &str) -> String {
    format!("items/{item_id}/reviews/{review_id}/replies/{reply_id}")
}

/// Path of a report document.
pub fn report_path(report_id: &str) -> String {
    format!("reports/{report_id}")
}

/// Path of a user profile document.
pub fn user_path(user_id: &str) -> String {
    format!("users/{user_id}")
}

/// A parsed document path, used to route change records to
/// notification rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocPath {
    Item {
        item_id: String,
    },
    Review {
        item_id: String,
        review_id: String,
    },
    Reply {
        item_id: String,
        review_id: String,
        reply_id: String,
    },
    Report {
        report_id: String,
    },
    User {
        user_id: String,
    },
}

impl DocPath {
    /// Parse a stored document path into its collection shape.
    ///
    /// Returns `None` for paths that don't match any known collection.
    pub fn parse(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            ["items", item_id] => Some(Self::Item {
                item_id: (*item_id).to_string(),
            }),
            ["items", item_id, "reviews", review_id] => Some(Self::Review {
                item_id: (*item_id).to_string(),
                review_id: (*review_id).to_string(),
            }),
            ["items", item_id, "reviews", review_id, "replies", reply_id] => Some(Self::Reply {
                item_id: (*item_id).to_string(),
                review_id: (*review_id).to_string(),
                reply_id: (*reply_id).to_string(),
            }),
            ["reports", report_id] => Some(Self::Report {
                report_id: (*report_id).to_string(),
            }),
            ["users", user_id] => Some(Self::User {
                user_id: (*user_id).to_string(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_serializes_camel_case() {
        let article = Article {
            title: "On Bees".to_string(),
            author: "A. Keeper".to_string(),
            author_id: "u-1".to_string(),
            approved: false,
            year: 2024,
            rating_count: 2,
            rating_sum: 7.0,
            article_url: "https://example.com/bees.pdf".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["authorId"], "u-1");
        assert_eq!(json["ratingCount"], 2);
        assert_eq!(json["ratingSum"], 7.0);
        assert_eq!(json["articleUrl"], "https://example.com/bees.pdf");
        assert!(json.get("rating_count").is_none());
    }

    #[test]
    fn test_timestamps_serialize_at_fixed_precision() {
        use chrono::{Duration, TimeZone};

        let whole = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let review = |timestamp| Review {
            user_id: "u-1".to_string(),
            user_name: "Dana".to_string(),
            rating: 4.0,
            comment: String::new(),
            timestamp,
        };

        let json = serde_json::to_value(review(whole)).unwrap();
        let on_the_second = json["timestamp"].as_str().unwrap().to_string();
        assert_eq!(on_the_second, "2024-01-01T10:00:00.000000Z");

        // Sub-second-later timestamps must also sort after as strings.
        let json = serde_json::to_value(review(whole + Duration::milliseconds(500))).unwrap();
        let half_a_second_later = json["timestamp"].as_str().unwrap();
        assert_eq!(half_a_second_later, "2024-01-01T10:00:00.500000Z");
        assert!(on_the_second.as_str() < half_a_second_later);

        // Variable-precision input still deserializes.
        let review: Review = serde_json::from_value(serde_json::json!({
            "userId": "u-1",
            "userName": "Dana",
            "rating": 4.0,
            "comment": "",
            "timestamp": "2024-01-01T10:00:00Z",
        }))
        .unwrap();
        assert_eq!(review.timestamp, whole);
    }

    #[test]
    fn test_average_rating_derived() {
        let mut article = Article {
            title: String::new(),
            author: String::new(),
            author_id: String::new(),
            approved: true,
            year: 2024,
            rating_count: 4,
            rating_sum: 14.0,
            article_url: String::new(),
            created_at: Utc::now(),
        };
        assert!((article.average_rating() - 3.5).abs() < f64::EPSILON);

        article.rating_count = 0;
        article.rating_sum = 0.0;
        assert_eq!(article.average_rating(), 0.0);
        assert!(!article.average_rating().is_nan());
    }

    #[test]
    fn test_profile_defaults_and_token_field() {
        // A profile document without fcmTokens must deserialize with an
        // empty token list.
        let profile: UserProfile =
            serde_json::from_str(r#"{"isAdmin":true,"isBanned":false}"#).unwrap();
        assert!(profile.is_admin);
        assert!(!profile.is_banned);
        assert!(profile.fcm_tokens.is_empty());

        let default = UserProfile::default();
        assert!(!default.is_admin);
        assert!(!default.is_banned);
    }

    #[test]
    fn test_content_type_display_and_serde() {
        assert_eq!(ContentType::Review.to_string(), "review");
        assert_eq!(ContentType::Reply.to_string(), "reply");
        assert_eq!(
            serde_json::to_string(&ContentType::Reply).unwrap(),
            "\"reply\""
        );
    }

    #[test]
    fn test_doc_path_parse() {
        assert_eq!(
            DocPath::parse("items/ar-abc123"),
            Some(DocPath::Item {
                item_id: "ar-abc123".to_string()
            })
        );
        assert_eq!(
            DocPath::parse("items/ar-abc123/reviews/u-9"),
            Some(DocPath::Review {
                item_id: "ar-abc123".to_string(),
                review_id: "u-9".to_string()
            })
        );
        assert_eq!(
            DocPath::parse("items/a/reviews/b/replies/re-000000"),
            Some(DocPath::Reply {
                item_id: "a".to_string(),
                review_id: "b".to_string(),
                reply_id: "re-000000".to_string()
            })
        );
        assert_eq!(
            DocPath::parse("reports/rp-xyz987"),
            Some(DocPath::Report {
                report_id: "rp-xyz987".to_string()
            })
        );
        assert_eq!(
            DocPath::parse("users/u-1"),
            Some(DocPath::User {
                user_id: "u-1".to_string()
            })
        );
        assert_eq!(DocPath::parse("items/a/reviews"), None);
        assert_eq!(DocPath::parse("unknown/x"), None);
    }

    #[test]
    fn test_round_trip_matches_path_builders() {
        assert_eq!(
            DocPath::parse(&review_path("ar-1", "u-2")),
            Some(DocPath::Review {
                item_id: "ar-1".to_string(),
                review_id: "u-2".to_string()
            })
        );
        assert_eq!(
            DocPath::parse(&reply_path("ar-1", "u-2", "re-3")),
            Some(DocPath::Reply {
                item_id: "ar-1".to_string(),
                review_id: "u-2".to_string(),
                reply_id: "re-3".to_string()
            })
        );
    }
}

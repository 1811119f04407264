//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};

pub mod commands;

/// Content-review service with moderated articles, ratings, and
/// push-notification dispatch
#[derive(Parser, Debug)]
#[command(name = "hive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Override acting user id (default: $HIVE_USER or $USER)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Override display name (default: $HIVE_USER_NAME or the user id)
    #[arg(long, global = true)]
    pub name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new .hive directory in the current directory
    Init,

    /// Manage articles
    #[command(subcommand)]
    Articles(ArticlesCommands),

    /// Manage reviews and ratings
    #[command(subcommand)]
    Reviews(ReviewsCommands),

    /// Manage replies under reviews
    #[command(subcommand)]
    Replies(RepliesCommands),

    /// Manage the moderation queue
    #[command(subcommand)]
    Reports(ReportsCommands),

    /// Manage user profiles
    #[command(subcommand)]
    Users(UsersCommands),

    /// Drain pending change records into notifications
    Dispatch,
}

// ============================================================================
// Articles subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ArticlesCommands {
    /// Submit a new article (lands in the pending queue unless you are
    /// an admin)
    Submit {
        /// Article title
        #[arg(long)]
        title: String,

        /// Author display name (default: your display name)
        #[arg(long)]
        author: Option<String>,

        /// Publication year
        #[arg(long)]
        year: i32,

        /// Link to the article
        #[arg(long)]
        url: String,
    },

    /// List articles (approved by default)
    List {
        /// Show only the pending approval queue
        #[arg(long, conflicts_with = "all")]
        pending: bool,

        /// Show everything regardless of approval
        #[arg(long)]
        all: bool,
    },

    /// Show one article with its derived average rating
    Show {
        /// Item ID
        item_id: String,
    },

    /// Approve a pending article (admin)
    Approve {
        /// Item ID
        item_id: String,
    },

    /// Reject and remove an article (admin)
    Reject {
        /// Item ID
        item_id: String,
    },

    /// Edit an article's descriptive fields (author or admin)
    Edit {
        /// Item ID
        item_id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New publication year
        #[arg(long)]
        year: Option<i32>,

        /// New link
        #[arg(long)]
        url: Option<String>,
    },
}

// ============================================================================
// Reviews subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ReviewsCommands {
    /// Rate an article (one rating per user per article)
    Add {
        /// Item ID
        item_id: String,

        /// Rating, 1.0 through 5.0
        #[arg(long)]
        rating: f64,

        /// Review comment
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Change your rating and comment
    Edit {
        /// Item ID
        item_id: String,

        /// Review ID (the reviewing user's id)
        review_id: String,

        /// New rating, 1.0 through 5.0
        #[arg(long)]
        rating: f64,

        /// New comment
        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Delete a review (owner or admin)
    Delete {
        /// Item ID
        item_id: String,

        /// Review ID
        review_id: String,
    },

    /// List an article's reviews, newest first
    List {
        /// Item ID
        item_id: String,
    },
}

// ============================================================================
// Replies subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum RepliesCommands {
    /// Reply to a review
    Add {
        /// Item ID
        item_id: String,

        /// Review ID
        review_id: String,

        /// Reply text
        message: String,
    },

    /// Edit a reply (owner or admin)
    Edit {
        /// Item ID
        item_id: String,

        /// Review ID
        review_id: String,

        /// Reply ID
        reply_id: String,

        /// New text
        message: String,
    },

    /// Delete a reply (owner or admin)
    Delete {
        /// Item ID
        item_id: String,

        /// Review ID
        review_id: String,

        /// Reply ID
        reply_id: String,
    },

    /// List a review's replies in thread order
    List {
        /// Item ID
        item_id: String,

        /// Review ID
        review_id: String,
    },
}

// ============================================================================
// Reports subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ReportsCommands {
    /// Report a review or reply
    Add {
        /// Item ID
        item_id: String,

        /// Review ID
        review_id: String,

        /// Reply ID (report the reply instead of the review)
        #[arg(long)]
        reply: Option<String>,

        /// Why this content is being reported
        #[arg(long)]
        reason: String,
    },

    /// List open reports, newest first (admin)
    List,

    /// Resolve a report by deleting the reported content (admin)
    ResolveDelete {
        /// Report ID
        report_id: String,
    },

    /// Resolve reports by banning a user and sweeping their content
    /// (admin)
    ResolveBan {
        /// User ID to ban
        user_id: String,
    },
}

// ============================================================================
// Users subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// Show a user's profile flags and registered tokens
    Show {
        /// User ID
        user_id: String,
    },

    /// Register a push delivery token for yourself
    RegisterToken {
        /// Device token
        token: String,
    },

    /// Grant or revoke the admin flag (admin)
    SetAdmin {
        /// User ID
        user_id: String,

        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,
    },
}

//! Command implementations.

pub mod articles;
pub mod dispatch;
pub mod helpers;
pub mod init;
pub mod replies;
pub mod reports;
pub mod reviews;
pub mod users;

pub use articles::{
    run_articles_approve, run_articles_edit, run_articles_list, run_articles_reject,
    run_articles_show, run_articles_submit,
};
pub use dispatch::run_dispatch;
pub use init::run_init;
pub use replies::{run_replies_add, run_replies_delete, run_replies_edit, run_replies_list};
pub use reports::{
    run_reports_add, run_reports_list, run_reports_resolve_ban, run_reports_resolve_delete,
};
pub use reviews::{run_reviews_add, run_reviews_delete, run_reviews_edit, run_reviews_list};
pub use users::{run_users_register_token, run_users_set_admin, run_users_show};

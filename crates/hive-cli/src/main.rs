//! hive - content-review service with moderated articles, ratings,
//! and push-notification dispatch

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use std::env;

use cli::commands::{
    run_articles_approve, run_articles_edit, run_articles_list, run_articles_reject,
    run_articles_show, run_articles_submit, run_dispatch, run_init, run_replies_add,
    run_replies_delete, run_replies_edit, run_replies_list, run_reports_add, run_reports_list,
    run_reports_resolve_ban, run_reports_resolve_delete, run_reviews_add, run_reviews_delete,
    run_reviews_edit, run_reviews_list, run_users_register_token, run_users_set_admin,
    run_users_show,
};
use cli::{
    ArticlesCommands, Cli, Commands, RepliesCommands, ReportsCommands, ReviewsCommands,
    UsersCommands,
};
use output::OutputFormat;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = env::current_dir()?;
    tracing::debug!(root = %root.display(), "resolved working directory");

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let user = cli.user.as_deref();
    let name = cli.name.as_deref();

    match cli.command {
        Commands::Init => {
            run_init(&root)?;
        }

        Commands::Articles(cmd) => match cmd {
            ArticlesCommands::Submit {
                title,
                author,
                year,
                url,
            } => {
                run_articles_submit(&root, title, author, year, url, user, name, format)?;
            }
            ArticlesCommands::List { pending, all } => {
                run_articles_list(&root, pending, all, format)?;
            }
            ArticlesCommands::Show { item_id } => {
                run_articles_show(&root, &item_id, format)?;
            }
            ArticlesCommands::Approve { item_id } => {
                run_articles_approve(&root, &item_id, user, name, format)?;
            }
            ArticlesCommands::Reject { item_id } => {
                run_articles_reject(&root, &item_id, user, name)?;
            }
            ArticlesCommands::Edit {
                item_id,
                title,
                year,
                url,
            } => {
                run_articles_edit(&root, &item_id, title, year, url, user, name, format)?;
            }
        },

        Commands::Reviews(cmd) => match cmd {
            ReviewsCommands::Add {
                item_id,
                rating,
                comment,
            } => {
                run_reviews_add(&root, &item_id, rating, comment, user, name, format)?;
            }
            ReviewsCommands::Edit {
                item_id,
                review_id,
                rating,
                comment,
            } => {
                run_reviews_edit(
                    &root, &item_id, &review_id, rating, comment, user, name, format,
                )?;
            }
            ReviewsCommands::Delete { item_id, review_id } => {
                run_reviews_delete(&root, &item_id, &review_id, user, name, format)?;
            }
            ReviewsCommands::List { item_id } => {
                run_reviews_list(&root, &item_id, format)?;
            }
        },

        Commands::Replies(cmd) => match cmd {
            RepliesCommands::Add {
                item_id,
                review_id,
                message,
            } => {
                run_replies_add(&root, &item_id, &review_id, message, user, name, format)?;
            }
            RepliesCommands::Edit {
                item_id,
                review_id,
                reply_id,
                message,
            } => {
                run_replies_edit(&root, &item_id, &review_id, &reply_id, message, user, name)?;
            }
            RepliesCommands::Delete {
                item_id,
                review_id,
                reply_id,
            } => {
                run_replies_delete(&root, &item_id, &review_id, &reply_id, user, name)?;
            }
            RepliesCommands::List { item_id, review_id } => {
                run_replies_list(&root, &item_id, &review_id, format)?;
            }
        },

        Commands::Reports(cmd) => match cmd {
            ReportsCommands::Add {
                item_id,
                review_id,
                reply,
                reason,
            } => {
                run_reports_add(
                    &root, &item_id, &review_id, reply, reason, user, name, format,
                )?;
            }
            ReportsCommands::List => {
                run_reports_list(&root, user, name, format)?;
            }
            ReportsCommands::ResolveDelete { report_id } => {
                run_reports_resolve_delete(&root, &report_id, user, name)?;
            }
            ReportsCommands::ResolveBan { user_id } => {
                run_reports_resolve_ban(&root, &user_id, user, name, format)?;
            }
        },

        Commands::Users(cmd) => match cmd {
            UsersCommands::Show { user_id } => {
                run_users_show(&root, &user_id, format)?;
            }
            UsersCommands::RegisterToken { token } => {
                run_users_register_token(&root, &token, user, name)?;
            }
            UsersCommands::SetAdmin { user_id, revoke } => {
                run_users_set_admin(&root, &user_id, revoke, user, name)?;
            }
        },

        Commands::Dispatch => {
            run_dispatch(&root, format)?;
        }
    }

    Ok(())
}

//! Interactive menu shell.
//!
//! Pure I/O glue over the loaders and query templates. An operation failure
//! is reported and returns to the menu; it never takes the process down.

use crate::queries;
use anyhow::Result;
use colored::Colorize;
use sociograph_client::GraphService;
use sociograph_ingest_csv::{load_dir, schema};
use std::io::{self, Write};
use std::path::Path;

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prompt for a value, keeping `default` on empty input.
fn prompt_or<T: std::str::FromStr + std::fmt::Display>(label: &str, default: T) -> Result<T> {
    let line = prompt(&format!("{label} [{default}]"))?;
    if line.is_empty() {
        return Ok(default);
    }
    match line.parse() {
        Ok(value) => Ok(value),
        Err(_) => {
            println!("{}", format!("invalid value {line:?}, using {default}").yellow());
            Ok(default)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => println!("{}", format!("failed to render result: {err}").red()),
    }
}

fn banner(title: &str) {
    let line = "*".repeat(72);
    println!("{line}");
    println!("\t\t\t{}", title.bold());
    println!("{line}");
}

async fn query_menu<S: GraphService>(service: &S) -> Result<()> {
    println!("{}", "Queries:".bold());
    println!("  1 -- Find influential users");
    println!("  2 -- Get trending hashtags");
    println!("  3 -- Query community members");
    println!("  4 -- User follower network");
    println!("  5 -- Search posts and comments");
    println!("  6 -- Posts by user");

    match prompt("Enter your choice")?.as_str() {
        "1" => {
            banner("Find influential users");
            let min = prompt_or("Minimum influence score", 8.0)?;
            print_json(&queries::influential_users(service, min).await?);
        }
        "2" => {
            banner("Get trending hashtags");
            let min = prompt_or("Minimum trend score", 7.5)?;
            let hashtags = prompt_or("Hashtag limit", 5usize)?;
            let posts = prompt_or("Posts per hashtag", 3usize)?;
            print_json(&queries::trending_hashtags(service, min, hashtags, posts).await?);
        }
        "3" => {
            banner("Query community members");
            let name = prompt("Community name")?;
            let first = prompt_or("Page size", 10usize)?;
            let offset = prompt_or("Offset", 0usize)?;
            print_json(&queries::community_members(service, &name, first, offset).await?);
        }
        "4" => {
            banner("User follower network");
            let min = prompt_or("Minimum influence score", 8.0)?;
            print_json(&queries::user_network(service, min).await?);
        }
        "5" => {
            banner("Search posts and comments");
            let text = prompt("Search text")?;
            print_json(&queries::search_content(service, &text).await?);
        }
        "6" => {
            banner("Posts by user");
            let username = prompt("Username")?;
            print_json(&queries::posts_by_user(service, &username).await?);
        }
        other => println!("{}", format!("invalid option {other:?}").yellow()),
    }
    Ok(())
}

/// Main menu loop. Runs until the user exits.
pub async fn run<S: GraphService>(service: &S, data_dir: &Path) -> Result<()> {
    loop {
        println!();
        println!("{}", "Sociograph".bold().cyan());
        println!("  1 -- Create schema");
        println!("  2 -- Load data");
        println!("  3 -- Query data");
        println!("  4 -- Drop all data");
        println!("  5 -- Exit");

        let choice = prompt("Enter your choice")?;
        let outcome: Result<()> = match choice.as_str() {
            "1" => schema::apply(service).await.map_err(Into::into),
            "2" => match load_dir(service, data_dir).await {
                Ok(report) => {
                    println!("{}", "Data loaded".green());
                    print!("{report}");
                    Ok(())
                }
                Err(err) => Err(err.into()),
            },
            "3" => query_menu(service).await,
            "4" => {
                if prompt("Type 'drop' to confirm")? == "drop" {
                    service.drop_all().await.map_err(Into::into)
                } else {
                    println!("{}", "aborted".yellow());
                    Ok(())
                }
            }
            "5" => return Ok(()),
            other => {
                println!("{}", format!("invalid option {other:?}").yellow());
                Ok(())
            }
        };

        // Only the startup connection check is fatal; everything else
        // reports and returns to the menu.
        if let Err(err) = outcome {
            println!("{}", format!("operation failed: {err:#}").red());
        }
    }
}

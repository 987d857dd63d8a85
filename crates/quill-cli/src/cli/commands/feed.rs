//! Feed command handler.
//!
//! Prints the first page, then reads commands from stdin: an empty line loads
//! the next page, `tags a,b` switches the filter (`tags` alone clears it), and
//! `q` quits. With `--pages N` it loads N pages and exits.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use quill_core::api::{BlogClient, PostSummary};
use quill_core::feed::{Feed, FeedEvent, FetchOutcome, TagFilter};

use crate::cli::context::AppContext;

/// A parsed line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Event(FeedEvent),
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line {
        "" | "m" | "more" => return Input::Event(FeedEvent::SentinelVisible),
        "q" | "quit" | "exit" => return Input::Quit,
        _ => {}
    }
    match line.strip_prefix("tags") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            Input::Event(FeedEvent::FilterChanged(TagFilter::parse(rest)))
        }
        _ => Input::Unknown(line.to_string()),
    }
}

pub async fn run(app: &AppContext, tags: Option<&str>, pages: Option<u32>) -> Result<()> {
    app.visits().ping_if_due(&app.client).await;

    let feed = Feed::new(app.client.clone(), app.config.effective_page_size());
    let filter = tags.map(TagFilter::parse).unwrap_or_default();
    let mut shown = 0;

    print_filter(&filter, false);
    let first = feed.change_filter(filter).await;

    if let Some(pages) = pages {
        into_result(first)?;
        render(&feed, &mut shown);
        for _ in 1..pages {
            let Some(outcome) = feed.load_more().await else {
                break;
            };
            into_result(outcome)?;
            render(&feed, &mut shown);
        }
        print_footer(&feed);
        return Ok(());
    }

    report(&first);
    render(&feed, &mut shown);
    print_footer(&feed);

    let stdin = io::stdin();
    loop {
        print!("[enter] more  tags <a,b>  q > ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }

        let event = match parse_input(&line) {
            Input::Quit => break,
            Input::Unknown(cmd) => {
                eprintln!("Unknown command: {cmd}");
                continue;
            }
            Input::Event(event) => event,
        };

        if let FeedEvent::FilterChanged(filter) = &event {
            shown = 0;
            print_filter(filter, true);
        }
        if let Some(outcome) = feed.dispatch(event).await {
            report(&outcome);
        }
        render(&feed, &mut shown);
        print_footer(&feed);
    }

    Ok(())
}

fn print_filter(filter: &TagFilter, announce_all: bool) {
    if filter.is_empty() {
        if announce_all {
            println!("Showing all posts");
        }
    } else {
        println!("Showing posts tagged {}", filter.tags().join(", "));
    }
}

/// Prints posts appended since the last call.
fn render(feed: &Feed<BlogClient>, shown: &mut usize) {
    let posts = feed.with_state(|s| s.posts()[(*shown).min(s.posts().len())..].to_vec());
    for post in &posts {
        println!("{}", format_post(post));
    }
    *shown += posts.len();
}

fn print_footer(feed: &Feed<BlogClient>) {
    let (empty, has_more) = feed.with_state(|s| (s.is_empty_feed(), s.has_more()));
    if empty {
        println!("No posts found.");
    } else if !has_more {
        println!("(end of feed)");
    }
}

fn report(outcome: &FetchOutcome) {
    if let FetchOutcome::Failed(err) = outcome {
        eprintln!("Failed to load posts: {}", err.user_message());
    }
}

fn into_result(outcome: FetchOutcome) -> Result<()> {
    match outcome {
        FetchOutcome::Failed(err) => Err(err.into()),
        _ => Ok(()),
    }
}

fn format_post(post: &PostSummary) -> String {
    let mut line = format!(
        "#{:<5} {}  {}  by {}  ♥ {}",
        post.id,
        post.created_at.format("%Y-%m-%d"),
        post.title,
        post.author_name,
        post.like_count
    );
    if !post.tags.is_empty() {
        line.push_str(&format!("  [{}]", post.tags.join(", ")));
    }
    line
}

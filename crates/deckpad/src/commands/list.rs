use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::deck::{Deck, Fields};

use super::open_session;

#[derive(Debug, Serialize)]
struct SlideSummary {
    index: usize,
    title: Option<String>,
    classes: Vec<String>,
    frontmatter: Fields,
    global: Fields,
}

fn summarize(deck: &Deck) -> Vec<SlideSummary> {
    deck.slides()
        .iter()
        .map(|s| SlideSummary {
            index: s.index,
            title: s.display_title(),
            classes: s.classes(),
            frontmatter: s.frontmatter.fields().clone(),
            global: s.frontmatter.global.clone(),
        })
        .collect()
}

pub fn run(source: Option<&str>, json: bool, original: bool) -> Result<()> {
    let (_, session) = open_session(source, original)?;
    let summaries = summarize(session.deck());

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("{}", "No slides found.".yellow());
        return Ok(());
    }

    let current = session.index();
    for summary in &summaries {
        let marker = if summary.index == current { ">" } else { " " };
        let title = summary
            .title
            .clone()
            .unwrap_or_else(|| "(untitled)".to_string());
        let classes = if summary.classes.is_empty() {
            String::new()
        } else {
            format!("  [{}]", summary.classes.join(" "))
        };
        println!(
            "{marker} {:>3}  {}{}",
            (summary.index + 1).to_string().dimmed(),
            title.bold(),
            classes.cyan()
        );
    }
    if session.restored_edits() {
        println!();
        println!("{}", "Showing locally saved edits (use --original to ignore).".dimmed());
    }
    Ok(())
}

use anyhow::Result;
use colored::Colorize;

use super::open_session;

pub fn run(source: Option<&str>, slide: Option<usize>, raw: bool, original: bool) -> Result<()> {
    let (_, session) = open_session(source, original)?;
    let deck = session.deck();

    let slides: Vec<_> = match slide {
        Some(n) => {
            let Some(s) = n.checked_sub(1).and_then(|i| deck.get(i)) else {
                anyhow::bail!("Slide {n} does not exist (deck has {} slides)", deck.len());
            };
            vec![s]
        }
        None => deck.slides().iter().collect(),
    };

    for (i, s) in slides.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let header = match s.display_title() {
            Some(title) => format!("── {} · {title} ", s.index + 1),
            None => format!("── {} ", s.index + 1),
        };
        println!("{}", header.dimmed());
        if raw {
            println!("{}", s.content.source());
        } else {
            if s.content.is_empty() {
                println!("{}", "(empty)".dimmed());
            } else {
                println!("{}", s.content.plain_text(session.data()));
            }
        }
    }
    Ok(())
}

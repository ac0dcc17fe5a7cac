use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::loader::source_from_arg;

use super::open_storage;

pub fn run(source: Option<&str>, yes: bool) -> Result<()> {
    let config = Config::load_or_default();
    let source = source_from_arg(&config.resolve_source(source)).describe();
    let mut storage = open_storage(&config, &source)?;

    if !storage.path().exists() {
        println!("{}", format!("Nothing saved for {source}.").yellow());
        return Ok(());
    }

    if !yes {
        let confirmed = inquire::Confirm::new(&format!(
            "Discard saved edits and slide position for {source}?"
        ))
        .with_default(false)
        .prompt()?;
        if !confirmed {
            println!("{}", "Kept saved state.".dimmed());
            return Ok(());
        }
    }

    storage.clear()?;
    println!("{}", format!("Forgot saved state for {source}.").green());
    Ok(())
}

use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use style_mirror::cli::StyleCommand;
use style_mirror::fetcher::{Fetch, HttpFetcher};
use style_mirror::logging;
use style_mirror::{Outcome, Page, StyleMirror};

/// Asks for a URL until one loads.
async fn prompt_for_page<F: Fetch>(mirror: &StyleMirror<F>) -> Result<Page> {
    let stdin = io::stdin();
    loop {
        print!("Enter URL: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            bail!("no URL entered");
        }

        match mirror.load_page(&line).await {
            Ok(page) => return Ok(page),
            Err(e) => {
                tracing::debug!(error = %format!("{:#}", e), "page load failed");
                println!("{}", "Invalid URL. Please enter a valid URL.".red());
            }
        }
    }
}

async fn run(args: StyleCommand) -> Result<()> {
    let fetcher = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout))?;
    let mirror = StyleMirror::new(fetcher, &args.output_dir, Duration::from_secs(args.delay));

    let page = match &args.url {
        Some(url) => mirror.load_page(url).await?,
        None => prompt_for_page(&mirror).await?,
    };

    if let Outcome::Localized(summary) = mirror.localize(&page).await? {
        println!(
            "✅ Localized {} CSS file(s) and {} resource(s)",
            summary.css_files.len(),
            summary.resources
        );
    }
    Ok(())
}

/// One-line error report with the whole context chain.
fn error_report(err: &anyhow::Error) -> String {
    format!("style-mirror error: {:#}", err)
}

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init_logging() {
        eprintln!("{}", error_report(&err));
        std::process::exit(1);
    }

    if let Err(err) = run(StyleCommand::parse()).await {
        eprintln!("{}", error_report(&err).red());
        std::process::exit(1);
    }
}

use clap::Parser;
use std::path::PathBuf;

use crate::fetcher::USER_AGENT;

#[derive(Parser, Debug)]
#[command(
    name = "style-mirror",
    about = "A CLI utility to localize the stylesheets of a web page",
    version,
    long_about = "Downloads the linked and inline CSS of a page, the fonts and images it references, and rewrites everything to work from a local folder. Without a URL argument the page URL is asked for interactively."
)]
pub struct StyleCommand {
    /// The URL of the page to localize (prompted for when omitted)
    pub url: Option<String>,

    /// Directory in which the page folder is created
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// User agent string to use for requests
    #[arg(long, default_value = USER_AGENT)]
    pub user_agent: String,

    /// Seconds to wait before fetching the page
    #[arg(long, default_value_t = 3)]
    pub delay: u64,

    /// Timeout for requests in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

//! CLI argument definitions using clap derive macros.

use clap::Parser;

/// Browse the Project Gutenberg catalogue from the terminal.
///
/// Filters by title, author and language, scrolls through result pages and
/// prints the address-bar query that reproduces the search.
#[derive(Parser, Debug)]
#[command(name = "gutenscroll")]
#[command(author, version, about)]
pub struct Args {
    /// Title terms to search for
    #[arg(short, long)]
    pub title: Option<String>,

    /// Author terms to search for
    #[arg(short, long)]
    pub author: Option<String>,

    /// Language code to include (repeatable: -L en -L fr)
    #[arg(short = 'L', long = "language")]
    pub languages: Vec<String>,

    /// Start from an address-bar query such as "title=dickens&page=2"
    #[arg(short, long, value_name = "QUERY")]
    pub url: Option<String>,

    /// Number of result pages to load (1-50)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub pages: u32,

    /// Show the full record of one book instead of a listing
    #[arg(short, long, value_name = "ID")]
    pub book: Option<u64>,

    /// Catalogue endpoint (defaults to the public Gutendex API)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Debounce interval for typed filters in milliseconds (0-10000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=10_000))]
    pub debounce_ms: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

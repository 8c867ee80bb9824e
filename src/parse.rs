use clap::Parser;

#[derive(Parser)]
#[command(name = "ebird-collector")]
#[command(about = "A CLI tool for collecting eBird alert digests into a checklist record CSV")]
#[command(version = "1.0")]
pub(crate) struct Args {
    /// Directory containing raw digest email files
    #[arg(short, long)]
    pub digests: String,

    /// Output CSV filename (default embeds the digest date range)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Base delay between requests in milliseconds
    #[arg(long, default_value = "500")]
    pub delay: u64,

    /// Also write a media-only CSV next to the main output
    #[arg(short, long)]
    pub media: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

use clap::Parser;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::debug;

use nsb_archive_dl::downloader::{DEFAULT_MARKER_CLASS, ShowRecord};
use nsb_archive_dl::{Options, Schedule, download, list};

#[derive(Parser, Debug)]
#[command(name = "nsb-archive-dl")]
#[command(about = "Downloads show archives from https://archives.nsbradio.co.uk/")]
#[command(version)]
struct Cli {
    #[arg(
        short = 'u',
        value_name = "URL",
        help = "show archive URL, i.e. https://archives.nsbradio.co.uk/index.php?dir=The%20JJPinkman%20Show/"
    )]
    url: String,

    #[arg(
        short = 'o',
        value_name = "DIR",
        required_unless_present = "list",
        help = "output directory, created if missing"
    )]
    output: Option<PathBuf>,

    #[arg(
        short = 'd',
        value_name = "N",
        required_unless_present = "list",
        help = "number of simultaneous downloads"
    )]
    downloads: Option<NonZeroUsize>,

    #[arg(long, default_value = DEFAULT_MARKER_CLASS, help = "class marking download links")]
    marker_class: String,

    #[arg(long, help = "start the next download as soon as any finishes")]
    rolling: bool,

    #[arg(long, help = "print the shows found as JSON lines and exit")]
    list: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "more logging (-v debug, -vv trace)")]
    verbose: u8,

    #[arg(short, long, conflicts_with = "verbose", help = "only log errors")]
    quiet: bool,
}

fn init_logging(cli: &Cli) {
    // RUST_LOG wins over the flags
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout is reserved for --list records
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// One JSON object per show, one show per line.
fn write_listing<W: Write>(mut out: W, shows: &[ShowRecord]) -> std::io::Result<()> {
    for show in shows {
        serde_json::to_writer(&mut out, show)?;
        writeln!(out)?;
    }
    out.flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_logging(&cli);
    debug!(?cli, "arguments parsed");

    if cli.list {
        let shows = list(&cli.url, &cli.marker_class).await?;
        write_listing(std::io::stdout().lock(), &shows)?;
        return Ok(());
    }

    let output = cli.output.ok_or("-o is required")?;
    let downloads = cli.downloads.ok_or("-d is required")?;
    let mut options = Options::new(cli.url, output, downloads);
    options.marker_class = cli.marker_class;
    if cli.rolling {
        options.schedule = Schedule::Rolling;
    }

    download(&options).await?;

    Ok(())
}

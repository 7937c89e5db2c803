mod executor;
mod planer;
#[cfg(test)]
mod test_helpers;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::info;

use crate::error::{Error, Result};

pub use executor::{Outcome, download_show, run_in_batches, run_rolling, split_batches};
pub use planer::{DEFAULT_MARKER_CLASS, Planer, ShowRecord, fetch_page, parse_listing};

/// How downloads are spread over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Fixed groups of `concurrency` shows; a group starts once the previous
    /// one has completely finished.
    #[default]
    Batched,
    /// Up to `concurrency` shows in flight; the next starts when any finishes.
    Rolling,
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Listing page, e.g. `https://archives.nsbradio.co.uk/index.php?dir=ShowName/`.
    pub url: String,
    pub output_dir: PathBuf,
    pub concurrency: NonZeroUsize,
    pub marker_class: String,
    pub schedule: Schedule,
}

impl Options {
    pub fn new(
        url: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        concurrency: NonZeroUsize,
    ) -> Self {
        Options {
            url: url.into(),
            output_dir: output_dir.into(),
            concurrency,
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
            schedule: Schedule::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}

impl Summary {
    fn from_outcomes(outcomes: &[Outcome]) -> Self {
        outcomes
            .iter()
            .fold(Summary::default(), |mut summary, outcome| {
                match outcome {
                    Outcome::Downloaded { bytes } => {
                        summary.downloaded += 1;
                        summary.bytes += bytes;
                    }
                    Outcome::Skipped => summary.skipped += 1,
                }
                summary
            })
    }
}

/// Fetches the listing page and returns the shows on it without downloading.
pub async fn list(url: &str, marker_class: &str) -> Result<Vec<ShowRecord>> {
    Planer::new(reqwest::Client::new(), marker_class)
        .plan(url)
        .await
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).await.map_err(|e| Error::io(dir, e))
}

/// Downloads every show linked from `options.url` into `options.output_dir`,
/// skipping shows already present there.
pub async fn download(options: &Options) -> Result<Summary> {
    ensure_dir(&options.output_dir).await?;

    let client = reqwest::Client::new();
    let shows = Planer::new(client.clone(), options.marker_class.as_str())
        .plan(&options.url)
        .await?;
    info!(shows = shows.len(), url = %options.url, "parsed listing");

    let dir: Arc<Path> = Arc::from(options.output_dir.as_path());
    let worker = move |show: ShowRecord| {
        let client = client.clone();
        let dir = Arc::clone(&dir);
        async move { download_show(&client, &show, &dir).await }
    };

    let outcomes = match options.schedule {
        Schedule::Batched => run_in_batches(shows, options.concurrency, worker).await?,
        Schedule::Rolling => run_rolling(shows, options.concurrency, worker).await?,
    };

    let summary = Summary::from_outcomes(&outcomes);
    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        bytes = summary.bytes,
        "Download complete"
    );
    Ok(summary)
}

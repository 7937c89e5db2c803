use futures::StreamExt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::downloader::planer::ShowRecord;
use crate::error::{Error, Result};
use crate::utils::limited_spawner::LimitedSpawner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Downloaded { bytes: u64 },
    /// A file with the show's name was already there.
    Skipped,
}

/// `dir/name`, provided `name` is a single plain file name.
fn target_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file_name)), None) if file_name == name => Ok(dir.join(name)),
        _ => Err(Error::UnsafeFileName {
            name: name.to_string(),
        }),
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn stream_to_file(response: reqwest::Response, url: &str, path: &Path) -> Result<u64> {
    let file = File::create(path).await.map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::http(url, e))?;
        writer.write_all(&chunk).await.map_err(|e| Error::io(path, e))?;
        written += chunk.len() as u64;
    }
    writer.flush().await.map_err(|e| Error::io(path, e))?;

    Ok(written)
}

/// Downloads one show into `dir` unless a file of the same name exists.
///
/// Presence alone counts as done: an existing file is never re-fetched or
/// checked, even if an earlier run left it truncated.
pub async fn download_show(
    client: &reqwest::Client,
    show: &ShowRecord,
    dir: &Path,
) -> Result<Outcome> {
    let path = target_path(dir, show.name())?;

    if is_file(&path).await {
        info!("file {} already exists", show.name());
        return Ok(Outcome::Skipped);
    }

    info!("downloading {} ...", show.name());

    let response = client
        .get(show.url())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| Error::http(show.url(), err))?;
    let bytes = stream_to_file(response, show.url(), &path).await?;

    info!("{} has been downloaded", show.name());
    debug!(bytes, path = %path.display(), "transfer finished");
    Ok(Outcome::Downloaded { bytes })
}

/// Consecutive groups of at most `size` items; only the last may be shorter.
pub fn split_batches<T>(items: Vec<T>, size: NonZeroUsize) -> Vec<Vec<T>> {
    let mut batches = Vec::with_capacity(items.len().div_ceil(size.get()));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        batches.push(items.by_ref().take(size.get()).collect());
    }
    batches
}

fn collect_outcomes<O>(
    joined: Vec<std::result::Result<Result<O>, tokio::task::JoinError>>,
    outputs: &mut Vec<O>,
) -> Vec<Error> {
    let mut failures = Vec::new();
    for result in joined {
        match result {
            Ok(Ok(output)) => outputs.push(output),
            Ok(Err(err)) => {
                warn!(error = %err, "download failed");
                failures.push(err);
            }
            Err(err) => {
                warn!(error = %err, "download task panicked");
                failures.push(Error::from(err));
            }
        }
    }
    failures
}

/// Runs `worker` over `items` one batch at a time: every item of a batch gets
/// its own task, and the next batch starts only once all of them finished.
///
/// A failure never cancels the rest of its batch, but no later batch starts
/// after one; the failures of that batch are returned together.
pub async fn run_in_batches<T, O, F, Fut>(
    items: Vec<T>,
    size: NonZeroUsize,
    worker: F,
) -> Result<Vec<O>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<O>> + Send + 'static,
    O: Send + 'static,
{
    let mut outputs = Vec::with_capacity(items.len());
    let batches = split_batches(items, size);
    let total = batches.len();

    for (index, batch) in batches.into_iter().enumerate() {
        debug!(batch = index + 1, of = total, size = batch.len(), "starting batch");
        let handles = batch
            .into_iter()
            .map(|item| tokio::spawn(worker(item)))
            .collect::<Vec<_>>();

        let failures = collect_outcomes(futures::future::join_all(handles).await, &mut outputs);
        if !failures.is_empty() {
            return Err(Error::Batch(failures));
        }
    }

    Ok(outputs)
}

/// Keeps up to `limit` workers running, starting the next item as soon as a
/// slot frees up. Every item is attempted; failures are returned together at
/// the end.
pub async fn run_rolling<T, O, F, Fut>(
    items: Vec<T>,
    limit: NonZeroUsize,
    worker: F,
) -> Result<Vec<O>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<O>> + Send + 'static,
    O: Send + 'static,
{
    let mut outputs = Vec::with_capacity(items.len());
    let mut spawner = LimitedSpawner::new(limit);
    for item in items {
        spawner.spawn(worker(item)).await?;
    }
    debug!(tasks = spawner.len(), "all downloads started");

    let failures = collect_outcomes(spawner.join_all().await, &mut outputs);
    if failures.is_empty() {
        Ok(outputs)
    } else {
        Err(Error::Batch(failures))
    }
}

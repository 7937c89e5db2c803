//! In-process stand-in for the archive site, shared by the downloader tests.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub(crate) const TWO_SHOW_LISTING: &str = r#"<!DOCTYPE html>
<html>
<body>
  <a href="index.php?dir=">Home</a>
  <table>
    <tr><td><a class="noBreak" href="index.php?dir=X/&file=show1.mp3">show1.mp3</a></td></tr>
    <tr><td><a class="noBreak" href="index.php?dir=X/&file=show2.mp3">show2.mp3</a></td></tr>
  </table>
</body>
</html>"#;

/// Body served for a show file.
pub(crate) fn show_body(name: &str) -> String {
    format!("audio bytes of {name}")
}

#[derive(Clone)]
struct ArchiveState {
    listing: Arc<str>,
    file_hits: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    delay: Duration,
}

/// `index.php` serves the listing, or a show when `file` is present.
/// Show names starting with `missing` answer 404.
async fn archive_page(
    State(state): State<ArchiveState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(name) = params.get("file") else {
        return Html(state.listing.to_string()).into_response();
    };

    state.file_hits.fetch_add(1, Ordering::SeqCst);
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    show_body(name).into_response()
}

pub(crate) struct ArchiveServer {
    base: String,
    state: ArchiveState,
    handle: JoinHandle<()>,
}

impl ArchiveServer {
    pub(crate) async fn start(listing: &str) -> Self {
        Self::start_with_delay(listing, Duration::ZERO).await
    }

    /// Every show response is held back by `delay`, so overlapping
    /// transfers can be observed.
    pub(crate) async fn start_with_delay(listing: &str, delay: Duration) -> Self {
        let state = ArchiveState {
            listing: Arc::from(listing),
            file_hits: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            delay,
        };
        let app = Router::new()
            .route("/index.php", get(archive_page))
            .route("/garbled", get(|| async { vec![0xffu8, 0xfe, 0x41] }))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ArchiveServer {
            base: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub(crate) fn listing_url(&self) -> String {
        self.url("/index.php?dir=X/")
    }

    /// URL the listing parser derives for `name`.
    pub(crate) fn file_url(&self, name: &str) -> String {
        self.url(&format!("/index.php?dir=X/&file={}", name))
    }

    /// Number of show requests received so far.
    pub(crate) fn file_hits(&self) -> usize {
        self.state.file_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for ArchiveServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

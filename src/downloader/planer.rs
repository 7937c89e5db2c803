use scraper::{CaseSensitivity, Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Class carried by the download anchors on the archive listing pages.
pub const DEFAULT_MARKER_CLASS: &str = "noBreak";

const FILE_PARAM: &str = "file";

/// One downloadable show found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowRecord {
    name: String,
    url: String,
}

impl ShowRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// File name the show is stored under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// GETs `url` and returns the body as UTF-8 text.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|err| Error::http(url, err))?;
    let body = response.bytes().await.map_err(|err| Error::http(url, err))?;

    String::from_utf8(body.to_vec()).map_err(|source| Error::Decode {
        url: url.to_string(),
        source,
    })
}

/// Page URL with its query and fragment removed.
fn base_url(page_url: &str) -> Result<Url> {
    let mut base = Url::parse(page_url).map_err(|source| Error::InvalidUrl {
        url: page_url.to_string(),
        source,
    })?;
    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}

/// First non-blank `file` value of the query string.
fn file_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == FILE_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Extracts a record from every `<a>` carrying `marker_class`, in document
/// order. An anchor without `href` or without a `file` parameter fails the
/// whole listing rather than being skipped.
pub fn parse_listing(html: &str, page_url: &str, marker_class: &str) -> Result<Vec<ShowRecord>> {
    let base = base_url(page_url)?;
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a").map_err(|e| Error::Selector {
        reason: e.to_string(),
    })?;

    document
        .select(&anchor_selector)
        .filter(|a| {
            a.value()
                .has_class(marker_class, CaseSensitivity::CaseSensitive)
        })
        .enumerate()
        .map(|(index, a)| -> Result<ShowRecord> {
            let href = a.value().attr("href").ok_or(Error::MissingHref { index })?;
            let show_url = base.join(href).map_err(|source| Error::InvalidUrl {
                url: href.to_string(),
                source,
            })?;
            let name = file_param(&show_url).ok_or_else(|| Error::MissingFileParam {
                url: show_url.to_string(),
            })?;

            debug!(%name, url = %show_url, "found show");
            Ok(ShowRecord::new(name, show_url.to_string()))
        })
        .collect()
}

pub struct Planer {
    client: reqwest::Client,
    marker_class: String,
}

impl Planer {
    pub fn new(client: reqwest::Client, marker_class: impl Into<String>) -> Self {
        Planer {
            client,
            marker_class: marker_class.into(),
        }
    }

    /// Fetches the listing page and returns the shows it links to.
    pub async fn plan(&self, page_url: &str) -> Result<Vec<ShowRecord>> {
        let html = fetch_page(&self.client, page_url).await?;
        debug!(bytes = html.len(), url = page_url, "fetched listing page");
        parse_listing(&html, page_url, &self.marker_class)
    }
}

//! Downloads show archives from the HTML directory listings served by
//! <https://archives.nsbradio.co.uk/>.

pub mod downloader;
pub mod error;
pub mod utils;

pub use downloader::{Options, Schedule, Summary, download, list};
pub use error::{Error, Result};

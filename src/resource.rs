//! Fetching images and shortening URLs.
//!
//! Both are collaborators of the document walker. Image failures are
//! recoverable: the walker prints a placeholder instead. Shortener failures
//! are fatal except for [`Error::UnsupportedUrl`], which makes the walker skip
//! the link.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{Error, Result};

/// Resolves an image destination to a decoded image.
pub trait ImageSource {
    fn fetch(&self, destination: &str) -> Result<DynamicImage>;
}

/// Turns an absolute HTTP(S) URL into a shorter one.
pub trait UrlShortener {
    /// Fails with [`Error::UnsupportedUrl`] for relative or non-HTTP(S) URLs.
    fn shorten(&self, url: &str) -> Result<String>;
}

/// Parse `url` and check that it is an absolute HTTP or HTTPS URL.
pub fn check_shortenable(url: &str) -> Result<Url> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(parsed),
        _ => Err(Error::UnsupportedUrl(url.to_string())),
    }
}

/// Image source reading local files, and remote ones when built with the
/// `http` feature.
///
/// Relative destinations are resolved against a base directory.
pub struct Images {
    base: PathBuf,
    #[cfg(feature = "http")]
    client: reqwest::blocking::Client,
}

impl Images {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Images {
            base: base.into(),
            #[cfg(feature = "http")]
            client: reqwest::blocking::Client::new(),
        }
    }

    fn read_local(&self, path: &Path) -> Result<DynamicImage> {
        let bytes = std::fs::read(self.base.join(path))?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

impl ImageSource for Images {
    fn fetch(&self, destination: &str) -> Result<DynamicImage> {
        match Url::parse(destination) {
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::Fetch(format!("invalid file URL {}", destination)))?;
                self.read_local(&path)
            }
            #[cfg(feature = "http")]
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                let bytes = http::download(&self.client, url.as_str())?;
                Ok(image::load_from_memory(&bytes)?)
            }
            Ok(url) => Err(Error::Fetch(format!(
                "unsupported image scheme '{}'",
                url.scheme()
            ))),
            Err(_) => self.read_local(Path::new(destination)),
        }
    }
}

/// Shortener that validates URLs but leaves them unchanged.
///
/// Used when no network shortening service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unshortened;

impl UrlShortener for Unshortened {
    fn shorten(&self, url: &str) -> Result<String> {
        Ok(check_shortenable(url)?.to_string())
    }
}

#[cfg(feature = "http")]
pub use http::TinyUrl;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use log::debug;

    const TINYURL_API: &str = "http://tinyurl.com/api-create.php";

    /// Downloads `url` with a GET request and returns the body.
    pub(super) fn download(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let resp = client
            .get(url)
            .send()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(Error::Fetch(format!("request failed: {}", resp.status())));
        }
        let bytes = resp.bytes().map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Shortener backed by the tinyurl.com creation API.
    pub struct TinyUrl {
        client: reqwest::blocking::Client,
    }

    impl TinyUrl {
        pub fn new() -> Self {
            TinyUrl {
                client: reqwest::blocking::Client::new(),
            }
        }
    }

    impl Default for TinyUrl {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UrlShortener for TinyUrl {
        fn shorten(&self, url: &str) -> Result<String> {
            let parsed = check_shortenable(url)?;
            let mut api = Url::parse(TINYURL_API).map_err(|e| Error::Fetch(e.to_string()))?;
            api.query_pairs_mut().append_pair("url", parsed.as_str());
            let body = download(&self.client, api.as_str())?;
            let short = String::from_utf8(body).map_err(|e| Error::Fetch(e.to_string()))?;
            debug!("shortened {} to {}", url, short);
            Ok(short.trim().to_string())
        }
    }
}

//! URL parsing for storage backends.
//!
//! Extracts backend configuration from S3 and local filesystem URL formats.

use object_store::path::Path;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use snafu::prelude::*;

use crate::error::{InvalidUrlSnafu, IoSnafu, StorageError};

use super::{LocalConfig, S3Config};

// Patterns are tried in order; the first match wins.
const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.*))?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?P<protocol>https?)://(?P<endpoint>[^:/]+):(?P<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";
const S3_URL: &str = r"^[sS]3[aAnN]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";
// Anything without a scheme is a path relative to the working directory.
const RELATIVE_PATH: &str = r"^[^/:][^:]*$";

static RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RELATIVE_PATH).expect("valid URL pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Local,
}

static MATCHERS: LazyLock<Vec<(Backend, Regex)>> = LazyLock::new(|| {
    [
        (Backend::S3, S3_PATH),
        (Backend::S3, S3_VIRTUAL),
        (Backend::S3, S3_ENDPOINT_URL),
        (Backend::S3, S3_URL),
        (Backend::Local, FILE_URI),
        (Backend::Local, FILE_URL),
        (Backend::Local, FILE_PATH),
    ]
    .into_iter()
    .map(|(backend, pattern)| (backend, Regex::new(pattern).expect("valid URL pattern")))
    .collect()
});

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (backend, regex) in MATCHERS.iter() {
            if let Some(captures) = regex.captures(url) {
                return Ok(match backend {
                    Backend::S3 => Self::parse_s3(&captures),
                    Backend::Local => Self::parse_local(&captures),
                });
            }
        }

        if RELATIVE.is_match(url) {
            return Self::parse_relative(url);
        }

        InvalidUrlSnafu {
            url: url.to_string(),
        }
        .fail()
    }

    fn parse_relative(url: &str) -> Result<Self, StorageError> {
        let absolute = std::path::absolute(url).context(IoSnafu)?;
        let path = absolute.to_string_lossy();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        Ok(BackendConfig::Local(LocalConfig {
            path: path.to_string(),
        }))
    }

    fn parse_s3(captures: &Captures) -> Self {
        let bucket = captures["bucket"].to_string();
        let region = captures.name("region").map(|m| m.as_str().to_string());

        let endpoint = captures.name("endpoint").map(|endpoint| {
            let port = captures
                .name("port")
                .and_then(|p| p.as_str().parse::<u16>().ok())
                .unwrap_or(443);
            let protocol = captures
                .name("protocol")
                .map(|p| p.as_str())
                .unwrap_or("https");
            format!("{protocol}://{}:{port}", endpoint.as_str())
        });

        let key = captures
            .name("key")
            .map(|m| m.as_str().trim_end_matches('/'))
            .filter(|k| !k.is_empty())
            .map(Path::from);

        BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket,
            key,
        })
    }

    fn parse_local(captures: &Captures) -> Self {
        let path = captures["path"].trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        BackendConfig::Local(LocalConfig { path })
    }

    /// Key prefix applied to every path, if the backend has one.
    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}

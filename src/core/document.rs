//! Document Identity
//!
//! Stable keys derived from a document's canonical location.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tower_lsp::lsp_types::Url;

/// Identity of a document instance, derived from its canonical URL.
///
/// Two identities are equal when their canonical locations are equal: the URL
/// parser collapses `.` and `..` path segments, and the fragment is dropped since
/// it addresses a position inside the document rather than the document itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Url);

impl DocumentId {
    pub fn new(mut url: Url) -> Self {
        url.set_fragment(None);
        Self(url)
    }

    /// Parse a document identity from a URL string
    pub fn parse(location: &str) -> Result<Self> {
        let url = Url::parse(location)
            .with_context(|| format!("invalid document location '{}'", location))?;
        Ok(Self::new(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Last path segment of the location, percent-decoded, used for filename
    /// selectors. A segment that does not decode to UTF-8 is returned as is.
    pub fn file_name(&self) -> Option<Cow<'_, str>> {
        let raw = self
            .0
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())?;
        Some(urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw)))
    }
}

impl From<Url> for DocumentId {
    fn from(url: Url) -> Self {
        Self::new(url)
    }
}

impl FromStr for DocumentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use quick_xml::events::BytesStart;
use serde::{Serialize, Serializer};
use url::Url;

use crate::error::DecodeError;

/// A single advisory from an updateinfo feed
///
/// Field values are kept exactly as they appear in the document. The
/// serialized form is what templates see, so `kind` is exposed as `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Update {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub title: String,
    pub severity: String,
    pub release: String,
    pub issued: Issued,
    pub references: Vec<Reference>,
    pub description: String,
    pub packages: Vec<Package>,
}

impl Update {
    /// Build an update from the attributes of its `<update>` start tag
    pub fn from_start(start: &BytesStart) -> Result<Self, DecodeError> {
        let mut update = Update::default();
        for attr in start.attributes() {
            let attr = attr?;
            match attr.key.local_name().as_ref() {
                b"type" => update.kind = attr.unescape_value()?.into_owned(),
                b"status" => update.status = attr.unescape_value()?.into_owned(),
                _ => {}
            }
        }
        Ok(update)
    }

    /// Issue time, if the feed provided one
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued.date.map(|d| d.0)
    }
}

/// The `<issued>` element
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Issued {
    pub date: Option<IssuedDate>,
}

impl Issued {
    pub fn from_start(start: &BytesStart) -> Result<Self, DecodeError> {
        let mut issued = Issued::default();
        for attr in start.attributes() {
            let attr = attr?;
            if attr.key.local_name().as_ref() == b"date" {
                issued.date = Some(IssuedDate::parse(&attr.unescape_value()?)?);
            }
        }
        Ok(issued)
    }
}

/// Issue timestamp, stored as UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IssuedDate(pub DateTime<Utc>);

impl IssuedDate {
    /// Parse a decimal count of seconds since the Unix epoch
    pub fn parse(value: &str) -> Result<Self, DecodeError> {
        let malformed = |reason: String| DecodeError::MalformedTimestamp {
            value: value.to_string(),
            reason,
        };
        let secs: i64 = value.parse().map_err(|e| malformed(format!("{e}")))?;
        DateTime::from_timestamp(secs, 0)
            .map(IssuedDate)
            .ok_or_else(|| malformed("timestamp out of range".to_string()))
    }
}

impl fmt::Display for IssuedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for IssuedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A cross-link to a bug or CVE tracker
///
/// `href` keeps the link as written; it may be relative or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reference {
    pub href: Option<String>,
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Reference {
    pub fn from_start(start: &BytesStart) -> Result<Self, DecodeError> {
        let mut reference = Reference::default();
        for attr in start.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?;
            match attr.key.local_name().as_ref() {
                b"href" => reference.href = Some(parse_href(&value)?),
                b"id" => reference.id = value.into_owned(),
                b"title" => reference.title = value.into_owned(),
                b"type" => reference.kind = value.into_owned(),
                _ => {}
            }
        }
        Ok(reference)
    }
}

/// Validate a reference link and return it unchanged
///
/// Absolute URLs, relative references and the empty string are accepted.
/// Control characters, a missing scheme before `:`, broken percent escapes and
/// unparseable hosts are rejected.
pub fn parse_href(value: &str) -> Result<String, DecodeError> {
    let malformed = |reason: String| DecodeError::MalformedUrl {
        value: value.to_string(),
        reason,
    };

    if value.bytes().any(|b| b.is_ascii_control()) {
        return Err(malformed("invalid control character in URL".to_string()));
    }
    if value.starts_with(':') {
        return Err(malformed("missing protocol scheme".to_string()));
    }
    if let Some(escape) = invalid_escape(value) {
        return Err(malformed(format!("invalid URL escape \"{escape}\"")));
    }

    let base = Url::parse(HREF_BASE).map_err(|e| malformed(e.to_string()))?;
    Url::options()
        .base_url(Some(&base))
        .parse(value)
        .map_err(|e| malformed(e.to_string()))?;
    Ok(value.to_string())
}

/// Placeholder base that lets relative references resolve during validation
const HREF_BASE: &str = "http://updateinfo.invalid/";

/// First `%` sequence not followed by two hex digits
fn invalid_escape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, &b)| b == b'%')
        .map(|(i, _)| i)
        .find(|&i| {
            !bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit))
        })
        .map(|i| value[i..].chars().take(3).collect())
}

/// A package touched by an update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub filename: String,
}

impl Package {
    /// Populate name/version/release/arch; `filename` is a child element
    pub fn from_start(start: &BytesStart) -> Result<Self, DecodeError> {
        let mut package = Package::default();
        for attr in start.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.local_name().as_ref() {
                b"name" => package.name = value,
                b"version" => package.version = value,
                b"release" => package.release = value,
                b"arch" => package.arch = value,
                _ => {}
            }
        }
        Ok(package)
    }
}

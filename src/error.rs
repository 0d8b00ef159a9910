use std::io;
use std::path::PathBuf;

use quick_xml::events::attributes::AttrError;

/// Errors surfaced by a filter run
///
/// Every variant is terminal: the pipeline stops on the first error and
/// output already written to the sink is left in place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The updateinfo feed could not be opened
    #[error("could not open updateinfo file '{}': {source}", path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A date, whitelist or template was rejected before the run started
    #[error("{0}")]
    ConfigInvalid(String),

    /// The feed could not be decoded
    #[error("decoding updateinfo near byte {position}: {source}")]
    Decode {
        position: u64,
        #[source]
        source: DecodeError,
    },

    /// A template failed while rendering an accepted update
    #[error("rendering update '{id}': {source}")]
    Render {
        id: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// Writing to the output sink failed
    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}

/// Reasons a single `<update>` element failed to decode
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed timestamp '{value}': {reason}")]
    MalformedTimestamp { value: String, reason: String },

    #[error("malformed URL '{value}': {reason}")]
    MalformedUrl { value: String, reason: String },

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Attribute(#[from] AttrError),

    #[error("unexpected end of input inside <{0}>")]
    UnexpectedEof(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

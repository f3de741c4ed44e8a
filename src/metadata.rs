//! Maps the string metadata of a post ([`crate::markdown::Metadata`]) onto
//! typed fields, and derives the stable [`content_id`] for a post name.

use crate::markdown::Metadata;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::fmt;

/// The format of the `date` key, e.g. `01-05-2024` or `1-5-2024`.
pub const DATE_FORMAT: &str = "%m-%d-%Y";

/// The format of [`PostMetadata::display_date`], e.g. `Jan 5, 2024`.
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// The typed view of a post's metadata. Every field is optional; keys which
/// aren't recognized are ignored.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostMetadata {
    /// Overrides the post's title.
    pub title: Option<String>,

    pub subtitle: Option<String>,

    /// The parsed `date` key.
    pub published_at: Option<NaiveDate>,

    /// `published_at` formatted with [`DISPLAY_DATE_FORMAT`].
    pub display_date: Option<String>,

    /// True only when the `hidden` value is `true` in any letter case.
    pub hidden: bool,
}

impl PostMetadata {
    /// Extracts the recognized keys from `metadata`. Fails only if the `date`
    /// key is present and doesn't match [`DATE_FORMAT`].
    pub fn from_metadata(metadata: &Metadata) -> Result<PostMetadata> {
        let mut post = PostMetadata::default();
        for (key, value) in metadata {
            match key.as_str() {
                "title" => post.title = Some(value.clone()),
                "subtitle" => post.subtitle = Some(value.clone()),
                "date" => {
                    let date = parse_date(value)?;
                    post.display_date = Some(display_date(date));
                    post.published_at = Some(date);
                }
                "hidden" => post.hidden = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        Ok(post)
    }
}

/// Parses a `date` metadata value.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        Error::InvalidDate {
            value: value.to_owned(),
            err,
        }
    })
}

/// Formats a date for display, e.g. `Jan 5, 2024`.
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Derives the opaque output directory name for a post from its name. This is
/// the hex SHA-256 digest of the name, so it survives title and metadata edits
/// but changes when the source file is renamed.
pub fn content_id(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}

/// Represents the result of a metadata operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem with a post's metadata.
#[derive(Debug)]
pub enum Error {
    /// Returned when the `date` value doesn't match [`DATE_FORMAT`].
    InvalidDate {
        value: String,
        err: chrono::ParseError,
    },

    /// Returned when a post which must be dated has no `date` key.
    MissingDate,

    /// Returned when the metadata block itself can't be parsed.
    Block(crate::markdown::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidDate { value, err } => write!(
                f,
                "invalid date `{}` (expected month-day-year): {}",
                value, err
            ),
            Error::MissingDate => write!(f, "missing `date` metadata"),
            Error::Block(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidDate { value: _, err } => Some(err),
            Error::MissingDate => None,
            Error::Block(err) => Some(err),
        }
    }
}

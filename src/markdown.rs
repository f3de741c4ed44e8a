//! Converts page sources from markdown to HTML and, for posts, splits the
//! leading metadata block off of the source before conversion.

use crate::htmlrenderer;
use pulldown_cmark::{Options, Parser};
use std::collections::BTreeMap;
use std::fmt;
use std::io;

/// The fence line which opens and closes a metadata block.
const FENCE: &str = "---";

/// The string metadata found at the top of a source file. Keys are case
/// sensitive.
pub type Metadata = BTreeMap<String, String>;

/// The result of converting a source file with metadata extraction enabled.
#[derive(Debug, Default)]
pub struct Rendered {
    /// The converted HTML body.
    pub html: String,

    /// The metadata block, or [`None`] if the source had none.
    pub metadata: Option<Metadata>,
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> Result<String> {
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    htmlrenderer::push_html(&mut html, Parser::new_ext(markdown, options()))?;
    Ok(html)
}

/// Converts markdown to HTML after extracting the metadata block from the top
/// of `input`. The block is delimited by `---` lines and holds YAML key/value
/// pairs:
///
/// ```md
/// ---
/// title: Hello, world!
/// date: 04-16-2021
/// ---
/// # Hello
/// ```
///
/// Sources without an opening fence have no metadata and are converted whole.
pub fn to_html_with_metadata(input: &str) -> Result<Rendered> {
    match split_metadata(input)? {
        Some((block, body)) => Ok(Rendered {
            html: to_html(body)?,
            metadata: Some(parse_metadata(block)?),
        }),
        None => Ok(Rendered {
            html: to_html(input)?,
            metadata: None,
        }),
    }
}

/// Splits `input` into its metadata block and its body. Returns [`None`] if
/// the first line isn't a fence.
fn split_metadata(input: &str) -> Result<Option<(&str, &str)>> {
    let input = input.trim_start_matches('\u{feff}');
    let first_line_end = input.find('\n').unwrap_or_else(|| input.len());
    if input[..first_line_end].trim_end() != FENCE {
        return Ok(None);
    }

    let block_start = (first_line_end + 1).min(input.len());
    let mut offset = block_start;
    for line in input[block_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok(Some((
                &input[block_start..offset],
                &input[offset + line.len()..],
            )));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

/// Parses a metadata block into string pairs. Non-string scalars are rendered
/// in their canonical YAML spelling so the consumer only deals in strings.
fn parse_metadata(block: &str) -> Result<Metadata> {
    use serde_yaml::Value;

    if block.trim().is_empty() {
        return Ok(Metadata::new());
    }
    let mapping = match serde_yaml::from_str::<Value>(block)? {
        Value::Null => return Ok(Metadata::new()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(Error::NotAMapping),
    };

    let mut metadata = Metadata::new();
    for (key, value) in mapping.iter() {
        metadata.insert(scalar_to_string(key)?, scalar_to_string(value)?);
    }
    Ok(metadata)
}

fn scalar_to_string(value: &serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value;
    Ok(match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)?
            .trim_start_matches(FENCE)
            .trim()
            .to_owned(),
    })
}

type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned when the opening `---` fence has no matching closing fence.
    MissingEndFence,

    /// Returned when the metadata block is valid YAML but not a mapping.
    NotAMapping,

    /// Returned when the metadata block isn't valid YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned for I/O errors while writing HTML.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingEndFence => {
                write!(f, "Metadata block is missing its closing `---`")
            }
            Error::NotAMapping => {
                write!(f, "Metadata block must contain `key: value` pairs")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingEndFence => None,
            Error::NotAMapping => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_metadata_and_body() -> Result<()> {
        let rendered = to_html_with_metadata(
            "---\ntitle: T\ndate: 01-05-2024\nhidden: true\ndraft: 3\n---\nHello\n",
        )?;
        let metadata = rendered.metadata.expect("metadata block");
        assert_eq!(Some("T"), metadata.get("title").map(String::as_str));
        assert_eq!(
            Some("01-05-2024"),
            metadata.get("date").map(String::as_str)
        );
        assert_eq!(Some("true"), metadata.get("hidden").map(String::as_str));
        assert_eq!(Some("3"), metadata.get("draft").map(String::as_str));
        assert_eq!("<p>Hello</p>", rendered.html.trim());
        Ok(())
    }

    #[test]
    fn test_no_metadata_block() -> Result<()> {
        let rendered = to_html_with_metadata("# Title\n\nBody")?;
        assert!(rendered.metadata.is_none());
        assert_eq!("<h1>Title</h1><p>Body</p>", rendered.html);
        Ok(())
    }

    #[test]
    fn test_empty_metadata_block() -> Result<()> {
        let rendered = to_html_with_metadata("---\n---\nBody")?;
        assert_eq!(Some(Metadata::new()), rendered.metadata);
        Ok(())
    }

    #[test]
    fn test_missing_end_fence() {
        match to_html_with_metadata("---\ntitle: T\nBody") {
            Err(Error::MissingEndFence) => {}
            other => panic!("wanted MissingEndFence; found {:?}", other),
        }
    }

    #[test]
    fn test_non_mapping_metadata() {
        match to_html_with_metadata("---\n- a\n- b\n---\nBody") {
            Err(Error::NotAMapping) => {}
            other => panic!("wanted NotAMapping; found {:?}", other),
        }
    }

    #[test]
    fn test_external_links() -> Result<()> {
        let html = to_html("[out](https://example.org) [in](/about/)")?;
        assert_eq!(
            concat!(
                r#"<p><a href="https://example.org" title="" target="_blank" rel="nofollow noopener">out</a> "#,
                r#"<a href="/about/" title="">in</a></p>"#,
            ),
            html
        );
        Ok(())
    }

    #[test]
    fn test_fenced_code_block() -> Result<()> {
        let html = to_html("```rust\nfn main() {}\n```\n")?;
        assert_eq!(
            "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>",
            html
        );
        Ok(())
    }

    #[test]
    fn test_footnotes() -> Result<()> {
        let html = to_html("Text[^1]\n\n[^1]: Note\n")?;
        assert!(html.contains(r##"<a href="#1">1</a>"##));
        assert!(html.contains(r#"<div class="footnote-definition" id="1">"#));
        Ok(())
    }

    #[test]
    fn test_table_syntax_is_plain_text() -> Result<()> {
        let html = to_html("| a |\n|---|\n| b |\n")?;
        assert!(!html.contains("<table>"));
        assert!(html.starts_with("<p>"));
        Ok(())
    }

    #[test]
    fn test_image_alt_text() -> Result<()> {
        let html = to_html(r#"![a *cat*](/cat.png "Cat")"#)?;
        assert_eq!(
            r#"<p><img src="/cat.png" alt="a cat" title="Cat" /></p>"#,
            html
        );
        Ok(())
    }
}

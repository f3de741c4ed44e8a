//! Defines the [`Page`] taxonomy: the closed set of page variants, the
//! attributes they share ([`PageInfo`]), and the [`Error`] type for loading
//! and writing pages.
//!
//! Every page goes through the same lifecycle. It is constructed from the
//! project file (or, for posts, discovered by its collection), then
//! [`Page::load`] reads and renders its source, then [`Page::write`] puts the
//! rendered HTML at `<output>/<target_path>/index.html`.

use crate::collection::CollectionPage;
use crate::config::PageDecl;
use crate::markdown;
use crate::metadata;
use crate::post::PostPage;
use crate::theme::{self, NavEntry, Site};
use crate::value;
use gtmpl::Value;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The file written into each page's target directory.
pub const INDEX_FILE: &str = "index.html";

/// The extension of page and post sources.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// The attributes shared by every page variant.
#[derive(Clone, Debug, PartialEq)]
pub struct PageInfo {
    /// Identifies the page. Source and target paths are derived from it.
    pub name: String,

    /// The display title.
    pub title: String,

    /// Where the source lives, relative to the input directory.
    pub source_path: PathBuf,

    /// The directory the page is written into, relative to the output
    /// directory. Empty for the site root.
    pub target_path: PathBuf,

    /// Hidden pages are left out of navigation but still written.
    pub hidden: bool,

    /// The page body as an HTML fragment. Set by `load`.
    pub content: Option<String>,

    /// The complete HTML document. Set by `load`.
    pub rendered_output: Option<String>,
}

impl PageInfo {
    pub fn new(
        name: &str,
        title: &str,
        source_path: PathBuf,
        target_path: PathBuf,
        hidden: bool,
    ) -> PageInfo {
        PageInfo {
            name: name.to_owned(),
            title: title.to_owned(),
            source_path,
            target_path,
            hidden,
            content: None,
            rendered_output: None,
        }
    }

    /// Reads the source file, failing with [`Error::SourceNotFound`] if it
    /// doesn't exist.
    pub(crate) fn read_source(&self, site: &Site) -> Result<String> {
        let path = site.input_directory.join(&self.source_path);
        if !path.is_file() {
            return Err(Error::SourceNotFound(path));
        }
        std::fs::read_to_string(&path).map_err(|err| Error::Read { path, err })
    }

    /// Writes `rendered_output` to `<output_root>/<target_path>/index.html`,
    /// creating directories as needed.
    pub fn write(&self, output_root: &Path) -> Result<()> {
        let output = self
            .rendered_output
            .as_ref()
            .ok_or_else(|| Error::NotLoaded(self.name.clone()))?;
        let dir = output_root.join(&self.target_path);
        std::fs::create_dir_all(&dir).map_err(|err| Error::OutputWrite {
            path: dir.clone(),
            err,
        })?;
        let path = dir.join(INDEX_FILE);
        debug!("Writing `{}` to {}", self.name, path.display());
        std::fs::write(&path, output)
            .map_err(|err| Error::OutputWrite { path, err })
    }

    /// The template fields every page has. Variants add their own fields on
    /// top of these.
    pub(crate) fn fields(
        &self,
        type_name: &str,
        site: &Site,
    ) -> Result<HashMap<String, Value>> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), value::string(self.name.as_str()));
        m.insert("title".to_owned(), value::string(self.title.as_str()));
        m.insert("type_name".to_owned(), value::string(type_name));
        m.insert("hidden".to_owned(), Value::Bool(self.hidden));
        m.insert("content".to_owned(), value::option_to_value(&self.content));
        m.insert(
            "target".to_owned(),
            value::string(self.target_path.to_string_lossy()),
        );
        m.insert(
            "url".to_owned(),
            value::string(site.url_for(&self.target_path).map_err(|err| {
                Error::Template {
                    page: self.name.clone(),
                    err,
                }
            })?),
        );
        m.insert("show_title".to_owned(), Value::Bool(true));
        Ok(m)
    }
}

/// A standalone page rendered from `<name>.md`. The front page is a
/// [`SinglePage`] whose target is the output root.
#[derive(Clone, Debug, PartialEq)]
pub struct SinglePage {
    pub info: PageInfo,
}

impl SinglePage {
    pub fn new(name: &str, title: &str, hidden: bool) -> SinglePage {
        SinglePage {
            info: PageInfo::new(
                name,
                title,
                PathBuf::from(format!("{}{}", name, MARKDOWN_EXTENSION)),
                PathBuf::from(name),
                hidden,
            ),
        }
    }

    /// Builds the site root page. It is never hidden and always targets the
    /// output root, whatever its name.
    pub fn front(name: &str, title: &str) -> SinglePage {
        let mut page = SinglePage::new(name, title, false);
        page.info.target_path = PathBuf::new();
        page
    }

    fn load(
        &mut self,
        type_name: &str,
        site: &Site,
        navs: &[NavEntry],
    ) -> Result<()> {
        let source = self.info.read_source(site)?;
        let source = site
            .substitute_assets_url(&source)
            .map_err(|err| self.template_error(err))?;
        let content =
            markdown::to_html(&source).map_err(|err| Error::Markdown {
                path: self.info.source_path.clone(),
                err,
            })?;
        self.info.content = Some(content);

        let mut fields = self.info.fields(type_name, site)?;
        if type_name == FRONT_PAGE {
            fields.insert("show_title".to_owned(), Value::Bool(false));
        }
        let output = site
            .render_page(Value::Object(fields), navs)
            .map_err(|err| self.template_error(err))?;
        self.info.rendered_output = Some(output);
        Ok(())
    }

    fn template_error(&self, err: theme::Error) -> Error {
        Error::Template {
            page: self.info.name.clone(),
            err,
        }
    }
}

pub const SINGLE_PAGE: &str = "SinglePage";
pub const FRONT_PAGE: &str = "FrontPage";
pub const COLLECTION_PAGE: &str = "CollectionPage";
pub const POST_PAGE: &str = "PostPage";

/// A page of the site. The variant set is closed: the build only ever deals
/// with these four kinds of page.
#[derive(Clone, Debug, PartialEq)]
pub enum Page {
    Single(SinglePage),
    Front(SinglePage),
    Collection(CollectionPage),

    /// Never declared in the project file and never built from it. A
    /// [`CollectionPage`] owns its posts as plain [`PostPage`]s and loads and
    /// writes them itself; this arm lets code holding a post answer the same
    /// `load`/`write`/`type_name` calls as any other page.
    Post(PostPage),
}

impl From<&PageDecl> for Page {
    /// Constructs the top-level page declared in the project file.
    fn from(decl: &PageDecl) -> Page {
        match decl {
            PageDecl::Front { name, title } => {
                Page::Front(SinglePage::front(name, title))
            }
            PageDecl::Single {
                name,
                title,
                hidden,
            } => Page::Single(SinglePage::new(name, title, *hidden)),
            PageDecl::Collection {
                name,
                title,
                hidden,
            } => Page::Collection(CollectionPage::new(name, title, *hidden)),
        }
    }
}

impl Page {
    pub fn info(&self) -> &PageInfo {
        match self {
            Page::Single(page) | Page::Front(page) => &page.info,
            Page::Collection(page) => &page.info,
            Page::Post(page) => &page.info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn title(&self) -> &str {
        &self.info().title
    }

    pub fn hidden(&self) -> bool {
        self.info().hidden
    }

    pub fn target_path(&self) -> &Path {
        &self.info().target_path
    }

    /// The variant tag handed to templates with navigation entries.
    pub fn type_name(&self) -> &'static str {
        match self {
            Page::Single(_) => SINGLE_PAGE,
            Page::Front(_) => FRONT_PAGE,
            Page::Collection(_) => COLLECTION_PAGE,
            Page::Post(_) => POST_PAGE,
        }
    }

    /// The navigation entry for this page as currently declared.
    pub fn nav_entry(&self) -> NavEntry {
        NavEntry {
            name: self.name().to_owned(),
            title: self.title().to_owned(),
            type_name: self.type_name(),
            target: self.target_path().to_owned(),
        }
    }

    /// Reads and renders the page. Collections discover, load, and order
    /// their posts here. Must be called once, before [`Page::write`].
    pub fn load(&mut self, site: &Site, navs: &[NavEntry]) -> Result<()> {
        debug!("Loading {} `{}`", self.type_name(), self.name());
        let type_name = self.type_name();
        match self {
            Page::Single(page) | Page::Front(page) => {
                page.load(type_name, site, navs)
            }
            Page::Collection(page) => page.load(site, navs),
            Page::Post(page) => page.load(site, navs),
        }
    }

    /// Writes the rendered page below `output_root`. Collections write their
    /// posts before their own index.
    pub fn write(&self, output_root: &Path) -> Result<()> {
        match self {
            Page::Single(page) | Page::Front(page) => {
                page.info.write(output_root)
            }
            Page::Collection(page) => page.write(output_root),
            Page::Post(page) => page.info.write(output_root),
        }
    }
}

/// Represents the result of a page operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or writing a page. Any of these aborts the
/// build.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page's source file or directory doesn't exist.
    SourceNotFound(PathBuf),

    /// Returned when a post is constructed without a collection parent.
    InvalidParent { post: String },

    /// Returned when a post's metadata is malformed or its date is missing
    /// or unparseable.
    Metadata { path: PathBuf, err: metadata::Error },

    /// Returned for I/O errors reading a source.
    Read { path: PathBuf, err: io::Error },

    /// Returned for I/O errors creating output directories or files.
    OutputWrite { path: PathBuf, err: io::Error },

    /// Returned when a page is written before it was loaded.
    NotLoaded(String),

    /// Returned when a source can't be converted to HTML.
    Markdown { path: PathBuf, err: markdown::Error },

    /// Returned when templating a page fails.
    Template { page: String, err: theme::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SourceNotFound(path) => {
                write!(f, "source not found: {}", path.display())
            }
            Error::InvalidParent { post } => write!(
                f,
                "post `{}` has no parent or its parent isn't a collection",
                post
            ),
            Error::Metadata { path, err } => {
                write!(f, "parsing metadata of `{}`: {}", path.display(), err)
            }
            Error::Read { path, err } => {
                write!(f, "reading `{}`: {}", path.display(), err)
            }
            Error::OutputWrite { path, err } => {
                write!(f, "writing `{}`: {}", path.display(), err)
            }
            Error::NotLoaded(name) => {
                write!(f, "page `{}` was written before it was loaded", name)
            }
            Error::Markdown { path, err } => {
                write!(f, "converting `{}`: {}", path.display(), err)
            }
            Error::Template { page, err } => {
                write!(f, "rendering page `{}`: {}", page, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceNotFound(_) => None,
            Error::InvalidParent { .. } => None,
            Error::Metadata { path: _, err } => Some(err),
            Error::Read { path: _, err } => Some(err),
            Error::OutputWrite { path: _, err } => Some(err),
            Error::NotLoaded(_) => None,
            Error::Markdown { path: _, err } => Some(err),
            Error::Template { page: _, err } => Some(err),
        }
    }
}

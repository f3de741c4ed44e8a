//! Defines the [`Theme`] (the parsed page and collection templates) and the
//! [`Site`] rendering context which is threaded through every page load.

use crate::config::SiteOptions;
use crate::value;
use gtmpl::{Context, Template, Value};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The template for single, front, and post pages.
pub const PAGE_TEMPLATE: &str = "page.html";

/// The template for collection index pages.
pub const COLLECTION_TEMPLATE: &str = "collection.html";

/// Templates in this theme subdirectory are prepended to both templates so
/// `{{define}}` blocks can be shared.
pub const PARTIALS_DIRECTORY: &str = "partials";

/// The two parsed templates of a theme.
pub struct Theme {
    page_template: Template,
    collection_template: Template,
}

impl Theme {
    /// Loads `page.html`, `collection.html`, and any partials from the theme
    /// directory.
    pub fn load(theme_directory: &Path) -> Result<Theme> {
        let partials = partials(&theme_directory.join(PARTIALS_DIRECTORY))?;
        let files = |main: &str| {
            let mut files = partials.clone();
            files.push(theme_directory.join(main));
            files
        };
        Ok(Theme {
            page_template: parse_template(files(PAGE_TEMPLATE).iter())?,
            collection_template: parse_template(
                files(COLLECTION_TEMPLATE).iter(),
            )?,
        })
    }

    /// Builds a theme from template source text.
    pub fn from_sources(page: &str, collection: &str) -> Result<Theme> {
        Ok(Theme {
            page_template: parse_source(page)?,
            collection_template: parse_source(collection)?,
        })
    }
}

/// Lists the `*.html` files in `dir` in file name order. A missing directory
/// has no partials.
fn partials(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "html")
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(
    template_files: impl Iterator<Item = P>,
) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }
    parse_source(&contents)
}

fn parse_source(source: &str) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(source)
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

fn execute(template: &Template, value: Value) -> Result<String> {
    let context =
        Context::from(value).map_err(|e| Error::Execute(e.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    template
        .execute(&mut out, &context)
        .map_err(|e| Error::Execute(e.to_string()))?;
    String::from_utf8(out).map_err(|e| Error::Execute(e.to_string()))
}

/// A navigation entry for a visible top-level page.
#[derive(Clone, Debug, PartialEq)]
pub struct NavEntry {
    pub name: String,
    pub title: String,
    pub type_name: &'static str,

    /// The output directory of the page, relative to the output root.
    pub target: PathBuf,
}

/// Everything a page needs to turn its source into HTML: the theme, the site
/// options, and where sources live. Built once per build and passed to each
/// [`crate::page::Page::load`].
pub struct Site<'a> {
    pub theme: &'a Theme,
    pub options: &'a SiteOptions,
    pub input_directory: &'a Path,
}

impl<'a> Site<'a> {
    pub fn new(
        theme: &'a Theme,
        options: &'a SiteOptions,
        input_directory: &'a Path,
    ) -> Site<'a> {
        Site {
            theme,
            options,
            input_directory,
        }
    }

    /// Renders a single, front, or post page value with the page template.
    pub fn render_page(&self, page: Value, navs: &[NavEntry]) -> Result<String> {
        let context = self.context(page, navs, None)?;
        execute(&self.theme.page_template, context)
    }

    /// Renders a collection page value and its ordered post values with the
    /// collection template.
    pub fn render_collection(
        &self,
        page: Value,
        posts: Vec<Value>,
        navs: &[NavEntry],
    ) -> Result<String> {
        let context = self.context(page, navs, Some(posts))?;
        execute(&self.theme.collection_template, context)
    }

    /// Replaces `{{ .assets_url }}` in page source text with the URL of the
    /// copied assets directory.
    pub fn substitute_assets_url(&self, text: &str) -> Result<String> {
        let url = self.options.assets_url()?;
        execute(
            &parse_source(text)?,
            value::object(vec![("assets_url", value::string(url.as_str()))]),
        )
    }

    /// Replaces `{{ .static_url }}` in stylesheet text with the URL of the
    /// copied theme `static` directory.
    pub fn substitute_static_url(&self, text: &str) -> Result<String> {
        let url = self.options.static_url()?;
        execute(
            &parse_source(text)?,
            value::object(vec![("static_url", value::string(url.as_str()))]),
        )
    }

    /// The absolute URL string for a page target path.
    pub fn url_for(&self, target: &Path) -> Result<String> {
        Ok(self.options.target_url(target)?.to_string())
    }

    fn options_value(&self) -> Result<Value> {
        let mut m = std::collections::HashMap::new();
        for (k, v) in &self.options.extra {
            m.insert(k.clone(), value::from_yaml(v));
        }
        m.insert("url".to_owned(), value::string(self.options.url.as_str()));
        m.insert(
            "assets_dir".to_owned(),
            value::string(self.options.assets_dir.to_string_lossy()),
        );
        m.insert(
            "assets_url".to_owned(),
            value::string(self.options.assets_url()?.as_str()),
        );
        m.insert(
            "static_url".to_owned(),
            value::string(self.options.static_url()?.as_str()),
        );
        Ok(Value::Object(m))
    }

    fn nav_value(&self, nav: &NavEntry) -> Result<Value> {
        Ok(value::object(vec![
            ("name", value::string(nav.name.as_str())),
            ("title", value::string(nav.title.as_str())),
            ("type_name", value::string(nav.type_name)),
            ("url", value::string(self.url_for(&nav.target)?)),
        ]))
    }

    fn context(
        &self,
        page: Value,
        navs: &[NavEntry],
        posts: Option<Vec<Value>>,
    ) -> Result<Value> {
        let navs = navs
            .iter()
            .map(|nav| self.nav_value(nav))
            .collect::<Result<Vec<Value>>>()?;
        let mut pairs = vec![
            ("options", self.options_value()?),
            ("navs", Value::Array(navs)),
            ("page", page),
        ];
        if let Some(posts) = posts {
            pairs.push(("posts", Value::Array(posts)));
        }
        Ok(value::object(pairs))
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for loading and applying templates.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template text.
    ParseTemplate(String),

    /// Returned for errors executing a template.
    Execute(String),

    /// Returned when a page URL can't be derived from the site URL.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "Parsing template: {}", err),
            Error::Execute(err) => write!(f, "Executing template: {}", err),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Execute(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator when joining URLs.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    fn options() -> SiteOptions {
        SiteOptions::new(Url::parse("https://example.org/").unwrap())
    }

    #[test]
    fn test_substitute_assets_url() -> Result<()> {
        let theme = Theme::from_sources("page", "collection")?;
        let options = options();
        let site = Site::new(&theme, &options, Path::new("."));
        assert_eq!(
            "![cat](https://example.org/assets/cat.png)",
            site.substitute_assets_url("![cat]({{ .assets_url }}/cat.png)")?
        );
        Ok(())
    }

    #[test]
    fn test_substitute_static_url() -> Result<()> {
        let theme = Theme::from_sources("page", "collection")?;
        let options = options();
        let site = Site::new(&theme, &options, Path::new("."));
        assert_eq!(
            "body { background: url(https://example.org/static/bg.png); }",
            site.substitute_static_url(
                "body { background: url({{ .static_url }}/bg.png); }"
            )?
        );
        Ok(())
    }

    #[test]
    fn test_render_page_with_navs() -> Result<()> {
        let theme = Theme::from_sources(
            "{{range .navs}}<a href=\"{{.url}}\">{{.title}}</a>{{end}}|{{.page.title}}|{{.options.url}}",
            "",
        )?;
        let options = options();
        let site = Site::new(&theme, &options, Path::new("."));
        let navs = vec![
            NavEntry {
                name: "home".to_owned(),
                title: "Home".to_owned(),
                type_name: "FrontPage",
                target: PathBuf::new(),
            },
            NavEntry {
                name: "about".to_owned(),
                title: "About".to_owned(),
                type_name: "SinglePage",
                target: PathBuf::from("about"),
            },
        ];
        let html = site.render_page(
            value::object(vec![("title", value::string("About"))]),
            &navs,
        )?;
        assert_eq!(
            concat!(
                r#"<a href="https://example.org/">Home</a>"#,
                r#"<a href="https://example.org/about/">About</a>"#,
                "|About|https://example.org/",
            ),
            html
        );
        Ok(())
    }

    #[test]
    fn test_load_missing_theme() {
        let dir = tempfile::tempdir().unwrap();
        match Theme::load(dir.path()) {
            Err(Error::OpenTemplateFile { path, err: _ }) => {
                assert_eq!(dir.path().join(PAGE_TEMPLATE), path)
            }
            _ => panic!("wanted OpenTemplateFile"),
        }
    }
}

//! Defines [`PostPage`], a dated page owned by a
//! [`crate::collection::CollectionPage`].

use crate::collection::CollectionPage;
use crate::markdown;
use crate::metadata::{self, PostMetadata};
use crate::page::{Error, Page, PageInfo, Result, MARKDOWN_EXTENSION, POST_PAGE};
use crate::theme::{NavEntry, Site};
use crate::value;
use chrono::NaiveDate;
use gtmpl::Value;
use std::path::{Path, PathBuf};

/// Marks the end of a post's summary in its rendered HTML.
pub const FOLD_TAG: &str = "<!-- more -->";

/// A post. Its source is `<collection>/<name>.md` and it is written to
/// `<collection>/<content_id>/`, so its URL doesn't expose the file name and
/// survives title changes.
#[derive(Clone, Debug, PartialEq)]
pub struct PostPage {
    pub info: PageInfo,

    /// The name of the owning collection.
    pub collection: String,

    /// The opaque output directory name, derived from the post name.
    pub content_id: String,

    /// The `date` metadata. Required before the post can be ordered within
    /// its collection.
    pub published_at: Option<NaiveDate>,

    /// `published_at` formatted for display, e.g. `Jan 5, 2024`.
    pub display_date: Option<String>,

    pub subtitle: Option<String>,
}

impl PostPage {
    /// Constructs a post named `name` owned by `parent`. The title defaults to
    /// the name until metadata says otherwise.
    pub fn new(name: &str, parent: &CollectionPage) -> PostPage {
        let collection = &parent.info.name;
        let content_id = metadata::content_id(name);
        PostPage {
            info: PageInfo::new(
                name,
                name,
                Path::new(collection)
                    .join(format!("{}{}", name, MARKDOWN_EXTENSION)),
                Path::new(collection).join(&content_id),
                false,
            ),
            collection: collection.clone(),
            content_id,
            published_at: None,
            display_date: None,
            subtitle: None,
        }
    }

    /// Constructs a post for an arbitrary parent page, failing with
    /// [`Error::InvalidParent`] unless the parent is a collection. Discovery
    /// already holds the collection itself and uses [`PostPage::new`].
    pub fn with_parent(name: &str, parent: Option<&Page>) -> Result<PostPage> {
        match parent {
            Some(Page::Collection(collection)) => {
                Ok(PostPage::new(name, collection))
            }
            _ => Err(Error::InvalidParent {
                post: name.to_owned(),
            }),
        }
    }

    /// Reads the post, applies its metadata, and renders it with the page
    /// template.
    pub fn load(&mut self, site: &Site, navs: &[NavEntry]) -> Result<()> {
        let source = self.info.read_source(site)?;
        let source = site
            .substitute_assets_url(&source)
            .map_err(|err| self.template_error(err))?;
        let rendered = markdown::to_html_with_metadata(&source)
            .map_err(|err| self.metadata_error(metadata::Error::Block(err)))?;

        if let Some(metadata) = &rendered.metadata {
            let metadata = PostMetadata::from_metadata(metadata)
                .map_err(|err| self.metadata_error(err))?;
            self.apply(metadata);
        }
        self.info.content = Some(rendered.html);

        let output = site
            .render_page(self.to_value(site)?, navs)
            .map_err(|err| self.template_error(err))?;
        self.info.rendered_output = Some(output);
        Ok(())
    }

    fn apply(&mut self, metadata: PostMetadata) {
        if let Some(title) = metadata.title {
            self.info.title = title;
        }
        if metadata.subtitle.is_some() {
            self.subtitle = metadata.subtitle;
        }
        if metadata.published_at.is_some() {
            self.published_at = metadata.published_at;
            self.display_date = metadata.display_date;
        }
        if metadata.hidden {
            self.info.hidden = true;
        }
    }

    /// Returns the post HTML up to [`FOLD_TAG`] and whether the post was
    /// actually cut there.
    pub fn summary(&self) -> (&str, bool) {
        let body = self.info.content.as_deref().unwrap_or("");
        match body.find(FOLD_TAG) {
            Some(i) => (&body[..i], true),
            None => (body, false),
        }
    }

    /// Converts the post into a template value. Collections hand these to the
    /// collection template in display order.
    pub fn to_value(&self, site: &Site) -> Result<Value> {
        let mut m = self.info.fields(POST_PAGE, site)?;
        let (summary, summarized) = self.summary();
        m.insert("summary".to_owned(), value::string(summary));
        m.insert("summarized".to_owned(), Value::Bool(summarized));
        m.insert("subtitle".to_owned(), value::option_to_value(&self.subtitle));
        m.insert("date".to_owned(), value::option_to_value(&self.display_date));
        m.insert(
            "published_at".to_owned(),
            value::option_to_value(
                &self.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
        );
        m.insert(
            "content_id".to_owned(),
            value::string(self.content_id.as_str()),
        );
        m.insert("parent".to_owned(), value::string(self.collection.as_str()));
        Ok(Value::Object(m))
    }

    fn metadata_error(&self, err: metadata::Error) -> Error {
        Error::Metadata {
            path: self.source_path(),
            err,
        }
    }

    fn template_error(&self, err: crate::theme::Error) -> Error {
        Error::Template {
            page: self.info.name.clone(),
            err,
        }
    }

    fn source_path(&self) -> PathBuf {
        self.info.source_path.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::test::{options, theme};
    use crate::page::SinglePage;

    fn blog() -> CollectionPage {
        CollectionPage::new("blog", "Blog", false)
    }

    #[test]
    fn test_paths() {
        let post = PostPage::new("hello", &blog());
        assert_eq!(Path::new("blog").join("hello.md"), post.info.source_path);
        assert_eq!(
            Path::new("blog").join(metadata::content_id("hello")),
            post.info.target_path
        );
        assert_eq!("hello", post.info.title);
    }

    #[test]
    fn test_invalid_parent() {
        let single = Page::Single(SinglePage::new("about", "About", false));
        for parent in vec![None, Some(&single)] {
            match PostPage::with_parent("hello", parent) {
                Err(Error::InvalidParent { post }) => assert_eq!("hello", post),
                other => panic!("wanted InvalidParent; found {:?}", other),
            }
        }
        let collection = Page::Collection(blog());
        assert!(PostPage::with_parent("hello", Some(&collection)).is_ok());
    }

    #[test]
    fn test_load_applies_metadata() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let input = tempfile::tempdir()?;
        std::fs::create_dir(input.path().join("blog"))?;
        std::fs::write(
            input.path().join("blog").join("first.md"),
            "---\ntitle: T\nsubtitle: S\ndate: 01-05-2024\nhidden: \"True\"\nmood: sunny\n---\nIntro\n\n<!-- more -->\n\nRest\n",
        )?;
        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());

        let mut post = PostPage::new("first", &blog());
        post.load(&site, &[])?;
        assert_eq!("T", post.info.title);
        assert_eq!(Some("S".to_owned()), post.subtitle);
        assert_eq!(Some("Jan 5, 2024".to_owned()), post.display_date);
        assert_eq!(NaiveDate::from_ymd_opt(2024, 1, 5), post.published_at);
        assert!(post.info.hidden);
        assert_eq!(
            Path::new("blog").join(metadata::content_id("first")),
            post.info.target_path
        );

        let (summary, summarized) = post.summary();
        assert!(summarized);
        assert_eq!("<p>Intro</p>", summary.trim());
        assert!(post
            .info
            .rendered_output
            .as_deref()
            .unwrap_or("")
            .starts_with("PostPage|T|<p>Intro</p>"));
        Ok(())
    }

    #[test]
    fn test_post_dispatches_as_page() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        std::fs::create_dir(input.path().join("blog"))?;
        std::fs::write(
            input.path().join("blog").join("first.md"),
            "---\ntitle: First\ndate: 01-05-2024\n---\nHello\n",
        )?;
        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());

        let collection = Page::Collection(blog());
        let mut page =
            Page::Post(PostPage::with_parent("first", Some(&collection))?);
        assert_eq!(POST_PAGE, page.type_name());
        page.load(&site, &[])?;
        assert_eq!("First", page.title());
        page.write(output.path())?;

        let html = std::fs::read_to_string(
            output
                .path()
                .join("blog")
                .join(metadata::content_id("first"))
                .join(crate::page::INDEX_FILE),
        )?;
        assert_eq!("PostPage|First|<p>Hello</p>", html);
        Ok(())
    }

    #[test]
    fn test_hidden_yes_is_visible() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let input = tempfile::tempdir()?;
        std::fs::create_dir(input.path().join("blog"))?;
        std::fs::write(
            input.path().join("blog").join("p.md"),
            "---\ndate: 01-05-2024\nhidden: yes\n---\nBody\n",
        )?;
        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());

        let mut post = PostPage::new("p", &blog());
        post.load(&site, &[])?;
        assert!(!post.info.hidden);
        Ok(())
    }

    #[test]
    fn test_bad_date() {
        let input = tempfile::tempdir().unwrap();
        std::fs::create_dir(input.path().join("blog")).unwrap();
        std::fs::write(
            input.path().join("blog").join("p.md"),
            "---\ndate: January 5th\n---\nBody\n",
        )
        .unwrap();
        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());

        let mut post = PostPage::new("p", &blog());
        match post.load(&site, &[]) {
            Err(Error::Metadata {
                path,
                err: metadata::Error::InvalidDate { .. },
            }) => assert_eq!(Path::new("blog").join("p.md"), path),
            other => panic!("wanted Metadata error; found {:?}", other),
        }
    }
}

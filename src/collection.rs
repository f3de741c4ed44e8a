//! Defines [`CollectionPage`], a page listing the posts found in its source
//! directory, along with the discovery and ordering of those posts.

use crate::metadata;
use crate::page::{Error, PageInfo, Result, COLLECTION_PAGE, MARKDOWN_EXTENSION};
use crate::post::PostPage;
use crate::theme::{NavEntry, Site};
use gtmpl::Value;
use log::debug;
use std::path::{Path, PathBuf};

/// A page whose content is the list of its posts. Its source is the
/// directory `<name>/` and it owns every post discovered there.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionPage {
    pub info: PageInfo,

    /// The loaded posts, most recent first.
    pub posts: Vec<PostPage>,
}

impl CollectionPage {
    pub fn new(name: &str, title: &str, hidden: bool) -> CollectionPage {
        CollectionPage {
            info: PageInfo::new(
                name,
                title,
                PathBuf::from(name),
                PathBuf::from(name),
                hidden,
            ),
            posts: Vec::new(),
        }
    }

    /// Finds the post sources in the collection directory and constructs an
    /// unloaded [`PostPage`] for each, in file name order. Entries which
    /// aren't regular `*.md` files are skipped.
    pub fn discover(&self, site: &Site) -> Result<Vec<PostPage>> {
        let dir = site.input_directory.join(&self.info.source_path);
        if !dir.is_dir() {
            return Err(Error::SourceNotFound(dir));
        }

        let read_error = |err: std::io::Error| Error::Read {
            path: dir.clone(),
            err,
        };
        let mut names = Vec::new();
        for result in std::fs::read_dir(&dir).map_err(read_error)? {
            let entry = result.map_err(read_error)?;
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            if !entry.path().is_file() {
                continue;
            }
            // Only the final extension is removed: `a.md.md` is the post `a.md`.
            if let Some(name) = file_name.strip_suffix(MARKDOWN_EXTENSION) {
                names.push(name.to_owned());
            }
        }
        names.sort();

        Ok(names
            .iter()
            .map(|name| PostPage::new(name, self))
            .collect())
    }

    /// Discovers and loads every post, orders them most recent first, and
    /// renders the collection template. Any post failing to load or lacking a
    /// date fails the whole collection.
    pub fn load(&mut self, site: &Site, navs: &[NavEntry]) -> Result<()> {
        let mut posts = self.discover(site)?;
        for post in posts.iter_mut() {
            debug!("Loading post `{}/{}`", self.info.name, post.info.name);
            post.load(site, navs)?;
        }
        sort_posts(&mut posts)?;
        self.posts = posts;
        self.info.content = Some(String::new());

        let page = Value::Object(self.info.fields(COLLECTION_PAGE, site)?);
        let posts = self
            .posts
            .iter()
            .map(|post| post.to_value(site))
            .collect::<Result<Vec<Value>>>()?;
        let output = site.render_collection(page, posts, navs).map_err(|err| {
            Error::Template {
                page: self.info.name.clone(),
                err,
            }
        })?;
        self.info.rendered_output = Some(output);
        Ok(())
    }

    /// Writes every post, then the collection index.
    pub fn write(&self, output_root: &Path) -> Result<()> {
        for post in &self.posts {
            post.info.write(output_root)?;
        }
        self.info.write(output_root)
    }
}

/// Orders posts most recent first. Posts sharing a date keep their relative
/// order. Fails if any post has no date.
pub fn sort_posts(posts: &mut Vec<PostPage>) -> Result<()> {
    if let Some(undated) = posts.iter().find(|p| p.published_at.is_none()) {
        return Err(Error::Metadata {
            path: undated.info.source_path.clone(),
            err: metadata::Error::MissingDate,
        });
    }
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::page::test::{options, theme};
    use crate::page::INDEX_FILE;

    fn write_post(dir: &Path, file_name: &str, date: &str) {
        std::fs::write(
            dir.join(file_name),
            format!("---\ntitle: {}\ndate: {}\n---\nBody of {}\n", file_name, date, file_name),
        )
        .unwrap();
    }

    fn names(collection: &CollectionPage) -> Vec<&str> {
        collection.posts.iter().map(|p| p.info.name.as_str()).collect()
    }

    #[test]
    fn test_orders_posts_and_ignores_other_files() -> Result<()> {
        let input = tempfile::tempdir().unwrap();
        let dir = input.path().join("blog");
        std::fs::create_dir(&dir).unwrap();
        write_post(&dir, "a.md", "01-01-2020");
        write_post(&dir, "b.md", "12-31-2024");
        std::fs::write(dir.join("notes.txt"), "not a post").unwrap();
        std::fs::create_dir(dir.join("drafts.md")).unwrap();

        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());
        let mut blog = CollectionPage::new("blog", "Blog", false);
        blog.load(&site, &[])?;

        assert_eq!(vec!["b", "a"], names(&blog));
        assert_eq!(
            Some("Blog:[b Dec 31, 2024][a Jan 1, 2020]"),
            blog.info.rendered_output.as_deref()
        );
        Ok(())
    }

    #[test]
    fn test_equal_dates_keep_discovery_order() -> Result<()> {
        let input = tempfile::tempdir().unwrap();
        let dir = input.path().join("blog");
        std::fs::create_dir(&dir).unwrap();
        write_post(&dir, "c.md", "03-03-2021");
        write_post(&dir, "a.md", "03-03-2021");
        write_post(&dir, "b.md", "03-03-2021");
        write_post(&dir, "z.md", "01-01-2019");
        write_post(&dir, "new.md", "06-01-2022");

        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());
        let mut blog = CollectionPage::new("blog", "Blog", false);
        blog.load(&site, &[])?;

        assert_eq!(vec!["new", "a", "b", "c", "z"], names(&blog));
        Ok(())
    }

    #[test]
    fn test_only_last_extension_is_stripped() -> Result<()> {
        let input = tempfile::tempdir().unwrap();
        let dir = input.path().join("blog");
        std::fs::create_dir(&dir).unwrap();
        write_post(&dir, "notes.md.md", "02-02-2022");
        write_post(&dir, "notes.md", "01-01-2022");

        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());
        let mut blog = CollectionPage::new("blog", "Blog", false);
        blog.load(&site, &[])?;

        assert_eq!(vec!["notes.md", "notes"], names(&blog));
        assert_eq!(
            Path::new("blog").join("notes.md.md"),
            blog.posts[0].info.source_path
        );
        assert_ne!(blog.posts[0].content_id, blog.posts[1].content_id);
        Ok(())
    }

    #[test]
    fn test_undated_post_fails_collection() {
        let input = tempfile::tempdir().unwrap();
        let dir = input.path().join("blog");
        std::fs::create_dir(&dir).unwrap();
        write_post(&dir, "a.md", "01-01-2020");
        std::fs::write(dir.join("b.md"), "---\ntitle: B\n---\nNo date\n").unwrap();

        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());
        let mut blog = CollectionPage::new("blog", "Blog", false);
        match blog.load(&site, &[]) {
            Err(Error::Metadata {
                path,
                err: metadata::Error::MissingDate,
            }) => assert_eq!(Path::new("blog").join("b.md"), path),
            other => panic!("wanted MissingDate; found {:?}", other),
        }
        assert!(blog.posts.is_empty());
        assert!(blog.info.rendered_output.is_none());
    }

    #[test]
    fn test_missing_directory() {
        let input = tempfile::tempdir().unwrap();
        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());
        let mut blog = CollectionPage::new("blog", "Blog", false);
        match blog.load(&site, &[]) {
            Err(Error::SourceNotFound(path)) => {
                assert_eq!(input.path().join("blog"), path)
            }
            other => panic!("wanted SourceNotFound; found {:?}", other),
        }
    }

    #[test]
    fn test_write_cascades_to_posts() -> Result<()> {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let dir = input.path().join("blog");
        std::fs::create_dir(&dir).unwrap();
        write_post(&dir, "hello.md", "01-05-2024");

        let theme = theme();
        let options = options();
        let site = Site::new(&theme, &options, input.path());
        let mut blog = CollectionPage::new("blog", "Blog", false);
        blog.load(&site, &[])?;
        blog.write(output.path())?;

        assert!(output.path().join("blog").join(INDEX_FILE).is_file());
        assert!(output
            .path()
            .join("blog")
            .join(metadata::content_id("hello"))
            .join(INDEX_FILE)
            .is_file());
        Ok(())
    }
}

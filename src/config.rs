//! Loads the project file (`quire.yaml`) into a [`Config`].

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "quire.yaml";

/// The options made available to every template as `options`.
#[derive(Deserialize, Clone, Debug)]
pub struct SiteOptions {
    /// The base URL of the site.
    pub url: Url,

    /// The directory holding user assets, relative to the project root.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Every other `site` key, passed to templates verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl SiteOptions {
    pub fn new(url: Url) -> SiteOptions {
        SiteOptions {
            url,
            assets_dir: default_assets_dir(),
            extra: BTreeMap::new(),
        }
    }

    /// The URL of the copied assets directory.
    pub fn assets_url(&self) -> std::result::Result<Url, url::ParseError> {
        self.url.join(crate::build::ASSETS_DIRECTORY)
    }

    /// The URL of the copied theme `static` directory.
    pub fn static_url(&self) -> std::result::Result<Url, url::ParseError> {
        self.url.join(crate::build::STATIC_DIRECTORY)
    }

    /// The URL of the directory for a page target path. The empty target is
    /// the site root.
    pub fn target_url(
        &self,
        target: &Path,
    ) -> std::result::Result<Url, url::ParseError> {
        let segments: Vec<String> = target
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        match segments.is_empty() {
            true => Ok(self.url.clone()),
            false => self.url.join(&format!("{}/", segments.join("/"))),
        }
    }
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

/// A top-level page as declared in the project file.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PageDecl {
    /// The site root. Its source is `<name>.md`.
    Front { name: String, title: String },

    /// A standalone page whose source is `<name>.md`.
    Single {
        name: String,
        title: String,
        #[serde(default)]
        hidden: bool,
    },

    /// A directory of dated posts named `<name>/`.
    Collection {
        name: String,
        title: String,
        #[serde(default)]
        hidden: bool,
    },
}

#[derive(Deserialize)]
struct Project {
    site: SiteOptions,

    #[serde(default = "default_input_directory")]
    input_directory: PathBuf,

    #[serde(default = "default_template_directory")]
    template_directory: PathBuf,

    #[serde(default = "default_output_directory")]
    output_directory: PathBuf,

    pages: Vec<PageDecl>,
}

fn default_input_directory() -> PathBuf {
    PathBuf::from("content")
}

fn default_template_directory() -> PathBuf {
    PathBuf::from("theme")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("_site")
}

/// Fully resolved build configuration. All directories are joined onto the
/// project root.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: SiteOptions,
    pub input_directory: PathBuf,
    pub template_directory: PathBuf,
    pub assets_directory: PathBuf,
    pub output_directory: PathBuf,
    pub pages: Vec<PageDecl>,
}

impl Config {
    /// Looks for [`PROJECT_FILE`] in `dir` and then in each of its parents.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.is_file() {
            return Config::from_project_file(&path)
                .with_context(|| format!("Loading configuration `{}`", path.display()));
        }
        match dir.parent() {
            Some(parent) => Config::from_directory(parent),
            None => Err(anyhow!(
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            )),
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        Config::from_yaml(&yaml, project_root)
    }

    /// Parses project file contents, resolving directories against
    /// `project_root`.
    pub fn from_yaml(yaml: &str, project_root: &Path) -> Result<Config> {
        Config::from_project(serde_yaml::from_str(yaml)?, project_root)
    }

    fn from_project(project: Project, project_root: &Path) -> Result<Config> {
        if project.site.url.cannot_be_a_base() {
            return Err(anyhow!(
                "`site.url` must be a base URL such as `https://example.org/`; found `{}`",
                project.site.url
            ));
        }

        let fronts = project
            .pages
            .iter()
            .filter(|p| matches!(p, PageDecl::Front { .. }))
            .count();
        if fronts > 1 {
            return Err(anyhow!("Only one `front` page may be declared; found {}", fronts));
        }

        Ok(Config {
            input_directory: project_root.join(&project.input_directory),
            template_directory: project_root.join(&project.template_directory),
            assets_directory: project_root.join(&project.site.assets_dir),
            output_directory: project_root.join(&project.output_directory),
            site: project.site,
            pages: project.pages,
        })
    }
}

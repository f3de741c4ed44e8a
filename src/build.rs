//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: deriving the navigation list
//! from the declared pages, preparing the output skeleton (theme `static`
//! files and user assets), loading every page ([`crate::page::Page::load`]),
//! and writing every page ([`crate::page::Page::write`]).
//!
//! The build is all-or-nothing: the first error aborts it.

use crate::config::Config;
use crate::page::{Error as PageError, Page};
use crate::theme::{Error as ThemeError, NavEntry, Site, Theme};
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The output subdirectory holding the theme's `static` files.
pub const STATIC_DIRECTORY: &str = "static";

/// The output subdirectory holding the user's assets.
pub const ASSETS_DIRECTORY: &str = "assets";

/// Builds the site described by a [`Config`] into
/// [`Config::output_directory`].
pub fn build_site(config: &Config) -> Result<()> {
    let theme = Theme::load(&config.template_directory)?;
    let site = Site::new(&theme, &config.site, &config.input_directory);
    let mut pages: Vec<Page> = config.pages.iter().map(Page::from).collect();
    build_pages(&mut pages, &site, config, &config.output_directory)
}

/// Runs the build phases over an explicit page set: navigation, skeleton,
/// load, then write.
pub fn build_pages(
    pages: &mut [Page],
    site: &Site,
    config: &Config,
    output_directory: &Path,
) -> Result<()> {
    let navs = navigation(pages);

    info!("Preparing {}", output_directory.display());
    prepare_skeleton(site, config, output_directory)?;

    info!("Loading {} pages", pages.len());
    for page in pages.iter_mut() {
        page.load(site, &navs)?;
    }

    info!("Writing {} pages", pages.len());
    for page in pages.iter() {
        page.write(output_directory)?;
    }

    info!("Built site in {}", output_directory.display());
    Ok(())
}

/// Lists the visible pages in declaration order. This is computed before any
/// page is loaded, so it reflects declared titles only.
pub fn navigation(pages: &[Page]) -> Vec<NavEntry> {
    pages
        .iter()
        .filter(|p| !p.hidden())
        .map(Page::nav_entry)
        .collect()
}

/// Resets the output directory and populates it with the theme's `static`
/// directory and the user's assets. Placeholders in copied stylesheets are
/// replaced with the static URL.
pub fn prepare_skeleton(
    site: &Site,
    config: &Config,
    output_directory: &Path,
) -> Result<()> {
    // The output directory is deleted wholesale, so it must not hold sources.
    let output = resolve_path(output_directory);
    for source in [
        &config.input_directory,
        &config.template_directory,
        &config.assets_directory,
    ] {
        if resolve_path(source).starts_with(&output) {
            return Err(Error::UnsafeOutput(output_directory.to_owned()));
        }
    }
    rmdir(output_directory)?;
    std::fs::create_dir_all(output_directory).map_err(|err| {
        Error::Skeleton {
            path: output_directory.to_owned(),
            err,
        }
    })?;

    let static_output = output_directory.join(STATIC_DIRECTORY);
    copy_if_present(
        &config.template_directory.join(STATIC_DIRECTORY),
        &static_output,
    )?;
    copy_if_present(
        &config.assets_directory,
        &output_directory.join(ASSETS_DIRECTORY),
    )?;

    if static_output.is_dir() {
        rewrite_stylesheets(site, &static_output)?;
    }
    Ok(())
}

/// Canonicalizes the nearest existing ancestor of `path` and appends the
/// remaining components, so paths spelled differently compare equal even if
/// `path` doesn't exist yet.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = match path.is_absolute() {
        true => path.to_owned(),
        false => match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_owned(),
        },
    };
    for ancestor in absolute.ancestors() {
        if let Ok(canonical) = ancestor.canonicalize() {
            let rest = absolute.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return normalize(&canonical.join(rest));
        }
    }
    normalize(&absolute)
}

// Folds `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn copy_if_present(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        copy_dir(src, dst)
    } else {
        warn!("Skipping {}: not a directory", src.display());
        Ok(())
    }
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for result in WalkDir::new(src) {
        let entry = result?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // the entry path
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        let io_error = |err: std::io::Error| Error::Skeleton {
            path: target.clone(),
            err,
        };
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(io_error)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(io_error)?;
        }
    }
    Ok(())
}

fn rewrite_stylesheets(site: &Site, dir: &Path) -> Result<()> {
    for result in WalkDir::new(dir) {
        let entry = result?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().map_or(true, |ext| ext != "css")
        {
            continue;
        }
        let io_error = |err: std::io::Error| Error::Skeleton {
            path: path.to_owned(),
            err,
        };
        let css = std::fs::read_to_string(path).map_err(io_error)?;
        let css = site.substitute_static_url(&css)?;
        std::fs::write(path, css).map_err(io_error)?;
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during page loading or
/// writing, cleaning the output directory, preparing the skeleton, and
/// loading or applying the theme.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading or writing a page.
    Page(PageError),

    /// Returned for errors loading the theme or rewriting stylesheets.
    Theme(ThemeError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying the skeleton.
    Skeleton { path: PathBuf, err: std::io::Error },

    /// Returned when the output directory contains the sources it would be
    /// built from.
    UnsafeOutput(PathBuf),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Page(err) => err.fmt(f),
            Error::Theme(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Skeleton { path, err } => {
                write!(f, "Preparing '{}': {}", path.display(), err)
            }
            Error::UnsafeOutput(path) => write!(
                f,
                "Refusing to replace '{}': it contains the site sources",
                path.display()
            ),
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Page(err) => Some(err),
            Error::Theme(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::Skeleton { path: _, err } => Some(err),
            Error::UnsafeOutput(_) => None,
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<PageError> for Error {
    /// Converts [`PageError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: PageError) -> Error {
        Error::Page(err)
    }
}

impl From<ThemeError> for Error {
    /// Converts [`ThemeError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ThemeError) -> Error {
        Error::Theme(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

//! The library code for the `quire` static site generator. A site is a list
//! of declared pages (see [`crate::config`]) rendered through a theme (see
//! [`crate::theme`]). Building it happens in four steps:
//!
//! 1. Deriving the navigation from the declared pages ([`crate::build`])
//! 2. Preparing the output directory with the theme's static files and the
//!    user's assets
//! 3. Loading every page: reading its Markdown source, applying its metadata
//!    and rendering it with a template ([`crate::page`], [`crate::post`],
//!    [`crate::collection`])
//! 4. Writing every rendered page to `<target>/index.html`
//!
//! Collections are the only page kind with children: each `*.md` file in the
//! collection's directory becomes a dated post, and the collection page lists
//! them most recent first.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collection;
pub mod config;
pub mod htmlrenderer;
pub mod markdown;
pub mod metadata;
pub mod page;
pub mod post;
pub mod serve;
pub mod theme;
pub mod value;

//! slugline: content identity resolution and metadata synthesis.
//!
//! # Modules
//!
//! - [`slug`]: the shared slug normalizer
//! - [`headings`]: heading extraction, anchored rendering, active-heading tracking
//! - [`metadata`]: SEO metadata merge engine
//! - [`resolver`]: slug → entity/sub-item resolution over hints and the catalog
//! - [`db`]: SQLite catalog, metadata-override store and hint channel
//! - [`api`]: JSON HTTP adapter
//! - [`client`]: remote catalog source
//! - [`config`]: file and environment configuration

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod headings;
pub mod metadata;
pub mod models;
pub mod resolver;
pub mod slug;

pub use resolver::{Navigation, Resolution, ResolveError, Resolver};
pub use slug::normalize;

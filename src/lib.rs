//! Release resolution and artifact verification for GitHub-style APIs.
//!
//! The library is layered leaves first: [`http`] (retrying transport and
//! pagination), [`cache`] (TTL file cache), [`provider`] (release fetching and
//! caching), [`finder`] (latest-release selection) and [`checksum`]
//! (checksum lookup and local verification). [`commands`] wires them up for
//! the `ghsum` binary.

pub mod cache;
pub mod checksum;
pub mod commands;
pub mod finder;
pub mod http;
pub mod platform;
pub mod provider;
pub mod runtime;

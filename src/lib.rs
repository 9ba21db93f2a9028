//! Photo-sharing feed server with cache-aside hydration of posts, comments and authors.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

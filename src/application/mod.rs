//! Application services layer.

pub mod accounts;
pub mod admin;
pub mod comments;
pub mod error;
pub mod feed;
pub mod maintenance;
pub mod posting;
pub mod repos;
pub mod sync;
pub mod timeline;

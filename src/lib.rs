pub mod app;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod playlists;
pub mod service;
pub mod storage;

pub use context::CatalogContext;
pub use error::{CatalogError, ErrorKind};

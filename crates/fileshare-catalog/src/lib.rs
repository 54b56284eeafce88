//! # fileshare-catalog
//!
//! Durable storage of [`FileMetadata`] and [`Fragment`] rows: a single-file
//! SQLite database with foreign-key cascade from fragments to their parent
//! file, enforced at every connection open.
//!
//! [`Catalog`] is the only type most callers need; [`model`] holds the plain
//! data types it reads and writes.

pub mod error;
pub mod model;
pub mod store;

pub use error::{CatalogError, Result};
pub use model::{FileMetadata, Fragment, Status, CHUNK_SIZE};
pub use store::Catalog;

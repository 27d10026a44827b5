//! One interface for reading, writing, deleting and listing named objects on
//! local paths, S3 buckets, Azure Blob containers and HTTP endpoints.
//!
//! The backend follows from the base path:
//!
//! | base path                          | backend           |
//! |------------------------------------|-------------------|
//! | `s3://bucket/prefix`               | S3                |
//! | `blob://account/container/prefix`  | Azure Blob        |
//! | `http(s)://host/path`              | HTTP (read-only)  |
//! | anything else                      | local filesystem  |

pub mod backend;
pub mod config;
pub mod error;
pub mod join;
pub mod location;
pub mod sniff;
pub mod store;

pub use config::StoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use location::{BackendKind, Location};
pub use store::Store;

//! updateinfo-filter - Fast streaming filter for RPM updateinfo advisory feeds
//!
//! This library selects advisories from an `updateinfo.xml` document (as
//! published in rpm-md repositories) and renders each selected advisory
//! through a text template. It is designed to handle multi-gigabyte feeds
//! without ever building the document tree.
//!
//! # Key Features
//!
//! - **True streaming**: Tokenizes the XML forward-only and holds a single `<update>` at a time
//! - **Date window**: Keeps updates issued strictly between two dates
//! - **Type filtering**: Optionally keeps only one advisory type, e.g. `security`
//! - **Package whitelist**: Keeps updates touching at least one listed package
//! - **Templating**: Built-in layout or any Handlebars template
//! - **Order preservation**: Updates are rendered in document order
//! - **Checksums**: Optionally computes a digest of the rendered output
//!
//! # Examples
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use std::path::Path;
//! use updateinfo_filter::{run, FilterConfig, Renderer};
//!
//! let before = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
//! let after = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
//! let config = FilterConfig::new(before, after).with_update_type("security");
//! let renderer = Renderer::new().unwrap();
//!
//! let mut output = std::io::stdout();
//! run(Path::new("updateinfo.xml"), &config, &renderer, &mut output, None).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;

pub use error::{DecodeError, Error, Result};
pub use filter::{FilterConfig, SECURITY_TYPE};
pub use model::{Issued, IssuedDate, Package, Reference, Update};
pub use parser::UpdateStream;
pub use pipeline::{filter_updates_streaming, run, DigestAlgorithm, DigestWriter, FilterStats};
pub use render::{Renderer, DEFAULT_TEMPLATE};

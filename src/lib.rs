//! # cerbedit
//!
//! A Cursive-based TUI document editor for Cerberus-style schemas.
//!
//! Cerbedit turns a validation schema into an interactive terminal form:
//! every nesting level of the document becomes a page, scalar fields are
//! edited in place under live rule checks, and structural changes keep
//! the document normalized against the schema.
//!
//! ## Features
//!
//! - TUI interface built with [Cursive](https://github.com/gyscos/cursive)
//! - Cerberus-style rule support: type, schema, valuesrules, keysrules,
//!   regex, min/max, required, default, selector variants
//! - Multi-format support: YAML and JSON documents
//! - Live validation while typing, with rejected edits left out of the
//!   document
//! - Tagged-union editing through selector fields with automatic purge
//!   and default fill on switch
//! - Automatic backup before saving changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cerbedit::{Value, run_with_values};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "name": { "type": "string", "required": true },
//!     "port": { "type": "integer", "default": 8080, "min": 1 },
//! });
//! let document = json!({ "name": "svc" });
//!
//! // Run the editor; `Some` carries the edited document on save.
//! let edited: Option<Value> =
//!     run_with_values("config.yaml", &schema, &document).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Schema parsing, normalization and validation
//! - [`page`] - Editing pages as testable state machines
//! - [`stack`] - Navigation stack routing events and page results
//! - [`run`] - TUI application runner and save pipeline
//! - [`ui`] - Cursive views and input dispatch

#[macro_use]
mod log;

/// Schema parsing, normalization and validation.
///
/// This module owns everything that reads or rewrites documents: rule
/// parsing, selector resolution, normalization and validation.
pub mod data;

/// Editing pages as plain state machines, independent of the terminal.
pub mod page;

/// Navigation stack over pages.
pub mod stack;

/// TUI application runner and main entry points.
pub mod run;

/// Cursive views and input dispatch.
pub mod ui;

pub use run::*;
pub use serde_json::Value;

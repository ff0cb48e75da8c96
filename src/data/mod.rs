//! Schema and document data structures.
//!
//! This module provides the data layer of the editor:
//!
//! - Schema parsing and classification into editable shapes
//! - Normalization (defaults, key ordering, unknown-key purging)
//! - Field-level validation used by live editing
//!
//! ## Architecture
//!
//! The data module is organized into several submodules:
//!
//! - [`schema`] - Schema rule parsing and resolution against documents
//! - [`validator`] - Normalization and validation of document values
//! - [`value`] - Small helpers for rendering and classifying values

/// Schema rule parsing and resolution against documents.
pub mod schema;

/// Normalization and validation of document values.
pub mod validator;

/// Value helpers shared by the page and UI layers.
pub mod value;

pub use schema::{SchemaError, SchemaNode, SchemaRoot};

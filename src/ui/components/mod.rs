//! Cursive views built from page state.

pub mod form;
pub mod popup;

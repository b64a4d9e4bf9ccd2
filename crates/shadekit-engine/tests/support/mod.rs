//! Test support utilities for ShadeKit integration tests
//!
//! This module provides helpers for writing integration tests:
//! - TestTheme: Engine wrapper around a fully stocked document
//! - transform_one: Reference transformation for expected values

mod test_theme;

pub use test_theme::{
    transform_one, TestTheme, INLINE_CSS, LINKED_CSS, SHEET_URL, STYLE_CSS,
};

//! Shared helpers.

pub mod numeric;

pub use numeric::{as_index, first_number, first_text, lookup, parse_number, parse_number_value};

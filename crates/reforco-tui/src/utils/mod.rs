//! Utility functions for string formatting.

pub mod format;

pub use format::{format_date, format_duration, format_time, truncate_string};

//! Data loading
//!
//! Groups are read from CSV files with one sample point per row.

pub mod csv;

pub use self::csv::*;

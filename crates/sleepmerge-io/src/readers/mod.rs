//! Readers producing `Row`s.

pub mod csv;

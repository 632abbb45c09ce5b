//! File formats the CLI speaks: CSV payment batches, CSV invoice reports and
//! JSON ledger seeds.

pub mod csv;
pub mod seed;

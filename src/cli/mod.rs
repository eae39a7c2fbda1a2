//! Command-line interface for the `xfacet` binary.

pub mod commands;

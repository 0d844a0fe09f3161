//! # Keyscope
//!
//! Command-line front end for `keyscope-core`: reads stored values from files
//! or arguments, runs detection, decoding and materialization, and prints the
//! result as text or JSON.

pub mod cli;
pub mod config;

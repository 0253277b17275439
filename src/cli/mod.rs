//! Command-line interface
//!
//! Argument definitions and command handlers for the `twinstep` binary.

pub mod args;
pub mod commands;

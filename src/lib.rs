//! `twinstep` - step-by-step playback of side-by-side architecture diagrams
//!
//! A single sequencer walks a fixed list of phases on a timer and
//! broadcasts the current phase; independent presentation consumers map
//! each phase onto their own diagram.

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod observability;
pub mod phase;
pub mod presentation;
pub mod scenarios;

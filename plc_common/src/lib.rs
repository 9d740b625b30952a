//! PLC Runtime Common Library
//!
//! This crate provides shared constants, types and configuration loading
//! utilities for the PLC runtime workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - On-disk file names and runtime defaults
//! - [`state`] - Runtime lifecycle state enumeration
//! - [`debug`] - Debug variable type table and decoded values
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use plc_common::prelude::*;
//!
//! assert_eq!(RuntimeState::default(), RuntimeState::Empty);
//! ```

pub mod config;
pub mod consts;
pub mod debug;
pub mod prelude;
pub mod state;

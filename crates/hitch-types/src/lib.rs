//! Foundation types for hitch.
//!
//! Platform-agnostic types shared by every hitch crate: the RGB color used
//! for output overrides, the terminal configuration model, and the error
//! type.

pub mod color;
pub mod config;
pub mod error;

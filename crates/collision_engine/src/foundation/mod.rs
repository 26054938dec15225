//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Scalar abstraction and math helpers
//! - Arena handles for mesh storage
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;

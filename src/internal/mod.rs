//! Internal modules ported from external libraries.
//!
//! These modules contain code adapted from:
//! - scipy: Linear sum assignment

pub mod scipy;

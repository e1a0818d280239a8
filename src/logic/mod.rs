//! Logic modules: pure decision making with no I/O.
//!
//! # Modules
//!
//! - `resolver`: dependency ordering over the package catalog

pub mod resolver;

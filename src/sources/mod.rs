//! Source implementations shipped with Hondana.
//!
//! Remote sources live outside this crate and plug in through the
//! [`Source`](crate::Source) trait.
//!
//! # Available Sources
//!
//! - [`LocalSource`] - Chapters stored as directories or archives on disk

pub mod local;

pub use local::LocalSource;

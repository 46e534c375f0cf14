//! Routing module
//!
//! Explicitly constructed path router used in place of a global dispatcher.

mod router;

pub use router::Router;

//! Path, URI, and filename-convention primitives for the workspace core.
//!
//! Everything above this crate routes files by two questions: *where is it*
//! (URI/UTF-8 path conversion, in [`paths`]) and *what is it* (filename
//! classification and [`ConfigKind`] inference, in [`classify`]).

pub mod classify;
pub mod paths;

pub use classify::ConfigKind;

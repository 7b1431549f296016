//! JVM names, types, and flags
//!
//! This is just enough of the class file vocabulary to describe method bodies and the methods
//! generated while rewriting them. Nothing here reads or writes the binary class file format.

mod access_flags;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;

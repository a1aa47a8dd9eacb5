//! Data sources that do not come from a file: seeded synthetic campaigns for
//! the `demo` command and for tests.

pub mod synthetic;

pub use synthetic::*;

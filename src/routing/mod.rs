//! Declarative route descriptions and their compiled executable form.

pub mod compiler;
pub mod step;

pub use compiler::{compile_routes, read_routes, validate_slots, RouteCompileError};
pub use step::{AskCondition, RouteGraph, RouteStep};

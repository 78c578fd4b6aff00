//! docplan Graph
//!
//! Step dependencies extracted by a model are arbitrary input: they may name
//! steps that do not exist or loop back on themselves. This crate turns them
//! into a [`DependencyGraph`] that is guaranteed acyclic and referentially
//! intact, or rejects them with a [`GraphError`] precise enough to diagnose.
//!
//! # Example
//!
//! ```rust
//! use docplan_graph::{build, GraphError, StepSpec};
//!
//! let err = build(vec![
//!     StepSpec::new(1).depends_on([3]),
//!     StepSpec::new(2).depends_on([1]),
//!     StepSpec::new(3).depends_on([2]),
//! ])
//! .unwrap_err();
//! assert_eq!(err, GraphError::Cycle { cycle_path: vec![1, 2, 3, 1] });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod builder;
mod critical_path;
mod error;
mod graph;

pub use builder::{build, DependencyGraphBuilder};
pub use critical_path::path_weight;
pub use error::GraphError;
pub use graph::{DependencyGraph, GraphRecord, StepSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

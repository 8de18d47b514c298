//! The council composition engine.
//!
//! [`CompositionEngine`] enforces every council invariant — seat capacity,
//! one active seat per member per term, exclusive term activation — and
//! computes composition snapshots. It is layered over the `curia-core`
//! store traits and depends on no concrete backend; transport concerns are
//! the caller's responsibility.

mod engine;

pub use engine::CompositionEngine;

#[cfg(test)]
mod tests;

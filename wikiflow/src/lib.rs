//! LLM-driven task decomposition trees for automation wiki pages.
//!
//! The crate builds and maintains hierarchical step trees whose substance
//! comes from a text-generation backend. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (path addressing, merge policy,
//!   tolerant normalization, invariants). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting operations (tree persistence, configuration,
//!   prompt templates, output envelopes).
//! - **[`agents`]**: Model-backed operations behind the
//!   [`agents::TextGenerator`] trait, mockable in tests.
//!
//! [`flow`] coordinates agents with I/O to implement the full page pipeline.

pub mod agents;
pub mod core;
pub mod flow;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;

//! LALR(1) automaton construction.
//!
//! This crate turns a context-free grammar into a canonical LR(0) state
//! machine augmented with LALR(1) lookahead sets, computed with DeRemer and
//! Pennello's relational method. The output (states in discovery order,
//! per-state transitions, per-item lookahead sets and default reductions)
//! is consumed by a separate table-emission stage; grammar file parsing and
//! code generation are not part of this crate.

pub mod automaton;
pub mod grammar;
pub mod types;

mod util;

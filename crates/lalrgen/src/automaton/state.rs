//! Automaton states.

use super::item::Item;
use crate::{
    grammar::{Grammar, RuleID, Symbol, SymbolSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// Identifier of a state, indexing into the automaton's state arena.
///
/// The arena is append-only, so a `StateID` stays valid while the automaton
/// is alive even as new states are discovered. State 0 is the start state.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl StateID {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A state of the LR(0) machine together with the LALR(1) data attached to
/// it by the later pipeline stages.
#[derive(Debug, Default)]
pub struct State {
    /// The items defining this state's identity, in canonical (sorted)
    /// order. Deduplication of states is by kernel equality.
    pub kernel: Vec<Item>,

    /// Kernel plus every item reachable by nonterminal expansion with the
    /// dot at position 0. The kernel occupies the closure's prefix,
    /// index-for-index; left empty until the closure engine visits the
    /// state.
    pub closure: Vec<Item>,

    /// Outgoing transitions: grammar symbol to successor state.
    pub bundle: Map<Symbol, StateID>,

    /// Direct-read sets, then the full `Read` sets after SCC propagation,
    /// keyed by the nonterminals appearing as bundle keys.
    pub reads: Map<Symbol, SymbolSet>,

    /// `Follow` sets: seeded from `reads`, closed under the includes
    /// relation.
    pub follows: Map<Symbol, SymbolSet>,

    /// Lookahead sets, parallel to `closure`. The kernel items' lookaheads
    /// are the first `kernel.len()` entries.
    pub lookaheads: Vec<SymbolSet>,

    /// The reduction with the largest lookahead set, used by table emitters
    /// to collapse reduce actions.
    pub default_reduce: Option<RuleID>,
}

impl State {
    pub(crate) fn from_kernel(kernel: Vec<Item>) -> Self {
        Self {
            kernel,
            ..Self::default()
        }
    }

    /// Lookahead sets of the kernel items (the closure prefix).
    pub fn kernel_lookaheads(&self) -> &[SymbolSet] {
        &self.lookaheads[..self.kernel.len().min(self.lookaheads.len())]
    }

    /// Position of the reduce item for `rule` in this state's closure.
    pub(crate) fn reduce_position(&self, g: &Grammar, rule: RuleID) -> Option<usize> {
        let len = g.rule(rule).rhs.len();
        self.closure
            .iter()
            .position(|item| item.rule == rule && item.dot == len)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## closure:")?;
            for (i, item) in self.closure.iter().enumerate() {
                write!(f, "- {}", item.display(g))?;
                if i < self.kernel.len() {
                    write!(f, " (kernel)")?;
                }
                match self.lookaheads.get(i) {
                    Some(la) if !la.is_empty() => writeln!(f, "  {}", la.display(g))?,
                    _ => writeln!(f)?,
                }
            }
            if !self.bundle.is_empty() {
                writeln!(f, "## transitions:")?;
                for (&symbol, &target) in &self.bundle {
                    writeln!(f, "- {} => {}", g.spelling(symbol), target)?;
                }
            }
            if let Some(rule) = self.default_reduce {
                writeln!(f, "## default reduce: {}", g.rule(rule).display(g))?;
            }
            Ok(())
        })
    }
}

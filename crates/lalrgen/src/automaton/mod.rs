//! Construction of the LALR(1) automaton.
//!
//! [`Automaton::build`] drives the pipeline in fixed order: LR(0) state
//! graph via the closure engine, nullable fixpoint, lookback sets, the
//! Reads relation, the Includes relation producing the Follow sets, the
//! lookahead assignment and finally the default-reduce selection. The whole
//! computation is single-threaded and deterministic for a fixed grammar.

mod closure;
mod digraph;
mod lalr;

pub mod item;
pub mod state;

pub use self::{
    item::Item,
    lalr::{Goto, Reduce},
    state::{State, StateID},
};

use crate::{
    grammar::{Grammar, SymbolSet},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// The LALR(1) automaton under construction, and the finished product.
///
/// Owns every state for its lifetime; the grammar is borrowed read-only
/// and must outlive the automaton.
#[derive(Debug)]
pub struct Automaton<'g> {
    grammar: &'g Grammar,
    states: Vec<State>,
    kernels: Map<Vec<Item>, StateID>,
    nullables: SymbolSet,
    lookbacks: Map<Reduce, Set<Goto>>,
    start: StateID,
}

impl<'g> Automaton<'g> {
    /// Run the full construction pipeline over `grammar`.
    #[tracing::instrument(skip_all)]
    pub fn build(grammar: &'g Grammar) -> Self {
        let mut automaton = Self {
            grammar,
            states: Vec::new(),
            kernels: Map::default(),
            nullables: SymbolSet::default(),
            lookbacks: Map::default(),
            start: StateID::from_index(0),
        };

        let goal = Item {
            rule: grammar.goal(),
            dot: 0,
        };
        let (start, _) = automaton.intern_state(vec![goal]);
        automaton.start = start;

        automaton.close_all();
        automaton.build_nullables();
        automaton.build_lookbacks();
        automaton.build_reads();
        automaton.build_includes_and_follows();
        automaton.build_lookaheads();
        automaton.build_default_reduce_actions();

        automaton
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// States in discovery order; state 0 is the start state.
    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::from_index(i), state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn start(&self) -> StateID {
        self.start
    }

    /// Nonterminals that can derive the empty string.
    pub fn nullables(&self) -> &SymbolSet {
        &self.nullables
    }

    /// The lookback relation: completed item to the (state, nonterminal)
    /// pairs whose follow sets it inherits.
    pub fn lookbacks(&self) -> &Map<Reduce, Set<Goto>> {
        &self.lookbacks
    }

    /// Intern a candidate state by its kernel. The kernel must be in
    /// canonical (sorted) order.
    pub(crate) fn intern_state(&mut self, kernel: Vec<Item>) -> (StateID, bool) {
        debug_assert!(
            kernel.windows(2).all(|w| w[0] < w[1]),
            "kernel must be sorted and duplicate-free"
        );
        if let Some(&id) = self.kernels.get(&kernel) {
            return (id, false);
        }
        let id = StateID::from_index(self.states.len());
        self.kernels.insert(kernel.clone(), id);
        self.states.push(State::from_kernel(kernel));
        (id, true)
    }

    /// Close the nullable set: a left-hand side is nullable as soon as one
    /// of its rules has an all-nullable (or empty) right-hand side.
    #[tracing::instrument(skip_all)]
    fn build_nullables(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for (_, rule) in self.grammar.rules() {
                if rule.rhs.iter().all(|&s| self.nullables.contains(s)) {
                    changed |= self.nullables.insert(rule.lhs);
                }
            }
        }
        tracing::trace!("nullables = {}", self.nullables.display(self.grammar));
    }

    /// Dump of every state, for diagnostics and external emitters.
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            for (id, state) in self.states() {
                writeln!(f, "#### state {}", id)?;
                write!(f, "{}", state.display(self.grammar))?;
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    }

    // S -> A B, A -> 'a' | ε, B -> 'b'
    fn nullable_grammar() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.intern("S");
            let nt_a = g.intern("A");
            let nt_b = g.intern("B");
            g.rule(s, [nt_a, nt_b])?;
            g.rule(nt_a, [a])?;
            g.rule(nt_a, [])?;
            g.rule(nt_b, [b])?;
            g.start_symbol(s);
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn nullable_set_is_minimal_fixpoint() {
        init_tracing();
        let g = nullable_grammar();
        let automaton = Automaton::build(&g);

        let nt_a = g.symbol("A").unwrap();
        assert!(automaton.nullables().contains(nt_a));
        // neither S, B nor $accept derives ε (each has a non-nullable rhs)
        assert_eq!(automaton.nullables().len(), 1);
    }

    #[test]
    fn goal_item_lookahead_is_end_of_input() {
        let g = nullable_grammar();
        let automaton = Automaton::build(&g);

        let start = automaton.state(automaton.start());
        assert_eq!(
            start.closure[0],
            Item {
                rule: g.goal(),
                dot: 0
            }
        );
        let lookahead = &start.lookaheads[0];
        assert!(lookahead.contains(g.end_symbol()));
        assert_eq!(lookahead.len(), 1);
    }

    #[test]
    fn epsilon_reduce_lookahead_is_follow_of_a() {
        let g = nullable_grammar();
        let automaton = Automaton::build(&g);

        let nt_a = g.symbol("A").unwrap();
        let epsilon = *g
            .rules_for(nt_a)
            .iter()
            .find(|&&r| g.rule(r).rhs.is_empty())
            .unwrap();

        // A -> ε reduces in the start state; the only terminal that can
        // follow A there is 'b' (B starts with 'b').
        let start = automaton.state(automaton.start());
        let position = start.reduce_position(&g, epsilon).unwrap();
        let lookahead = &start.lookaheads[position];
        assert!(lookahead.contains(g.symbol("b").unwrap()));
        assert_eq!(lookahead.len(), 1);
    }

    #[test]
    fn shift_paths_reach_expected_reduce_items() {
        let g = nullable_grammar();
        let automaton = Automaton::build(&g);

        let nt_a = g.symbol("A").unwrap();
        let nt_b = g.symbol("B").unwrap();
        let b = g.symbol("b").unwrap();
        let b_rule = g.rules_for(nt_b)[0];

        let start = automaton.state(automaton.start());
        let after_a = automaton.state(start.bundle[&nt_a]);
        let after_b = automaton.state(after_a.bundle[&b]);
        assert!(after_b.reduce_position(&g, b_rule).is_some());
    }

    #[test]
    fn undeclared_rhs_symbol_warns_but_builds() {
        init_tracing();
        // X is neither a terminal nor any rule's left-hand side; this only
        // warns, and the pipeline must carry the unclassified symbol
        // through closure, lookback and includes without panicking
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.intern("S");
            let x = g.intern("X");
            g.rule(s, [a, x, b])?;
            g.start_symbol(s);
            Ok(())
        })
        .unwrap();

        let x = g.symbol("X").unwrap();
        assert!(!g.is_terminal(x) && !g.is_nonterminal(x));

        let automaton = Automaton::build(&g);
        let _ = automaton.display().to_string();

        // the shift chain a X b still reaches the reduce item for S
        let s = g.symbol("S").unwrap();
        let s_rule = g.rules_for(s)[0];
        let a = g.symbol("a").unwrap();
        let b = g.symbol("b").unwrap();
        let start = automaton.state(automaton.start());
        let after_a = automaton.state(start.bundle[&a]);
        let after_x = automaton.state(after_a.bundle[&x]);
        let after_b = automaton.state(after_x.bundle[&b]);
        assert!(after_b.reduce_position(&g, s_rule).is_some());
    }

    #[test]
    fn construction_is_deterministic() {
        let g = nullable_grammar();
        let first = Automaton::build(&g).display().to_string();
        let second = Automaton::build(&g).display().to_string();
        assert_eq!(first, second);
    }
}

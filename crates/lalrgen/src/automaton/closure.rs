//! The LR(0) closure engine: per-state closure computation and worklist
//! discovery of the whole state graph.

use super::{item::Item, state::StateID, Automaton};
use crate::{
    grammar::Symbol,
    types::{Map, Queue, Set},
};

impl Automaton<'_> {
    /// Compute closures transitively over the whole state graph, breadth
    /// first. Real grammars can produce thousands of states, so discovery
    /// runs on an explicit queue rather than the call stack.
    #[tracing::instrument(skip_all)]
    pub(crate) fn close_all(&mut self) {
        let mut pending: Queue<StateID> = Some(self.start()).into_iter().collect();
        while let Some(id) = pending.pop() {
            for fresh in self.closure(id) {
                pending.push(fresh);
            }
        }
        tracing::trace!("state graph closed, {} states", self.state_count());
    }

    /// Close a single state and intern its successor states, returning the
    /// newly discovered ones.
    ///
    /// A no-op on states whose closure is already populated: successor
    /// construction can reach a state again before the queue gets back to
    /// it, and recomputation must not disturb the closure ordering.
    pub(crate) fn closure(&mut self, id: StateID) -> Vec<StateID> {
        if !self.state(id).closure.is_empty() {
            return Vec::new();
        }

        let grammar = self.grammar();
        let kernel = self.state(id).kernel.clone();

        let mut closure: Set<Item> = kernel.iter().copied().collect();
        let mut working_list: Vec<Item> = kernel;
        let mut buckets: Map<Symbol, Vec<Item>> = Map::default();

        while let Some(item) = working_list.pop() {
            let Some(symbol) = item.symbol_after_dot(grammar) else {
                // reduce item, nothing to expand
                continue;
            };

            // the bucket for `symbol` collects the items whose `next`
            // items form the kernel of the successor on that symbol
            buckets.entry(symbol).or_default().push(item);

            if grammar.is_nonterminal(symbol) {
                for &rule in grammar.rules_for(symbol) {
                    let item = Item { rule, dot: 0 };
                    if closure.insert(item) {
                        working_list.push(item);
                    }
                }
            }
        }

        let mut fresh = Vec::new();
        for (symbol, bucket) in buckets {
            let mut kernel: Vec<Item> = bucket.iter().map(|item| item.next()).collect();
            kernel.sort_unstable();

            let (target, is_new) = self.intern_state(kernel);
            if is_new {
                fresh.push(target);
            }
            self.states[id.index()].bundle.insert(symbol, target);
        }

        // kernel items were inserted first, so they occupy the closure's
        // prefix index-for-index
        self.states[id.index()].closure = closure.into_iter().collect();

        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    // E -> E '+' T | T, T -> 'num'
    fn expr_grammar() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("plus")?;
            let num = g.terminal("num")?;
            let e = g.intern("E");
            let t = g.intern("T");
            g.rule(e, [e, plus, t])?;
            g.rule(e, [t])?;
            g.rule(t, [num])?;
            g.start_symbol(e);
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn states_are_deduplicated_by_kernel() {
        let g = expr_grammar();
        let automaton = Automaton::build(&g);

        let states: Vec<_> = automaton.states().collect();
        for (i, (_, left)) in states.iter().enumerate() {
            for (_, right) in &states[i + 1..] {
                assert_ne!(left.kernel, right.kernel);
            }
        }

        // shifting 'num' from the start state and from behind '+' must
        // reach the same [T -> num .] state
        let e = g.symbol("E").unwrap();
        let plus = g.symbol("plus").unwrap();
        let num = g.symbol("num").unwrap();
        let start = automaton.state(automaton.start());
        let direct = start.bundle[&num];
        let after_e = automaton.state(start.bundle[&e]);
        let after_plus = automaton.state(after_e.bundle[&plus]);
        assert_eq!(after_plus.bundle[&num], direct);
    }

    #[test]
    fn kernel_is_closure_prefix() {
        let g = expr_grammar();
        let automaton = Automaton::build(&g);
        for (_, state) in automaton.states() {
            assert_eq!(&state.closure[..state.kernel.len()], &state.kernel[..]);
        }
    }

    #[test]
    fn reclosing_a_state_is_a_no_op() {
        let g = expr_grammar();
        let mut automaton = Automaton::build(&g);
        let start = automaton.start();
        let before = automaton.state(start).closure.clone();

        assert!(automaton.closure(start).is_empty());
        assert_eq!(automaton.state(start).closure, before);
    }
}

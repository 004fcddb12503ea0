//! LALR(1) lookahead computation.
//!
//! Implements DeRemer and Pennello's relational method: direct-read sets
//! closed over the Reads relation, Follow sets closed over the Includes
//! relation, and lookback facts carrying the Follow sets onto the reduce
//! items.
//!
//! DeRemer and Pennello, Efficient Computation of LALR(1) Look-Ahead Sets,
//! <https://dl.acm.org/doi/10.1145/69622.357187>

use super::{
    digraph::{Channel, Digraph},
    item::Item,
    state::StateID,
    Automaton,
};
use crate::grammar::{Grammar, RuleID, Symbol, SymbolSet};
use std::fmt;

/// A nonterminal transition: the state it leaves and the nonterminal it
/// consumes. Nodes of the Reads and Includes digraphs.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Goto {
    pub state: StateID,
    pub symbol: Symbol,
}

impl fmt::Debug for Goto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.state, self.symbol)
    }
}

/// A completed item: the state holding the reduce item and its rule.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Reduce {
    pub state: StateID,
    pub rule: RuleID,
}

impl fmt::Debug for Reduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.state, self.rule)
    }
}

impl Automaton<'_> {
    /// Record, for every rule completing behind a nonterminal transition,
    /// which (state, nonterminal) pair its reduce item looks back to.
    #[tracing::instrument(skip_all)]
    pub(crate) fn build_lookbacks(&mut self) {
        let grammar = self.grammar();

        for p in 0..self.state_count() {
            let from = StateID::from_index(p);
            let nonterminals: Vec<Symbol> = self.states[p]
                .bundle
                .keys()
                .copied()
                .filter(|&a| grammar.is_nonterminal(a))
                .collect();

            for a in nonterminals {
                for &rule_id in grammar.rules_for(a) {
                    let rule = grammar.rule(rule_id);

                    // follow the rule's right-hand side through the bundle
                    // edges; for an epsilon rule this stays at `from`
                    let mut q = from;
                    for &symbol in &rule.rhs {
                        q = self.transition(q, symbol, rule_id);
                    }

                    assert!(
                        self.states[q.index()]
                            .reduce_position(grammar, rule_id)
                            .is_some(),
                        "internal: state {} has no reduce item for `{}'",
                        q,
                        rule.display(grammar),
                    );

                    tracing::trace!(
                        "({}, {}) lookback ({}, {})",
                        q,
                        rule.display(grammar),
                        from,
                        grammar.spelling(a),
                    );
                    self.lookbacks
                        .entry(Reduce {
                            state: q,
                            rule: rule_id,
                        })
                        .or_default()
                        .insert(Goto { state: from, symbol: a });
                }
            }
        }
    }

    fn transition(&self, from: StateID, symbol: Symbol, rule: RuleID) -> StateID {
        self.states[from.index()]
            .bundle
            .get(&symbol)
            .copied()
            .unwrap_or_else(|| {
                panic!(
                    "internal: state {} has no transition on `{}' while walking `{}'",
                    from,
                    self.grammar().spelling(symbol),
                    self.grammar().rule(rule).display(self.grammar()),
                )
            })
    }

    /// Direct-read sets plus the Reads digraph, propagated by SCC
    /// traversal.
    #[tracing::instrument(skip_all)]
    pub(crate) fn build_reads(&mut self) {
        let grammar = self.grammar();

        // DR(q,A) = the terminals shiftable right after the A transition
        for q in 0..self.state_count() {
            let edges: Vec<(Symbol, StateID)> = self.states[q]
                .bundle
                .iter()
                .map(|(&a, &r)| (a, r))
                .filter(|&(a, _)| grammar.is_nonterminal(a))
                .collect();

            for (a, r) in edges {
                let direct: SymbolSet = self.states[r.index()]
                    .bundle
                    .keys()
                    .copied()
                    .filter(|&t| grammar.is_terminal(t))
                    .collect();
                if direct.is_empty() {
                    continue;
                }
                tracing::trace!(
                    "DR({}, {}) = {}",
                    q,
                    grammar.spelling(a),
                    direct.display(grammar),
                );
                self.states[q]
                    .reads
                    .entry(a)
                    .or_default()
                    .union_with(&direct);
            }
        }

        // (q,A) reads (r,C)  <=>  q --A--> r --C--> and C is nullable
        let mut graph = Digraph::default();
        for q in 0..self.state_count() {
            let from = StateID::from_index(q);
            let edges: Vec<(Symbol, StateID)> = self.states[q]
                .bundle
                .iter()
                .map(|(&a, &r)| (a, r))
                .filter(|&(a, _)| grammar.is_nonterminal(a))
                .collect();

            for (a, r) in edges {
                let nullable_gotos: Vec<Symbol> = self.states[r.index()]
                    .bundle
                    .keys()
                    .copied()
                    .filter(|&c| grammar.is_nonterminal(c) && self.nullables.contains(c))
                    .collect();
                for c in nullable_gotos {
                    let source = graph.node(Goto {
                        state: from,
                        symbol: a,
                    });
                    let target = graph.node(Goto {
                        state: r,
                        symbol: c,
                    });
                    graph.insert_edge(source, target);
                    tracing::trace!(
                        "({}, {}) reads ({}, {})",
                        from,
                        grammar.spelling(a),
                        r,
                        grammar.spelling(c),
                    );
                }
            }
        }

        graph.propagate(&mut self.states, Channel::Reads);
    }

    /// Seed the Follow sets from the Read sets, then close them over the
    /// Includes relation.
    #[tracing::instrument(skip_all)]
    pub(crate) fn build_includes_and_follows(&mut self) {
        for state in &mut self.states {
            state.follows = state.reads.clone();
        }

        let graph = self.includes_digraph();
        graph.propagate(&mut self.states, Channel::Follows);
    }

    // (p,A) includes (p',B)  <=>  B -> βAγ, γ =>* ε, p' --β--> p
    fn includes_digraph(&self) -> Digraph {
        let grammar = self.grammar();
        let mut graph = Digraph::default();

        for pp in 0..self.state_count() {
            let origin = StateID::from_index(pp);
            for (&name, _) in &self.states[pp].bundle {
                if !grammar.is_nonterminal(name) {
                    continue;
                }
                for &rule_id in grammar.rules_for(name) {
                    let rule = grammar.rule(rule_id);

                    let mut p = origin;
                    for (i, &symbol) in rule.rhs.iter().enumerate() {
                        let tail_nullable = rule.rhs[i + 1..]
                            .iter()
                            .all(|&s| self.nullables.contains(s));
                        if grammar.is_nonterminal(symbol) && tail_nullable {
                            let source = graph.node(Goto { state: p, symbol });
                            let target = graph.node(Goto {
                                state: origin,
                                symbol: name,
                            });
                            graph.insert_edge(source, target);
                            tracing::trace!(
                                "({}, {}) includes ({}, {})",
                                p,
                                grammar.spelling(symbol),
                                origin,
                                grammar.spelling(name),
                            );
                        }
                        if i + 1 < rule.rhs.len() {
                            p = self.transition(p, symbol, rule_id);
                        }
                    }
                }
            }
        }

        graph
    }

    /// Union the Follow sets onto the reduce items through the lookback
    /// facts. The kernel items' lookaheads need no separate copy: the
    /// kernel is the closure's prefix and shares its entries.
    #[tracing::instrument(skip_all)]
    pub(crate) fn build_lookaheads(&mut self) {
        let grammar = self.grammar();

        for p in 0..self.state_count() {
            let state = StateID::from_index(p);
            let closure = self.states[p].closure.clone();
            let mut lookaheads = vec![SymbolSet::default(); closure.len()];

            for (i, item) in closure.iter().enumerate() {
                if !item.is_reduce(grammar) {
                    continue;
                }
                let Some(gotos) = self.lookbacks.get(&Reduce {
                    state,
                    rule: item.rule,
                }) else {
                    continue;
                };
                for goto in gotos {
                    if let Some(follows) =
                        self.states[goto.state.index()].follows.get(&goto.symbol)
                    {
                        lookaheads[i].union_with(follows);
                    }
                }
                tracing::trace!(
                    "LA({}, {}) = {}",
                    state,
                    item.display(grammar),
                    lookaheads[i].display(grammar),
                );
            }

            self.states[p].lookaheads = lookaheads;
        }

        // the initial item [$accept ::= . start $end] carries end-of-input,
        // as in the conventional seeding of the initial item
        let start = self.start();
        let position = self.states[start.index()]
            .closure
            .iter()
            .position(|item| item.rule == grammar.goal() && item.dot == 0)
            .expect("internal: goal item missing from the start state");
        self.states[start.index()].lookaheads[position].insert(grammar.end_symbol());
    }

    /// Pick, per state, the reduction with the largest lookahead set as the
    /// fallback action. A heuristic for table compaction, not a validator.
    #[tracing::instrument(skip_all)]
    pub(crate) fn build_default_reduce_actions(&mut self) {
        let grammar = self.grammar();
        for state in &mut self.states {
            state.default_reduce =
                select_default_reduce(grammar, &state.closure, &state.lookaheads);
        }
    }
}

/// The reduce item with the largest lookahead set; ties keep the first in
/// closure order, which is deterministic because the closure is a vector.
fn select_default_reduce(
    g: &Grammar,
    closure: &[Item],
    lookaheads: &[SymbolSet],
) -> Option<RuleID> {
    let mut selected: Option<(RuleID, usize)> = None;
    for (i, item) in closure.iter().enumerate() {
        if !item.is_reduce(g) {
            continue;
        }
        let size = lookaheads.get(i).map_or(0, SymbolSet::len);
        match selected {
            Some((_, best)) if size <= best => {}
            _ => selected = Some((item.rule, size)),
        }
    }
    selected.map(|(rule, _)| rule)
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
    fn left_recursion_propagates_follows() {
        let g = expr_grammar();
        let automaton = Automaton::build(&g);

        let t = g.symbol("T").unwrap();
        let t_rule = g.rules_for(t)[0];
        let plus = g.symbol("plus").unwrap();

        // T -> num reduces in a single merged state, with everything that
        // can follow E as its lookahead
        let (_, state) = automaton
            .states()
            .find(|(_, state)| state.reduce_position(&g, t_rule).is_some())
            .unwrap();
        let position = state.reduce_position(&g, t_rule).unwrap();
        let lookahead = &state.lookaheads[position];
        assert!(lookahead.contains(plus));
        assert!(lookahead.contains(g.end_symbol()));
        assert_eq!(lookahead.len(), 2);
    }

    #[test]
    fn rebuilding_reaches_the_same_fixpoint() {
        let g = expr_grammar();
        let first = Automaton::build(&g);
        let second = Automaton::build(&g);

        for ((_, a), (_, b)) in first.states().zip(second.states()) {
            assert_eq!(a.lookaheads, b.lookaheads);
            assert_eq!(a.follows, b.follows);
            assert_eq!(a.default_reduce, b.default_reduce);
        }
    }

    #[test]
    fn default_reduce_picks_largest_lookahead() {
        let g = Grammar::define(|def| {
            let terminals: Vec<_> = ["t1", "t2", "t3", "t4", "t5"]
                .iter()
                .map(|t| def.terminal(t))
                .collect::<Result<_, _>>()?;
            let x = def.intern("X");
            let y = def.intern("Y");
            let z = def.intern("Z");
            def.rule(x, [])?;
            def.rule(y, [])?;
            def.rule(z, [])?;
            def.rule(x, terminals.clone())?;
            def.start_symbol(x);
            Ok(())
        })
        .unwrap();

        let terminals: Vec<_> = ["t1", "t2", "t3", "t4", "t5"]
            .iter()
            .map(|t| g.symbol(t).unwrap())
            .collect();
        let x = g.symbol("X").unwrap();
        let y = g.symbol("Y").unwrap();
        let z = g.symbol("Z").unwrap();
        let x_rule = g.rules_for(x)[0];
        let y_rule = g.rules_for(y)[0];
        let z_rule = g.rules_for(z)[0];

        let closure = [
            Item { rule: x_rule, dot: 0 },
            Item { rule: y_rule, dot: 0 },
            Item { rule: z_rule, dot: 0 },
        ];
        let sets = |sizes: [usize; 3]| -> Vec<SymbolSet> {
            sizes
                .iter()
                .map(|&n| terminals[..n].iter().copied().collect())
                .collect()
        };

        // {3, 1, 5}: the largest set wins
        assert_eq!(
            select_default_reduce(&g, &closure, &sets([3, 1, 5])),
            Some(z_rule)
        );
        // {4, 4, 1}: ties keep the first found
        assert_eq!(
            select_default_reduce(&g, &closure, &sets([4, 4, 1])),
            Some(x_rule)
        );
    }
}

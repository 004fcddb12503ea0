//! The digraph underlying the Reads and Includes relations, and the
//! SCC-based set propagation running over it.
//!
//! Nodes are (state, nonterminal) pairs kept in an index-stable arena;
//! handles are plain indices, so arena growth never invalidates them.

use super::{lalr::Goto, state::State};
use crate::{
    grammar::{Symbol, SymbolSet},
    types::Map,
};
use std::cmp;

/// Selects which per-state set table a propagation pass merges.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Channel {
    Reads,
    Follows,
}

impl Channel {
    fn of(self, state: &mut State) -> &mut Map<Symbol, SymbolSet> {
        match self {
            Channel::Reads => &mut state.reads,
            Channel::Follows => &mut state.follows,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Digraph {
    nodes: Vec<Node>,
    index: Map<Goto, usize>,
}

#[derive(Debug)]
struct Node {
    data: Goto,
    edges: Vec<usize>,
    root: bool,
}

struct Frame {
    node: usize,
    edge: usize,
    number: usize,
}

impl Digraph {
    /// Intern the node identified by `data`.
    pub(crate) fn node(&mut self, data: Goto) -> usize {
        if let Some(&id) = self.index.get(&data) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            data,
            edges: Vec::new(),
            root: true,
        });
        self.index.insert(data, id);
        id
    }

    /// Add the edge `source -> target`; the target of any edge is no
    /// longer an entry point.
    pub(crate) fn insert_edge(&mut self, source: usize, target: usize) {
        let node = &mut self.nodes[source];
        if !node.edges.contains(&target) {
            node.edges.push(target);
        }
        self.nodes[target].root = false;
    }

    /// Union every node's set into the sets of all nodes that can reach it,
    /// with a Tarjan-style single pass: explicit depth-first numbering,
    /// min-accumulated low links and a member stack that saturates the sets
    /// of a strongly connected component when its root is popped.
    ///
    /// Entry points are visited first, then every remaining node, so
    /// isolated cycles unreachable from any root are still resolved.
    pub(crate) fn propagate(&self, states: &mut [State], channel: Channel) {
        let mut dfn = vec![0usize; self.nodes.len()];
        let mut next_dfn = 0usize;
        let mut scc_stack = Vec::new();
        let mut frames = Vec::new();

        for x in 0..self.nodes.len() {
            if self.nodes[x].root {
                self.visit(x, states, channel, &mut dfn, &mut next_dfn, &mut scc_stack, &mut frames);
            }
        }
        for x in 0..self.nodes.len() {
            self.visit(x, states, channel, &mut dfn, &mut next_dfn, &mut scc_stack, &mut frames);
        }
    }

    /// Iterative depth-first visit; the frame stack replaces call-stack
    /// recursion, which is not bounded for large grammars.
    #[allow(clippy::too_many_arguments)]
    fn visit(
        &self,
        start: usize,
        states: &mut [State],
        channel: Channel,
        dfn: &mut [usize],
        next_dfn: &mut usize,
        scc_stack: &mut Vec<usize>,
        frames: &mut Vec<Frame>,
    ) {
        if dfn[start] != 0 {
            return;
        }
        *next_dfn += 1;
        dfn[start] = *next_dfn;
        scc_stack.push(start);
        frames.push(Frame {
            node: start,
            edge: 0,
            number: *next_dfn,
        });

        while let Some(frame) = frames.last_mut() {
            let x = frame.node;
            let number = frame.number;
            match self.nodes[x].edges.get(frame.edge).copied() {
                Some(y) => {
                    frame.edge += 1;
                    if dfn[y] == 0 {
                        *next_dfn += 1;
                        dfn[y] = *next_dfn;
                        scc_stack.push(y);
                        frames.push(Frame {
                            node: y,
                            edge: 0,
                            number: *next_dfn,
                        });
                    } else {
                        dfn[x] = cmp::min(dfn[x], dfn[y]);
                        self.merge(states, channel, x, y);
                    }
                }
                None => {
                    // every successor of x handled
                    frames.pop();
                    if dfn[x] == number {
                        // x is the root of its component; saturate the
                        // members' sets and retire their numbers
                        while let Some(s) = scc_stack.pop() {
                            dfn[s] = usize::MAX;
                            if s == x {
                                break;
                            }
                            self.merge(states, channel, s, x);
                        }
                    }
                    if let Some(parent) = frames.last() {
                        dfn[parent.node] = cmp::min(dfn[parent.node], dfn[x]);
                        self.merge(states, channel, parent.node, x);
                    }
                }
            }
        }
    }

    // F(dst) <- F(dst) \cup F(src)
    fn merge(&self, states: &mut [State], channel: Channel, dst: usize, src: usize) {
        if dst == src {
            return;
        }
        let dst_data = self.nodes[dst].data;
        let src_data = self.nodes[src].data;

        let Some(added) = channel
            .of(&mut states[src_data.state.index()])
            .get(&src_data.symbol)
            .cloned()
        else {
            return;
        };
        if added.is_empty() {
            return;
        }

        channel
            .of(&mut states[dst_data.state.index()])
            .entry(dst_data.symbol)
            .or_default()
            .union_with(&added);
    }
}

//! Grammar model: interned symbols, rules, terminal/nonterminal
//! classification and the rule-by-left-hand-side index.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// An interned symbol spelling.
///
/// Two symbols with equal spelling always resolve to the same index, so
/// index equality is spelling equality. Symbols are never destroyed while
/// the owning [`Grammar`] is alive.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// The stable small integer identifying this symbol, usable as a table
    /// index by external emitters.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{:03}", self.0)
    }
}

/// Identifier of a production rule, indexing into [`Grammar::rules`].
///
/// Rules are append-only and never mutated, so a `RuleID` stays valid for
/// the lifetime of the grammar.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleID(u32);

impl RuleID {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{:03}", self.0)
    }
}

/// A set of symbols backed by a bit vector over interner indices.
///
/// Iteration yields symbols in ascending index order, which keeps every
/// dump and every set-cardinality tie-break deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    inner: bit_set::BitSet,
}

impl SymbolSet {
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.inner.contains(symbol.index())
    }

    pub fn insert(&mut self, symbol: Symbol) -> bool {
        self.inner.insert(symbol.index())
    }

    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.inner.iter().map(|raw| Symbol(raw as u32))
    }

    // `"{a, b}"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            f.write_str("{")?;
            for (i, symbol) in self.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(g.spelling(symbol))?;
            }
            f.write_str("}")
        })
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(Symbol::index).collect(),
        }
    }
}

/// A production rule: left-hand-side symbol and ordered right-hand side.
/// An empty right-hand side is an epsilon rule.
#[derive(Debug)]
pub struct Rule {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

impl Rule {
    // `"lhs ::= a b c"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ::=", g.spelling(self.lhs))?;
            for &symbol in &self.rhs {
                write!(f, " {}", g.spelling(symbol))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("no start symbol specified")]
    MissingStart,

    #[error("start symbol `{0}' is declared as a terminal")]
    TerminalStart(String),

    #[error("symbol name `{0}' is reserved")]
    ReservedName(String),

    #[error("symbol `{0}' is declared both as a terminal and as a left-hand side")]
    SymbolClassClash(String),
}

/// The grammar consumed by the automaton builder: immutable after
/// construction, borrowed read-only for the lifetime of the automaton.
#[derive(Debug)]
pub struct Grammar {
    names: Set<String>,
    terminals: SymbolSet,
    nonterminals: SymbolSet,
    rules: Vec<Rule>,
    rule_map: Map<Symbol, Vec<RuleID>>,
    start: Symbol,
    goal: RuleID,
    end: Symbol,
    accept: Symbol,
}

impl Grammar {
    /// Define a grammar using the specified function.
    ///
    /// The augmenting rule `$accept ::= <start> $end` is appended exactly
    /// once, after every user rule has been registered.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef::new();
        f(&mut def)?;
        def.end()
    }

    pub fn spelling(&self, symbol: Symbol) -> &str {
        self.names
            .get_index(symbol.index())
            .map(String::as_str)
            .expect("symbol index out of interner range")
    }

    /// Look up an already interned spelling.
    pub fn symbol(&self, spelling: &str) -> Option<Symbol> {
        self.names.get_index_of(spelling).map(|i| Symbol(i as u32))
    }

    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        self.terminals.contains(symbol)
    }

    pub fn is_nonterminal(&self, symbol: Symbol) -> bool {
        self.nonterminals.contains(symbol)
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleID, &Rule)> + '_ {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (RuleID(i as u32), rule))
    }

    /// All rules whose left-hand side is `symbol`, in registration order.
    pub fn rules_for(&self, symbol: Symbol) -> &[RuleID] {
        self.rule_map.get(&symbol).map_or(&[], Vec::as_slice)
    }

    /// The augmenting rule `$accept ::= <start> $end`, seed of the initial
    /// automaton state.
    pub fn goal(&self) -> RuleID {
        self.goal
    }

    pub fn start(&self) -> Symbol {
        self.start
    }

    /// The end-of-input terminal `$end`.
    pub fn end_symbol(&self) -> Symbol {
        self.end
    }

    /// The synthetic goal nonterminal `$accept`.
    pub fn accept_symbol(&self) -> Symbol {
        self.accept
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for symbol in self.terminals.iter() {
            writeln!(f, "{}", self.spelling(symbol))?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for symbol in self.nonterminals.iter() {
            write!(f, "{}", self.spelling(symbol))?;
            if symbol == self.start {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in &self.rules {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

/// The contextual values for building a [`Grammar`].
#[derive(Debug)]
pub struct GrammarDef {
    names: Set<String>,
    terminals: SymbolSet,
    declared_lhs: SymbolSet,
    rules: Vec<Rule>,
    start: Option<Symbol>,
    end: Symbol,
}

impl GrammarDef {
    fn new() -> Self {
        let mut def = Self {
            names: Set::default(),
            terminals: SymbolSet::default(),
            declared_lhs: SymbolSet::default(),
            rules: Vec::new(),
            start: None,
            end: Symbol(0),
        };
        def.end = def.intern("$end");
        def.terminals.insert(def.end);
        def
    }

    /// Map a spelling to its canonical symbol, creating one on first use.
    pub fn intern(&mut self, spelling: &str) -> Symbol {
        let (index, _) = self.names.insert_full(spelling.to_owned());
        Symbol(index as u32)
    }

    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, spelling: &str) -> Result<Symbol, GrammarError> {
        if spelling.starts_with('$') {
            return Err(GrammarError::ReservedName(spelling.to_owned()));
        }
        let symbol = self.intern(spelling);
        if self.declared_lhs.contains(symbol) {
            return Err(GrammarError::SymbolClassClash(spelling.to_owned()));
        }
        self.terminals.insert(symbol);
        Ok(symbol)
    }

    /// Register a production rule. The left-hand side joins the nonterminal
    /// set; right-hand-side symbols may be forward references. Reserved
    /// `$`-prefixed symbols cannot appear as a left-hand side.
    pub fn rule<I>(&mut self, lhs: Symbol, rhs: I) -> Result<RuleID, GrammarError>
    where
        I: IntoIterator<Item = Symbol>,
    {
        let spelling = self
            .names
            .get_index(lhs.index())
            .cloned()
            .unwrap_or_default();
        if spelling.starts_with('$') {
            return Err(GrammarError::ReservedName(spelling));
        }
        if self.terminals.contains(lhs) {
            return Err(GrammarError::SymbolClassClash(spelling));
        }
        let id = RuleID(self.rules.len() as u32);
        self.declared_lhs.insert(lhs);
        self.rules.push(Rule {
            lhs,
            rhs: rhs.into_iter().collect(),
        });
        Ok(id)
    }

    /// Designate the start symbol.
    pub fn start_symbol(&mut self, symbol: Symbol) {
        self.start = Some(symbol);
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        let start = self.start.take().ok_or(GrammarError::MissingStart)?;
        if self.terminals.contains(start) {
            return Err(GrammarError::TerminalStart(
                self.names
                    .get_index(start.index())
                    .cloned()
                    .unwrap_or_default(),
            ));
        }

        // A right-hand-side symbol that is neither a declared terminal nor
        // any rule's left-hand side can never be reached by a closure; this
        // is reported but does not abort construction.
        let mut undefined = SymbolSet::default();
        for rule in &self.rules {
            for &symbol in &rule.rhs {
                if self.terminals.contains(symbol)
                    || self.declared_lhs.contains(symbol)
                    || !undefined.insert(symbol)
                {
                    continue;
                }
                tracing::warn!(
                    "symbol `{}' is not defined",
                    self.names.get_index(symbol.index()).expect("interned"),
                );
            }
        }

        let mut rule_map: Map<Symbol, Vec<RuleID>> = Map::default();
        for (i, rule) in self.rules.iter().enumerate() {
            rule_map.entry(rule.lhs).or_default().push(RuleID(i as u32));
        }

        // Augmenting rule `$accept ::= <start> $end`, added exactly once.
        let accept = self.intern("$accept");
        let goal = RuleID(self.rules.len() as u32);
        self.rules.push(Rule {
            lhs: accept,
            rhs: vec![start, self.end],
        });
        self.declared_lhs.insert(accept);
        rule_map.entry(accept).or_default().push(goal);

        Ok(Grammar {
            names: self.names,
            terminals: self.terminals,
            nonterminals: self.declared_lhs,
            rules: self.rules,
            rule_map,
            start,
            goal,
            end: self.end,
            accept,
        })
    }
}

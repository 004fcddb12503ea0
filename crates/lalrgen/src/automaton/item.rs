//! LR(0) items.

use crate::{
    grammar::{Grammar, RuleID},
    util::display_fn,
};
use std::fmt;

/// A grammar rule paired with a dot position into its right-hand side.
///
/// Items are value types: equal (rule, dot) always means the same item.
/// Dot 0 means nothing consumed; dot == rhs length is a reduce item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub rule: RuleID,
    pub dot: usize,
}

impl Item {
    pub fn is_reduce(&self, g: &Grammar) -> bool {
        self.dot == g.rule(self.rule).rhs.len()
    }

    /// The symbol immediately after the dot, `None` for a reduce item.
    pub fn symbol_after_dot(&self, g: &Grammar) -> Option<crate::grammar::Symbol> {
        g.rule(self.rule).rhs.get(self.dot).copied()
    }

    /// Same rule, dot advanced by one. Must not be called on a reduce item.
    pub fn next(self) -> Item {
        Item {
            rule: self.rule,
            dot: self.dot + 1,
        }
    }

    // `"lhs: a . b c"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{}:", g.spelling(rule.lhs))?;
            for (i, &symbol) in rule.rhs.iter().enumerate() {
                if i == self.dot {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.spelling(symbol))?;
            }
            if self.dot == rule.rhs.len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    #[test]
    fn reduce_and_next() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.intern("S");
            g.rule(s, [a, a])?;
            g.rule(s, [])?;
            g.start_symbol(s);
            Ok(())
        })
        .unwrap();

        let s = grammar.symbol("S").unwrap();
        let [pair, epsilon] = grammar.rules_for(s) else {
            panic!("expected two rules for S");
        };

        let item = Item { rule: *pair, dot: 0 };
        assert!(!item.is_reduce(&grammar));
        assert_eq!(item.symbol_after_dot(&grammar), grammar.symbol("a"));
        let item = item.next().next();
        assert!(item.is_reduce(&grammar));
        assert_eq!(item.symbol_after_dot(&grammar), None);

        // an epsilon rule is a reduce item at dot 0
        let item = Item {
            rule: *epsilon,
            dot: 0,
        };
        assert!(item.is_reduce(&grammar));
    }
}

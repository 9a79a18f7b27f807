//! The filter operator vocabulary.

use std::fmt;

/// Operator is a comparison between a field and (for binary operators) a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    DoesNotContain,
    StartsWith,
    DoesNotStartWith,
    EndsWith,
    DoesNotEndWith,
    MatchesRegex,
    DoesNotMatchRegex,
    ContainsRegex,
    DoesNotContainRegex,
    IsNone,
    IsNotNone,
    IsTrue,
    IsFalse,
}

const OPERATORS: &[(&str, Operator)] = &[
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("<", Operator::Lt),
    ("<=", Operator::Le),
    (">", Operator::Gt),
    (">=", Operator::Ge),
    ("contains", Operator::Contains),
    ("does-not-contain", Operator::DoesNotContain),
    ("starts-with", Operator::StartsWith),
    ("does-not-start-with", Operator::DoesNotStartWith),
    ("ends-with", Operator::EndsWith),
    ("does-not-end-with", Operator::DoesNotEndWith),
    ("matches-regex", Operator::MatchesRegex),
    ("does-not-match-regex", Operator::DoesNotMatchRegex),
    ("contains-regex", Operator::ContainsRegex),
    ("does-not-contain-regex", Operator::DoesNotContainRegex),
    ("is-none", Operator::IsNone),
    ("is-not-none", Operator::IsNotNone),
    ("is-true", Operator::IsTrue),
    ("is-false", Operator::IsFalse),
];

impl Operator {
    pub fn parse(s: &str) -> Option<Operator> {
        OPERATORS.iter().find(|(name, _)| *name == s).map(|(_, op)| *op)
    }

    pub fn as_str(&self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// Unary operators take no value token.
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Operator::IsNone | Operator::IsNotNone | Operator::IsTrue | Operator::IsFalse
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge)
    }

    pub fn is_regex(&self) -> bool {
        matches!(
            self,
            Operator::MatchesRegex
                | Operator::DoesNotMatchRegex
                | Operator::ContainsRegex
                | Operator::DoesNotContainRegex
        )
    }

    /// For a negated operator, returns its positive counterpart.
    pub fn positive(&self) -> Option<Operator> {
        match self {
            Operator::Ne => Some(Operator::Eq),
            Operator::DoesNotContain => Some(Operator::Contains),
            Operator::DoesNotStartWith => Some(Operator::StartsWith),
            Operator::DoesNotEndWith => Some(Operator::EndsWith),
            Operator::DoesNotMatchRegex => Some(Operator::MatchesRegex),
            Operator::DoesNotContainRegex => Some(Operator::ContainsRegex),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operator_round_trips_its_name() {
        for (name, op) in OPERATORS {
            assert_eq!(Operator::parse(name), Some(*op));
            assert_eq!(op.as_str(), *name);
        }
        assert_eq!(Operator::parse("like"), None);
        assert_eq!(Operator::parse("=~"), None);
    }

    #[test]
    fn test_classes() {
        assert!(Operator::IsNone.is_unary());
        assert!(!Operator::Eq.is_unary());
        assert!(Operator::Le.is_numeric());
        assert!(Operator::ContainsRegex.is_regex());
        assert_eq!(Operator::DoesNotEndWith.positive(), Some(Operator::EndsWith));
        assert_eq!(Operator::Contains.positive(), None);
    }
}

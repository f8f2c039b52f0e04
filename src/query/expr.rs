use std::fmt;

use serde::{Deserialize, Serialize};

/// Expression tree for conditions and select items.
///
/// A closed set of node kinds: raw fragments are the leaves, AND/OR groups
/// and function calls are the internal nodes. Every consumer matches
/// exhaustively, so a new node kind forces every walk to take a position on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Raw(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Func { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    pub fn and(parts: Vec<Expr>) -> Self {
        Expr::And(parts)
    }

    pub fn or(parts: Vec<Expr>) -> Self {
        Expr::Or(parts)
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Func { name: name.into(), args }
    }

    /// Merges `other` into this expression as an AND conjunct.
    pub fn and_with(self, other: Expr) -> Self {
        match self {
            Expr::And(mut parts) => {
                parts.push(other);
                Expr::And(parts)
            }
            current => Expr::And(vec![current, other]),
        }
    }

    /// Merges `other` into this expression as an OR disjunct.
    pub fn or_with(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut parts) => {
                parts.push(other);
                Expr::Or(parts)
            }
            current => Expr::Or(vec![current, other]),
        }
    }

    fn fmt_child(child: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match child {
            Expr::And(_) | Expr::Or(_) => write!(f, "({})", child),
            Expr::Raw(_) | Expr::Func { .. } => write!(f, "{}", child),
        }
    }

    fn fmt_group(parts: &[Expr], separator: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", separator)?;
            }
            Self::fmt_child(part, f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Raw(text) => write!(f, "{}", text),
            Expr::And(parts) => Self::fmt_group(parts, " AND ", f),
            Expr::Or(parts) => Self::fmt_group(parts, " OR ", f),
            Expr::Func { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Raw(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Raw(value)
    }
}

//! Logical expressions over transition rules.
//!
//! A [`LogicalExpression`] ANDs together one or more
//! [`Rule`](crate::rule::Rule)s and keeps an index from attribute key to
//! the rules watching it, so an incoming update only touches the rules
//! that care about it.

mod logical;

pub use logical::LogicalExpression;

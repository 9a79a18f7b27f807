//! Filter module - the boolean query language used by the gathered verb.
//!
//! An expression combines field predicates such as `name starts-with "web-"`
//! or `tags contains-regex "^prod"` with `and`/`or`/`not` and parentheses.

mod expression;
mod operator;
mod token;


pub use expression::*;
pub use operator::Operator;
pub use token::{tokenize, Token};

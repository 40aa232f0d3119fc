//! Restricted formula language for deriving Strata fields.
//!
//! A formula is arithmetic over `#label#` placeholders, numeric literals
//! and calls into a [`FunctionTable`]:
//!
//! ```text
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-" unary | power
//! power   := atom (("^" | "**") unary)?
//! atom    := number | "#" label "#" | name "(" [expr ("," expr)*] ")" | "(" expr ")"
//! ```
//!
//! Nothing else is accepted: there are no variables, attribute accesses or
//! host-language escapes. [`Formula::validate`] checks a formula against a
//! function table once; [`Formula::evaluate`] then runs it against any
//! number of [`Bindings`], one per group.
//!
//! # Examples
//!
//! ```
//! use strata_core::Dataset;
//! use strata_expr::{Bindings, Formula, FunctionTable};
//!
//! let table = FunctionTable::new();
//! let formula = Formula::validate("2 * #a# + abs(#b#)", &table).unwrap();
//!
//! let mut bindings = Bindings::new();
//! bindings.insert("a".into(), Dataset::from_float(&[2], vec![1.0, 2.0]).unwrap());
//! bindings.insert("b".into(), Dataset::from_float(&[2], vec![-3.0, 4.0]).unwrap());
//!
//! let out = formula.evaluate(&table, &bindings).unwrap();
//! assert_eq!(out.as_float().unwrap(), &[5.0, 8.0]);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod ast;
pub mod broadcast;
pub mod eval;
pub mod functions;
pub mod parse;
pub mod token;

pub use ast::{BinOp, Expr};
pub use eval::{Bindings, Formula};
pub use functions::{Function, FunctionTable};

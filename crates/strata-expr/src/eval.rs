//! Validated formulas and their evaluation.

use indexmap::IndexMap;
use strata_core::{Dataset, ExprError};

use crate::ast::{BinOp, Expr};
use crate::broadcast::{map, zip};
use crate::functions::FunctionTable;
use crate::parse::parse;

/// Datasets bound to placeholder labels for one evaluation.
pub type Bindings = IndexMap<String, Dataset>;

/// A formula that has passed validation against a function table.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parse and validate `source` against `table`.
    ///
    /// A formula is accepted only if it parses, every function it calls
    /// is in `table`, and it either references at least one `#label#` or
    /// is itself a call to a function in `table`.
    pub fn validate(source: &str, table: &FunctionTable) -> Result<Self, ExprError> {
        let expr = parse(source)?;
        if let Some(name) = expr.calls().into_iter().find(|n| !table.contains(n)) {
            return Err(ExprError::UnknownFunction {
                name: name.to_string(),
            });
        }
        let is_call = matches!(expr, Expr::Call { .. });
        if expr.placeholders().is_empty() && !is_call {
            return Err(ExprError::Malformed {
                formula: source.to_string(),
                reason: "no '#label#' placeholder and not a function call".into(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The formula text as given.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Distinct placeholder labels in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.expr.placeholders()
    }

    /// Evaluate against one group's bindings.
    ///
    /// Every placeholder must be bound; a missing one is
    /// [`ExprError::Unbound`].
    pub fn evaluate(&self, table: &FunctionTable, bindings: &Bindings) -> Result<Dataset, ExprError> {
        eval(&self.expr, table, bindings)
    }
}

fn eval(expr: &Expr, table: &FunctionTable, bindings: &Bindings) -> Result<Dataset, ExprError> {
    match expr {
        Expr::Number(v) => Ok(Dataset::scalar(*v)),
        Expr::Field(label) => bindings
            .get(label)
            .cloned()
            .ok_or_else(|| ExprError::Unbound {
                label: label.clone(),
            }),
        Expr::Neg(inner) => map(&eval(inner, table, bindings)?, |x| -x),
        Expr::Binary { op, lhs, rhs } => {
            let a = eval(lhs, table, bindings)?;
            let b = eval(rhs, table, bindings)?;
            let op: BinOp = *op;
            zip(&a, &b, |x, y| op.apply(x, y))
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|a| eval(a, table, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            table.call(name, &args)
        }
    }
}

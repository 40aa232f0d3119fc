//! Named functions callable from formulas.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use strata_core::{Dataset, ExprError};

use crate::broadcast::{map, zip};

/// A pure function over datasets.
///
/// Functions receive their evaluated arguments, attributes included, and
/// must not depend on anything else.
pub type Function = Arc<dyn Fn(&[Dataset]) -> Result<Dataset, ExprError> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    function: Function,
    builtin: bool,
}

/// Name → function lookup consulted by the evaluator.
///
/// A new table holds the elementwise built-ins (`abs`, `sqrt`, `exp`,
/// `ln`, `log10`, `sin`, `cos`, `tan`, `arcsin`, `arccos`, `arctan`,
/// `floor`, `ceil`, `sign`, `min`, `max`). Further functions are added
/// with [`register`](Self::register); built-in names cannot be replaced.
///
/// Tables are plain values. Callers build one per call and pass it to
/// the evaluator explicitly; nothing is registered process-wide.
#[derive(Clone)]
pub struct FunctionTable {
    entries: IndexMap<String, Entry>,
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionTable {
    /// A table holding only the built-ins.
    pub fn new() -> Self {
        let mut entries = IndexMap::new();
        let unary: [(&str, fn(f64) -> f64); 14] = [
            ("abs", f64::abs),
            ("sqrt", f64::sqrt),
            ("exp", f64::exp),
            ("ln", f64::ln),
            ("log10", f64::log10),
            ("sin", f64::sin),
            ("cos", f64::cos),
            ("tan", f64::tan),
            ("arcsin", f64::asin),
            ("arccos", f64::acos),
            ("arctan", f64::atan),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
            ("sign", sign),
        ];
        for (name, f) in unary {
            let function: Function = Arc::new(move |args: &[Dataset]| {
                let [x] = args else {
                    return Err(arity(name, 1, args.len()));
                };
                map(x, f)
            });
            entries.insert(name.to_string(), Entry { function, builtin: true });
        }
        let binary: [(&str, fn(f64, f64) -> f64); 2] = [("min", f64::min), ("max", f64::max)];
        for (name, f) in binary {
            let function: Function = Arc::new(move |args: &[Dataset]| {
                let [a, b] = args else {
                    return Err(arity(name, 2, args.len()));
                };
                zip(a, b, f)
            });
            entries.insert(name.to_string(), Entry { function, builtin: true });
        }
        Self { entries }
    }

    /// Add a function under `name`.
    ///
    /// Re-registering a non-built-in name replaces it. Built-in names are
    /// rejected with [`ExprError::ReservedName`].
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> Result<(), ExprError>
    where
        F: Fn(&[Dataset]) -> Result<Dataset, ExprError> + Send + Sync + 'static,
    {
        self.insert(name.into(), Arc::new(function))
    }

    /// Add an already shared function under `name`.
    pub fn insert(&mut self, name: String, function: Function) -> Result<(), ExprError> {
        if self.is_builtin(&name) {
            return Err(ExprError::ReservedName { name });
        }
        if !valid_name(&name) {
            return Err(ExprError::Malformed {
                formula: name,
                reason: "function names are identifiers".into(),
            });
        }
        self.entries.insert(
            name,
            Entry {
                function,
                builtin: false,
            },
        );
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Result<Self, ExprError>
    where
        F: Fn(&[Dataset]) -> Result<Dataset, ExprError> + Send + Sync + 'static,
    {
        self.register(name, function)?;
        Ok(self)
    }

    /// Look up a function.
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.entries.get(name).map(|e| &e.function)
    }

    /// Returns `true` if `name` is callable.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns `true` if `name` is a built-in.
    pub fn is_builtin(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.builtin)
    }

    /// Names of the registered (non-built-in) functions.
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.builtin)
            .map(|(name, _)| name.as_str())
    }

    /// Call `name` with `args`.
    pub fn call(&self, name: &str, args: &[Dataset]) -> Result<Dataset, ExprError> {
        let function = self.get(name).ok_or_else(|| ExprError::UnknownFunction {
            name: name.to_string(),
        })?;
        function(args)
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("functions", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}

fn arity(function: &str, expected: usize, found: usize) -> ExprError {
    ExprError::Arity {
        function: function.to_string(),
        expected,
        found,
    }
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

//! # Weight Laws
//!
//! A weight law is a user-supplied scalar expression bound to a
//! (start-polygon-name, end-polygon-name) pair. When present it replaces
//! the default linear interpolation of the pair's declared weights; absent
//! pairs fall back to `w0 + t·(w1 - w0)`.
//!
//! Laws are compiled once at registration (see [`WeightLaw::compile`]) and
//! evaluated per station against a read-only [`LawScope`]. Evaluation is
//! deterministic: identical (expression, z, lookup-file contents) always
//! produce identical output - there is no randomness and no mutable state
//! beyond the field's load-once lookup cache.
//!
//! A finite-result check runs after every evaluation; NaN or infinity is
//! the hard `NumericInvalid` error, never a silently clamped value.

mod expr;
mod lookup;

pub use expr::LawScope;
pub use lookup::{LookupCache, LookupTable};

use serde::{Deserialize, Serialize};

use crate::errors::{FieldError, FieldResult};

/// Serializable weight-law binding record, as consumed from input files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawBinding {
    /// Polygon name in the start anchor
    pub start: String,
    /// Polygon name in the end anchor
    pub end: String,
    /// Expression source text
    pub expression: String,
}

/// A compiled weight-law expression.
#[derive(Debug, Clone)]
pub struct WeightLaw {
    source: String,
    root: expr::Expr,
}

impl WeightLaw {
    /// Tokenize and parse the expression. Sandbox violations (identifiers
    /// outside the allow-list) and syntax errors are rejected here, before
    /// the law can ever run.
    pub fn compile(source: impl Into<String>) -> FieldResult<Self> {
        let source = source.into();
        let root = expr::compile(&source)?;
        Ok(WeightLaw { source, root })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate at the scope's station. The result must be a finite real
    /// number.
    pub fn evaluate(&self, scope: &LawScope) -> FieldResult<f64> {
        let value = self.root.eval(scope)?;
        if !value.is_finite() {
            return Err(FieldError::NumericInvalid {
                expression: self.source.clone(),
                z: scope.z,
                value: value.to_string(),
            });
        }
        Ok(value)
    }
}

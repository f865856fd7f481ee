//! Resolved queries and their parameter descriptors.

use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    /// Input parameter.
    #[default]
    In,
    /// Output parameter of a callable statement.
    Out,
    /// Input and output parameter.
    InOut,
}

impl ParameterMode {
    /// Whether a value must be supplied for this parameter.
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::Out)
    }

    /// Get the mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
        }
    }
}

impl FromStr for ParameterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "INOUT" | "IN_OUT" => Ok(Self::InOut),
            other => Err(format!("unknown parameter mode '{}'", other)),
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One positional parameter of a resolved query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// The binding path as written in the placeholder, after iteration
    /// aliases were applied.
    pub expression: SmolStr,
    /// Declared or inferred value type.
    pub value_type: ValueType,
    /// Declared database type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<SmolStr>,
    /// Declared numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<u32>,
    /// Parameter direction.
    #[serde(default)]
    pub mode: ParameterMode,
    /// The resolved value.
    pub value: Value,
}

impl ParameterDescriptor {
    /// Create an `IN` descriptor with the type inferred from the value.
    pub fn new(expression: impl Into<SmolStr>, value: Value) -> Self {
        Self {
            expression: expression.into(),
            value_type: value.value_type(),
            sql_type: None,
            numeric_scale: None,
            mode: ParameterMode::In,
            value,
        }
    }
}

/// Final output of template resolution.
///
/// `text` contains one positional marker per entry of `parameters`, in the
/// same left-to-right order. Values must be bound in exactly that order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedQuery {
    text: String,
    parameters: Vec<ParameterDescriptor>,
    #[serde(default)]
    extra_bindings: IndexMap<String, Value>,
}

impl ResolvedQuery {
    /// Create a resolved query.
    pub fn new(
        text: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        extra_bindings: IndexMap<String, Value>,
    ) -> Self {
        Self {
            text: text.into(),
            parameters,
            extra_bindings,
        }
    }

    /// Query text with positional markers.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parameter descriptors in binding order.
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Bindings captured during resolution, including iteration aliases.
    pub fn extra_bindings(&self) -> &IndexMap<String, Value> {
        &self.extra_bindings
    }

    /// Look up a captured binding.
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.extra_bindings.get(name)
    }

    /// The parameter values in binding order.
    pub fn values(&self) -> Vec<Value> {
        self.parameters.iter().map(|p| p.value.clone()).collect()
    }

    /// Parameter expressions in binding order.
    pub fn expressions(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.expression.as_str()).collect()
    }

    /// Replace the query text, keeping parameters and bindings.
    ///
    /// The new text must carry the same number of markers.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Split into text, parameters and bindings.
    pub fn into_parts(self) -> (String, Vec<ParameterDescriptor>, IndexMap<String, Value>) {
        (self.text, self.parameters, self.extra_bindings)
    }
}

impl fmt::Display for ResolvedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

//! Per-resolution evaluation state.

use super::expr::Scope;
use crate::config::TemplateConfig;
use crate::error::MapperResult;
use crate::value::{PathResolvable, Value, path_segments};
use indexmap::IndexMap;
use std::mem;

/// Binding name of the parameter object itself.
pub const PARAMETER_BINDING: &str = "_parameter";

/// Binding name of the configured database identifier.
pub const DATABASE_ID_BINDING: &str = "_databaseId";

/// Named values collected during resolution.
pub type Bindings = IndexMap<String, Value>;

/// Resolve `path` against bindings first, then the parameter object.
///
/// The first path segment picks the root value; remaining segments navigate
/// into it. `_parameter` names the parameter object as a whole.
pub fn resolve_binding_path(
    bindings: &Bindings,
    parameter: &dyn PathResolvable,
    path: &str,
) -> Option<Value> {
    let mut segments = path_segments(path);
    let head = segments.next()?;

    let root = match bindings.get(head) {
        Some(value) => value.clone(),
        None if head == PARAMETER_BINDING => parameter.as_value()?,
        None => parameter.field(head)?,
    };

    segments.try_fold(root, |current, segment| current.get(segment))
}

#[derive(Debug)]
struct Frame {
    number: usize,
    saved: Vec<(String, Option<Value>)>,
    aliases: Vec<(String, String)>,
}

/// Mutable state for one template resolution.
///
/// Holds the text produced so far, the binding environment and the counter
/// used to name iteration aliases. A context lives for a single resolution
/// and is never shared.
pub struct DynamicContext<'a> {
    parameter: &'a dyn PathResolvable,
    config: &'a TemplateConfig,
    bindings: Bindings,
    scopes: Vec<Frame>,
    buffer: String,
    unique: usize,
}

impl<'a> DynamicContext<'a> {
    /// Create a fresh context for a parameter object.
    pub fn new(parameter: &'a dyn PathResolvable, config: &'a TemplateConfig) -> Self {
        let mut bindings = Bindings::new();
        if let Some(id) = &config.database_id {
            bindings.insert(DATABASE_ID_BINDING.to_string(), Value::String(id.clone()));
        }
        Self {
            parameter,
            config,
            bindings,
            scopes: Vec::new(),
            buffer: String::new(),
            unique: 0,
        }
    }

    /// The parameter object.
    pub fn parameter(&self) -> &'a dyn PathResolvable {
        self.parameter
    }

    /// The template configuration.
    pub fn config(&self) -> &'a TemplateConfig {
        self.config
    }

    /// Current bindings.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Text produced so far.
    pub fn sql(&self) -> &str {
        &self.buffer
    }

    /// Append a text fragment.
    ///
    /// Whitespace-only fragments are dropped and a single space separates
    /// fragments that would otherwise run together.
    pub fn append_sql(&mut self, fragment: &str) {
        if fragment.trim().is_empty() {
            return;
        }
        let needs_space = self.buffer.chars().last().is_some_and(|c| !c.is_whitespace())
            && !fragment.starts_with(char::is_whitespace);
        if needs_space {
            self.buffer.push(' ');
        }
        self.buffer.push_str(fragment);
    }

    /// Run `f` against an empty buffer and return what it produced.
    ///
    /// The outer buffer is restored afterwards, also on failure.
    pub fn capture<F>(&mut self, f: F) -> MapperResult<String>
    where
        F: FnOnce(&mut Self) -> MapperResult<()>,
    {
        let outer = mem::take(&mut self.buffer);
        let result = f(self);
        let inner = mem::replace(&mut self.buffer, outer);
        result.map(|_| inner)
    }

    /// Bind a value for the rest of the resolution.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Bind a value in the innermost scope.
    ///
    /// The previous value is restored when the scope is popped. Without an
    /// open scope this behaves like [`bind`](Self::bind).
    pub fn bind_scoped(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let previous = self.bindings.insert(name.clone(), value);
        if let Some(frame) = self.scopes.last_mut() {
            if !frame.saved.iter().any(|(saved, _)| *saved == name) {
                frame.saved.push((name, previous));
            }
        }
    }

    /// Bind a value in the innermost scope and under the scope's unique
    /// alias.
    ///
    /// The alias binding outlives the scope; [`pop_scope`](Self::pop_scope)
    /// reports it so references made inside the scope can be pointed at it.
    /// Without an open scope this behaves like [`bind`](Self::bind).
    pub fn bind_aliased(&mut self, name: &str, value: Value) {
        let Some(frame) = self.scopes.last_mut() else {
            self.bind(name, value);
            return;
        };
        let alias = format!("{}{}_{}", self.config.iteration_prefix, name, frame.number);
        frame.aliases.retain(|(existing, _)| existing != name);
        frame.aliases.push((name.to_string(), alias.clone()));

        self.bindings.insert(alias, value.clone());
        self.bind_scoped(name, value);
    }

    /// Open a binding scope and return its unique number.
    pub fn push_scope(&mut self) -> usize {
        let number = self.unique_number();
        self.scopes.push(Frame {
            number,
            saved: Vec::new(),
            aliases: Vec::new(),
        });
        number
    }

    /// Close the innermost scope, restoring shadowed bindings.
    ///
    /// Returns the `(name, alias)` pairs bound with
    /// [`bind_aliased`](Self::bind_aliased) in that scope.
    pub fn pop_scope(&mut self) -> Vec<(String, String)> {
        let Some(frame) = self.scopes.pop() else {
            return Vec::new();
        };
        for (name, previous) in frame.saved.into_iter().rev() {
            match previous {
                Some(value) => {
                    self.bindings.insert(name, value);
                }
                None => {
                    self.bindings.shift_remove(&name);
                }
            }
        }
        frame.aliases
    }

    /// Allocate the next unique number.
    pub fn unique_number(&mut self) -> usize {
        let n = self.unique;
        self.unique += 1;
        n
    }

    /// Finish the resolution, returning the text and bindings.
    pub fn into_parts(self) -> (String, Bindings) {
        (self.buffer, self.bindings)
    }
}

impl Scope for DynamicContext<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        resolve_binding_path(&self.bindings, self.parameter, path)
    }
}

impl std::fmt::Debug for DynamicContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicContext")
            .field("parameter", &self.parameter)
            .field("bindings", &self.bindings)
            .field("sql", &self.buffer)
            .field("unique", &self.unique)
            .finish()
    }
}

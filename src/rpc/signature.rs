//! Explicit argument descriptors for keyword-style handlers.

use serde_json::{Map, Value};

use crate::error::BindError;

/// Declared arguments of one handler: required names plus optional names
/// with defaults.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    required: Vec<String>,
    optional: Vec<(String, Value)>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.optional.push((name.into(), default.into()));
        self
    }

    fn declares(&self, name: &str) -> bool {
        self.required.iter().any(|n| n == name) || self.optional.iter().any(|(n, _)| n == name)
    }

    /// Defaults, overlaid with `supplied`.
    ///
    /// Undeclared names and unbound required names are rejected; nothing of
    /// the handler runs in that case.
    pub fn bind(&self, supplied: Map<String, Value>) -> Result<Map<String, Value>, BindError> {
        let mut bound: Map<String, Value> = self.optional.iter().cloned().collect();
        for (name, value) in supplied {
            if !self.declares(&name) {
                return Err(BindError::UnknownArgument(name));
            }
            bound.insert(name, value);
        }
        if let Some(missing) = self.required.iter().find(|n| !bound.contains_key(n.as_str())) {
            return Err(BindError::MissingArgument(missing.clone()));
        }
        Ok(bound)
    }

    /// Parse a request payload and bind it. An absent or empty payload means
    /// no arguments.
    pub fn bind_payload(&self, payload: Option<&[u8]>) -> Result<Map<String, Value>, BindError> {
        let supplied = match payload {
            None | Some([]) => Map::new(),
            Some(bytes) => match serde_json::from_slice::<Value>(bytes) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(BindError::NotAnObject),
                Err(e) => return Err(BindError::InvalidJson(e.to_string())),
            },
        };
        self.bind(supplied)
    }
}

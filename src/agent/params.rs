//! Bounded per-agent extension parameters

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::MAX_EXTENSION_PARAMS;
use crate::core::error::{PursuitError, Result};

/// Scalar value of a team-specific parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Extension map handed to strategies
///
/// Holds at most `MAX_EXTENSION_PARAMS` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtensionParams {
    values: BTreeMap<String, ParamValue>,
}

impl ExtensionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, ParamValue>) -> Result<Self> {
        if values.len() > MAX_EXTENSION_PARAMS {
            return Err(PursuitError::InvalidConfig(format!(
                "{} extension params exceeds limit of {}",
                values.len(),
                MAX_EXTENSION_PARAMS
            )));
        }
        Ok(Self { values })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) -> Result<()> {
        let key = key.into();
        if !self.values.contains_key(&key) && self.values.len() >= MAX_EXTENSION_PARAMS {
            return Err(PursuitError::InvalidConfig(format!(
                "cannot add '{}': extension params full",
                key
            )));
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Numeric lookup; integers widen to f64
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Argument values and parameter sets
//!
//! A `ParameterSet` is the ordered argument bundle handed to a fixture
//! constructor or a test method. Sets are immutable once built and shared
//! through cheap handle clones.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by typed parameter access
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("Missing argument at position {0}")]
    Missing(usize),

    #[error("Argument {index} is {actual}, expected {expected}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

/// A single argument value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    List(Vec<Param>),
}

impl Param {
    /// Runtime type name used in unique test names
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::Null => "null",
            Param::Bool(_) => "bool",
            Param::Int(_) => "i64",
            Param::UInt(_) => "u64",
            Param::Float(_) => "f64",
            Param::Char(_) => "char",
            Param::Str(_) => "String",
            Param::List(_) => "Vec<Param>",
        }
    }

    /// Stable hash of the value.
    ///
    /// Uses SipHash with fixed keys so the same value hashes identically on
    /// every run of the same build.
    pub fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// `<type>#<hash>` component of a unique name
    pub fn unique_component(&self) -> String {
        format!("{}#{}", self.type_name(), self.identity_hash())
    }
}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name().hash(state);
        match self {
            Param::Null => {}
            Param::Bool(v) => v.hash(state),
            Param::Int(v) => v.hash(state),
            Param::UInt(v) => v.hash(state),
            Param::Float(v) => v.to_bits().hash(state),
            Param::Char(v) => v.hash(state),
            Param::Str(v) => v.hash(state),
            Param::List(items) => {
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Null => write!(f, "null"),
            Param::Bool(v) => write!(f, "{v}"),
            Param::Int(v) => write!(f, "{v}"),
            Param::UInt(v) => write!(f, "{v}"),
            Param::Float(v) => write!(f, "{v}"),
            Param::Char(v) => write!(f, "{v}"),
            Param::Str(v) => write!(f, "{v}"),
            Param::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(v.into())
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<u64> for Param {
    fn from(v: u64) -> Self {
        Param::UInt(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<char> for Param {
    fn from(v: char) -> Self {
        Param::Char(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Str(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Str(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Param::Null)
    }
}

/// Ordered, immutable argument bundle.
///
/// Cloning (or `retain`) hands out another handle to the same values; the
/// values are released when the last handle is dropped.
#[derive(Clone, Debug, Default)]
pub struct ParameterSet {
    values: Arc<[Param]>,
}

impl ParameterSet {
    pub fn new<I, P>(values: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Empty set for zero-argument calls
    pub fn empty() -> Self {
        Self::default()
    }

    /// Take another handle on the same values
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Number of live handles sharing these values
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Param] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Result<&Param, ParamError> {
        self.values.get(index).ok_or(ParamError::Missing(index))
    }

    pub fn bool(&self, index: usize) -> Result<bool, ParamError> {
        match self.get(index)? {
            Param::Bool(v) => Ok(*v),
            other => Err(mismatch(index, "bool", other)),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64, ParamError> {
        match self.get(index)? {
            Param::Int(v) => Ok(*v),
            other => Err(mismatch(index, "i64", other)),
        }
    }

    pub fn uint(&self, index: usize) -> Result<u64, ParamError> {
        match self.get(index)? {
            Param::UInt(v) => Ok(*v),
            other => Err(mismatch(index, "u64", other)),
        }
    }

    pub fn float(&self, index: usize) -> Result<f64, ParamError> {
        match self.get(index)? {
            Param::Float(v) => Ok(*v),
            Param::Int(v) => Ok(*v as f64),
            other => Err(mismatch(index, "f64", other)),
        }
    }

    pub fn str(&self, index: usize) -> Result<&str, ParamError> {
        match self.get(index)? {
            Param::Str(v) => Ok(v),
            other => Err(mismatch(index, "String", other)),
        }
    }

    /// String argument that may be `Param::Null`
    pub fn opt_str(&self, index: usize) -> Result<Option<&str>, ParamError> {
        match self.get(index)? {
            Param::Null => Ok(None),
            Param::Str(v) => Ok(Some(v)),
            other => Err(mismatch(index, "String", other)),
        }
    }

    /// `<type>#<hash>` components joined with commas
    pub fn unique_list(&self) -> String {
        self.values
            .iter()
            .map(Param::unique_component)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Display renderings joined with commas
    pub fn display_list(&self) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn mismatch(index: usize, expected: &'static str, actual: &Param) -> ParamError {
    ParamError::TypeMismatch {
        index,
        expected,
        actual: actual.type_name(),
    }
}

impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<P: Into<Param>> FromIterator<P> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

//! MPlayer property types and the casts that turn reply text into values.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CastError {
  #[error("{0} is not a valid mplayer data type")]
  UnknownType(String),
  #[error("Invalid {kind} literal: {literal:?}")]
  InvalidLiteral { kind: PropertyType, literal: String },
}

/// Conversion from protocol text to a typed value.
pub type Cast = fn(&str) -> Result<PropertyValue, CastError>;

/// Property types as named in `-list-properties` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
  Flag,
  Integer,
  Position,
  Float,
  Time,
  String,
  StringList,
}

impl PropertyType {
  /// Protocol spelling of the type.
  pub fn protocol_name(self) -> &'static str {
    match self {
      PropertyType::Flag => "Flag",
      PropertyType::Integer => "Integer",
      PropertyType::Position => "Position",
      PropertyType::Float => "Float",
      PropertyType::Time => "Time",
      PropertyType::String => "String",
      PropertyType::StringList => "String list",
    }
  }

  /// Whether values of this type have an order that bounds can constrain.
  pub fn is_numeric(self) -> bool {
    matches!(
      self,
      PropertyType::Integer | PropertyType::Position | PropertyType::Float | PropertyType::Time
    )
  }

  pub fn cast(self) -> Cast {
    match self {
      PropertyType::Flag => cast_flag,
      PropertyType::Integer | PropertyType::Position => cast_integer,
      PropertyType::Float | PropertyType::Time => cast_float,
      PropertyType::String => cast_string,
      PropertyType::StringList => cast_string_list,
    }
  }
}

impl fmt::Display for PropertyType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.protocol_name())
  }
}

impl FromStr for PropertyType {
  type Err = CastError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Flag" => Ok(PropertyType::Flag),
      "Integer" => Ok(PropertyType::Integer),
      "Position" => Ok(PropertyType::Position),
      "Float" => Ok(PropertyType::Float),
      "Time" => Ok(PropertyType::Time),
      "String" => Ok(PropertyType::String),
      "String list" | "StringList" => Ok(PropertyType::StringList),
      other => Err(CastError::UnknownType(other.to_string())),
    }
  }
}

/// Look up the cast for a protocol type name.
pub fn cast_for(type_name: &str) -> Result<Cast, CastError> {
  type_name.parse::<PropertyType>().map(PropertyType::cast)
}

fn cast_flag(raw: &str) -> Result<PropertyValue, CastError> {
  Ok(PropertyValue::Flag(raw != "no"))
}

fn cast_integer(raw: &str) -> Result<PropertyValue, CastError> {
  raw
    .trim()
    .parse::<i64>()
    .map(PropertyValue::Integer)
    .map_err(|_| CastError::InvalidLiteral {
      kind: PropertyType::Integer,
      literal: raw.to_string(),
    })
}

fn cast_float(raw: &str) -> Result<PropertyValue, CastError> {
  raw
    .trim()
    .parse::<f64>()
    .map(PropertyValue::Float)
    .map_err(|_| CastError::InvalidLiteral {
      kind: PropertyType::Float,
      literal: raw.to_string(),
    })
}

fn cast_string(raw: &str) -> Result<PropertyValue, CastError> {
  Ok(PropertyValue::String(raw.to_string()))
}

fn cast_string_list(raw: &str) -> Result<PropertyValue, CastError> {
  Ok(PropertyValue::StringList(raw.to_string()))
}

/// Typed property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
  Flag(bool),
  Integer(i64),
  Float(f64),
  String(String),
  /// Undecoded string-list text, see [`PropertyValue::pairs`].
  StringList(String),
}

impl PropertyValue {
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      PropertyValue::Flag(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      PropertyValue::Integer(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      PropertyValue::Integer(n) => Some(*n as f64),
      PropertyValue::Float(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      PropertyValue::String(s) | PropertyValue::StringList(s) => Some(s),
      _ => None,
    }
  }

  /// Read a string list as `key,value,key,value` pairs (the metadata layout).
  /// A trailing key without a value is dropped.
  pub fn pairs(&self) -> Vec<(&str, &str)> {
    let PropertyValue::StringList(raw) = self else {
      return Vec::new();
    };
    if raw.is_empty() {
      return Vec::new();
    }
    let items: Vec<&str> = raw.split(',').collect();
    items
      .chunks_exact(2)
      .map(|pair| (pair[0], pair[1]))
      .collect()
  }

  /// Whether this value can be stored in a property of type `kind`.
  pub fn fits(&self, kind: PropertyType) -> bool {
    match (self, kind) {
      (PropertyValue::Flag(_), PropertyType::Flag) => true,
      (PropertyValue::Integer(_), k) if k.is_numeric() => true,
      (PropertyValue::Float(_), PropertyType::Float | PropertyType::Time) => true,
      (PropertyValue::String(_), PropertyType::String | PropertyType::StringList) => true,
      (PropertyValue::StringList(_), PropertyType::StringList) => true,
      _ => false,
    }
  }
}

impl PartialOrd for PropertyValue {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    match (self, other) {
      (PropertyValue::Integer(a), PropertyValue::Integer(b)) => a.partial_cmp(b),
      (PropertyValue::Flag(a), PropertyValue::Flag(b)) => a.partial_cmp(b),
      (PropertyValue::String(a), PropertyValue::String(b)) => a.partial_cmp(b),
      (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
  }
}

impl fmt::Display for PropertyValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PropertyValue::Flag(true) => f.write_str("yes"),
      PropertyValue::Flag(false) => f.write_str("no"),
      PropertyValue::Integer(n) => write!(f, "{}", n),
      PropertyValue::Float(n) => write!(f, "{}", n),
      PropertyValue::String(s) | PropertyValue::StringList(s) => f.write_str(s),
    }
  }
}

impl From<bool> for PropertyValue {
  fn from(value: bool) -> Self {
    PropertyValue::Flag(value)
  }
}

impl From<i64> for PropertyValue {
  fn from(value: i64) -> Self {
    PropertyValue::Integer(value)
  }
}

impl From<i32> for PropertyValue {
  fn from(value: i32) -> Self {
    PropertyValue::Integer(value as i64)
  }
}

impl From<f64> for PropertyValue {
  fn from(value: f64) -> Self {
    PropertyValue::Float(value)
  }
}

impl From<&str> for PropertyValue {
  fn from(value: &str) -> Self {
    PropertyValue::String(value.to_string())
  }
}

impl From<String> for PropertyValue {
  fn from(value: String) -> Self {
    PropertyValue::String(value)
  }
}

//! Typed getters and setters built from discovered descriptors.
//!
//! Each accessor captures its property's name, type and bounds when it is built, so a
//! call never goes back to the descriptor list.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use super::channel::{ChannelError, CommandChannel};
use super::discovery::PropertyDescriptor;
use super::protocol::PendingCommand;
use super::types::{CastError, PropertyType, PropertyValue};

/// Which declared bound a value violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
  Min,
  Max,
}

impl fmt::Display for Bound {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Bound::Min => f.write_str("at least"),
      Bound::Max => f.write_str("at most"),
    }
  }
}

#[derive(Error, Debug)]
pub enum AccessError {
  #[error("{property}: value must be {bound} {limit}, got {value}")]
  ValueOutOfRange {
    property: String,
    bound: Bound,
    limit: PropertyValue,
    value: PropertyValue,
  },
  #[error("{property} expects a {expected} value, got {value:?}")]
  TypeMismatch {
    property: String,
    expected: PropertyType,
    value: PropertyValue,
  },
  #[error(transparent)]
  Cast(#[from] CastError),
  #[error(transparent)]
  Channel(#[from] ChannelError),
}

/// Reads one property.
#[derive(Debug, Clone)]
pub struct Getter {
  command: PendingCommand,
  kind: PropertyType,
}

impl Getter {
  pub fn new(name: &str, kind: PropertyType) -> Self {
    Self {
      command: PendingCommand::get_property(name),
      kind,
    }
  }

  /// Turn a raw answer into a value.
  ///
  /// Flags are never missing: MPlayer sometimes answers a false flag with no text, so
  /// an absent or empty answer reads as `false`. Other types keep absence as `None` so
  /// it stays distinct from a zero or empty value. An empty string is a real value;
  /// empty numeric text has nothing to cast and reads as absent.
  pub fn interpret(&self, answer: Option<&str>) -> Result<Option<PropertyValue>, CastError> {
    match (self.kind, answer) {
      (PropertyType::Flag, answer) => {
        let set = matches!(answer, Some(text) if !text.is_empty() && text != "no");
        Ok(Some(PropertyValue::Flag(set)))
      }
      (_, None) => Ok(None),
      (kind, Some("")) if kind.is_numeric() => Ok(None),
      (kind, Some(text)) => kind.cast()(text).map(Some),
    }
  }

  /// Query MPlayer and interpret the answer.
  pub async fn read<R, W>(
    &self,
    channel: &mut CommandChannel<R, W>,
  ) -> Result<Option<PropertyValue>, AccessError>
  where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    let reply = channel.send(&self.command).await?;
    Ok(self.interpret(reply.into_answer().as_deref())?)
  }
}

/// Writes one property after checking type and bounds.
#[derive(Debug, Clone)]
pub struct Setter {
  name: String,
  alias: String,
  kind: PropertyType,
  min: Option<PropertyValue>,
  max: Option<PropertyValue>,
}

impl Setter {
  fn new(descriptor: &PropertyDescriptor) -> Self {
    Self {
      name: descriptor.name.clone(),
      alias: descriptor.alias.clone(),
      kind: descriptor.kind,
      min: descriptor.min.clone(),
      max: descriptor.max.clone(),
    }
  }

  /// Validate `value` and build the `set_property` command for it. Nothing is sent.
  ///
  /// Bounds only constrain numeric types; on flags and strings they just mark the
  /// property writable.
  pub fn command(&self, value: &PropertyValue) -> Result<PendingCommand, AccessError> {
    if !value.fits(self.kind) {
      return Err(AccessError::TypeMismatch {
        property: self.alias.clone(),
        expected: self.kind,
        value: value.clone(),
      });
    }

    if self.kind.is_numeric() {
      // an unordered value (NaN) satisfies no bound
      if let Some(min) = &self.min {
        if !matches!(value.partial_cmp(min), Some(Ordering::Greater | Ordering::Equal)) {
          return Err(self.out_of_range(Bound::Min, min, value));
        }
      }
      if let Some(max) = &self.max {
        if !matches!(value.partial_cmp(max), Some(Ordering::Less | Ordering::Equal)) {
          return Err(self.out_of_range(Bound::Max, max, value));
        }
      }
    }

    Ok(PendingCommand::set_property(&self.name, &value.to_string()))
  }

  fn out_of_range(&self, bound: Bound, limit: &PropertyValue, value: &PropertyValue) -> AccessError {
    AccessError::ValueOutOfRange {
      property: self.alias.clone(),
      bound,
      limit: limit.clone(),
      value: value.clone(),
    }
  }

  /// Validate and send without waiting; MPlayer does not always acknowledge sets.
  pub async fn write<R, W>(
    &self,
    channel: &mut CommandChannel<R, W>,
    value: &PropertyValue,
  ) -> Result<(), AccessError>
  where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
  {
    let command = self.command(value)?;
    channel.send(&command).await?;
    Ok(())
  }
}

/// A discovered property with its bound getter and, when writable, setter.
#[derive(Debug, Clone)]
pub struct Accessor {
  descriptor: PropertyDescriptor,
  getter: Getter,
  setter: Option<Setter>,
}

impl Accessor {
  pub fn build(descriptor: PropertyDescriptor) -> Self {
    let getter = Getter::new(&descriptor.name, descriptor.kind);
    let setter = (!descriptor.read_only).then(|| Setter::new(&descriptor));
    Self {
      descriptor,
      getter,
      setter,
    }
  }

  pub fn descriptor(&self) -> &PropertyDescriptor {
    &self.descriptor
  }

  pub fn getter(&self) -> &Getter {
    &self.getter
  }

  pub fn setter(&self) -> Option<&Setter> {
    self.setter.as_ref()
  }
}

/// Accessors by alias, in discovery order. Each player owns its own table.
#[derive(Debug, Clone, Default)]
pub struct AccessorTable {
  accessors: Vec<Accessor>,
  by_alias: HashMap<String, usize>,
}

impl AccessorTable {
  pub fn build(descriptors: impl IntoIterator<Item = PropertyDescriptor>) -> Self {
    let mut table = Self::default();
    for descriptor in descriptors {
      if table.by_alias.contains_key(&descriptor.alias) {
        log::warn!("Duplicate property alias {}, keeping the first", descriptor.alias);
        continue;
      }
      table
        .by_alias
        .insert(descriptor.alias.clone(), table.accessors.len());
      table.accessors.push(Accessor::build(descriptor));
    }
    table
  }

  pub fn get(&self, alias: &str) -> Option<&Accessor> {
    self.by_alias.get(alias).map(|&index| &self.accessors[index])
  }

  pub fn iter(&self) -> impl Iterator<Item = &Accessor> {
    self.accessors.iter()
  }

  pub fn len(&self) -> usize {
    self.accessors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.accessors.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mplayer::discovery::{parse_listing, DiscoveryPolicy};
  use crate::mplayer::testing::{CountingReader, SharedWriter};

  fn descriptor(line: &str) -> PropertyDescriptor {
    parse_listing(line, &DiscoveryPolicy::default())
      .pop()
      .expect("descriptor")
  }

  #[test]
  fn test_unbounded_property_has_no_setter() {
    let accessor = Accessor::build(descriptor("filename String No No"));
    assert!(accessor.setter().is_none());

    let accessor = Accessor::build(descriptor("sub_delay Float No No"));
    assert!(accessor.setter().is_some());
  }

  #[test]
  fn test_bounds_are_enforced() {
    let accessor = Accessor::build(descriptor("osdlevel Integer 0 3"));
    let setter = accessor.setter().unwrap();

    match setter.command(&PropertyValue::Integer(-1)) {
      Err(AccessError::ValueOutOfRange { bound, limit, .. }) => {
        assert_eq!(bound, Bound::Min);
        assert_eq!(limit, PropertyValue::Integer(0));
      }
      other => panic!("Expected ValueOutOfRange, got {:?}", other),
    }
    match setter.command(&PropertyValue::Integer(4)) {
      Err(AccessError::ValueOutOfRange { bound, .. }) => assert_eq!(bound, Bound::Max),
      other => panic!("Expected ValueOutOfRange, got {:?}", other),
    }

    assert_eq!(
      setter.command(&PropertyValue::Integer(0)).unwrap().line,
      "set_property osdlevel 0"
    );
    assert_eq!(
      setter.command(&PropertyValue::Integer(3)).unwrap().line,
      "set_property osdlevel 3"
    );
  }

  #[test]
  fn test_out_of_range_message() {
    let accessor = Accessor::build(descriptor("volume Float 0 100"));
    let err = accessor
      .setter()
      .unwrap()
      .command(&PropertyValue::Float(101.0))
      .unwrap_err();
    assert_eq!(err.to_string(), "volume: value must be at most 100, got 101");
  }

  #[test]
  fn test_type_mismatch() {
    let accessor = Accessor::build(descriptor("volume Float 0 100"));
    let err = accessor
      .setter()
      .unwrap()
      .command(&PropertyValue::from("loud"))
      .unwrap_err();
    assert!(matches!(err, AccessError::TypeMismatch { expected: PropertyType::Float, .. }));
  }

  #[test]
  fn test_flag_bounds_do_not_constrain() {
    let accessor = Accessor::build(descriptor("mute Flag 0 1"));
    let command = accessor
      .setter()
      .unwrap()
      .command(&PropertyValue::Flag(false))
      .unwrap();
    assert_eq!(command.line, "set_property mute no");
  }

  #[test]
  fn test_flag_interpretation() {
    let accessor = Accessor::build(descriptor("mute Flag 0 1"));
    let getter = accessor.getter();
    assert_eq!(getter.interpret(None).unwrap(), Some(PropertyValue::Flag(false)));
    assert_eq!(getter.interpret(Some("")).unwrap(), Some(PropertyValue::Flag(false)));
    assert_eq!(getter.interpret(Some("no")).unwrap(), Some(PropertyValue::Flag(false)));
    assert_eq!(getter.interpret(Some("yes")).unwrap(), Some(PropertyValue::Flag(true)));
    assert_eq!(getter.interpret(Some("1")).unwrap(), Some(PropertyValue::Flag(true)));
  }

  #[test]
  fn test_absent_value_is_not_cast() {
    let accessor = Accessor::build(descriptor("length Time No No"));
    let getter = accessor.getter();
    assert_eq!(getter.interpret(None).unwrap(), None);
    assert_eq!(getter.interpret(Some("")).unwrap(), None);
    assert_eq!(getter.interpret(Some("0")).unwrap(), Some(PropertyValue::Float(0.0)));
  }

  #[test]
  fn test_empty_string_is_a_value() {
    let accessor = Accessor::build(descriptor("filename String No No"));
    let getter = accessor.getter();
    assert_eq!(getter.interpret(None).unwrap(), None);
    assert_eq!(
      getter.interpret(Some("")).unwrap(),
      Some(PropertyValue::String(String::new()))
    );
  }

  #[tokio::test]
  async fn test_empty_string_read_differs_from_unavailable() {
    let accessor = Accessor::build(descriptor("filename String No No"));
    let mut channel = CommandChannel::new(
      CountingReader::new("ANS_filename=''\nANS_filename=PROPERTY_UNAVAILABLE\n"),
      SharedWriter::default(),
    );
    assert_eq!(
      accessor.getter().read(&mut channel).await.unwrap(),
      Some(PropertyValue::String(String::new()))
    );
    assert_eq!(accessor.getter().read(&mut channel).await.unwrap(), None);
  }

  #[test]
  fn test_nan_is_out_of_range() {
    let accessor = Accessor::build(descriptor("volume Float 0 100"));
    match accessor.setter().unwrap().command(&PropertyValue::Float(f64::NAN)) {
      Err(AccessError::ValueOutOfRange { bound, .. }) => assert_eq!(bound, Bound::Min),
      other => panic!("Expected ValueOutOfRange, got {:?}", other),
    }

    // only the declared bound is checked
    let accessor = Accessor::build(descriptor("speed Float No 100"));
    match accessor.setter().unwrap().command(&PropertyValue::Float(f64::NAN)) {
      Err(AccessError::ValueOutOfRange { bound, .. }) => assert_eq!(bound, Bound::Max),
      other => panic!("Expected ValueOutOfRange, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_set_sends_one_command_without_reading() {
    let accessor = Accessor::build(descriptor("volume Float 0 100"));
    let setter = accessor.setter().unwrap();
    let reader = CountingReader::new("");
    let writer = SharedWriter::default();
    let mut channel = CommandChannel::new(reader.clone(), writer.clone());

    setter.write(&mut channel, &PropertyValue::Float(0.0)).await.unwrap();
    assert_eq!(writer.lines(), vec!["set_property volume 0"]);

    setter.write(&mut channel, &PropertyValue::Float(100.0)).await.unwrap();
    assert_eq!(
      writer.lines(),
      vec!["set_property volume 0", "set_property volume 100"]
    );
    assert_eq!(reader.reads(), 0);
  }

  #[tokio::test]
  async fn test_rejected_set_writes_nothing() {
    let accessor = Accessor::build(descriptor("volume Float 0 100"));
    let writer = SharedWriter::default();
    let mut channel = CommandChannel::new(CountingReader::new(""), writer.clone());

    let result = accessor
      .setter()
      .unwrap()
      .write(&mut channel, &PropertyValue::Float(-0.5))
      .await;

    assert!(matches!(result, Err(AccessError::ValueOutOfRange { .. })));

    let result = accessor
      .setter()
      .unwrap()
      .write(&mut channel, &PropertyValue::Float(f64::NAN))
      .await;

    assert!(matches!(result, Err(AccessError::ValueOutOfRange { .. })));
    assert!(writer.lines().is_empty());
  }

  #[tokio::test]
  async fn test_set_then_get_round_trip() {
    let accessor = Accessor::build(descriptor("speed Float 0.01 100.00"));
    let writer = SharedWriter::default();
    // MPlayer reflects the value back in its own formatting
    let mut channel = CommandChannel::new(CountingReader::new("ANS_speed=1.750000\n"), writer.clone());

    let value = PropertyValue::Float(1.75);
    accessor.setter().unwrap().write(&mut channel, &value).await.unwrap();
    let read = accessor.getter().read(&mut channel).await.unwrap();

    assert_eq!(read, Some(value));
    assert_eq!(writer.lines(), vec!["set_property speed 1.75", "get_property speed"]);
  }

  #[tokio::test]
  async fn test_unavailable_read() {
    let accessor = Accessor::build(descriptor("percent_pos Integer 0 100"));
    let mut channel = CommandChannel::new(
      CountingReader::new("ANS_percent_pos=PROPERTY_UNAVAILABLE\n"),
      SharedWriter::default(),
    );
    assert_eq!(accessor.getter().read(&mut channel).await.unwrap(), None);
  }

  #[test]
  fn test_table_lookup_and_order() {
    let descriptors = parse_listing(
      "volume Float 0 100\nfilename String No No\nmute Flag 0 1\n",
      &DiscoveryPolicy::default(),
    );
    let table = AccessorTable::build(descriptors);
    assert_eq!(table.len(), 3);
    let aliases: Vec<&str> = table.iter().map(|a| a.descriptor().alias.as_str()).collect();
    assert_eq!(aliases, vec!["volume", "filename", "mute"]);
    assert!(table.get("filename").unwrap().setter().is_none());
    assert!(table.get("missing").is_none());
  }
}

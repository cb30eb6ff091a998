//! Measurement points and their InfluxDB line protocol encoding.

use std::collections::BTreeMap;
use std::fmt::Write;

use time::OffsetDateTime;

/// A single field value of a [`Point`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Integer(i64),
  String(String),
}

impl From<i64> for FieldValue {
  fn from(value: i64) -> Self {
    FieldValue::Integer(value)
  }
}

impl From<bool> for FieldValue {
  fn from(value: bool) -> Self {
    FieldValue::Integer(value as i64)
  }
}

impl From<u16> for FieldValue {
  fn from(value: u16) -> Self {
    FieldValue::Integer(value.into())
  }
}

impl From<&str> for FieldValue {
  fn from(value: &str) -> Self {
    FieldValue::String(value.to_owned())
  }
}

impl From<String> for FieldValue {
  fn from(value: String) -> Self {
    FieldValue::String(value)
  }
}

/// A timestamped measurement point: one measurement name, a set of tags
/// and at least one field.
///
/// ```rust
/// use probe_core::sink::Point;
/// use time::OffsetDateTime;
///
/// let point = Point::new("simplePortMonitor")
///   .tag("name", "db")
///   .tag("source", "eu-1")
///   .field("isOnline", true)
///   .field("responseTime", 12_i64)
///   .timestamp(OffsetDateTime::UNIX_EPOCH);
///
/// assert_eq!(
///   point.to_line(),
///   "simplePortMonitor,name=db,source=eu-1 isOnline=1i,responseTime=12i 0"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
  measurement: String,
  tags: BTreeMap<String, String>,
  fields: Vec<(String, FieldValue)>,
  timestamp: OffsetDateTime,
}

impl Point {
  /// Creates a point timestamped now.
  pub fn new(measurement: impl Into<String>) -> Self {
    Self {
      measurement: measurement.into(),
      tags: BTreeMap::new(),
      fields: Vec::new(),
      timestamp: OffsetDateTime::now_utc(),
    }
  }

  pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.tags.insert(key.into(), value.into());
    self
  }

  pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
    self.fields.push((key.into(), value.into()));
    self
  }

  pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
    self.timestamp = timestamp;
    self
  }

  pub fn measurement(&self) -> &str {
    &self.measurement
  }

  pub fn get_tag(&self, key: &str) -> Option<&str> {
    self.tags.get(key).map(String::as_str)
  }

  pub fn get_field(&self, key: &str) -> Option<&FieldValue> {
    self.fields
      .iter()
      .find(|(name, _)| name == key)
      .map(|(_, value)| value)
  }

  pub fn get_timestamp(&self) -> OffsetDateTime {
    self.timestamp
  }

  /// Encodes the point as one line of line protocol with nanosecond
  /// precision. Tags with empty values are left out, line protocol has no
  /// way to express them.
  pub fn to_line(&self) -> String {
    let mut line = String::with_capacity(64);

    escape_into(&mut line, &self.measurement, &[',', ' ']);

    for (key, value) in self.tags.iter().filter(|(_, value)| !value.is_empty()) {
      line.push(',');
      escape_into(&mut line, key, &[',', '=', ' ']);
      line.push('=');
      escape_into(&mut line, value, &[',', '=', ' ']);
    }

    for (index, (key, value)) in self.fields.iter().enumerate() {
      line.push(if index == 0 { ' ' } else { ',' });
      escape_into(&mut line, key, &[',', '=', ' ']);
      line.push('=');

      match value {
        FieldValue::Integer(value) => {
          let _ = write!(line, "{}i", value);
        }
        FieldValue::String(value) => {
          line.push('"');
          escape_into(&mut line, value, &['"', '\\']);
          line.push('"');
        }
      }
    }

    let _ = write!(line, " {}", self.timestamp.unix_timestamp_nanos());

    line
  }
}

/// Line breaks end a line protocol record and have no escape, they are
/// written as spaces.
fn escape_into(target: &mut String, value: &str, special: &[char]) {
  for character in value.chars() {
    let character = if matches!(character, '\n' | '\r') { ' ' } else { character };

    match character {
      character if special.contains(&character) => {
        target.push('\\');
        target.push(character);
      }
      character => target.push(character),
    }
  }
}

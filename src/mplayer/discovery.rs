//! Property discovery from `mplayer -list-properties`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::process::{list_properties, ProcessError};
use super::types::{CastError, PropertyType, PropertyValue};

/// Static description of one MPlayer property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
  /// Name MPlayer knows the property by.
  pub name: String,
  /// Name the player exposes it under.
  pub alias: String,
  pub kind: PropertyType,
  pub min: Option<PropertyValue>,
  pub max: Option<PropertyValue>,
  pub read_only: bool,
}

/// Naming and writability rules applied to the raw listing.
#[derive(Debug, Clone)]
pub struct DiscoveryPolicy {
  /// Properties replaced by a dedicated player operation.
  pub ignored: HashSet<String>,
  /// Canonical name -> exposed alias.
  pub renamed: HashMap<String, String>,
  /// Properties that are read-only even though they declare bounds.
  pub read_only: HashSet<String>,
  /// Properties that stay writable without declared bounds.
  pub force_writable: HashSet<String>,
  /// Names taken by the player's own operations.
  pub reserved: HashSet<String>,
}

fn string_set(names: &[&str]) -> HashSet<String> {
  names.iter().map(|name| name.to_string()).collect()
}

impl Default for DiscoveryPolicy {
  fn default() -> Self {
    Self {
      ignored: string_set(&["pause"]),
      renamed: HashMap::from([("pause".to_string(), "paused".to_string())]),
      read_only: string_set(&[
        "length",
        "pause",
        "stream_end",
        "stream_length",
        "stream_start",
        "stream_time_pos",
      ]),
      force_writable: string_set(&["sub_delay"]),
      reserved: string_set(&[
        "load",
        "paused",
        "set_paused",
        "pause",
        "resume",
        "stop",
        "quit",
        "terminate",
        "properties",
        "get",
        "set",
      ]),
    }
  }
}

/// Run MPlayer's introspection once and build descriptors from its output.
pub async fn discover(
  program: &Path,
  policy: &DiscoveryPolicy,
) -> Result<Vec<PropertyDescriptor>, ProcessError> {
  let listing = list_properties(program).await?;
  let descriptors = parse_listing(&listing, policy);
  log::info!("Discovered {} MPlayer properties", descriptors.len());
  Ok(descriptors)
}

/// Parse `-list-properties` output. Rows that fail to parse are skipped; the rest keep
/// listing order.
pub fn parse_listing(listing: &str, policy: &DiscoveryPolicy) -> Vec<PropertyDescriptor> {
  let mut taken = policy.reserved.clone();
  let mut descriptors = Vec::new();

  for line in listing.lines() {
    let Some(row) = ListingRow::parse(line) else {
      continue;
    };

    if policy.ignored.contains(row.name) {
      log::debug!("Ignoring property {}", row.name);
      continue;
    }

    let alias = policy
      .renamed
      .get(row.name)
      .cloned()
      .unwrap_or_else(|| row.name.to_string());

    if taken.contains(&alias) {
      log::debug!("Property alias {} already in use, skipping", alias);
      continue;
    }

    let descriptor = match row.describe(alias, policy) {
      Ok(descriptor) => descriptor,
      Err(e) => {
        log::warn!("Skipping property {}: {}", row.name, e);
        continue;
      }
    };

    if let (Some(min), Some(max)) = (&descriptor.min, &descriptor.max) {
      if min > max {
        log::warn!("Skipping property {}: min {} exceeds max {}", row.name, min, max);
        continue;
      }
    }

    taken.insert(descriptor.alias.clone());
    descriptors.push(descriptor);
  }

  descriptors
}

/// One `name type min max` row.
struct ListingRow<'a> {
  name: &'a str,
  kind: &'a str,
  min: &'a str,
  max: &'a str,
}

impl<'a> ListingRow<'a> {
  fn parse(line: &'a str) -> Option<Self> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let name = *fields.first()?;
    if !is_lower_identifier(name) {
      return None;
    }

    // "String list" is the only type name with a space in it
    let (kind, bounds) = if fields.len() >= 3 && fields[1] == "String" && fields[2] == "list" {
      ("String list", &fields[3..])
    } else {
      (*fields.get(1)?, &fields[2.min(fields.len())..])
    };

    if bounds.len() < 2 {
      log::debug!("Malformed property row: {}", line.trim());
      return None;
    }

    Some(Self {
      name,
      kind,
      min: bounds[0],
      max: bounds[1],
    })
  }

  fn describe(
    &self,
    alias: String,
    policy: &DiscoveryPolicy,
  ) -> Result<PropertyDescriptor, CastError> {
    let kind: PropertyType = self.kind.parse()?;
    let min = parse_bound(kind, self.min)?;
    let max = parse_bound(kind, self.max)?;

    let unbounded = min.is_none() && max.is_none();
    let read_only = (unbounded && !policy.force_writable.contains(self.name))
      || policy.read_only.contains(self.name);

    Ok(PropertyDescriptor {
      name: self.name.to_string(),
      alias,
      kind,
      min,
      max,
      read_only,
    })
  }
}

fn parse_bound(kind: PropertyType, raw: &str) -> Result<Option<PropertyValue>, CastError> {
  if raw == "No" {
    return Ok(None);
  }
  kind.cast()(raw).map(Some)
}

/// Header, banner and footer lines start with something else.
fn is_lower_identifier(token: &str) -> bool {
  let mut chars = token.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
    && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

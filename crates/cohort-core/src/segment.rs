//! Segment types — named cohort definitions.
//!
//! The `config` payload of a segment is stored verbatim. Nothing in this
//! service interprets it, whatever the segment's [`SegmentType`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a segment is meant to be populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
  Static,
  Dynamic,
  DynamicRule,
}

impl SegmentType {
  /// The string stored in the `segment_type` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Static => "static",
      Self::Dynamic => "dynamic",
      Self::DynamicRule => "dynamic_rule",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "static" => Some(Self::Static),
      "dynamic" => Some(Self::Dynamic),
      "dynamic_rule" => Some(Self::DynamicRule),
      _ => None,
    }
  }
}

/// A persisted segment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
  pub id:           Uuid,
  pub name:         String,
  #[serde(rename = "type")]
  pub segment_type: SegmentType,
  pub config:       serde_json::Value,
  pub description:  String,
  pub is_active:    bool,
  /// Set once on creation; never changes afterwards.
  pub created_on:   DateTime<Utc>,
}

// ─── NewSegment ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::SegmentStore::create_segment`].
/// `id` is generated by the store; `created_on` is stamped by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSegment {
  pub name:         String,
  pub segment_type: SegmentType,
  pub config:       serde_json::Value,
  pub description:  String,
  pub is_active:    bool,
}

impl NewSegment {
  /// Convenience constructor: empty description, active, `null` config.
  pub fn new(name: impl Into<String>, segment_type: SegmentType) -> Self {
    Self {
      name: name.into(),
      segment_type,
      config: serde_json::Value::Null,
      description: String::new(),
      is_active: true,
    }
  }

  /// Attach the store-generated identity.
  pub fn into_segment(self, id: Uuid, created_on: DateTime<Utc>) -> Segment {
    Segment {
      id,
      name: self.name,
      segment_type: self.segment_type,
      config: self.config,
      description: self.description,
      is_active: self.is_active,
      created_on,
    }
  }
}

// ─── SegmentPatch ────────────────────────────────────────────────────────────

/// A partial update. Only `Some` fields overwrite the stored segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPatch {
  pub name:         Option<String>,
  pub segment_type: Option<SegmentType>,
  pub config:       Option<serde_json::Value>,
  pub description:  Option<String>,
  pub is_active:    Option<bool>,
}

impl SegmentPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Merge the patch into `segment`. `id` and `created_on` are never touched.
  pub fn apply(self, segment: &mut Segment) {
    if let Some(name) = self.name {
      segment.name = name;
    }
    if let Some(segment_type) = self.segment_type {
      segment.segment_type = segment_type;
    }
    if let Some(config) = self.config {
      segment.config = config;
    }
    if let Some(description) = self.description {
      segment.description = description;
    }
    if let Some(is_active) = self.is_active {
      segment.is_active = is_active;
    }
  }
}

//! Anchors: labeled attachment points on a part.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use osvcad_math::{is_finite_triple, Point3, Vec3};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An attachment point on a part.
///
/// All four fields are supplied together at construction and never change.
/// `direction` is stored as given; callers are responsible for passing a
/// unit vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    position: Point3,
    direction: Vec3,
    dimension: f64,
    description: String,
}

impl Anchor {
    /// Create an anchor.
    pub fn new(
        position: Point3,
        direction: Vec3,
        dimension: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            position,
            direction,
            dimension,
            description: description.into(),
        }
    }

    /// Attachment position in the part's local frame.
    pub fn position(&self) -> &Point3 {
        &self.position
    }

    /// Attachment direction in the part's local frame.
    pub fn direction(&self) -> &Vec3 {
        &self.direction
    }

    /// Characteristic dimension, e.g. a hole diameter.
    pub fn dimension(&self) -> f64 {
        self.dimension
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Describe the first non-finite field, if any.
    pub fn check_finite(&self) -> Result<(), String> {
        if !is_finite_triple(&self.position.coords) {
            return Err("non-finite position".to_string());
        }
        if !is_finite_triple(&self.direction) {
            return Err("non-finite direction".to_string());
        }
        if !self.dimension.is_finite() {
            return Err("non-finite dimension".to_string());
        }
        Ok(())
    }
}

/// Label of an anchor, unique within one node's anchor map.
///
/// Text forms that parse as integers are normalized to [`AnchorKey::Index`],
/// so `"0"` and `0` name the same anchor and keys survive text round trips.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnchorKey {
    /// Integer label.
    Index(i64),
    /// String label.
    Name(String),
}

impl AnchorKey {
    /// Build a key from text. Only canonical integer text (the form
    /// `Display` writes back) becomes an `Index`, so `"007"` and `"+5"` stay
    /// names and distinct labels never collide.
    pub fn parse(label: &str) -> Self {
        match label.parse::<i64>() {
            Ok(i) if i.to_string() == label => AnchorKey::Index(i),
            _ => AnchorKey::Name(label.to_string()),
        }
    }
}

impl From<i64> for AnchorKey {
    fn from(i: i64) -> Self {
        AnchorKey::Index(i)
    }
}

impl From<&str> for AnchorKey {
    fn from(s: &str) -> Self {
        AnchorKey::parse(s)
    }
}

impl FromStr for AnchorKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AnchorKey::parse(s))
    }
}

impl fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorKey::Index(i) => write!(f, "{i}"),
            AnchorKey::Name(s) => f.write_str(s),
        }
    }
}

impl Serialize for AnchorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct AnchorKeyVisitor;

impl Visitor<'_> for AnchorKeyVisitor {
    type Value = AnchorKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an anchor label (string or integer)")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<AnchorKey, E> {
        Ok(AnchorKey::parse(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<AnchorKey, E> {
        Ok(AnchorKey::Index(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<AnchorKey, E> {
        i64::try_from(v)
            .map(AnchorKey::Index)
            .map_err(|_| E::custom(format!("anchor index {v} out of range")))
    }
}

// Integer keys are accepted too, for hand-written YAML.
impl<'de> Deserialize<'de> for AnchorKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AnchorKeyVisitor)
    }
}

/// Anchors of one node, ordered by key.
pub type AnchorMap = BTreeMap<AnchorKey, Anchor>;

/// Check every anchor in a map, returning `"anchor <key>: <problem>"`.
pub fn check_anchors(anchors: &AnchorMap) -> Result<(), String> {
    for (key, anchor) in anchors {
        anchor
            .check_finite()
            .map_err(|problem| format!("anchor {key}: {problem}"))?;
    }
    Ok(())
}

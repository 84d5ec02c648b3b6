//! Capability tags and the membership test behind every authorization check.
//!
//! Features are a flat set of `verb:noun` strings. They are modeled as an
//! enum so a typo in a gate is a compile error, and stored in the database as
//! a `text[]` column.

use std::collections::BTreeSet;
use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use tracing::warn;

/// One permitted action. Variants are declared in the lexicographic order of
/// their tags so a `FeatureSet` serializes sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    CreateSession,
    CreateUser,
    ReadActivationToken,
    ReadSession,
}

impl Feature {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateSession => "create:session",
            Self::CreateUser => "create:user",
            Self::ReadActivationToken => "read:activation_token",
            Self::ReadSession => "read:session",
        }
    }

    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "create:session" => Some(Self::CreateSession),
            "create:user" => Some(Self::CreateUser),
            "read:activation_token" => Some(Self::ReadActivationToken),
            "read:session" => Some(Self::ReadSession),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An ordered set of capability tags held by a principal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    #[must_use]
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Self {
        Self(features.into_iter().collect())
    }

    /// Decode the stored tags; unknown tags are dropped with a warning so a
    /// stale row cannot take the whole account down.
    #[must_use]
    pub fn from_tags(tags: &[String]) -> Self {
        Self(
            tags.iter()
                .filter_map(|tag| {
                    let feature = Feature::parse(tag);
                    if feature.is_none() {
                        warn!(tag = %tag, "ignoring unrecognized feature tag");
                    }
                    feature
                })
                .collect(),
        )
    }

    /// The pure membership test. No I/O, no side effects.
    #[must_use]
    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.0.iter().map(|feature| feature.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for feature in &self.0 {
            seq.serialize_element(feature)?;
        }
        seq.end()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Features granted to a freshly registered, not yet activated user.
#[must_use]
pub fn default_user_features() -> FeatureSet {
    FeatureSet::new([Feature::ReadActivationToken])
}

/// Features held by a request with no session cookie.
#[must_use]
pub fn anonymous_features() -> FeatureSet {
    FeatureSet::new([
        Feature::ReadActivationToken,
        Feature::CreateSession,
        Feature::CreateUser,
    ])
}

/// Features granted by account activation, replacing the default set.
#[must_use]
pub fn activated_features() -> FeatureSet {
    FeatureSet::new([Feature::CreateSession, Feature::ReadSession])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for feature in [
            Feature::CreateSession,
            Feature::CreateUser,
            Feature::ReadActivationToken,
            Feature::ReadSession,
        ] {
            assert_eq!(Feature::parse(feature.as_str()), Some(feature));
        }
        assert_eq!(Feature::parse("delete:user"), None);
        assert_eq!(Feature::parse(""), None);
    }

    #[test]
    fn from_tags_drops_unknown_entries() {
        let tags = vec![
            "read:session".to_string(),
            "admin:everything".to_string(),
            "create:session".to_string(),
        ];
        let set = FeatureSet::from_tags(&tags);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Feature::ReadSession));
        assert!(set.contains(Feature::CreateSession));
    }

    #[test]
    fn serializes_as_sorted_string_array() {
        let set = FeatureSet::new([
            Feature::ReadSession,
            Feature::CreateUser,
            Feature::CreateSession,
        ]);
        let value = serde_json::to_value(&set).expect("feature set serializes");
        assert_eq!(
            value,
            serde_json::json!(["create:session", "create:user", "read:session"])
        );
    }

    #[test]
    fn default_set_is_exactly_read_activation_token() {
        let set = default_user_features();
        assert_eq!(set.tags(), vec!["read:activation_token"]);
    }

    #[test]
    fn anonymous_set_matches_contract() {
        let set = anonymous_features();
        assert_eq!(
            set.tags(),
            vec!["create:session", "create:user", "read:activation_token"]
        );
        assert!(!set.contains(Feature::ReadSession));
    }

    #[test]
    fn activation_replaces_rather_than_extends() {
        let set = activated_features();
        assert_eq!(set.tags(), vec!["create:session", "read:session"]);
        assert!(!set.contains(Feature::ReadActivationToken));
    }
}

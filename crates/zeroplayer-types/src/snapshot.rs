//! Generic key-value state bags used for save and restore.
//!
//! A [`Snapshot`] is split into sections, one per declaring capability
//! (`"entity"`, `"decaying"`, `"movable"`, ...). Each capability writes only
//! its own section, so adding a capability to a kind never collides with
//! keys written by another. Values are stored as [`serde_json::Value`] so
//! the bag carries no file-format concerns of its own.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors raised while reading or writing a [`Snapshot`].
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A value could not be converted into the bag representation.
    #[error("failed to encode {section}.{key}: {source}")]
    Encode {
        /// Section being written.
        section: String,
        /// Key being written.
        key: String,
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// A stored value could not be converted back into its type.
    #[error("failed to decode {section}.{key}: {source}")]
    Decode {
        /// Section being read.
        section: String,
        /// Key being read.
        key: String,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },

    /// A required key was absent.
    #[error("missing snapshot value {section}.{key}")]
    Missing {
        /// Section being read.
        section: String,
        /// Key being read.
        key: String,
    },
}

/// Sectioned key-value bag holding the minimal mutable state of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    sections: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl Snapshot {
    /// Create an empty bag.
    pub const fn new() -> Self {
        Self {
            sections: BTreeMap::new(),
        }
    }

    /// Store `value` under `section.key`, replacing any previous value.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        section: &str,
        key: &str,
        value: &T,
    ) -> Result<(), SnapshotError> {
        let encoded = serde_json::to_value(value).map_err(|source| SnapshotError::Encode {
            section: section.to_owned(),
            key: key.to_owned(),
            source,
        })?;
        self.sections
            .entry(section.to_owned())
            .or_default()
            .insert(key.to_owned(), encoded);
        Ok(())
    }

    /// Read `section.key`, returning `Ok(None)` if it was never written.
    pub fn get<T: DeserializeOwned>(
        &self,
        section: &str,
        key: &str,
    ) -> Result<Option<T>, SnapshotError> {
        let Some(raw) = self.sections.get(section).and_then(|s| s.get(key)) else {
            return Ok(None);
        };
        serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|source| SnapshotError::Decode {
                section: section.to_owned(),
                key: key.to_owned(),
                source,
            })
    }

    /// Read `section.key`, failing with [`SnapshotError::Missing`] if absent.
    pub fn require<T: DeserializeOwned>(
        &self,
        section: &str,
        key: &str,
    ) -> Result<T, SnapshotError> {
        self.get(section, key)?.ok_or_else(|| SnapshotError::Missing {
            section: section.to_owned(),
            key: key.to_owned(),
        })
    }

    /// Whether any key was written under `section`.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Whether the bag holds no sections at all.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// State that can be written to and restored from a [`Snapshot`].
///
/// Implementors write under their own [`SECTION`](Self::SECTION) so that
/// several capabilities can share one bag.
pub trait Snapshotable {
    /// Section name owned by this implementor.
    const SECTION: &'static str;

    /// Write this state into `snapshot`.
    fn fill_snapshot(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError>;

    /// Overwrite this state from `snapshot`.
    fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// Build a fresh bag holding only this state.
    fn form_snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let mut snapshot = Snapshot::new();
        self.fill_snapshot(&mut snapshot)?;
        Ok(snapshot)
    }
}

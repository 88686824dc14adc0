use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::error::WireError;

/// Size of one entry in the container's target list.
pub const TARGET_ID_SIZE: usize = 16;

/// Identifier of a device the container is built for.
///
/// Shown as a UUID whose bytes are taken in file order, so
/// `29 32 EC AE CC 69 D8 43 ...` reads as `2932ecae-cc69-d843-...`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub [u8; TARGET_ID_SIZE]);

impl TargetId {
    pub fn from_bytes(raw: [u8; TARGET_ID_SIZE]) -> Self {
        Self(raw)
    }

    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl From<Uuid> for TargetId {
    fn from(id: Uuid) -> Self {
        Self(*id.as_bytes())
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_uuid())
    }
}

/// Targets known out of the box.
const BUILTIN_TARGETS: &[(&str, &str)] = &[("2932ecae-cc69-d843-bd0e-61dc3406f71b", "iLO 4")];

/// Mapping from target identifier to a human-readable device name.
///
/// [`TargetTable::default`] holds the built-in targets. More can be added
/// with [`insert`](Self::insert), for example from `--target UUID=NAME`
/// command-line values parsed by [`parse_entry`](Self::parse_entry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetTable {
    entries: BTreeMap<TargetId, String>,
}

impl TargetTable {
    /// A table with no entries. Every lookup fails.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace a target, returning the previous name if any.
    pub fn insert(&mut self, id: TargetId, name: impl Into<String>) -> Option<String> {
        self.entries.insert(id, name.into())
    }

    /// Resolve a target identifier to its device name.
    pub fn lookup(&self, id: &TargetId) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TargetId, &str)> {
        self.entries.iter().map(|(id, name)| (id, name.as_str()))
    }

    /// Parse a `UUID=NAME` table entry.
    ///
    /// # Errors
    ///
    /// - [`WireError::InvalidTargetSpec`] if there is no `=` or the name is
    ///   empty.
    /// - [`WireError::Uuid`] if the identifier is not a valid UUID.
    pub fn parse_entry(spec: &str) -> Result<(TargetId, String), WireError> {
        let invalid = || WireError::InvalidTargetSpec {
            spec: spec.to_string(),
        };

        let (id, name) = spec.split_once('=').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }

        let id = Uuid::parse_str(id.trim())?;
        Ok((TargetId::from(id), name.to_string()))
    }
}

impl Default for TargetTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (id, name) in BUILTIN_TARGETS {
            if let Ok(id) = Uuid::parse_str(id) {
                table.insert(TargetId::from(id), *name);
            }
        }
        table
    }
}

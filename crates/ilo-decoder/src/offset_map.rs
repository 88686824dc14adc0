use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;

use crate::error::DecodeError;

/// Absolute offsets of every region discovered during a decode.
///
/// Entries keep discovery order for display. Serialisation sorts keys and
/// indents by four spaces, which is the layout of `firmware.map`:
///
/// ```text
/// {
///     "BOOTLOADER": 1116744,
///     "BOOTLOADER_HDR": 24,
///     "ELF": 2136,
///     "ELF_HDR": 1048
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OffsetMap {
    entries: Vec<(String, usize)>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that region `name` starts at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::DuplicateRegion`] if `name` was already
    /// recorded; the existing entry is kept.
    pub fn record(&mut self, name: impl Into<String>, offset: usize) -> Result<(), DecodeError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(DecodeError::DuplicateRegion { name });
        }
        log::debug!("region {name} at {offset:#010x}");
        self.entries.push((name, offset));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|&(_, offset)| offset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, offset)| (name.as_str(), *offset))
    }

    /// Entries keyed and sorted by name.
    pub fn sorted(&self) -> BTreeMap<&str, usize> {
        self.iter().collect()
    }

    /// Serialise as sorted JSON with a four-space indent.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures from `serde_json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Serialize for OffsetMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sorted = self.sorted();
        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for (name, offset) in sorted {
            map.serialize_entry(name, &offset)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_discovery_order() {
        let mut map = OffsetMap::new();
        map.record("BOOTLOADER_HDR", 0x18).unwrap();
        map.record("BOOTLOADER", 0x1_0000).unwrap();
        map.record("ELF_HDR", 0x458).unwrap();

        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["BOOTLOADER_HDR", "BOOTLOADER", "ELF_HDR"]);
        assert_eq!(map.get("BOOTLOADER"), Some(0x1_0000));
        assert_eq!(map.get("KERNEL_MAIN"), None);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut map = OffsetMap::new();
        map.record("ELF", 10).unwrap();
        let err = map.record("ELF", 20).unwrap_err();
        assert!(matches!(err, DecodeError::DuplicateRegion { ref name } if name == "ELF"));
        assert_eq!(map.get("ELF"), Some(10));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn json_is_sorted_with_four_space_indent() {
        let mut map = OffsetMap::new();
        map.record("BOOTLOADER_HDR", 24).unwrap();
        map.record("BOOTLOADER", 5000).unwrap();
        map.record("ELF_HDR", 1112).unwrap();
        map.record("ELF", 2200).unwrap();

        assert_eq!(
            map.to_json().unwrap(),
            "{\n    \"BOOTLOADER\": 5000,\n    \"BOOTLOADER_HDR\": 24,\n    \"ELF\": 2200,\n    \"ELF_HDR\": 1112\n}"
        );
    }

    #[test]
    fn empty_map_serialises_as_empty_object() {
        assert_eq!(OffsetMap::new().to_json().unwrap(), "{}");
    }
}

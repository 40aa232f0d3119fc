//! Store paths and the identifiers of the container layout.
//!
//! The container is laid out as
//!
//! ```text
//! geometry/{cells,size,origin,constituents}
//! geometry/mapping/{phase,homogenization}/<name>
//! increment_<i>/time
//! increment_<i>/{phase,homogenization}/<name>/<label>
//! ```

use std::fmt;
use std::str::FromStr;

/// Name of the container-level geometry group.
pub const GEOMETRY: &str = "geometry";

/// Name of the mapping group inside [`GEOMETRY`].
pub const MAPPING: &str = "mapping";

/// Name of the per-increment time dataset.
pub const TIME: &str = "time";

const INCREMENT_PREFIX: &str = "increment_";

/// Slash-separated path to a group or dataset in a store.
///
/// The root is the empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(Vec<String>);

impl StorePath {
    /// The root group.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a `/`-separated path. Empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// A new path with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Path segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

impl From<&str> for StorePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Index of a saved increment; its group is named `increment_<index>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncrementId(pub u32);

impl IncrementId {
    /// Parse a group name of the form `increment_<index>`.
    ///
    /// The index must be written without sign or leading zeros, so every
    /// accepted name equals [`path`](Self::path) of the result.
    pub fn from_group_name(name: &str) -> Option<Self> {
        let digits = name.strip_prefix(INCREMENT_PREFIX)?;
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        canonical.then(|| digits.parse().ok()).flatten().map(Self)
    }

    /// Path of the increment group.
    pub fn path(self) -> StorePath {
        StorePath::root().join(self.to_string())
    }
}

impl fmt::Display for IncrementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{INCREMENT_PREFIX}{}", self.0)
    }
}

impl From<u32> for IncrementId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// The two kinds of partition fields are stored under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartitionKind {
    /// A named region of material.
    Phase,
    /// A named aggregation rule over constituents.
    Homogenization,
}

impl PartitionKind {
    /// Both kinds, in storage order.
    pub const ALL: [PartitionKind; 2] = [PartitionKind::Phase, PartitionKind::Homogenization];

    /// Group name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phase => "phase",
            Self::Homogenization => "homogenization",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phase" => Ok(Self::Phase),
            "homogenization" => Ok(Self::Homogenization),
            other => Err(format!("unknown partition kind '{other}'")),
        }
    }
}

/// Address of one partition group within one increment: the unit that
/// fields are read from, evaluated over, and written to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    /// Increment.
    pub increment: IncrementId,
    /// Partition kind.
    pub kind: PartitionKind,
    /// Partition name.
    pub name: String,
}

impl GroupKey {
    /// Create a group key.
    pub fn new(increment: IncrementId, kind: PartitionKind, name: impl Into<String>) -> Self {
        Self {
            increment,
            kind,
            name: name.into(),
        }
    }

    /// Path of the partition group.
    pub fn path(&self) -> StorePath {
        self.increment
            .path()
            .join(self.kind.as_str())
            .join(self.name.clone())
    }

    /// Path of a field inside the partition group.
    pub fn field(&self, label: &str) -> StorePath {
        self.path().join(label)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.increment, self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_empty_segments() {
        let p = StorePath::parse("/increment_0//phase/A/");
        assert_eq!(p.segments(), &["increment_0", "phase", "A"]);
        assert_eq!(p.to_string(), "/increment_0/phase/A");
        assert_eq!(p.name(), Some("A"));
    }

    #[test]
    fn root_has_no_parent() {
        assert!(StorePath::root().parent().is_none());
        assert!(StorePath::root().is_root());
        assert_eq!(StorePath::root().to_string(), "/");
    }

    #[test]
    fn increment_group_names_round_trip() {
        let id = IncrementId(40);
        assert_eq!(id.to_string(), "increment_40");
        assert_eq!(IncrementId::from_group_name("increment_40"), Some(id));
        assert_eq!(IncrementId::from_group_name("increment_x"), None);
        assert_eq!(IncrementId::from_group_name("geometry"), None);
    }

    #[test]
    fn padded_or_signed_increment_names_are_not_increments() {
        assert_eq!(IncrementId::from_group_name("increment_0"), Some(IncrementId(0)));
        for name in ["increment_007", "increment_00", "increment_+7", "increment_"] {
            assert_eq!(IncrementId::from_group_name(name), None, "{name}");
        }
    }

    #[test]
    fn group_key_paths() {
        let key = GroupKey::new(IncrementId(3), PartitionKind::Homogenization, "SX");
        assert_eq!(key.path().to_string(), "/increment_3/homogenization/SX");
        assert_eq!(key.field("F").to_string(), "/increment_3/homogenization/SX/F");
    }

    #[test]
    fn partition_kind_from_str() {
        assert_eq!("phase".parse::<PartitionKind>(), Ok(PartitionKind::Phase));
        assert!("grain".parse::<PartitionKind>().is_err());
    }
}

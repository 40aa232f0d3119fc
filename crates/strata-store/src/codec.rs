//! Binary encode/decode for the container format.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length. Optional attributes use a presence byte followed by the
//! value. The format is intentionally simple: no compression, no
//! alignment padding, no self-describing schema.

use std::io::{Read, Write};

use strata_core::{Attributes, Dataset, Lattice, Store, StoreError, Values};

use crate::memory::{Group, MemoryStore};
use crate::{FORMAT_VERSION, MAGIC};

/// Deepest group nesting accepted when decoding.
const MAX_DEPTH: usize = 64;

const DTYPE_FLOAT: u8 = 0;
const DTYPE_INT: u8 = 1;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), StoreError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), StoreError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), StoreError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), StoreError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_optional_str(w: &mut dyn Write, s: Option<&str>) -> Result<(), StoreError> {
    match s {
        Some(s) => {
            write_u8(w, 1)?;
            write_length_prefixed_str(w, s)
        }
        None => write_u8(w, 0),
    }
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, StoreError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, StoreError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, StoreError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, StoreError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| StoreError::Malformed {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

fn read_optional_str(r: &mut dyn Read) -> Result<Option<String>, StoreError> {
    match read_u8(r)? {
        0 => Ok(None),
        1 => Ok(Some(read_length_prefixed_str(r)?)),
        flag => Err(StoreError::Malformed {
            detail: format!("invalid presence flag: {flag}"),
        }),
    }
}

// ── Dataset encode/decode ───────────────────────────────────────

/// Encode one dataset: dtype, shape, elements, attributes.
pub fn encode_dataset(w: &mut dyn Write, dataset: &Dataset) -> Result<(), StoreError> {
    let dtype = match dataset.values() {
        Values::Float(_) => DTYPE_FLOAT,
        Values::Int(_) => DTYPE_INT,
    };
    write_u8(w, dtype)?;
    write_u32_le(w, dataset.ndim() as u32)?;
    for &dim in dataset.shape() {
        write_u64_le(w, dim as u64)?;
    }
    write_u64_le(w, dataset.len() as u64)?;
    match dataset.values() {
        Values::Float(v) => {
            for x in v {
                w.write_all(&x.to_le_bytes())?;
            }
        }
        Values::Int(v) => {
            for x in v {
                w.write_all(&x.to_le_bytes())?;
            }
        }
    }

    let attrs = dataset.attrs();
    write_optional_str(w, attrs.unit.as_deref())?;
    write_optional_str(w, attrs.description.as_deref())?;
    write_optional_str(w, attrs.creator.as_deref())?;
    write_optional_str(w, attrs.created.as_deref())?;
    write_optional_str(w, attrs.formula.as_deref())?;
    write_optional_str(w, attrs.lattice.map(Lattice::symbol))?;
    Ok(())
}

/// Decode one dataset.
pub fn decode_dataset(r: &mut dyn Read) -> Result<Dataset, StoreError> {
    let dtype = read_u8(r)?;
    let ndim = read_u32_le(r)? as usize;
    if ndim > MAX_DEPTH {
        return Err(StoreError::Malformed {
            detail: format!("dataset rank {ndim} exceeds {MAX_DEPTH}"),
        });
    }
    let mut shape = Vec::with_capacity(ndim);
    for _ in 0..ndim {
        shape.push(read_u64_le(r)? as usize);
    }
    let n = read_u64_le(r)? as usize;
    let expected: usize = shape.iter().product();
    if n != expected {
        return Err(StoreError::Malformed {
            detail: format!("{n} elements recorded for shape {shape:?}"),
        });
    }

    let mut buf = [0u8; 8];
    let values = match dtype {
        DTYPE_FLOAT => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                r.read_exact(&mut buf)?;
                v.push(f64::from_le_bytes(buf));
            }
            Values::Float(v)
        }
        DTYPE_INT => {
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                r.read_exact(&mut buf)?;
                v.push(i64::from_le_bytes(buf));
            }
            Values::Int(v)
        }
        tag => {
            return Err(StoreError::Malformed {
                detail: format!("unknown dtype tag {tag}"),
            })
        }
    };

    let unit = read_optional_str(r)?;
    let description = read_optional_str(r)?;
    let creator = read_optional_str(r)?;
    let created = read_optional_str(r)?;
    let formula = read_optional_str(r)?;
    let lattice = match read_optional_str(r)? {
        Some(symbol) => Some(
            symbol
                .parse::<Lattice>()
                .map_err(|detail| StoreError::Malformed { detail })?,
        ),
        None => None,
    };

    let attrs = Attributes {
        unit,
        description,
        creator,
        created,
        formula,
        lattice,
    };
    Ok(Dataset::new(&shape, values)?.with_attrs(attrs))
}

// ── Group encode/decode ─────────────────────────────────────────

fn encode_group(w: &mut dyn Write, group: &Group) -> Result<(), StoreError> {
    let groups: Vec<_> = group.groups().collect();
    write_u32_le(w, groups.len() as u32)?;
    for (name, child) in groups {
        write_length_prefixed_str(w, name)?;
        encode_group(w, child)?;
    }
    let arrays: Vec<_> = group.arrays().collect();
    write_u32_le(w, arrays.len() as u32)?;
    for (name, dataset) in arrays {
        write_length_prefixed_str(w, name)?;
        encode_dataset(w, dataset)?;
    }
    Ok(())
}

fn decode_group(r: &mut dyn Read, depth: usize) -> Result<Group, StoreError> {
    if depth > MAX_DEPTH {
        return Err(StoreError::Malformed {
            detail: format!("group nesting exceeds {MAX_DEPTH}"),
        });
    }
    let mut group = Group::new();
    let n_groups = read_u32_le(r)?;
    for _ in 0..n_groups {
        let name = read_length_prefixed_str(r)?;
        let child = decode_group(r, depth + 1)?;
        group.insert_group(name, child);
    }
    let n_arrays = read_u32_le(r)?;
    for _ in 0..n_arrays {
        let name = read_length_prefixed_str(r)?;
        let dataset = decode_dataset(r)?;
        group.insert_array(name, dataset);
    }
    Ok(group)
}

// ── Container encode/decode ─────────────────────────────────────

/// Encode a whole container: header, name, and the group tree.
pub fn encode_store(w: &mut dyn Write, store: &MemoryStore) -> Result<(), StoreError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_length_prefixed_str(w, store.name())?;
    encode_group(w, store.root())
}

/// Decode and validate a whole container.
pub fn decode_store(r: &mut dyn Read) -> Result<MemoryStore, StoreError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(StoreError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion { found: version });
    }
    let name = read_length_prefixed_str(r)?;
    let root = decode_group(r, 0)?;
    Ok(MemoryStore::from_root(name, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strata_core::StorePath;

    fn sample_store() -> MemoryStore {
        let mut s = MemoryStore::new("sample");
        let f = Dataset::from_float(&[2, 3], vec![1.0, -2.0, 3.5, 0.0, f64::NAN, 6.0])
            .unwrap()
            .with_attrs(Attributes {
                unit: Some("1".into()),
                description: Some("deformation gradient".into()),
                lattice: Some(Lattice::CF),
                ..Attributes::default()
            });
        s.write_array(&"increment_0/phase/A/F".into(), f, false).unwrap();
        s.write_array(
            &"geometry/cells".into(),
            Dataset::from_int(&[3], vec![2, 1, 1]).unwrap(),
            false,
        )
        .unwrap();
        s.write_array(&"increment_0/time".into(), Dataset::scalar(0.5), false)
            .unwrap();
        s
    }

    #[test]
    fn container_round_trips() {
        let s = sample_store();
        let mut buf = Vec::new();
        encode_store(&mut buf, &s).unwrap();
        let back = decode_store(&mut buf.as_slice()).unwrap();
        assert_eq!(back.name(), "sample");
        let f = back.read_array(&"increment_0/phase/A/F".into()).unwrap();
        let orig = s.read_array(&"increment_0/phase/A/F".into()).unwrap();
        assert!(f.allclose(&orig, 0.0, 0.0));
        assert_eq!(f.attrs(), orig.attrs());
        assert_eq!(
            back.read_array(&StorePath::parse("geometry/cells")).unwrap(),
            s.read_array(&StorePath::parse("geometry/cells")).unwrap()
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = b"NOPE\x01".to_vec();
        buf.extend_from_slice(&[0; 16]);
        assert!(matches!(
            decode_store(&mut buf.as_slice()),
            Err(StoreError::InvalidMagic)
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut buf = MAGIC.to_vec();
        buf.push(FORMAT_VERSION + 1);
        assert!(matches!(
            decode_store(&mut buf.as_slice()),
            Err(StoreError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        let s = sample_store();
        let mut buf = Vec::new();
        encode_store(&mut buf, &s).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(decode_store(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn rejects_element_count_mismatch() {
        let mut buf = Vec::new();
        write_u8(&mut buf, DTYPE_FLOAT).unwrap();
        write_u32_le(&mut buf, 1).unwrap();
        write_u64_le(&mut buf, 3).unwrap();
        write_u64_le(&mut buf, 2).unwrap();
        assert!(matches!(
            decode_dataset(&mut buf.as_slice()),
            Err(StoreError::Malformed { .. })
        ));
    }

    proptest! {
        #[test]
        fn integer_datasets_survive_encoding(data in proptest::collection::vec(any::<i64>(), 0..64)) {
            let n = data.len();
            let d = Dataset::from_int(&[n], data).unwrap();
            let mut buf = Vec::new();
            encode_dataset(&mut buf, &d).unwrap();
            let back = decode_dataset(&mut buf.as_slice()).unwrap();
            prop_assert_eq!(back, d);
        }
    }
}

//! Binary container for tabulated emitter grids.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length. The format is intentionally simple — no compression, no
//! alignment padding, no self-describing schema: a scalar header map
//! followed by named 4-D extensions of `f64` data, each with its own
//! scalar header (axis-scaling keys live there).

use std::io::{Read, Write};

use indexmap::IndexMap;
use log::debug;

use crate::error::TableError;

/// Container magic.
pub const MAGIC: &[u8; 8] = b"UMBRGRID";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

// ── Primitive codec ─────────────────────────────────────────────

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), TableError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), TableError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), TableError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), TableError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, TableError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, TableError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, TableError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_str(r: &mut dyn Read) -> Result<String, TableError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| TableError::MalformedExtension {
        detail: format!("invalid UTF-8 name: {e}"),
    })
}

// ── Extension ───────────────────────────────────────────────────

/// A named 4-D dense array with its own scalar header.
#[derive(Clone, Debug, PartialEq)]
pub struct Extension {
    /// Extension name (e.g. `"emissquant"`, `"velocity"`).
    pub name: String,
    /// Per-extension scalar header (axis-scaling keys such as `CRVAL1`).
    pub header: IndexMap<String, f64>,
    /// Axis lengths, axis 1 first (fastest-varying in `data`).
    pub dims: [usize; 4],
    /// Dense payload, axis-1 fastest.
    pub data: Vec<f64>,
}

impl Extension {
    /// New extension; the payload length must equal the dims product.
    pub fn new(name: impl Into<String>, dims: [usize; 4], data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            header: IndexMap::new(),
            dims,
            data,
        }
    }

    fn expected_len(&self) -> usize {
        self.dims.iter().product()
    }

    fn write(&self, w: &mut dyn Write) -> Result<(), TableError> {
        write_str(w, &self.name)?;
        write_u32_le(w, self.header.len() as u32)?;
        for (key, value) in &self.header {
            write_str(w, key)?;
            write_f64_le(w, *value)?;
        }
        for d in self.dims {
            write_u64_le(w, d as u64)?;
        }
        write_u64_le(w, self.data.len() as u64)?;
        for v in &self.data {
            write_f64_le(w, *v)?;
        }
        Ok(())
    }

    fn read(r: &mut dyn Read) -> Result<Self, TableError> {
        let name = read_str(r)?;
        let n_keys = read_u32_le(r)?;
        let mut header = IndexMap::new();
        for _ in 0..n_keys {
            let key = read_str(r)?;
            let value = read_f64_le(r)?;
            header.insert(key, value);
        }
        let mut dims = [0usize; 4];
        for d in &mut dims {
            *d = read_u64_le(r)? as usize;
        }
        let len = read_u64_le(r)? as usize;
        let expected: usize = dims.iter().product();
        if len != expected {
            return Err(TableError::MalformedExtension {
                detail: format!(
                    "extension '{name}': payload length {len} does not match dims {dims:?}"
                ),
            });
        }
        let mut data = Vec::with_capacity(len);
        for _ in 0..len {
            data.push(read_f64_le(r)?);
        }
        Ok(Self {
            name,
            header,
            dims,
            data,
        })
    }
}

// ── Table ───────────────────────────────────────────────────────

/// A grid-table container: scalar metadata plus named extensions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Top-level scalar metadata (`RepeatPhi`, `Rin`, `Rout`, …).
    pub header: IndexMap<String, f64>,
    /// Extensions in file order.
    pub extensions: Vec<Extension>,
}

impl Table {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mandatory scalar lookup.
    pub fn require(&self, name: &str) -> Result<f64, TableError> {
        self.header
            .get(name)
            .copied()
            .ok_or_else(|| TableError::MissingKey {
                name: name.to_string(),
            })
    }

    /// Mandatory extension lookup.
    pub fn require_extension(&self, name: &str) -> Result<&Extension, TableError> {
        self.extensions
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| TableError::MissingExtension {
                name: name.to_string(),
            })
    }

    /// Serialize to a writer.
    pub fn write(&self, w: &mut dyn Write) -> Result<(), TableError> {
        debug!(
            "writing grid table: {} header keys, {} extensions",
            self.header.len(),
            self.extensions.len()
        );
        w.write_all(MAGIC)?;
        write_u32_le(w, FORMAT_VERSION)?;
        write_u32_le(w, self.header.len() as u32)?;
        for (key, value) in &self.header {
            write_str(w, key)?;
            write_f64_le(w, *value)?;
        }
        write_u32_le(w, self.extensions.len() as u32)?;
        for ext in &self.extensions {
            if ext.data.len() != ext.expected_len() {
                return Err(TableError::MalformedExtension {
                    detail: format!(
                        "extension '{}': payload length {} does not match dims {:?}",
                        ext.name,
                        ext.data.len(),
                        ext.dims
                    ),
                });
            }
            ext.write(w)?;
        }
        Ok(())
    }

    /// Deserialize from a reader.
    pub fn read(r: &mut dyn Read) -> Result<Self, TableError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(TableError::BadMagic);
        }
        let version = read_u32_le(r)?;
        if version != FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion { found: version });
        }
        let n_keys = read_u32_le(r)?;
        let mut header = IndexMap::new();
        for _ in 0..n_keys {
            let key = read_str(r)?;
            let value = read_f64_le(r)?;
            header.insert(key, value);
        }
        let n_ext = read_u32_le(r)?;
        let mut extensions = Vec::with_capacity(n_ext as usize);
        for _ in 0..n_ext {
            extensions.push(Extension::read(r)?);
        }
        debug!(
            "read grid table: {} header keys, {} extensions",
            header.len(),
            extensions.len()
        );
        Ok(Self { header, extensions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Table {
        let mut table = Table::new();
        table.header.insert("Rin".into(), 3.0);
        table.header.insert("Rout".into(), 20.0);
        table.header.insert("Zmin".into(), 0.0);
        table.header.insert("Zmax".into(), 2.0);
        let mut em = Extension::new("emissquant", [2, 3, 1, 2], (0..12).map(f64::from).collect());
        em.header.insert("CRVAL1".into(), 1.0e17);
        em.header.insert("CDELT1".into(), 1.0e15);
        em.header.insert("CRPIX1".into(), 1.0);
        table.extensions.push(em);
        table
            .extensions
            .push(Extension::new("velocity", [3, 3, 1, 2], vec![0.5; 18]));
        table
    }

    #[test]
    fn round_trip_is_identity() {
        let table = sample();
        let mut buf = Vec::new();
        table.write(&mut buf).unwrap();
        let back = Table::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(table, back);
    }

    #[test]
    fn bad_magic_rejected() {
        let err = Table::read(&mut Cursor::new(b"NOTAGRID....".to_vec())).unwrap_err();
        assert!(matches!(err, TableError::BadMagic));
    }

    #[test]
    fn version_mismatch_rejected() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[8] = 0xFF; // corrupt version field
        let err = Table::read(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedVersion { .. }));
    }

    #[test]
    fn payload_dims_mismatch_rejected() {
        let mut table = sample();
        table.extensions[0].data.pop();
        let mut buf = Vec::new();
        let err = table.write(&mut buf).unwrap_err();
        assert!(matches!(err, TableError::MalformedExtension { .. }));
    }

    #[test]
    fn missing_lookups_are_typed() {
        let table = sample();
        assert!(matches!(
            table.require("RepeatPhi"),
            Err(TableError::MissingKey { .. })
        ));
        assert!(matches!(
            table.require_extension("nope"),
            Err(TableError::MissingExtension { .. })
        ));
        assert_eq!(table.require("Rin").unwrap(), 3.0);
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        let err = Table::read(&mut Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, TableError::Io(_)));
    }
}

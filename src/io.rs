//! Safetensors I/O for the assembled dataset.
//!
//! Writer: [`StWriter`] collects named little-endian arrays and writes a
//! single `.safetensors` bundle.  Reader: [`read_bundle`] loads the arrays a
//! [`Dataset`](crate::Dataset) was saved as.
//!
//! Bundle layout:
//!
//! ```text
//! data    F32  [N, T, R]   normalised ROI time series
//! labels  U8   [N]         diagnosis codes
//! ids     U8   [N, W]      ASCII subject ids, NUL-padded to width W
//! __metadata__             sites, target_len, n_regions
//! ```
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use ndarray::Array3;

use crate::dataset::Dataset;
use crate::subject::SubjectId;

// ── Bundle sink ──────────────────────────────────────────────────────────────

/// A container of named arrays.  The dataset hands its arrays to one of
/// these without knowing the on-disk encoding.
pub trait ArrayBundle {
    fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]);
    fn add_u8(&mut self, name: &str, data: &[u8], shape: &[usize]);
    fn add_metadata(&mut self, key: &str, value: &str);
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Simple safetensors file writer for F32 and U8 tensors.
///
/// ```rust,no_run
/// use roiset::io::{ArrayBundle, StWriter};
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &[1.0f32, 2.0, 3.0], &[1, 3]);
/// w.add_u8("labels", &[0, 1, 1], &[3]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header_map.insert("__metadata__".into(), self.metadata.clone().into());
        }
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();

        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

impl ArrayBundle for StWriter {
    fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    fn add_u8(&mut self, name: &str, data: &[u8], shape: &[usize]) {
        self.entries.push((name.to_string(), data.to_vec(), "U8", shape.to_vec()));
    }

    fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

struct Header {
    entries: HashMap<String, serde_json::Value>,
    data_start: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    ensure!(bytes.len() >= 8, "safetensors file too small");
    let n = u64::from_le_bytes(bytes[..8].try_into()?);
    let data_start = usize::try_from(n)
        .ok()
        .and_then(|n| n.checked_add(8))
        .context("safetensors header length overflows")?;
    ensure!(bytes.len() >= data_start, "safetensors header truncated");
    let entries: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..data_start])
            .context("failed to parse safetensors header")?;
    Ok(Header { entries, data_start })
}

impl Header {
    fn tensor<'a>(&self, bytes: &'a [u8], name: &str, dtype: &str) -> Result<(&'a [u8], Vec<usize>)> {
        let entry = self.entries.get(name)
            .with_context(|| format!("missing {name:?} tensor"))?;
        let got = entry["dtype"].as_str().unwrap_or("");
        ensure!(got == dtype, "{name:?}: dtype {got}, expected {dtype}");

        let as_usize = |v: &serde_json::Value| {
            v.as_u64().map(|x| x as usize).with_context(|| format!("{name:?}: bad header"))
        };
        let offsets = entry["data_offsets"].as_array()
            .with_context(|| format!("{name:?}: missing data_offsets"))?;
        ensure!(offsets.len() == 2, "{name:?}: bad data_offsets");
        let s = self.data_start.checked_add(as_usize(&offsets[0])?)
            .with_context(|| format!("{name:?}: data offset overflows"))?;
        let e = self.data_start.checked_add(as_usize(&offsets[1])?)
            .with_context(|| format!("{name:?}: data offset overflows"))?;
        ensure!(s <= e && e <= bytes.len(), "{name:?}: data out of bounds");

        let shape = entry["shape"].as_array()
            .with_context(|| format!("{name:?}: missing shape"))?
            .iter()
            .map(as_usize)
            .collect::<Result<Vec<_>>>()?;
        Ok((&bytes[s..e], shape))
    }

    fn metadata(&self, key: &str) -> Option<&str> {
        self.entries.get("__metadata__")?.get(key)?.as_str()
    }
}

/// Load a bundle written by [`Dataset::save`](crate::Dataset::save).
pub fn read_bundle(path: &Path) -> Result<Dataset> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let header = parse_header(&bytes)?;

    let (raw, shape) = header.tensor(&bytes, "data", "F32")?;
    ensure!(shape.len() == 3, "\"data\": expected 3 dims, got {shape:?}");
    let values: Vec<f32> = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values)?;

    let (raw, shape) = header.tensor(&bytes, "labels", "U8")?;
    ensure!(shape == [data.dim().0] && raw.len() == shape[0], "\"labels\": shape {shape:?}");
    let labels = raw.to_vec();

    let (raw, shape) = header.tensor(&bytes, "ids", "U8")?;
    ensure!(shape.len() == 2 && shape[0] == labels.len(), "\"ids\": shape {shape:?}");
    let ids = if shape[1] == 0 {
        Vec::new()
    } else {
        raw.chunks_exact(shape[1])
            .map(|row| -> Result<SubjectId> {
                let end = row.iter().position(|&b| b == 0).unwrap_or(row.len());
                let text = std::str::from_utf8(&row[..end])?;
                SubjectId::parse(text).with_context(|| format!("bad subject id {text:?}"))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let sites = match header.metadata("sites") {
        Some("") | None => Vec::new(),
        Some(s) => s.split(',').map(str::to_string).collect(),
    };

    if ids.len() != labels.len() {
        bail!("ids/labels length mismatch: {} vs {}", ids.len(), labels.len());
    }
    Ok(Dataset { data, labels, ids, sites })
}

/// Pack ids into a `[N, W]` NUL-padded byte matrix, `W` the longest id.
pub(crate) fn pack_ids(ids: &[SubjectId]) -> (Vec<u8>, usize) {
    let width = ids.iter().map(|id| id.as_str().len()).max().unwrap_or(0);
    let mut out = vec![0u8; ids.len() * width];
    for (row, id) in out.chunks_exact_mut(width.max(1)).zip(ids) {
        row[..id.as_str().len()].copy_from_slice(id.as_str().as_bytes());
    }
    (out, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_eight_byte_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.safetensors");
        let mut w = StWriter::new();
        w.add_u8("a", &[1, 2, 3], &[3]);
        w.add_metadata("k", "v");
        w.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(n % 8, 0);
        assert_eq!(&bytes[8 + n..], &[1, 2, 3]);
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.metadata("k"), Some("v"));
    }

    #[test]
    fn ids_pack_to_longest_width() {
        let ids: Vec<_> = ["1", "123456789"].iter().filter_map(|s| SubjectId::parse(s)).collect();
        let (bytes, width) = pack_ids(&ids);
        assert_eq!(width, 9);
        assert_eq!(&bytes[..9], b"0000001\0\0");
        assert_eq!(&bytes[9..], b"123456789");
    }

    #[test]
    fn truncated_file_is_an_error() {
        assert!(parse_header(&[1, 2, 3]).is_err());
        assert!(parse_header(&64u64.to_le_bytes()).is_err());
    }

    #[test]
    fn huge_header_length_is_an_error() {
        let mut bytes = (u64::MAX - 3).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn huge_data_offset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.safetensors");
        let header = format!(
            r#"{{"data":{{"dtype":"F32","shape":[1,1,1],"data_offsets":[{},{}]}}}}"#,
            u64::MAX - 1,
            u64::MAX
        );
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let err = read_bundle(&path).unwrap_err();
        assert!(format!("{err:#}").contains("overflows"), "{err:#}");
    }
}

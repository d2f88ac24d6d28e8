//! Per-site phenotype tables.
//!
//! Each site ships a CSV with dozens of columns; only the subject id and the
//! diagnosis code are kept.  Rows are projected to `{SubjectId, u8}` as they
//! are read so nothing untyped travels further down the pipeline.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use crate::config::LabelMode;
use crate::subject::SubjectId;

/// Diagnosis lookup for one site, keyed by canonical id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phenotype {
    labels: BTreeMap<SubjectId, u8>,
}

impl Phenotype {
    pub fn get(&self, id: &SubjectId) -> Option<u8> {
        self.labels.get(id).copied()
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &SubjectId> {
        self.labels.keys()
    }
}

impl FromIterator<(SubjectId, u8)> for Phenotype {
    fn from_iter<I: IntoIterator<Item = (SubjectId, u8)>>(iter: I) -> Self {
        Self { labels: iter.into_iter().collect() }
    }
}

/// Load the phenotype table at `path`.
///
/// Returns `Ok(None)` when the file does not exist: the site is simply not
/// available.  A file that exists but cannot be read as CSV, or lacks
/// `id_column` / `dx_column`, is an error.
///
/// Rows with an unparseable id or diagnosis (held-out sites write `pending`
/// in the DX column) are skipped and reported with a single warning.
pub fn load_phenotype(
    path: &Path,
    id_column: &str,
    dx_column: &str,
    mode: LabelMode,
) -> Result<Option<Phenotype>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("opening {}", path.display()));
        }
    };
    let table = parse_phenotype(file, id_column, dx_column, mode)
        .with_context(|| format!("reading phenotype table {}", path.display()))?;
    Ok(Some(table))
}

/// Parse a phenotype CSV from any reader.  See [`load_phenotype`].
pub fn parse_phenotype<R: Read>(
    reader: R,
    id_column: &str,
    dx_column: &str,
    mode: LabelMode,
) -> Result<Phenotype> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().context("missing CSV header")?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("column {name:?} not found"))
    };
    let id_idx = column(id_column)?;
    let dx_idx = column(dx_column)?;

    let mut labels = BTreeMap::new();
    let mut skipped = 0usize;
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("CSV row {}", row + 2))?;
        let id = record.get(id_idx).and_then(SubjectId::parse);
        let dx = record.get(dx_idx).and_then(parse_dx);
        match (id, dx) {
            (Some(id), Some(dx)) => {
                let label = mode.apply(dx);
                if let Some(prev) = labels.insert(id.clone(), label) {
                    warn!("subject {id} listed twice; label {prev} replaced by {label}");
                }
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{skipped} phenotype rows without a usable {id_column:?}/{dx_column:?} skipped");
    }
    Ok(Phenotype { labels })
}

fn parse_dx(raw: &str) -> Option<u8> {
    let s = raw.trim();
    s.strip_suffix(".0").unwrap_or(s).parse().ok()
}

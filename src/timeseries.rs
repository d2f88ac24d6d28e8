//! ROI time-series discovery and parsing.
//!
//! A site directory holds one sub-directory per subject; each subject has
//! up to three resting-state segments written as AFNI-style `.1D` text:
//!
//! ```text
//! File                         Sub-brick  Mean_1    Mean_2   ...  Mean_190
//! /path/sfnwmrda0010001.nii.gz 0[0]       -4.0523   12.771   ...  0.3312
//! /path/sfnwmrda0010001.nii.gz 0[1]       -3.9911   12.604   ...  0.2981
//! ```
//!
//! The header row and the two leading metadata columns are discarded,
//! leaving a `[timepoints, regions]` matrix.  Segments present for a subject
//! are concatenated along the time axis in session order.
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::config::PipelineConfig;
use crate::subject::SubjectId;

/// Non-signal columns at the start of every data row.
pub const META_COLUMNS: usize = 2;

/// Concatenated signal per subject for one site, sorted by id.
pub type SiteSignals = BTreeMap<SubjectId, Array2<f32>>;

/// Parse one session file from a reader.
///
/// The first line is a header and is skipped.  Blank lines are ignored.
/// Every other line must hold exactly `META_COLUMNS + n_regions`
/// whitespace-separated fields, the signal ones numeric.  A file without a
/// single data row is rejected.
pub fn parse_roi_timeseries<R: BufRead>(reader: R, n_regions: usize) -> Result<Array2<f32>> {
    let mut values: Vec<f32> = Vec::new();
    let mut n_rows = 0usize;

    for (lineno, line) in reader.lines().enumerate().skip(1) {
        let line = line.with_context(|| format!("line {}", lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut n_fields = 0usize;
        for (col, field) in line.split_whitespace().enumerate() {
            n_fields += 1;
            if col < META_COLUMNS {
                continue;
            }
            let v: f32 = field.parse().with_context(|| {
                format!("line {}, column {}: not a number: {field:?}", lineno + 1, col + 1)
            })?;
            values.push(v);
        }
        if n_fields != META_COLUMNS + n_regions {
            bail!(
                "line {}: expected {} columns, found {n_fields}",
                lineno + 1,
                META_COLUMNS + n_regions
            );
        }
        n_rows += 1;
    }

    if n_rows == 0 {
        bail!("no timepoints after header");
    }
    Ok(Array2::from_shape_vec((n_rows, n_regions), values)?)
}

/// Read one session file.
///
/// `Ok(None)` if the file does not exist, `Err` if it exists but cannot be
/// parsed.
pub fn read_roi_timeseries(path: &Path, n_regions: usize) -> Result<Option<Array2<f32>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("opening {}", path.display())),
    };
    let data = parse_roi_timeseries(BufReader::new(file), n_regions)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(data))
}

/// Load and concatenate every readable segment of one subject.
///
/// Absent segments are skipped silently; malformed ones are logged and
/// skipped.  Returns `None` when no segment could be read.
pub fn load_subject(site: &str, id: &SubjectId, sessions: &[PathBuf], n_regions: usize) -> Option<Array2<f32>> {
    let mut segments: Vec<Array2<f32>> = Vec::with_capacity(sessions.len());
    for path in sessions {
        match read_roi_timeseries(path, n_regions) {
            Ok(Some(seg)) => segments.push(seg),
            Ok(None) => {}
            Err(e) => warn!("site {site}, subject {id}: dropping {}: {e:#}", path.display()),
        }
    }
    match segments.len() {
        0 => None,
        1 => segments.pop(),
        _ => {
            let views: Vec<ArrayView2<f32>> = segments.iter().map(|s| s.view()).collect();
            // Every segment passed the same column check, so shapes agree.
            concatenate(Axis(0), &views).ok()
        }
    }
}

/// Subject directories of a site, keyed and sorted by canonical id.
///
/// `Ok(None)` if the site directory does not exist.  Entries whose name is
/// not a subject id (phenotype CSV, `README`, hidden files) are ignored.
pub fn discover_subjects(site_dir: &Path) -> Result<Option<BTreeMap<SubjectId, PathBuf>>> {
    let entries = match fs::read_dir(site_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("listing {}", site_dir.display())),
    };

    let mut subjects: BTreeMap<SubjectId, PathBuf> = BTreeMap::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("listing {}: skipping entry: {e}", site_dir.display());
                continue;
            }
        };
        // Follows symlinks; unreadable entries count as non-directories.
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(SubjectId::parse) else {
            continue;
        };
        let path = entry.path();
        if let Some(prev) = subjects.get(&id) {
            warn!(
                "{} and {} both map to subject {id}; keeping the first",
                prev.display(),
                path.display()
            );
            continue;
        }
        subjects.insert(id, path);
    }
    Ok(Some(subjects))
}

/// Load every subject of `site` that has at least one readable segment.
///
/// `Ok(None)` if the site directory does not exist.
pub fn load_site_signals(cfg: &PipelineConfig, site: &str) -> Result<Option<SiteSignals>> {
    let Some(subjects) = discover_subjects(&cfg.site_dir(site))? else {
        return Ok(None);
    };

    let mut signals = SiteSignals::new();
    for (id, dir) in subjects {
        let sessions = cfg.session_paths(&dir, &id);
        match load_subject(site, &id, &sessions, cfg.n_regions) {
            Some(ts) => {
                signals.insert(id, ts);
            }
            None => debug!("site {site}, subject {id}: no session files"),
        }
    }
    Ok(Some(signals))
}

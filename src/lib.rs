//! # roiset — multi-site ROI time-series dataset builder
//!
//! `roiset` turns a multi-site resting-state fMRI release (ADHD-200 layout,
//! CC200 atlas) into one labelled tensor bundle ready for model training.
//!
//! ## Pipeline overview
//!
//! ```text
//! <root>/<site>/<site>_phenotypic.csv        <root>/<site>/<id>/*.1D
//!   │                                          │
//!   ├─ phenotype::load_phenotype()             ├─ timeseries::load_site_signals()
//!   │    id → DX                               │    id → [T_i, 190]  (sessions concatenated)
//!   └──────────────┬───────────────────────────┘
//!                  │
//!                  ├─ aggregate::aggregate_site()   intersect ids, fix_length → [N_site, T, 190]
//!                  ├─ DatasetBuilder::push()        one batch per site, in site order
//!                  ├─ DatasetBuilder::finish()      concatenate → [N, T, 190], labels, ids
//!                  └─ Dataset::save()               data / labels / ids → .safetensors
//! ```
//!
//! Failures are contained at the smallest unit: a malformed session file
//! drops that file, a missing phenotype table or site directory drops that
//! site.  Only an empty final dataset (or an internal inconsistency) aborts
//! the build.
//!
//! ## Quick start
//!
//! ```no_run
//! use roiset::{build_dataset, PipelineConfig};
//! use std::path::Path;
//!
//! let cfg = PipelineConfig {
//!     data_root: "/data/adhd200".into(),
//!     target_len: 176,
//!     ..PipelineConfig::default()
//! };
//! let ds = build_dataset(&cfg).unwrap();
//! println!("{} subjects, {:?}", ds.len(), ds.data.dim());
//! ds.save(Path::new("adhd200_cc200.safetensors")).unwrap();
//! ```

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod io;
pub mod normalize;
pub mod phenotype;
pub mod subject;
pub mod timeseries;

use anyhow::Result;
use log::{info, warn};

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use aggregate::{aggregate_site, SiteBatch};
pub use config::{LabelMode, PipelineConfig, ADHD200_SITES, CC200_REGIONS};
pub use dataset::{Dataset, DatasetBuilder};
pub use io::{read_bundle, ArrayBundle, StWriter};
pub use normalize::fix_length;
pub use phenotype::{load_phenotype, parse_phenotype, Phenotype};
pub use subject::SubjectId;
pub use timeseries::{load_site_signals, parse_roi_timeseries, read_roi_timeseries, SiteSignals};

/// Load, align and stack one site.
///
/// Returns `None` when the site contributes nothing: phenotype table or site
/// directory absent, table unreadable, or no subject with both a label and
/// a time series.  Never fails; problems are logged with the site name.
pub fn process_site(cfg: &PipelineConfig, site: &str) -> Option<SiteBatch> {
    let pheno_path = cfg.phenotype_path(site);
    let phenotype = match load_phenotype(&pheno_path, &cfg.id_column, &cfg.dx_column, cfg.label_mode) {
        Ok(Some(p)) => p,
        Ok(None) => {
            info!("{site}: no phenotype file at {}, skipping", pheno_path.display());
            return None;
        }
        Err(e) => {
            warn!("{site}: skipping site: {e:#}");
            return None;
        }
    };

    let signals = match load_site_signals(cfg, site) {
        Ok(Some(s)) => s,
        Ok(None) => {
            info!("{site}: no site directory under {}, skipping", cfg.data_root.display());
            return None;
        }
        Err(e) => {
            warn!("{site}: skipping site: {e:#}");
            return None;
        }
    };

    aggregate_site(site, &signals, &phenotype, cfg.target_len)
}

/// Run the whole pipeline over `cfg.sites` and assemble the dataset.
///
/// # Errors
///
/// Fails only when no site contributed a single subject, or when batches
/// cannot be combined (see [`DatasetBuilder::finish`]).
pub fn build_dataset(cfg: &PipelineConfig) -> Result<Dataset> {
    let mut builder = DatasetBuilder::new();
    for site in &cfg.sites {
        if let Some(batch) = process_site(cfg, site) {
            builder.push(batch);
        }
    }
    info!("{} subjects collected from {} configured sites", builder.n_subjects(), cfg.sites.len());
    builder.finish()
}

//! Per-site alignment of signals with labels.
use log::{info, warn};
use ndarray::{s, Array3};

use crate::normalize::fix_length;
use crate::phenotype::Phenotype;
use crate::subject::SubjectId;
use crate::timeseries::SiteSignals;

/// One site's aligned contribution to the dataset.
///
/// Row `i` of `data`, `labels[i]` and `ids[i]` describe the same subject;
/// rows are in ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteBatch {
    pub site: String,
    /// `[subjects, target_len, regions]`
    pub data: Array3<f32>,
    pub labels: Vec<u8>,
    pub ids: Vec<SubjectId>,
}

impl SiteBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Intersect `signals` with `phenotype`, normalise every kept series to
/// `target_len` rows and stack them.
///
/// Returns `None` when no subject has both a label and a signal.
pub fn aggregate_site(
    site: &str,
    signals: &SiteSignals,
    phenotype: &Phenotype,
    target_len: usize,
) -> Option<SiteBatch> {
    // BTreeMap iteration gives sorted ids.
    let mut valid: Vec<(&SubjectId, u8, _)> = signals
        .iter()
        .filter_map(|(id, ts)| phenotype.get(id).map(|dx| (id, dx, ts)))
        .collect();

    let Some(n_regions) = valid.first().map(|(_, _, ts)| ts.ncols()) else {
        info!("{site}: 0 valid subjects ({} with signal, {} labelled)",
            signals.len(), phenotype.len());
        return None;
    };
    valid.retain(|(id, _, ts)| {
        let ok = ts.ncols() == n_regions;
        if !ok {
            warn!("site {site}, subject {id}: {} regions, expected {n_regions}; excluded", ts.ncols());
        }
        ok
    });
    info!("{site}: {} valid subjects ({} with signal, {} labelled)",
        valid.len(), signals.len(), phenotype.len());

    let mut data = Array3::<f32>::zeros((valid.len(), target_len, n_regions));
    let mut labels = Vec::with_capacity(valid.len());
    let mut ids = Vec::with_capacity(valid.len());
    for (i, (id, dx, ts)) in valid.into_iter().enumerate() {
        data.slice_mut(s![i, .., ..])
            .assign(&fix_length(ts.view(), target_len));
        labels.push(dx);
        ids.push(id.clone());
    }

    Some(SiteBatch { site: site.to_string(), data, labels, ids })
}

//! Global dataset assembly.
//!
//! Site batches are collected in a [`DatasetBuilder`] as they are produced
//! and concatenated once, along the subject axis, by
//! [`DatasetBuilder::finish`].
use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};
use log::warn;
use ndarray::{concatenate, Array3, ArrayView3, Axis};

use crate::aggregate::SiteBatch;
use crate::io::{pack_ids, ArrayBundle, StWriter};
use crate::subject::SubjectId;

/// The final labelled tensor dataset.
///
/// `data[i]`, `labels[i]` and `ids[i]` refer to the same subject.  Rows are
/// ordered by site (processing order), then by id within a site.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// `[subjects, target_len, regions]`
    pub data: Array3<f32>,
    pub labels: Vec<u8>,
    pub ids: Vec<SubjectId>,
    /// Sites that contributed at least one subject, in order.
    pub sites: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn target_len(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_regions(&self) -> usize {
        self.data.dim().2
    }

    /// Hand the three arrays (`data`, `labels`, `ids`) and the site list to
    /// `bundle`.
    pub fn write_to<B: ArrayBundle>(&self, bundle: &mut B) {
        let (n, t, r) = self.data.dim();
        match self.data.as_slice() {
            Some(flat) => bundle.add_f32("data", flat, &[n, t, r]),
            None => {
                let flat: Vec<f32> = self.data.iter().copied().collect();
                bundle.add_f32("data", &flat, &[n, t, r]);
            }
        }
        bundle.add_u8("labels", &self.labels, &[n]);
        let (ids, width) = pack_ids(&self.ids);
        bundle.add_u8("ids", &ids, &[n, width]);

        bundle.add_metadata("sites", &self.sites.join(","));
        bundle.add_metadata("target_len", &t.to_string());
        bundle.add_metadata("n_regions", &r.to_string());
    }

    /// Write the dataset as a safetensors bundle.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        self.write_to(&mut w);
        w.write(path)
    }
}

/// Append-only accumulator of per-site batches.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    batches: Vec<SiteBatch>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one site's batch.  Empty batches are ignored.
    pub fn push(&mut self, batch: SiteBatch) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    /// Subjects collected so far.
    pub fn n_subjects(&self) -> usize {
        self.batches.iter().map(SiteBatch::len).sum()
    }

    /// Concatenate every batch into one [`Dataset`].
    ///
    /// A subject id already contributed by an earlier site is dropped from
    /// the later batch with a warning; the first occurrence is kept.
    ///
    /// # Errors
    ///
    /// * no subject was collected at all;
    /// * two batches disagree on `(target_len, regions)`.
    pub fn finish(self) -> Result<Dataset> {
        let Some(first) = self.batches.first() else {
            bail!("no subjects with both a label and a time series in any site");
        };
        let (_, t, r) = first.data.dim();
        for b in &self.batches {
            let (_, bt, br) = b.data.dim();
            if (bt, br) != (t, r) {
                bail!("site {}: batch shape ({bt}, {br}) differs from ({t}, {r})", b.site);
            }
        }

        let mut owner: HashMap<SubjectId, String> = HashMap::new();
        let mut batches = Vec::with_capacity(self.batches.len());
        for b in self.batches {
            let keep: Vec<usize> = (0..b.len())
                .filter(|&i| match owner.get(&b.ids[i]) {
                    Some(site) => {
                        warn!("subject {} found in site {site} and again in site {}; keeping {site}",
                            b.ids[i], b.site);
                        false
                    }
                    None => true,
                })
                .collect();
            for &i in &keep {
                owner.insert(b.ids[i].clone(), b.site.clone());
            }
            if keep.len() == b.len() {
                batches.push(b);
            } else if !keep.is_empty() {
                batches.push(SiteBatch {
                    data: b.data.select(Axis(0), &keep),
                    labels: keep.iter().map(|&i| b.labels[i]).collect(),
                    ids: keep.iter().map(|&i| b.ids[i].clone()).collect(),
                    site: b.site,
                });
            }
        }

        let views: Vec<ArrayView3<f32>> = batches.iter().map(|b| b.data.view()).collect();
        let data = concatenate(Axis(0), &views)?;
        let mut labels = Vec::with_capacity(data.dim().0);
        let mut ids = Vec::with_capacity(data.dim().0);
        let mut sites = Vec::with_capacity(batches.len());
        for b in batches {
            labels.extend(b.labels);
            ids.extend(b.ids);
            sites.push(b.site);
        }

        Ok(Dataset { data, labels, ids, sites })
    }
}

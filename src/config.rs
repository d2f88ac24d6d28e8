//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter of the dataset build.
//! The defaults describe the ADHD-200 preprocessed release (Athena pipeline,
//! CC200 atlas) laid out one directory per site.
use std::path::{Path, PathBuf};

use crate::subject::SubjectId;

/// Number of regions in the CC200 atlas after the Athena pipeline drops
/// empty parcels.
pub const CC200_REGIONS: usize = 190;

/// Sites of the ADHD-200 release, in processing order.
pub const ADHD200_SITES: &[&str] = &[
    "Peking_1",
    "Peking_2",
    "Peking_3",
    "KKI",
    "NYU",
    "NeuroIMAGE",
    "OHSU",
    "Pittsburgh",
    "WashU",
    "Brown",
];

/// How diagnosis codes are turned into labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// Keep the DX code as written (`0` control, `1..=3` ADHD subtypes).
    #[default]
    MultiClass,
    /// Collapse every non-zero code to `1`.
    Binary,
}

impl LabelMode {
    pub fn apply(self, dx: u8) -> u8 {
        match self {
            LabelMode::MultiClass => dx,
            LabelMode::Binary => u8::from(dx != 0),
        }
    }
}

/// Configuration for a full dataset build.
///
/// All fields are `pub` so a caller can override a few with struct-update
/// syntax:
///
/// ```
/// use roiset::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     data_root: "/data/adhd200".into(),
///     sites: vec!["KKI".into(), "NYU".into()],
///     target_len: 120,
///     ..PipelineConfig::default()
/// };
/// assert_eq!(cfg.phenotype_path("KKI").to_str().unwrap(),
///            "/data/adhd200/KKI/KKI_phenotypic.csv");
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding one sub-directory per site.
    pub data_root: PathBuf,

    /// Sites to process, in order.  Output rows follow this order.
    pub sites: Vec<String>,

    /// Fixed number of timepoints `T` every subject is padded or truncated to.
    ///
    /// Default: `176`.
    pub target_len: usize,

    /// Number of ROI columns expected in each session file, after the two
    /// metadata columns.
    ///
    /// Default: [`CC200_REGIONS`].
    pub n_regions: usize,

    /// Phenotype CSV location relative to the site directory.
    /// `{site}` is replaced by the site name.
    pub phenotype_file: String,

    /// Header of the identifier column in the phenotype CSV.
    pub id_column: String,

    /// Header of the diagnosis column in the phenotype CSV.
    pub dx_column: String,

    /// Session file names, in concatenation order.  `{id}` is replaced by the
    /// canonical subject id.
    pub session_files: Vec<String>,

    /// Label mapping applied to raw DX codes.
    pub label_mode: LabelMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            sites: ADHD200_SITES.iter().map(|s| s.to_string()).collect(),
            target_len: 176,
            n_regions: CC200_REGIONS,
            phenotype_file: "{site}_phenotypic.csv".into(),
            id_column: "ScanDir ID".into(),
            dx_column: "DX".into(),
            session_files: (1..=3)
                .map(|k| format!("sfnwmrda{{id}}_session_1_rest_{k}_cc200_TCs.1D"))
                .collect(),
            label_mode: LabelMode::default(),
        }
    }
}

impl PipelineConfig {
    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.data_root.join(site)
    }

    pub fn phenotype_path(&self, site: &str) -> PathBuf {
        self.site_dir(site)
            .join(self.phenotype_file.replace("{site}", site))
    }

    /// Candidate session files for one subject, in concatenation order.
    pub fn session_paths(&self, subject_dir: &Path, id: &SubjectId) -> Vec<PathBuf> {
        self.session_files
            .iter()
            .map(|tpl| subject_dir.join(tpl.replace("{id}", id.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_names() {
        let cfg = PipelineConfig::default();
        let id = SubjectId::parse("10001").unwrap();
        let paths = cfg.session_paths(Path::new("s"), &id);
        assert_eq!(paths.len(), 3);
        assert_eq!(
            paths[2].file_name().unwrap().to_str().unwrap(),
            "sfnwmrda0010001_session_1_rest_3_cc200_TCs.1D"
        );
    }

    #[test]
    fn binary_label_mode() {
        let codes: Vec<u8> = [0, 1, 2, 3].iter().map(|&d| LabelMode::Binary.apply(d)).collect();
        assert_eq!(codes, [0, 1, 1, 1]);
        assert_eq!(LabelMode::MultiClass.apply(3), 3);
    }
}

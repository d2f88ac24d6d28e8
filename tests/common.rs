/// Shared helpers: build a synthetic multi-site tree on disk.
use std::fs;
use std::path::{Path, PathBuf};

use roiset::PipelineConfig;
use tempfile::TempDir;

#[allow(unused)]
pub const N_REGIONS: usize = 4;

/// A temporary data root plus a config pointing at it.
pub struct Fixture {
    pub dir: TempDir,
    pub cfg: PipelineConfig,
}

#[allow(unused)]
impl Fixture {
    pub fn new(sites: &[&str], target_len: usize) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = PipelineConfig {
            data_root: dir.path().to_path_buf(),
            sites: sites.iter().map(|s| s.to_string()).collect(),
            target_len,
            n_regions: N_REGIONS,
            ..PipelineConfig::default()
        };
        Self { dir, cfg }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<site>/<site>_phenotypic.csv` with `(raw id, raw DX)` rows.
    pub fn phenotype(&self, site: &str, rows: &[(&str, &str)]) {
        let mut csv = String::from("ScanDir ID,Site,Gender,Age,DX\n");
        for (id, dx) in rows {
            csv += &format!("{id},1,0,10.5,{dx}\n");
        }
        let path = self.cfg.phenotype_path(site);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, csv).unwrap();
    }

    /// Write `text` verbatim as the site's phenotype CSV.
    pub fn raw_phenotype(&self, site: &str, text: &str) {
        let path = self.cfg.phenotype_path(site);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    /// Create an (initially empty) subject directory named exactly `dir_name`.
    pub fn subject_dir(&self, site: &str, dir_name: &str) -> PathBuf {
        let p = self.root().join(site).join(dir_name);
        fs::create_dir_all(&p).unwrap();
        p
    }

    /// Write session `k` (1-based) for subject `id` with `n_t` rows whose
    /// value is `base + t` in every region.
    pub fn session(&self, site: &str, id: &str, k: usize, n_t: usize, base: f32) {
        let dir = self.subject_dir(site, id);
        fs::write(session_path(&dir, id, k), session_text(n_t, base)).unwrap();
    }

    /// Write raw text as session `k` of subject `id`.
    pub fn raw_session(&self, site: &str, id: &str, k: usize, text: &str) {
        let dir = self.subject_dir(site, id);
        fs::write(session_path(&dir, id, k), text).unwrap();
    }
}

fn session_path(dir: &Path, id: &str, k: usize) -> PathBuf {
    dir.join(format!("sfnwmrda{id}_session_1_rest_{k}_cc200_TCs.1D"))
}

#[allow(unused)]
pub fn session_text(n_t: usize, base: f32) -> String {
    let mut s = String::from("File\tSub-brick");
    for r in 1..=N_REGIONS {
        s += &format!("\tMean_{r}");
    }
    s.push('\n');
    for t in 0..n_t {
        s += &format!("/data/sfnwmrda.nii.gz\t0[{t}]");
        for _ in 0..N_REGIONS {
            s += &format!("\t{}", base + t as f32);
        }
        s.push('\n');
    }
    s
}

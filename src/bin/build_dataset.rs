/// build_dataset: walk every configured site under `--data-root`, align ROI
/// time series with phenotype labels, and write one safetensors bundle.
///
/// Output keys:
///   data     [N, T, R]  f32  subjects padded/truncated to T timepoints
///   labels   [N]        u8   DX codes (or 0/1 with --binary)
///   ids      [N, W]     u8   ASCII subject ids, NUL-padded
///
/// Sites are skipped, not fatal, when their phenotype table or directory is
/// missing.  Set `RUST_LOG=debug` to see excluded subjects.
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use roiset::{build_dataset, LabelMode, PipelineConfig};

#[derive(Parser)]
#[command(name = "build_dataset", about = "Assemble a multi-site ROI time-series dataset")]
struct Args {
    /// Directory holding one sub-directory per site
    #[arg(long)]
    data_root: PathBuf,

    /// Output .safetensors path
    #[arg(long)]
    output: PathBuf,

    /// Sites to process, comma-separated, in order (default: the ADHD-200 sites)
    #[arg(long, value_delimiter = ',')]
    sites: Vec<String>,

    /// Timepoints per subject after padding/truncation (default: 176)
    #[arg(long, default_value_t = 176)]
    target_len: usize,

    /// ROI columns per session file (default: 190, CC200)
    #[arg(long, default_value_t = roiset::CC200_REGIONS)]
    n_regions: usize,

    /// Collapse ADHD subtypes into a single positive class
    #[arg(long)]
    binary: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = PipelineConfig {
        data_root: args.data_root,
        target_len: args.target_len,
        n_regions: args.n_regions,
        label_mode: if args.binary { LabelMode::Binary } else { LabelMode::MultiClass },
        ..PipelineConfig::default()
    };
    if !args.sites.is_empty() {
        cfg.sites = args.sites;
    }

    let ds = build_dataset(&cfg)?;
    println!("Assembled {} subjects from {} sites, tensor {:?}",
        ds.len(), ds.sites.len(), ds.data.dim());

    ds.save(&args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}

/// inspect_bundle: print a summary of a dataset bundle written by
/// `build_dataset`.
///
/// Output:
///   shape         [N, T, R]
///   sites         in row order
///   label counts  per DX code
///   padded rows   subjects whose last timepoint is all-zero
use anyhow::Result;
use clap::Parser;
use ndarray::s;
use std::collections::BTreeMap;
use std::path::PathBuf;

use roiset::read_bundle;

#[derive(Parser, Debug)]
#[command(name = "inspect_bundle")]
struct Args {
    /// Bundle written by build_dataset.
    bundle: PathBuf,

    /// Also list every subject id with its label.
    #[arg(long)]
    ids: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let ds = read_bundle(&args.bundle)?;

    println!("{}", args.bundle.display());
    println!("  shape   {:?}", ds.data.dim());
    println!("  sites   {}", ds.sites.join(", "));

    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for &dx in &ds.labels {
        *counts.entry(dx).or_default() += 1;
    }
    for (dx, n) in &counts {
        println!("  DX={dx}   {n}");
    }

    let t = ds.target_len();
    let padded = if t == 0 {
        0
    } else {
        (0..ds.len())
            .filter(|&i| ds.data.slice(s![i, t - 1, ..]).iter().all(|&v| v == 0.0))
            .count()
    };
    println!("  padded  {padded} of {} subjects end in a zero timepoint", ds.len());

    if args.ids {
        for (id, dx) in ds.ids.iter().zip(&ds.labels) {
            println!("  {id}  {dx}");
        }
    }
    Ok(())
}

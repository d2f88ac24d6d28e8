mod common;
use common::{Fixture, N_REGIONS};
use roiset::{build_dataset, read_bundle, ArrayBundle, StWriter};

#[test]
fn saved_dataset_reads_back_identically() {
    let fx = Fixture::new(&["B", "A"], 12);
    fx.phenotype("B", &[("2", "1"), ("1", "0")]);
    fx.session("B", "0000001", 1, 7, 0.5);
    fx.session("B", "0000002", 1, 20, -3.25);
    fx.phenotype("A", &[("1234567", "3")]);
    fx.session("A", "1234567", 1, 12, 100.0);

    let ds = build_dataset(&fx.cfg).unwrap();
    let path = fx.root().join("out.safetensors");
    ds.save(&path).unwrap();

    let back = read_bundle(&path).unwrap();
    assert_eq!(back.ids, ds.ids);
    assert_eq!(back.labels, ds.labels);
    assert_eq!(back.data.dim(), ds.data.dim());
    for (&got, &want) in back.data.iter().zip(ds.data.iter()) {
        approx::assert_abs_diff_eq!(got, want, epsilon = 1e-6_f32);
    }
    approx::assert_abs_diff_eq!(back.data[[0, 6, 0]], 6.5, epsilon = 1e-6_f32);
    approx::assert_abs_diff_eq!(back.data[[1, 11, 3]], 7.75, epsilon = 1e-6_f32);
    assert_eq!(back.data.dim(), (3, 12, N_REGIONS));
    assert_eq!(back.target_len(), 12);
    assert_eq!(back.n_regions(), N_REGIONS);
    assert_eq!(back.sites, ["B", "A"]);
}

#[test]
fn missing_tensor_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.safetensors");
    let mut w = StWriter::new();
    w.add_f32("data", &[0.0; 6], &[1, 2, 3]);
    w.add_u8("labels", &[1], &[1]);
    w.write(&path).unwrap();

    let err = read_bundle(&path).unwrap_err();
    assert!(format!("{err:#}").contains("\"ids\""), "{err:#}");
}

#[test]
fn wrong_dtype_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.safetensors");
    let mut w = StWriter::new();
    w.add_u8("data", &[0; 6], &[1, 2, 3]);
    w.write(&path).unwrap();

    let err = read_bundle(&path).unwrap_err();
    assert!(format!("{err:#}").contains("expected F32"), "{err:#}");
}

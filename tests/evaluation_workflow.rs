use ndarray::{array, Array2};
use rom_eval::io::npz::{write_npz_f64, SnapshotArchive};
use rom_eval::{
    compute_error, save_error, tensor_scaling, AeParams, ErrorSummary, FittedScaling, InverseScaler, ScalerKind,
    ScalingType,
};
use std::fs;

fn params_in(dir: &std::path::Path, scaling_type: ScalingType) -> AeParams {
    AeParams::new(
        format!("{}/", dir.display()),
        "run7",
        scaling_type,
        ScalerKind::MinMax,
    )
}

fn read_lines(path: &std::path::Path) -> Vec<f64> {
    fs::read_to_string(path)
        .expect("read saved errors")
        .lines()
        .map(|line| line.parse::<f64>().expect("numeric line"))
        .collect()
}

#[test]
fn save_error_writes_max_mean_min_of_relative_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = params_in(dir.path(), ScalingType::Sample);

    let path = save_error(&[2.0, 4.0, 6.0], &[2.0, 2.0, 3.0], &params, "U").expect("save");
    assert_eq!(path, dir.path().join("relative_errorsrun7U.txt"));

    let text = fs::read_to_string(&path).expect("read");
    assert_eq!(text.lines().count(), 3);
    assert!(text.starts_with("2.000000000000000000e+00\n"));
    assert_eq!(read_lines(&path), vec![2.0, 5.0 / 3.0, 1.0]);
}

#[test]
fn save_error_overwrites_previous_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = params_in(dir.path(), ScalingType::Sample);
    let path = params.relative_error_path("V");
    fs::write(&path, "stale\nstale\nstale\nstale\n").expect("seed file");

    save_error(&[1.0], &[4.0], &params, "V").expect("save");
    assert_eq!(read_lines(&path), vec![0.25, 0.25, 0.25]);
}

#[test]
fn save_error_keeps_unbounded_relative_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = params_in(dir.path(), ScalingType::Sample);
    let path = save_error(&[3.0, 1.0], &[0.0, 2.0], &params, "p").expect("save");
    let text = fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["inf", "inf", "5.000000000000000000e-01"]);
}

#[test]
fn save_error_into_missing_directory_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = AeParams::new(
        format!("{}/absent/", dir.path().display()),
        "run7",
        ScalingType::Sample,
        ScalerKind::MinMax,
    );
    assert!(save_error(&[1.0], &[1.0], &params, "U").is_err());
}

#[test]
fn scaled_archive_round_trip_matches_physical_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = params_in(dir.path(), ScalingType::FeatureSample);

    let truth: Array2<f64> = array![
        [1.0, 1.5, 2.0, 2.5],
        [0.0, -1.0, 4.0, 3.0],
        [7.0, 6.0, 5.0, 9.0]
    ];
    let (scaler, scaled_truth) =
        tensor_scaling(truth.view(), params.scaling_type, params.scaler_number).expect("scale");
    let physical_recon = &truth + 0.5;
    let scaled_recon = scaler.transform(physical_recon.view()).expect("transform");

    let scaler_path = dir.path().join("scaler.json");
    scaler.write_json(&scaler_path).expect("write scaler");
    let npz_path = dir.path().join("predictions.npz");
    write_npz_f64(
        &npz_path,
        &[("ground_truth", scaled_truth), ("prediction", scaled_recon)],
    )
    .expect("write npz");

    let archive = SnapshotArchive::load(&npz_path, &["ground_truth", "prediction"]).expect("load");
    let loaded_scaler = FittedScaling::from_path(&scaler_path).expect("load scaler");
    let scaler_ref: &dyn InverseScaler = &loaded_scaler;
    let errors = compute_error(
        archive.require("prediction").expect("prediction").view(),
        archive.require("ground_truth").expect("ground truth").view(),
        scaler_ref,
        &params,
    )
    .expect("compute");

    assert_eq!(errors.len(), 4);
    // every node is off by 0.5, so each column error is 0.5 * sqrt(3)
    let expected_error = 0.5 * 3.0f64.sqrt();
    for (j, (e, n)) in errors.error().iter().zip(errors.norm()).enumerate() {
        assert!((e - expected_error).abs() < 1e-9, "snapshot {j}: {e}");
        let column = truth.column(j);
        let expected_norm = column.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((n - expected_norm).abs() < 1e-9, "snapshot {j}: {n}");
    }

    let summary = ErrorSummary::from_sequences(errors.error(), errors.norm(), "U").expect("summary");
    let report_path = dir.path().join("reports").join("U.json");
    summary.write_json(&report_path).expect("write report");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("read report")).expect("parse report");
    assert_eq!(report["field"], "U");
    assert_eq!(report["snapshots"], 4);
    assert!(report["relative"]["max"].as_f64().expect("max") >= report["relative"]["min"].as_f64().expect("min"));
}

#[test]
fn params_file_drives_output_location() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params_path = dir.path().join("params.json");
    let json = format!(
        r#"{{"net_dir": "{}/", "net_run": "_a1", "scaling_type": 1, "scaler_number": 1}}"#,
        dir.path().display()
    );
    fs::write(&params_path, json).expect("write params");

    let params = AeParams::from_path(&params_path).expect("params");
    let path = save_error(&[1.0, 3.0], &[2.0, 2.0], &params, "T").expect("save");
    assert!(path.ends_with("relative_errors_a1T.txt"));
    assert_eq!(read_lines(&path), vec![1.5, 1.0, 0.5]);
}

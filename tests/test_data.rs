//! Integration test: dataset preparation and validation

use cardio_mlops::data::{
    clean, load_dataset, parse_raw, prepare_dataset, render_plots, validate_dataset, RawSource,
};
use cardio_mlops::features::{FEATURE_COLUMNS, TARGET_COLUMN};
use cardio_mlops::CardioError;

const RAW: &str = "\
63.0,1.0,1.0,145.0,233.0,1.0,2.0,150.0,0.0,2.3,3.0,0.0,6.0,0
67.0,1.0,4.0,160.0,286.0,0.0,2.0,108.0,1.0,1.5,2.0,3.0,3.0,2
67.0,1.0,4.0,120.0,229.0,0.0,2.0,129.0,1.0,2.6,2.0,2.0,7.0,1
37.0,1.0,3.0,130.0,250.0,0.0,0.0,187.0,0.0,3.5,3.0,0.0,3.0,0
41.0,0.0,2.0,130.0,204.0,0.0,2.0,172.0,0.0,1.4,1.0,0.0,3.0,0
56.0,1.0,2.0,120.0,236.0,0.0,0.0,178.0,0.0,0.8,1.0,0.0,3.0,0
62.0,0.0,4.0,140.0,268.0,0.0,2.0,160.0,0.0,3.6,3.0,2.0,3.0,3
57.0,0.0,4.0,120.0,354.0,0.0,0.0,163.0,1.0,0.6,1.0,0.0,3.0,0
63.0,1.0,4.0,130.0,254.0,0.0,2.0,147.0,0.0,1.4,2.0,1.0,7.0,2
53.0,1.0,4.0,140.0,203.0,1.0,2.0,155.0,1.0,3.1,3.0,0.0,7.0,1
53.0,0.0,3.0,128.0,216.0,0.0,2.0,115.0,0.0,0.0,1.0,0.0,?,0
38.0,1.0,3.0,138.0,175.0,0.0,0.0,173.0,0.0,0.0,1.0,?,3.0,0
";

#[tokio::test]
async fn test_prepare_from_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("processed.cleveland.data");
    std::fs::write(&raw_path, RAW).unwrap();
    let output = dir.path().join("data").join("heart.csv");

    let summary = prepare_dataset(&RawSource::parse(raw_path.to_str().unwrap()), &output)
        .await
        .unwrap();

    assert_eq!(summary.raw_rows, 12);
    assert_eq!(summary.dropped_rows, 2);
    assert_eq!(summary.rows, 10);
    assert_eq!(summary.positives, 5);
    assert!(output.exists());

    let df = load_dataset(&output).unwrap();
    assert_eq!(df.height(), 10);
    validate_dataset(&df).unwrap();
}

#[test]
fn test_cleaned_frame_has_canonical_columns() {
    let df = clean(&parse_raw(RAW).unwrap()).unwrap();

    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    for column in FEATURE_COLUMNS {
        assert!(names.contains(&column.to_string()), "missing {}", column);
    }
    assert!(names.contains(&TARGET_COLUMN.to_string()));

    for column in df.get_columns() {
        assert_eq!(column.null_count(), 0, "{} has nulls", column.name());
    }

    let target: Vec<i64> = df
        .column(TARGET_COLUMN)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert!(target.iter().all(|t| *t == 0 || *t == 1));
    assert_eq!(target, vec![0, 1, 1, 0, 0, 0, 1, 0, 1, 1]);
}

#[test]
fn test_validate_rejects_missing_target() {
    let df = clean(&parse_raw(RAW).unwrap()).unwrap().drop(TARGET_COLUMN).unwrap();
    assert!(matches!(validate_dataset(&df), Err(CardioError::DataError(_))));
}

#[tokio::test]
async fn test_missing_raw_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let source = RawSource::File(dir.path().join("absent.data"));
    assert!(prepare_dataset(&source, dir.path().join("out.csv")).await.is_err());
}

#[test]
fn test_plots_for_prepared_data() {
    let df = clean(&parse_raw(RAW).unwrap()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let paths = render_plots(&df, dir.path().join("plots")).unwrap();

    for path in [&paths.class_balance, &paths.histograms, &paths.correlation] {
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.contains("<svg"));
    }
}

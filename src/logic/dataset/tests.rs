use super::*;
use crate::logic::features::{encode, schema_for};

#[test]
fn test_generation_is_byte_identical() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    generate_all(dir_a.path(), 300, 42).unwrap();
    generate_all(dir_b.path(), 300, 42).unwrap();

    for task in TaskKind::ALL {
        let a = std::fs::read(dataset_path(dir_a.path(), task)).unwrap();
        let b = std::fs::read(dataset_path(dir_b.path(), task)).unwrap();
        assert_eq!(a, b, "{} dataset differs between runs", task);
    }
}

#[test]
fn test_rerun_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let first = generate_one(dir.path(), TaskKind::Risk, 100, 1).unwrap();
    let second = generate_one(dir.path(), TaskKind::Risk, 100, 1).unwrap();
    assert_eq!(first.fingerprint, second.fingerprint);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |x| x == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_headers_cover_schema_features_and_label() {
    let dir = tempfile::tempdir().unwrap();
    generate_all(dir.path(), 20, 42).unwrap();

    for task in TaskKind::ALL {
        let schema = schema_for(task);
        let header = writer::read_header(&dataset_path(dir.path(), task)).unwrap();
        for feature in &schema.ordered_feature_names {
            assert!(header.contains(feature), "{} header missing {}", task, feature);
        }
        assert!(header.contains(&schema.label_column));
    }
}

#[test]
fn test_round_trip_rows_encode() {
    let dir = tempfile::tempdir().unwrap();
    generate_all(dir.path(), 50, 9).unwrap();

    let rows: Vec<DiseaseRow> = read_dataset(&dataset_path(dir.path(), TaskKind::Disease)).unwrap();
    assert_eq!(rows.len(), 50);
    let schema = schema_for(TaskKind::Disease);
    for row in &rows {
        let vector = encode(schema, &row.to_record()).unwrap();
        assert_eq!(vector.len(), schema.feature_count());
        assert_eq!(vector.values[0], f64::from(row.age));
    }

    let rows: Vec<NoShowRow> = read_dataset(&dataset_path(dir.path(), TaskKind::NoShow)).unwrap();
    assert_eq!(rows, generator::generate_noshow_dataset(50, 9));
}

#[test]
fn test_read_missing_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result: Result<Vec<RiskRow>, _> = read_dataset(&dir.path().join("nope.csv"));
    assert!(result.is_err());
}

#[test]
fn test_empty_dataset_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("risk_dataset.csv");
    write_dataset::<RiskRow>(&path, &[]).unwrap();
    let result: Result<Vec<RiskRow>, _> = read_dataset(&path);
    assert!(matches!(result, Err(DatasetError::Empty(_))));
}

//! Integration test: Full pipeline (load → clean → reduce → render → store)

use std::fs;

use polars::prelude::*;
use visualdata::prelude::*;
use visualdata::frame::numeric_subset;

fn write_points(dir: &std::path::Path, name: &str, rows: usize) {
    let mut csv = String::from("a;b;c;d;e;species\n");
    for i in 0..rows {
        let x = i as f64;
        csv.push_str(&format!(
            "{};{};{};{};{};{}\n",
            x,
            (x * 0.3).sin(),
            x * 2.0 + 1.0,
            (i % 7) as f64,
            (x * 0.1).cos(),
            if i % 2 == 0 { "setosa" } else { "virginica" }
        ));
    }
    fs::write(dir.join(name), csv).unwrap();
}

fn create_numeric_frame(rows: usize) -> Frame {
    let cols: Vec<Column> = (0..5)
        .map(|j| {
            let values: Vec<f64> = (0..rows)
                .map(|i| ((i * (j + 3)) % 23) as f64 + (i as f64 * 0.01) * j as f64)
                .collect();
            Column::new(format!("f{}", j).into(), values)
        })
        .collect();
    Frame::new(DataFrame::new(cols).unwrap())
}

#[test]
fn test_linear_scenario_100_rows() {
    let request = ReductionRequest::new(ReductionMethod::Linear, TargetDim::Two);
    let result = Orchestrator::new().run(&create_numeric_frame(100), &request).unwrap();

    assert_eq!(result.coordinate_columns, vec!["PC_1", "PC_2"]);
    assert_eq!(result.frame.width(), 2);
    assert_eq!(result.frame.height(), 100);
    assert_eq!(result.frame.keys(), (0..100u64).collect::<Vec<_>>().as_slice());
}

#[test]
fn test_missing_label_produces_no_artifact() {
    let store = MemoryArtifactStore::new();
    let request = ReductionRequest::new(ReductionMethod::Linear, TargetDim::Two).with_label("color");

    let outcome = Orchestrator::new()
        .run(&create_numeric_frame(30), &request)
        .and_then(|result| ScatterPlot::default().render(&result))
        .and_then(|html| store.store(&html));

    assert!(matches!(outcome, Err(VisualDataError::LabelColumnNotFound(c)) if c == "color"));
    assert!(store.is_empty());
}

#[test]
fn test_perplexity_boundary() {
    let rows = 30;
    let frame = create_numeric_frame(rows);

    let at_rows = ReductionRequest::new(ReductionMethod::ProbabilityEmbedding, TargetDim::Two)
        .with_params(ReductionParams::default().with_perplexity(rows as f64).with_random_state(3));
    assert!(matches!(
        Orchestrator::new().run(&frame, &at_rows),
        Err(VisualDataError::InvalidHyperparameter { .. })
    ));

    let below_rows = ReductionRequest::new(ReductionMethod::ProbabilityEmbedding, TargetDim::Two)
        .with_params(ReductionParams::default().with_perplexity((rows - 1) as f64).with_random_state(3));
    let result = Orchestrator::new().run(&frame, &below_rows).unwrap();
    assert_eq!(result.coordinate_columns, vec!["TSNE_1", "TSNE_2"]);
    assert_eq!(result.frame.height(), rows);
}

#[test]
fn test_label_alignment_after_cleaning() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("gaps.csv"),
        "x,y,z,tag\n1,2,3,a\n,5,6,b\n7,1,9,c\n10,,12,d\n13,4,2,e\n16,9,5,f\n",
    )
    .unwrap();

    let raw = DataLoader::new(tmp.path()).load_frame("gaps.csv").unwrap();
    let request = ReductionRequest::new(ReductionMethod::Linear, TargetDim::Two).with_label("tag");
    let result = Orchestrator::new().run(&raw, &request).unwrap();

    let cleaned = Cleaner::new(CleaningPolicy::drop_missing_only()).clean(&raw).unwrap();
    let numeric = numeric_subset(&cleaned).unwrap();
    assert_eq!(result.frame.keys(), numeric.keys());
    assert_eq!(result.frame.keys(), &[0, 2, 4, 5]);
    assert!(result.frame.height() <= raw.height());

    let tags: Vec<String> = result
        .frame
        .column("tag")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(tags, vec!["a", "c", "e", "f"]);
}

#[test]
fn test_cleaner_idempotent_on_loaded_data() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("dup.csv"),
        "a,b,s\n1,2,x\n1,2,x\n,3,y\n4,,z\n5,6,\n",
    )
    .unwrap();
    // The first row only duplicates the others once its gap is filled.
    fs::write(tmp.path().join("fill.csv"), "a,b\n1,\n1,2\n1,2\n").unwrap();
    let loader = DataLoader::new(tmp.path());

    for name in ["dup.csv", "fill.csv"] {
        let raw = loader.load_frame(name).unwrap();
        for policy in [
            CleaningPolicy::default().with_drop_duplicates(true).with_drop_missing(true),
            CleaningPolicy::default().with_drop_duplicates(true).with_imputation(Imputation::Mean),
            CleaningPolicy::default().with_drop_duplicates(true).with_imputation(Imputation::Median),
            CleaningPolicy::default().with_imputation(Imputation::Constant),
        ] {
            let cleaner = Cleaner::new(policy);
            let once = cleaner.clean(&raw).unwrap();
            let (twice, report) = cleaner.clean_with_report(&once).unwrap();
            assert_eq!(once, twice, "{} with {:?}", name, policy);
            assert_eq!(report.values_imputed, 0);
            assert_eq!(report.rows_before, report.rows_after);
        }
    }
}

#[test]
fn test_numeric_projection_survives_drop_missing() {
    let raw = Frame::new(
        df!(
            "full" => &[1.0, 2.0, 3.0, 4.0],
            "gappy" => &[None, Some(1.0), None, Some(2.0)],
            "text" => &[Some("a"), None, Some("c"), Some("d")]
        )
        .unwrap(),
    );
    let cleaned = Cleaner::new(CleaningPolicy::drop_missing_only()).clean(&raw).unwrap();
    let numeric = numeric_subset(&cleaned).unwrap();
    assert_eq!(numeric.keys(), &[3]);
    assert_eq!(numeric.column_names(), vec!["full", "gappy"]);
}

#[test]
fn test_semicolon_csv_to_stored_3d_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    write_points(tmp.path(), "points.csv", 80);

    let raw = DataLoader::new(tmp.path()).load_frame("points.csv").unwrap();
    assert_eq!(raw.column_names(), vec!["a", "b", "c", "d", "e", "species"]);

    let request = ReductionRequest::new(ReductionMethod::GraphEmbedding, TargetDim::Three)
        .with_label("species")
        .with_params(ReductionParams::default().with_n_neighbors(10).with_random_state(11));
    let result = Orchestrator::new().run(&raw, &request).unwrap();
    assert_eq!(result.coordinate_columns, vec!["UMAP_1", "UMAP_2", "UMAP_3"]);
    assert_eq!(result.frame.height(), 80);

    let html = ScatterPlot::new("Points").render(&result).unwrap();
    assert!(html.contains("Points (UMAP 3D)"));
    assert!(html.contains("scatter3d"));
    assert!(html.contains("\"setosa\""));

    let store = FsArtifactStore::new(tmp.path().join("storage"), "http://localhost:8080");
    let artifact = store.store(&html).unwrap();
    assert_eq!(fs::read_to_string(store.artifact_path(&artifact)).unwrap(), html);
}

#[test]
fn test_auto_on_medium_frame_uses_probability_embedding() {
    let request = ReductionRequest::new(ReductionMethod::Auto, TargetDim::Two)
        .with_params(ReductionParams::default().with_perplexity(10.0).with_random_state(5));
    let result = Orchestrator::new().run(&create_numeric_frame(60), &request).unwrap();
    assert_eq!(result.method, ReductionMethod::ProbabilityEmbedding);
    assert_eq!(result.frame.height(), 60);
}

#[test]
fn test_export_cleaned_frame() {
    let tmp = tempfile::tempdir().unwrap();
    write_points(tmp.path(), "points.csv", 12);
    let raw = DataLoader::new(tmp.path()).load_frame("points.csv").unwrap();

    let db = tmp.path().join("points.db");
    let summary = SqliteExporter::new(&db)
        .export(&raw, "points", ConflictPolicy::Fail)
        .unwrap();
    assert_eq!(summary.rows_written, 12);
    assert!(matches!(
        SqliteExporter::new(&db).export(&raw, "points", ConflictPolicy::Fail),
        Err(VisualDataError::ExportConflict(_))
    ));
}

//! End-to-end pipeline test driven by a TOML configuration file
//!
//! 1. Write raw clinical and expression tables
//! 2. Train and register a model
//! 3. Re-score the registered model by ordinal

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use vital_forest::config::PipelineConfig;
use vital_forest::pipeline::{Pipeline, RunMode, PROCESSED_CLINICAL_FILE, PROCESSED_LABELED_FILE};
use vital_forest::registry::{ModelRegistry, Ordinal};
use vital_forest::Error;

const PATIENTS: usize = 24;

/// Raw clinical table: attributes as rows
fn raw_clinical() -> String {
    let ids: Vec<String> = (0..PATIENTS).map(|i| format!("tcga-ee-{i:04}")).collect();
    let status: Vec<String> = (0..PATIENTS).map(|i| (i % 2).to_string()).collect();
    let ages: Vec<String> = (0..PATIENTS).map(|i| (40 + i).to_string()).collect();
    let gender: Vec<&str> = (0..PATIENTS)
        .map(|i| if i % 3 == 0 { "female" } else { "male" })
        .collect();
    format!(
        "patient\t{}\nvital_status\t{}\nyears_to_birth\t{}\ngender\t{}\n",
        ids.join("\t"),
        status.join("\t"),
        ages.join("\t"),
        gender.join("\t")
    )
}

/// Raw expression table: genes as rows, three measurement columns per sample
fn raw_expression() -> String {
    let mut text = String::from("sample");
    for i in 0..PATIENTS {
        for _ in 0..3 {
            write!(text, "\tTCGA-EE-{i:04}-01A-11R").unwrap();
        }
    }
    text.push_str("\ngene");
    for _ in 0..PATIENTS {
        text.push_str("\traw_count\tscaled_estimate\tnormalized_count");
    }
    for (gene, informative) in [("TP53|7157", true), ("GAPDH|2597", false)] {
        write!(text, "\n{gene}").unwrap();
        for i in 0..PATIENTS {
            let value = if informative {
                (i % 2) * 50 + i % 5
            } else {
                i % 7
            };
            write!(text, "\t1\t0.001\t{value}.5").unwrap();
        }
    }
    text.push('\n');
    text
}

fn write_config(dir: &Path) -> PathBuf {
    std::fs::write(dir.join("clinical.txt"), raw_clinical()).unwrap();
    std::fs::write(dir.join("expression.txt"), raw_expression()).unwrap();

    let config = format!(
        r#"
[data]
clinical = "{root}/clinical.txt"
expression = "{root}/expression.txt"
expression_layout = "raw"
processed_dir = "{root}/processed"

[registry]
root = "{root}/models"

[train]
tree_count = 25
feature_fraction = 1.0
worker_count = 3
split_seed = 99

[report]
top_k = 10
"#,
        root = dir.display()
    );
    let path = dir.join("vital-forest.toml");
    std::fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_train_then_load_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_file(write_config(dir.path())).unwrap();
    let registry_root = config.registry.root.clone();
    let pipeline = Pipeline::new(config);

    let trained = pipeline.run(RunMode::Train).unwrap();
    assert_eq!(trained.samples, PATIENTS);
    assert_eq!(trained.features, 2);
    assert_eq!(trained.clinical.patients, PATIENTS);
    assert_eq!(trained.clinical.female, PATIENTS / 3);
    assert_eq!(trained.training.test_samples, 6);
    assert_eq!(trained.top_features.len(), 2);
    assert_eq!(trained.top_features[0].name, "TP53|7157");
    assert!(trained.training.test_accuracy > 0.8);

    let entry = trained.registered.clone().unwrap();
    assert_eq!(entry.ordinal, Ordinal::FIRST);
    assert!(entry.location.starts_with(&registry_root));

    // Same configuration again: name collision, model is not registered twice
    let retrained = pipeline.run(RunMode::Train).unwrap();
    assert!(retrained.registered.is_none());
    assert_eq!(ModelRegistry::open(&registry_root).len().unwrap(), 1);

    let loaded = pipeline.run(RunMode::Load(Ordinal::FIRST)).unwrap();
    assert_eq!(loaded.training, trained.training);
    assert_eq!(loaded.top_features, trained.top_features);
}

#[test]
fn test_processed_outputs_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_file(write_config(dir.path())).unwrap();
    Pipeline::new(config).prepare().unwrap();

    let processed = dir.path().join("processed");
    let clinical = std::fs::read_to_string(processed.join(PROCESSED_CLINICAL_FILE)).unwrap();
    assert!(clinical.starts_with("patient\tvital_status\tyears_to_birth\tgender\n"));
    assert_eq!(clinical.lines().count(), PATIENTS + 1);

    let labeled = std::fs::read_to_string(processed.join(PROCESSED_LABELED_FILE)).unwrap();
    let header = labeled.lines().next().unwrap();
    assert_eq!(header, "sample\tTP53|7157\tGAPDH|2597\tlabel");
}

#[test]
fn test_load_mode_reports_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_file(write_config(dir.path())).unwrap();
    let err = Pipeline::new(config)
        .run(RunMode::Load(Ordinal::new(4).unwrap()))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::from_file(write_config(dir.path())).unwrap();
    let report = Pipeline::new(config).run(RunMode::Train).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["samples"], PATIENTS);
    assert_eq!(json["top_features"][0]["rank"], 1);
    assert!(json["registered"]["location"].is_string());
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = PipelineConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

//! Integration tests for training, evaluation and feature ranking

use vital_forest::align::align;
use vital_forest::config::TrainConfig;
use vital_forest::forest::SplitCriterion;
use vital_forest::importance::top_features;
use vital_forest::registry::{MemoryRegistryLog, ModelRegistry};
use vital_forest::table::{ClinicalTable, ExpressionTable, LabeledDataset, Layout};
use vital_forest::training::{evaluate, train, train_and_register, TrainTestSplit};
use vital_forest::Error;

/// Two informative genes among `noise` uninformative ones.
fn dataset(samples: usize, noise: usize) -> LabeledDataset {
    let mut clinical = String::from("patient\tvital_status\n");
    let mut header = vec!["sample".to_string(), "SIGNAL|1".to_string()];
    header.extend((0..noise).map(|j| format!("NOISE{j}|{}", j + 2)));
    header.push("WEAK|99".to_string());
    let mut expression = header.join("\t");
    expression.push('\n');

    for i in 0..samples {
        let status = usize::from(i % 3 == 0);
        clinical.push_str(&format!("tcga-bb-{i:04}\t{status}\n"));

        let mut row = vec![
            format!("TCGA-BB-{i:04}-11A"),
            format!("{}.5", status * 8 + i % 4),
        ];
        row.extend((0..noise).map(|j| format!("{}.25", (i * 7 + j * 3) % 5)));
        row.push(format!("{}.75", status * 2 + i % 3));
        expression.push_str(&row.join("\t"));
        expression.push('\n');
    }

    let clinical = ClinicalTable::from_reader(clinical.as_bytes(), Layout::Processed).unwrap();
    let expression = ExpressionTable::from_reader(expression.as_bytes(), Layout::Processed).unwrap();
    align(&clinical, &expression).unwrap().labeled
}

fn config() -> TrainConfig {
    TrainConfig::builder()
        .tree_count(40)
        .feature_fraction(0.5)
        .split_criterion(SplitCriterion::Entropy)
        .worker_count(4)
        .split_seed(2024)
        .build()
}

#[test]
fn test_separable_data_generalizes() {
    let data = dataset(60, 4);
    let (artifact, report) = train(&data, &config()).unwrap();

    assert_eq!(report.test_samples, 15);
    assert_eq!(report.train_samples, 45);
    assert!(report.train_accuracy > 0.95);
    assert!(report.test_accuracy > 0.8, "{report:?}");
    assert_eq!(
        report.model_name,
        "n_estimators=40,max_features=0.5,criterion=entropy,n_jobs=4"
    );
    assert_eq!(artifact.forest().n_features(), 6);
}

#[test]
fn test_signal_gene_ranks_first() {
    let data = dataset(60, 4);
    let (artifact, _) = train(&data, &config()).unwrap();

    let names = data.feature_names();
    let ranked = top_features(&artifact, &names, 3).unwrap();
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].name, "SIGNAL|1");
    assert_eq!(ranked[0].rank, 1);
    assert!(ranked
        .windows(2)
        .all(|pair| pair[0].importance >= pair[1].importance));

    let total: f64 = artifact.forest().feature_importances().iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_seeded_training_is_reproducible() {
    let data = dataset(30, 2);
    let (a, ra) = train(&data, &config()).unwrap();
    let (b, rb) = train(&data, &config()).unwrap();

    assert_eq!(ra, rb);
    assert_eq!(a.forest(), b.forest());
}

#[test]
fn test_worker_count_does_not_change_the_forest() {
    let data = dataset(30, 2);
    let serial = TrainConfig {
        worker_count: 1,
        ..config()
    };
    let parallel = TrainConfig {
        worker_count: 8,
        ..config()
    };
    let (a, _) = train(&data, &serial).unwrap();
    let (b, _) = train(&data, &parallel).unwrap();
    assert_eq!(a.forest().trees(), b.forest().trees());
    assert_eq!(
        a.forest().feature_importances(),
        b.forest().feature_importances()
    );
}

#[test]
fn test_evaluate_matches_training_report() {
    let data = dataset(40, 3);
    let config = config();
    let (artifact, report) = train(&data, &config).unwrap();

    let split = TrainTestSplit::new(data.num_samples(), config.test_fraction, config.split_seed)
        .unwrap();
    let rescored = evaluate(&artifact, &data, &split).unwrap();
    assert_eq!(rescored, report);
}

#[test]
fn test_train_and_register_twice() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ModelRegistry::with_log(dir.path(), MemoryRegistryLog::new());
    let data = dataset(24, 1);

    let first = train_and_register(&data, &config(), &mut registry).unwrap();
    let entry = first.registered.unwrap();
    assert_eq!(entry.ordinal.get(), 1);

    let second = train_and_register(&data, &config(), &mut registry).unwrap();
    assert!(second.registered.is_none());
    assert_eq!(second.report.model_name, first.report.model_name);
    assert_eq!(registry.len().unwrap(), 1);
}

#[test]
fn test_degenerate_inputs() {
    let clinical = ClinicalTable::from_reader(
        "patient\tvital_status\ntcga-cc-0001\t1\ntcga-cc-0002\t1\n".as_bytes(),
        Layout::Processed,
    )
    .unwrap();
    let expression = ExpressionTable::from_reader(
        "sample\tg\nTCGA-CC-0001-01A\t1.5\nTCGA-CC-0002-01A\t2.5\n".as_bytes(),
        Layout::Processed,
    )
    .unwrap();
    let single_class = align(&clinical, &expression).unwrap().labeled;
    assert!(matches!(
        train(&single_class, &config()),
        Err(Error::TrainingFailed(_))
    ));

    let disjoint = ExpressionTable::from_reader(
        "sample\tg\nTCGA-DD-0001-01A\t1.5\n".as_bytes(),
        Layout::Processed,
    )
    .unwrap();
    let empty = align(&clinical, &disjoint).unwrap().labeled;
    assert!(empty.is_empty());
    assert!(matches!(
        train(&empty, &config()),
        Err(Error::TrainingFailed(_))
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let data = dataset(12, 1);
    let config = TrainConfig {
        tree_count: 0,
        ..config()
    };
    assert!(matches!(train(&data, &config), Err(Error::InvalidInput(_))));
}

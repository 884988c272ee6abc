//! Tests for error types

use vital_forest::Error;

#[test]
fn test_malformed_identifier_error() {
    let error = Error::MalformedIdentifier {
        id: "TCGA-AA".to_string(),
        expected: 12,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Malformed identifier"));
    assert!(error_str.contains("\"TCGA-AA\""));
    assert!(error_str.contains("12"));
}

#[test]
fn test_already_exists_error() {
    let error = Error::AlreadyExists("models/m1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("models/m1"));
    assert!(error_str.contains("already exists"));
}

#[test]
fn test_not_found_error() {
    let error = Error::NotFound("model #3".to_string());
    assert_eq!(format!("{error}"), "Not found: model #3");
}

#[test]
fn test_training_failed_error() {
    let error = Error::TrainingFailed("dataset is empty".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Training failed"));
    assert!(error_str.contains("dataset is empty"));
}

#[test]
fn test_schema_mismatch_error() {
    let error = Error::SchemaMismatch {
        expected: 20_531,
        actual: 3,
    };
    assert_eq!(
        format!("{error}"),
        "Schema mismatch: expected 20531 features, got 3"
    );
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("k must be greater than 0".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("k must be greater than 0"));
}

#[test]
fn test_parse_error() {
    let error = Error::ParseError("vital_status \"2\"".to_string());
    assert!(format!("{error}").starts_with("Parse error"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error: Error = io.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("denied"));
}

#[test]
fn test_bincode_error_conversion() {
    let err = bincode::deserialize::<String>(&[0xff]).unwrap_err();
    let error: Error = err.into();
    assert!(matches!(error, Error::Serialization(_)));
}

#[test]
fn test_error_debug() {
    let error = Error::NotFound("x".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("NotFound"));
}

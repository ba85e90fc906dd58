//! Unit tests for error.rs
//!
//! Tests Error variants, Display formatting and the not-loaded signal.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_invalid_parameter_display() {
    let err = Error::InvalidParameter("empty mesh path".to_string());
    assert_eq!(format!("{}", err), "Invalid parameter: empty mesh path");
}

#[test]
fn test_invalid_handle_display() {
    let err = Error::InvalidHandle("asset handle Handle(3v2) is stale".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid handle"));
    assert!(display.contains("Handle(3v2)"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of memory");
}

#[test]
fn test_resource_variants_display() {
    let failed = Error::ResourceCreationFailed("wrong type".to_string());
    let missing = Error::ResourceNotLoaded("crate.mesh".to_string());
    assert!(format!("{}", failed).contains("Resource creation failed"));
    assert!(format!("{}", missing).contains("Resource not loaded"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("max_assets must be greater than zero".to_string());
    assert!(format!("{}", err).contains("Initialization failed"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfCapacity("asset table is full".to_string());
    let dyn_err: &dyn std::error::Error = &err;
    assert!(dyn_err.source().is_none());
}

#[test]
fn test_error_clone_eq() {
    let err = Error::ResourceCreationFailed("timed out".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::ResourceCreationFailed("other".to_string()));
}

#[test]
fn test_is_not_loaded() {
    assert!(Error::ResourceNotLoaded("x".to_string()).is_not_loaded());
    assert!(!Error::ResourceCreationFailed("x".to_string()).is_not_loaded());
    assert!(!Error::OutOfMemory.is_not_loaded());
}

// ============================================================================
// RESULT ALIAS
// ============================================================================

fn parse_capacity(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidParameter(format!("bad capacity {}", value)))
}

#[test]
fn test_result_alias_with_question_mark() {
    fn double(value: i64) -> Result<u32> {
        Ok(parse_capacity(value)? * 2)
    }
    assert_eq!(double(4), Ok(8));
    assert!(matches!(double(-1), Err(Error::InvalidParameter(_))));
}

/*!
 * Tests for error types and conversions
 */

use doctran::errors::{
    AppError, ExtractError, MergeError, ProviderError, QueueError, StoreError, TranslationError,
};

#[test]
fn test_providerError_requestFailed_shouldDisplayCorrectly() {
    let error = ProviderError::RequestFailed("Connection timeout".to_string());
    let display = format!("{}", error);
    assert!(display.contains("API request failed"));
    assert!(display.contains("Connection timeout"));
}

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 500,
        message: "model not found".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("500"));
    assert!(display.contains("model not found"));
}

#[test]
fn test_providerError_timeout_shouldDisplaySeconds() {
    let error = ProviderError::Timeout(120);
    assert!(format!("{}", error).contains("120 seconds"));
}

#[test]
fn test_extractError_missingColumn_shouldNameColumn() {
    let error = ExtractError::MissingColumn("source".to_string());
    assert!(format!("{}", error).contains("'source'"));
}

#[test]
fn test_mergeError_unknownSegments_shouldListAllIds() {
    let error = MergeError::UnknownSegments {
        ids: vec!["row:9".to_string(), "Stories/Story_u1.xml#3".to_string()],
    };
    let display = format!("{}", error);
    assert!(display.contains("row:9"));
    assert!(display.contains("Stories/Story_u1.xml#3"));
}

#[test]
fn test_translationError_fromProviderError_shouldWrapCorrectly() {
    let provider_error = ProviderError::RequestFailed("Test error".to_string());
    let error: TranslationError = provider_error.into();
    let display = format!("{}", error);
    assert!(display.contains("Provider error"));
    assert!(display.contains("Test error"));
}

#[test]
fn test_translationError_countMismatch_shouldDisplayBothCounts() {
    let error = TranslationError::CountMismatch {
        requested: 10,
        received: 7,
    };
    let display = format!("{}", error);
    assert!(display.contains("10"));
    assert!(display.contains("7"));
}

#[test]
fn test_queueError_fromStoreError_shouldWrapCorrectly() {
    let store_error = StoreError::Corrupted("unexpected token".to_string());
    let error: QueueError = store_error.into();
    let display = format!("{}", error);
    assert!(display.contains("Store error"));
    assert!(display.contains("unexpected token"));
}

#[test]
fn test_appError_fromAnyhow_shouldBecomeUnknown() {
    let error: AppError = anyhow::anyhow!("something odd").into();
    assert!(matches!(error, AppError::Unknown(_)));
    assert!(format!("{}", error).contains("something odd"));
}

/*!
 * Tests for the segment CSV artifact format
 */

use doctran::errors::MergeError;
use doctran::segment::tabular::{read_segment_csv, write_segment_csv};
use doctran::segment::{Segment, SegmentId};

#[test]
fn test_write_segment_csv_withMixedIds_shouldEmitHeaderAndRows() {
    let segments = vec![
        Segment::translated(SegmentId::Row(0), "Hello", "Bonjour"),
        Segment::new(
            SegmentId::Run {
                story: "Stories/Story_ua.xml".to_string(),
                run: 1,
            },
            "world",
        ),
    ];
    let csv = String::from_utf8(write_segment_csv(&segments).unwrap()).unwrap();
    assert!(csv.starts_with("segment_id,source,target"));
    assert!(csv.contains("row:0,Hello,Bonjour"));
    assert!(csv.contains("Stories/Story_ua.xml#1,world,"));
}

#[test]
fn test_read_segment_csv_withEmptyTarget_shouldComeBackUntranslated() {
    let csv = b"segment_id,source,target\nrow:0,Hello,\nrow:1,Bye,Au revoir\n";
    let segments = read_segment_csv(csv).unwrap();
    assert_eq!(segments.len(), 2);
    assert!(segments[0].target_text.is_none());
    assert_eq!(segments[1].target_text.as_deref(), Some("Au revoir"));
}

#[test]
fn test_read_segment_csv_withMissingIdColumn_shouldFail() {
    let err = read_segment_csv(b"source,target\nHello,Bonjour\n").unwrap_err();
    assert!(matches!(err, MergeError::MissingColumn(ref col) if col == "segment_id"));
}

#[test]
fn test_read_segment_csv_withMissingTargetColumn_shouldFail() {
    let err = read_segment_csv(b"segment_id,source\nrow:0,Hello\n").unwrap_err();
    assert!(matches!(err, MergeError::MissingColumn(ref col) if col == "target"));
}

#[test]
fn test_read_segment_csv_withMalformedId_shouldFailWholeRead() {
    let csv = b"segment_id,source,target\nrow:0,Hello,Bonjour\nnot-an-id,Bye,\n";
    let err = read_segment_csv(csv).unwrap_err();
    assert!(matches!(err, MergeError::MalformedId(ref id) if id == "not-an-id"));
}

#[test]
fn test_segment_csv_withReorderedColumns_shouldStillResolveByName() {
    let csv = b"target,segment_id,source\nBonjour,row:0,Hello\n";
    let segments = read_segment_csv(csv).unwrap();
    assert_eq!(segments[0].id, SegmentId::Row(0));
    assert_eq!(segments[0].source_text, "Hello");
    assert_eq!(segments[0].target_text.as_deref(), Some("Bonjour"));
}

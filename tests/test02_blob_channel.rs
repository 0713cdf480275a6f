mod common;

use common::RecordingEngine;
use sql_marshal::prelude::*;

fn channel() -> BlobChannel {
    BlobChannel::new(&MarshalOptions::default())
}

fn read_all(channel: &mut BlobChannel, handle: BlobHandle) -> Vec<u8> {
    let mut content = Vec::new();
    while let Some(segment) = channel.read_segment(handle).unwrap() {
        content.extend_from_slice(&segment);
    }
    content
}

#[test]
fn binary_writes_are_chunked_at_the_declared_segment_size() {
    let mut engine = RecordingEngine::new();
    let mut blobs = channel();
    let content: Vec<u8> = (0..2_500_u32).map(|i| (i % 251) as u8).collect();

    let handle = blobs
        .open_for_write(&mut engine, BlobSubtype::Binary, 1_000)
        .unwrap();
    blobs.write_segment(&mut engine, handle, &content).unwrap();
    let id = blobs.close(&mut engine, handle).unwrap();

    assert_eq!(engine.segment_writes, vec![1_000, 1_000, 500]);
    assert_eq!(engine.blobs[&id].content, content);
    assert!(engine.blobs[&id].closed);
    assert_eq!(blobs.open_handles(), 0);
}

#[test]
fn text_writes_use_the_largest_allowed_segment() {
    let mut engine = RecordingEngine::new();
    let mut blobs = BlobChannel::new(&MarshalOptions::new().with_max_segment_size(4_096));
    let memo = "All work and no play. ".repeat(500);

    let id = blobs
        .write_all(&mut engine, BlobSubtype::Text, 80, memo.as_bytes())
        .unwrap();

    assert!(engine.segment_writes.iter().all(|&len| len <= 4_096));
    assert_eq!(engine.segment_writes.len(), memo.len().div_ceil(4_096));
    assert_eq!(engine.blobs[&id].content, memo.as_bytes());
}

#[test]
fn segments_read_back_in_order_and_stay_exhausted() {
    let mut engine = RecordingEngine::new();
    let content = b"0123456789abcdefghij".to_vec();
    let id = engine.seed_blob(BlobSubtype::Binary, content.clone());
    let mut blobs = channel();

    let handle = blobs.open_for_read(&mut engine, id).unwrap();
    assert_eq!(read_all(&mut blobs, handle), content);
    assert_eq!(blobs.read_segment(handle).unwrap(), None);
    assert_eq!(blobs.read_segment(handle).unwrap(), None);

    let again = blobs.open_for_read(&mut engine, id).unwrap();
    let segments: Vec<Vec<u8>> = blobs.segments(again).collect::<Result<_, _>>().unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments.concat(), content);
}

#[test]
fn empty_blob_round_trips() {
    let mut engine = RecordingEngine::new();
    let mut blobs = channel();
    let id = blobs
        .write_all(&mut engine, BlobSubtype::Binary, 80, &[])
        .unwrap();
    assert_eq!(blobs.read_to_end(&mut engine, id).unwrap(), Vec::<u8>::new());
}

#[test]
fn handles_are_direction_checked() {
    let mut engine = RecordingEngine::new();
    let mut blobs = channel();
    let writer = blobs
        .open_for_write(&mut engine, BlobSubtype::Binary, 80)
        .unwrap();
    let err = blobs.read_segment(writer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let id = engine.seed_blob(BlobSubtype::Binary, vec![1, 2, 3]);
    let reader = blobs.open_for_read(&mut engine, id).unwrap();
    let err = blobs.write_segment(&mut engine, reader, b"x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn closed_and_foreign_handles_are_stale() {
    let mut engine = RecordingEngine::new();
    let mut blobs = channel();
    let mut other = channel();

    let handle = blobs
        .open_for_write(&mut engine, BlobSubtype::Binary, 80)
        .unwrap();
    let err = other.write_segment(&mut engine, handle, b"x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    blobs.close(&mut engine, handle).unwrap();
    let err = blobs.write_segment(&mut engine, handle, b"x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = blobs.close(&mut engine, handle).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn invalidate_all_cancels_unfinished_writes() {
    let mut engine = RecordingEngine::new();
    let mut blobs = channel();
    let unfinished = blobs
        .open_for_write(&mut engine, BlobSubtype::Binary, 80)
        .unwrap();
    blobs
        .write_segment(&mut engine, unfinished, b"partial")
        .unwrap();
    let finished = blobs
        .write_all(&mut engine, BlobSubtype::Binary, 80, b"done")
        .unwrap();

    blobs.invalidate_all(&mut engine);

    assert_eq!(blobs.open_handles(), 0);
    assert_eq!(engine.cancelled.len(), 1);
    assert!(engine.blobs.contains_key(&finished));
    let err = blobs
        .write_segment(&mut engine, unfinished, b"more")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn failed_segment_write_cancels_the_blob() {
    let mut engine = RecordingEngine::new();
    engine.fail_blob_write_at = Some(1);
    let mut blobs = channel();

    let err = blobs
        .write_all(&mut engine, BlobSubtype::Binary, 4, b"0123456789")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Engine);
    assert_eq!(engine.cancelled.len(), 1);
    assert!(engine.blobs.is_empty());
    assert_eq!(blobs.open_handles(), 0);
}

#[test]
fn zero_segment_size_is_rejected() {
    let mut engine = RecordingEngine::new();
    let mut blobs = channel();
    let err = blobs
        .open_for_write(&mut engine, BlobSubtype::Binary, 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(engine.blobs_created(), 0);
}

#[test]
fn failed_read_to_end_releases_the_reader() {
    let mut engine = RecordingEngine::new();
    let id = engine.seed_blob(BlobSubtype::Binary, vec![7; 30]);
    engine.fail_blob_read_at = Some(2);
    let mut blobs = channel();

    let err = blobs.read_to_end(&mut engine, id).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Engine);
    assert_eq!(engine.close_calls, vec![id]);
    assert_eq!(blobs.open_handles(), 0);
}

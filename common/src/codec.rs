//! Durable container for recordings.
//!
//! The on-disk format is a compact JSON document `{"metadata": ..,
//! "frames": [..]}`, optionally gzip-wrapped. Decoding sniffs the gzip
//! magic bytes, so callers never need to know whether a file is
//! compressed.

use std::borrow::Cow;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Deserialize;

use crate::error::{ReplayError, Result};
use crate::types::{Recording, RecordingMetadata};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Serializes a recording to its container bytes.
pub fn encode(recording: &Recording, compress: bool) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(recording)
        .map_err(|e| ReplayError::PersistFailure(e.to_string()))?;

    if !compress {
        return Ok(json);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Deserializes a full recording. Fails with `CorruptRecording` on any
/// structural problem; never returns a partially parsed recording.
pub fn decode(bytes: &[u8]) -> Result<Recording> {
    let payload = inflate(bytes)?;
    serde_json::from_slice(&payload).map_err(|e| ReplayError::CorruptRecording(e.to_string()))
}

/// Deserializes only the metadata object, without materializing the frame
/// array as typed values. Used for directory listings.
pub fn decode_metadata_only(bytes: &[u8]) -> Result<RecordingMetadata> {
    #[derive(Deserialize)]
    struct MetadataEnvelope {
        metadata: RecordingMetadata,
    }

    let payload = inflate(bytes)?;
    let envelope: MetadataEnvelope = serde_json::from_slice(&payload)
        .map_err(|e| ReplayError::CorruptRecording(e.to_string()))?;
    Ok(envelope.metadata)
}

fn inflate(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ReplayError::CorruptRecording(format!("gzip: {e}")))?;
    Ok(Cow::Owned(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordedFrame;
    use chrono::Utc;
    use serde_json::json;

    fn sample_recording() -> Recording {
        let start = Utc::now();
        Recording {
            metadata: RecordingMetadata {
                recording_id: "nascar_s1_r5314_race_20260830_120000".to_string(),
                start_time: start,
                end_time: Some(start + chrono::Duration::seconds(2)),
                race_id: 5314,
                series_id: 1,
                run_name: "Test 400".to_string(),
                track_name: "Test Speedway".to_string(),
                run_type: 3,
                interval_ms: 1000,
                total_frames: 2,
                total_duration_sec: 1.0,
                file_size_bytes: 0,
                compressed: false,
                version: "1.0".to_string(),
            },
            frames: vec![
                RecordedFrame {
                    timestamp: 1_700_000_000.0,
                    frame_number: 0,
                    elapsed_ms: 0,
                    live_feed: json!({"lap_number": 1, "flag_state": 1}),
                    flag_data: Some(json!([{"flag_state": 1}])),
                    pit_data: None,
                    points_data: Some(json!([])),
                    stage_points: None,
                },
                RecordedFrame {
                    timestamp: 1_700_000_001.0,
                    frame_number: 1,
                    elapsed_ms: 1000,
                    live_feed: json!({"lap_number": 2, "flag_state": 1}),
                    flag_data: None,
                    pit_data: Some(json!([{"vehicle_number": "5"}])),
                    points_data: None,
                    stage_points: Some(json!([])),
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_uncompressed() {
        let recording = sample_recording();
        let bytes = encode(&recording, false).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, recording);
    }

    #[test]
    fn test_round_trip_compressed() {
        let recording = sample_recording();
        let bytes = encode(&recording, true).unwrap();
        assert!(bytes.starts_with(&GZIP_MAGIC));
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, recording);
    }

    #[test]
    fn test_decode_rejects_missing_metadata() {
        let bytes = serde_json::to_vec(&json!({"frames": []})).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, ReplayError::CorruptRecording(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"not json at all"),
            Err(ReplayError::CorruptRecording(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_gzip() {
        let recording = sample_recording();
        let mut bytes = encode(&recording, true).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            decode(&bytes),
            Err(ReplayError::CorruptRecording(_))
        ));
    }

    #[test]
    fn test_decode_metadata_only() {
        let recording = sample_recording();

        for compress in [false, true] {
            let bytes = encode(&recording, compress).unwrap();
            let metadata = decode_metadata_only(&bytes).unwrap();
            assert_eq!(metadata, recording.metadata);
        }
    }

    #[test]
    fn test_decode_metadata_only_rejects_missing_metadata() {
        let bytes = serde_json::to_vec(&json!({"frames": []})).unwrap();
        assert!(matches!(
            decode_metadata_only(&bytes),
            Err(ReplayError::CorruptRecording(_))
        ));
    }
}

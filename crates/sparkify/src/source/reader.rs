//! JSON record reader.
//!
//! Lists the files matching a [`PathPattern`] under the input root, fetches
//! them with bounded concurrency and decodes every record against a fixed
//! typed schema.

use std::marker::PhantomData;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use tracing::{debug, info};

use sparkify_core::emit;
use sparkify_core::metrics::events::{BytesRead, RecordsRead, SourceFilesDiscovered};
use sparkify_core::StorageProviderRef;

use super::pattern::PathPattern;
use crate::error::{InvalidRecordSnafu, ParseError, PipelineError};

/// Decodes the raw bytes of one source file into typed records.
///
/// Files may hold a single JSON object, several whitespace-separated
/// objects, or newline-delimited JSON. Decoding is strict: the first record
/// that is not valid JSON or does not fit `T` fails the whole file.
#[derive(Debug)]
pub struct JsonRecordDecoder<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonRecordDecoder<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }

    /// Decode all records in `data`. `path` is used for error messages.
    pub fn decode(&self, data: &[u8], path: &str) -> Result<Vec<T>, ParseError> {
        serde_json::Deserializer::from_slice(data)
            .into_iter::<T>()
            .enumerate()
            .map(|(index, record)| record.context(InvalidRecordSnafu { path, index }))
            .collect()
    }
}

impl<T: DeserializeOwned> Default for JsonRecordDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads record sets from the input root.
pub struct RecordReader {
    storage: StorageProviderRef,
    max_concurrent_files: usize,
}

impl RecordReader {
    pub fn new(storage: StorageProviderRef, max_concurrent_files: usize) -> Self {
        Self {
            storage,
            max_concurrent_files: max_concurrent_files.max(1),
        }
    }

    /// List relative paths of all files matching `pattern`, sorted.
    pub async fn list_matching(&self, pattern: &PathPattern) -> Result<Vec<Path>, PipelineError> {
        let listed = self
            .storage
            .list_with_prefix(pattern.listing_prefix())
            .await?;

        Ok(listed
            .into_iter()
            .filter(|path| pattern.matches(path.as_ref()))
            .collect())
    }

    /// Read every record from the files matching `pattern`.
    ///
    /// Records are returned in file path order, then in-file order. Fails if
    /// no file matches or if any record cannot be decoded.
    pub async fn read<T: DeserializeOwned>(
        &self,
        pattern: &str,
        source: &str,
    ) -> Result<Vec<T>, PipelineError> {
        let pattern = PathPattern::new(pattern)?;
        let files = self.list_matching(&pattern).await?;

        emit!(SourceFilesDiscovered {
            count: files.len(),
            source: source.to_string(),
        });

        if files.is_empty() {
            return Err(PipelineError::NoFilesMatched {
                pattern: pattern.to_string(),
                root: self.storage.canonical_url().to_string(),
            });
        }

        info!(
            target = %source,
            files = files.len(),
            pattern = %pattern,
            "Reading source files"
        );

        // `buffered` keeps completion order equal to path order.
        let contents: Vec<(String, Bytes)> = futures::stream::iter(files)
            .map(|path| {
                let storage = self.storage.clone();
                async move {
                    let bytes = storage.get(path.clone()).await?;
                    Ok::<_, PipelineError>((path.to_string(), bytes))
                }
            })
            .buffered(self.max_concurrent_files)
            .try_collect()
            .await?;

        let decoder = JsonRecordDecoder::<T>::new();
        let mut records = Vec::new();
        for (path, bytes) in contents {
            emit!(BytesRead {
                bytes: bytes.len() as u64,
                source: source.to_string(),
            });

            let decoded = decoder.decode(&bytes, &path)?;
            debug!(target = %source, file = %path, records = decoded.len(), "Decoded file");
            records.extend(decoded);
        }

        emit!(RecordsRead {
            count: records.len() as u64,
            source: source.to_string(),
        });
        info!(target = %source, records = records.len(), "Finished reading source");

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogRecord, EventRecord};
    use sparkify_core::StorageProvider;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    const SONG: &str = r#"{"num_songs": 1, "artist_id": "ARMJAGH1187FB546F3", "artist_latitude": 35.14968, "artist_longitude": -90.04892, "artist_location": "Memphis, TN", "artist_name": "The Box Tops", "song_id": "SOCIWDW12A8C13D406", "title": "Soul Deep", "duration": 148.03546, "year": 1969}"#;

    async fn reader_for(dir: &TempDir) -> RecordReader {
        let storage =
            StorageProvider::for_url_with_options(dir.path().to_str().unwrap(), &HashMap::new())
                .await
                .unwrap();
        RecordReader::new(Arc::new(storage), 4)
    }

    fn write_file(dir: &TempDir, relative: &str, contents: &str) {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_decode_ndjson_and_concatenated_objects() {
        let decoder = JsonRecordDecoder::<serde_json::Value>::new();

        let ndjson = b"{\"a\": 1}\n{\"a\": 2}\n\n";
        assert_eq!(decoder.decode(ndjson, "x").unwrap().len(), 2);

        let concatenated = b"{\"a\": 1}{\"a\": 2}   {\"a\": 3}";
        assert_eq!(decoder.decode(concatenated, "x").unwrap().len(), 3);

        assert!(decoder.decode(b"", "x").unwrap().is_empty());
    }

    #[test]
    fn test_decode_reports_record_index() {
        let decoder = JsonRecordDecoder::<EventRecord>::new();
        let data = concat!(
            r#"{"ts": 1, "sessionId": 1, "page": "Home"}"#,
            "\n",
            r#"{"ts": 2, "page": "Home"}"#,
        );

        let err = decoder.decode(data.as_bytes(), "log_data/a.json").unwrap_err();
        match err {
            ParseError::InvalidRecord { path, index, .. } => {
                assert_eq!(path, "log_data/a.json");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_read_matches_multi_level_pattern() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "song_data/A/B/C/TRABCEI128F424C983.json", SONG);
        write_file(&dir, "song_data/A/B/D/TRABDEI128F424C983.json", SONG);
        write_file(&dir, "song_data/A/B/too_shallow.json", SONG);
        write_file(&dir, "song_data/A/B/C/notes.txt", "not json");

        let reader = reader_for(&dir).await;
        let records: Vec<CatalogRecord> = reader
            .read("song_data/*/*/*/*.json", "song_data")
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Soul Deep");
    }

    #[tokio::test]
    async fn test_read_fails_on_any_bad_record() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "song_data/A/A/A/good.json", SONG);
        write_file(
            &dir,
            "song_data/A/A/B/bad.json",
            r#"{"song_id": "S2", "title": "No Artist", "duration": 1.0, "year": 1}"#,
        );

        let reader = reader_for(&dir).await;
        let result = reader
            .read::<CatalogRecord>("song_data/*/*/*/*.json", "song_data")
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::Parse {
                source: ParseError::InvalidRecord { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_read_without_matches_fails() {
        let dir = TempDir::new().unwrap();
        let reader = reader_for(&dir).await;

        let result = reader
            .read::<EventRecord>("log_data/*/*/*.json", "log_data")
            .await;
        assert!(matches!(result, Err(PipelineError::NoFilesMatched { .. })));
    }

    #[tokio::test]
    async fn test_read_preserves_path_order() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "log_data/2018/11/b.json",
            r#"{"ts": 2, "sessionId": 1, "page": "Home"}"#,
        );
        write_file(
            &dir,
            "log_data/2018/11/a.json",
            "{\"ts\": 1, \"sessionId\": 1, \"page\": \"Home\"}\n{\"ts\": 3, \"sessionId\": 1, \"page\": \"Home\"}",
        );

        let reader = reader_for(&dir).await;
        let events: Vec<EventRecord> = reader.read("log_data/*/*/*.json", "log_data").await.unwrap();

        let ts: Vec<i64> = events.iter().map(|e| e.ts).collect();
        assert_eq!(ts, vec![1, 3, 2]);
    }
}

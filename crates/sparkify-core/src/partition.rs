//! Hive-style partition paths.
//!
//! Output tables are split into `key=value/` directories. This module builds
//! those directory prefixes from column values and extracts them again from
//! written file paths.

use std::collections::HashMap;
use std::fmt::Write;

/// Directory value used when a partition column is null.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Build a partition directory prefix such as `year=2020/artist_id=A1`.
///
/// Values are escaped so a value can never introduce an extra path segment
/// or be mistaken for a `key=value` separator. `None` maps to
/// [`HIVE_DEFAULT_PARTITION`]. Returns an empty string when there are no
/// partition columns.
pub fn partition_path(values: &[(&str, Option<String>)]) -> String {
    values
        .iter()
        .map(|(column, value)| match value {
            Some(value) => format!("{column}={}", escape_value(value)),
            None => format!("{column}={HIVE_DEFAULT_PARTITION}"),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-escape characters that are unsafe inside a partition directory name.
fn escape_value(value: &str) -> String {
    if value.is_empty() {
        return HIVE_DEFAULT_PARTITION.to_string();
    }

    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(escaped, "%{byte:02X}");
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn needs_escape(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | '=' | '%' | ':' | '#' | '?' | '*' | '"')
}

/// Reverse [`escape_value`]. Malformed escapes are kept verbatim.
fn unescape_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Extracts partition values from file paths.
///
/// Supports two modes:
/// - **Specific columns**: Extract only values for configured partition columns
/// - **All columns**: Extract all `key=value` directory segments
///
/// # Examples
///
/// ```
/// use sparkify_core::PartitionExtractor;
///
/// let extractor = PartitionExtractor::all();
/// let values = extractor.extract("year=2024/month=1/part-00000.parquet");
/// assert_eq!(values.get("year"), Some(&"2024".to_string()));
/// assert_eq!(values.get("month"), Some(&"1".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct PartitionExtractor {
    /// The partition column names to extract. None means extract all.
    columns: Option<Vec<String>>,
}

impl PartitionExtractor {
    /// Create an extractor for specific partition columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: Some(columns),
        }
    }

    /// Create an extractor that extracts all partition columns.
    pub fn all() -> Self {
        Self { columns: None }
    }

    /// Extract unescaped partition values from a relative file path.
    ///
    /// Only directory segments are considered; the file name is ignored.
    pub fn extract(&self, path: &str) -> HashMap<String, String> {
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();

        segments
            .into_iter()
            .filter_map(|segment| segment.split_once('='))
            .filter(|(key, _)| match &self.columns {
                Some(cols) => cols.iter().any(|c| c == key),
                None => true,
            })
            .map(|(key, value)| (key.to_string(), unescape_value(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_path_multiple_columns() {
        let path = partition_path(&[
            ("year", Some("2020".to_string())),
            ("artist_id", Some("ARJIE2Y1187B994AB7".to_string())),
        ]);
        assert_eq!(path, "year=2020/artist_id=ARJIE2Y1187B994AB7");
    }

    #[test]
    fn test_partition_path_no_columns() {
        assert_eq!(partition_path(&[]), "");
    }

    #[test]
    fn test_partition_path_null_and_empty_values() {
        let path = partition_path(&[("year", None), ("artist_id", Some(String::new()))]);
        assert_eq!(
            path,
            "year=__HIVE_DEFAULT_PARTITION__/artist_id=__HIVE_DEFAULT_PARTITION__"
        );
    }

    #[test]
    fn test_partition_path_escapes_separators() {
        let path = partition_path(&[("artist_id", Some("a/b=c%".to_string()))]);
        assert_eq!(path, "artist_id=a%2Fb%3Dc%25");
        assert_eq!(path.matches('/').count(), 0);
    }

    #[test]
    fn test_extract_all_multiple_partitions() {
        let extractor = PartitionExtractor::all();
        let values = extractor.extract("year=2018/month=11/part-00000.parquet");

        assert_eq!(values.get("year"), Some(&"2018".to_string()));
        assert_eq!(values.get("month"), Some(&"11".to_string()));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_extract_ignores_file_name() {
        let extractor = PartitionExtractor::all();
        let values = extractor.extract("weird=name.parquet");
        assert!(values.is_empty());
    }

    #[test]
    fn test_extract_specific_filters_columns() {
        let extractor = PartitionExtractor::new(vec!["year".into()]);
        let values = extractor.extract("year=2018/month=11/part-00000.parquet");

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("year"), Some(&"2018".to_string()));
    }

    #[test]
    fn test_extract_unescapes_values() {
        let path = format!(
            "{}/part-00000.parquet",
            partition_path(&[("artist_id", Some("a/b=c%".to_string()))])
        );
        let values = PartitionExtractor::all().extract(&path);
        assert_eq!(values.get("artist_id"), Some(&"a/b=c%".to_string()));
    }
}

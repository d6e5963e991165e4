//! Hierarchical path patterns.
//!
//! Patterns are `/`-separated and matched against paths relative to the
//! input root:
//! - `*` matches any run of characters within one segment
//! - `?` matches a single character within one segment
//! - `**` as a whole segment matches zero or more segments
//!
//! e.g. `song_data/*/*/*/*.json` or `log_data/**/*.json`.

use regex::Regex;

use crate::error::ParseError;

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    prefix: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        let trimmed = pattern.trim_matches('/');
        if trimmed.is_empty() {
            return Err(ParseError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern is empty".to_string(),
            });
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ParseError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern contains an empty segment".to_string(),
            });
        }

        let prefix = segments
            .iter()
            .take_while(|segment| !is_wildcard(segment))
            .copied()
            .collect::<Vec<_>>()
            .join("/");

        let mut expr = String::from("^");
        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            match *segment {
                "**" if i == last => expr.push_str(".*"),
                "**" => expr.push_str("(?:[^/]+/)*"),
                segment => {
                    expr.push_str(&segment_regex(segment));
                    if i != last {
                        expr.push('/');
                    }
                }
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| ParseError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern: trimmed.to_string(),
            prefix,
            regex,
        })
    }

    /// The literal directory prefix before the first wildcard segment.
    ///
    /// Listing is narrowed to this prefix before matching.
    pub fn listing_prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether a relative path matches the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn is_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

fn segment_regex(segment: &str) -> String {
    let mut expr = String::with_capacity(segment.len() * 2);
    for c in segment.chars() {
        match c {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            c => expr.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_data_pattern() {
        let pattern = PathPattern::new("song_data/*/*/*/*.json").unwrap();

        assert_eq!(pattern.listing_prefix(), "song_data");
        assert!(pattern.matches("song_data/A/B/C/TRABCEI128F424C983.json"));
        assert!(!pattern.matches("song_data/A/B/TRABCEI128F424C983.json"));
        assert!(!pattern.matches("song_data/A/B/C/D/TRABCEI128F424C983.json"));
        assert!(!pattern.matches("song_data/A/B/C/TRABCEI128F424C983.json.bak"));
    }

    #[test]
    fn test_log_data_pattern() {
        let pattern = PathPattern::new("log_data/*/*/*.json").unwrap();

        assert!(pattern.matches("log_data/2018/11/2018-11-12-events.json"));
        assert!(!pattern.matches("log_data/2018/11/2018-11-12-events.ndjson"));
    }

    #[test]
    fn test_double_star_spans_levels() {
        let pattern = PathPattern::new("log_data/**/*.json").unwrap();

        assert!(pattern.matches("log_data/a.json"));
        assert!(pattern.matches("log_data/2018/11/a.json"));
        assert!(!pattern.matches("song_data/a.json"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let pattern = PathPattern::new("data/file.v1+final.json").unwrap();

        assert_eq!(pattern.listing_prefix(), "data/file.v1+final.json");
        assert!(pattern.matches("data/file.v1+final.json"));
        assert!(!pattern.matches("data/fileXv1+final.json"));
    }

    #[test]
    fn test_leading_wildcard_has_empty_prefix() {
        let pattern = PathPattern::new("*/events-??.json").unwrap();

        assert_eq!(pattern.listing_prefix(), "");
        assert!(pattern.matches("day1/events-01.json"));
        assert!(!pattern.matches("day1/events-1.json"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PathPattern::new("").is_err());
        assert!(PathPattern::new("a//b").is_err());
    }
}

//! Raw source records and star-schema rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Page value of an event that represents an actual playback.
pub const NEXT_SONG_PAGE: &str = "NextSong";

// ============================================================================
// Raw records
// ============================================================================

/// One song entry from the catalog metadata (`song_data`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    pub year: i32,
    pub duration: f64,
    pub num_songs: Option<i64>,
}

/// One application event from the listening logs (`log_data`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Epoch milliseconds.
    pub ts: i64,
    #[serde(default, deserialize_with = "deserialize_user_id")]
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub page: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
}

impl EventRecord {
    /// Whether this event is a song playback.
    pub fn is_playback(&self) -> bool {
        self.page == NEXT_SONG_PAGE
    }
}

/// Accept `userId` as a string or an integer; blank strings mean "no user".
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<RawUserId>::deserialize(deserializer)? {
        Some(RawUserId::Text(text)) if text.trim().is_empty() => None,
        Some(RawUserId::Text(text)) => Some(text),
        Some(RawUserId::Number(number)) => Some(number.to_string()),
        None => None,
    })
}

// ============================================================================
// Star schema rows
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SongDimension {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistDimension {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Calendar breakdown of one event timestamp.
///
/// `week` is the ISO-8601 week number; `weekday` counts 1 = Sunday through
/// 7 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeDimension {
    pub start_time: DateTime<Utc>,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    pub weekday: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDimension {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// One playback event. `song_id`/`artist_id` are null when the event
/// matched no catalog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongplayFact {
    pub songplay_id: String,
    pub start_time: DateTime<Utc>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_record_optional_fields() {
        let record: CatalogRecord = serde_json::from_str(
            r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null,
                "artist_longitude": null, "artist_location": "California - LA",
                "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480",
                "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#,
        )
        .unwrap();

        assert_eq!(record.song_id, "SOMZWCG12A8C13C480");
        assert_eq!(record.artist_location.as_deref(), Some("California - LA"));
        assert_eq!(record.artist_latitude, None);
        assert_eq!(record.year, 0);
    }

    #[test]
    fn test_catalog_record_missing_required_field() {
        let result: Result<CatalogRecord, _> = serde_json::from_str(
            r#"{"artist_id": "A1", "artist_name": "X", "title": "T", "duration": 1.0, "year": 2000}"#,
        );
        assert!(result.unwrap_err().to_string().contains("song_id"));
    }

    #[test]
    fn test_event_user_id_forms() {
        let parse = |user_id: &str| -> Option<String> {
            let json = format!(
                r#"{{"ts": 1, "userId": {user_id}, "sessionId": 7, "page": "Home"}}"#
            );
            serde_json::from_str::<EventRecord>(&json).unwrap().user_id
        };

        assert_eq!(parse(r#""39""#), Some("39".to_string()));
        assert_eq!(parse("39"), Some("39".to_string()));
        assert_eq!(parse(r#""""#), None);
        assert_eq!(parse("null"), None);
    }

    #[test]
    fn test_event_missing_user_id() {
        let event: EventRecord =
            serde_json::from_str(r#"{"ts": 1, "sessionId": 7, "page": "Home"}"#).unwrap();
        assert_eq!(event.user_id, None);
        assert!(!event.is_playback());
    }

    #[test]
    fn test_event_wrong_type_is_rejected() {
        let result: Result<EventRecord, _> =
            serde_json::from_str(r#"{"ts": "yesterday", "sessionId": 7, "page": "NextSong"}"#);
        assert!(result.is_err());
    }
}

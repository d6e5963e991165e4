//! Song and artist dimensions from catalog records.

use crate::model::{ArtistDimension, CatalogRecord, SongDimension};

use super::first_per_key;

/// One row per `song_id`; the first catalog record in input order wins.
pub fn build_songs(catalog: &[CatalogRecord]) -> Vec<SongDimension> {
    let rows = catalog.iter().map(|record| SongDimension {
        song_id: record.song_id.clone(),
        title: record.title.clone(),
        artist_id: record.artist_id.clone(),
        year: record.year,
        duration: record.duration,
    });
    first_per_key(rows, |row| row.song_id.clone())
}

/// One row per `artist_id`; the first catalog record in input order wins.
pub fn build_artists(catalog: &[CatalogRecord]) -> Vec<ArtistDimension> {
    let rows = catalog.iter().map(|record| ArtistDimension {
        artist_id: record.artist_id.clone(),
        name: record.artist_name.clone(),
        location: record.artist_location.clone(),
        latitude: record.artist_latitude,
        longitude: record.artist_longitude,
    });
    first_per_key(rows, |row| row.artist_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(song_id: &str, title: &str, artist_id: &str, artist_name: &str) -> CatalogRecord {
        CatalogRecord {
            song_id: song_id.to_string(),
            title: title.to_string(),
            artist_id: artist_id.to_string(),
            artist_name: artist_name.to_string(),
            artist_location: None,
            artist_latitude: None,
            artist_longitude: None,
            year: 2000,
            duration: 180.0,
            num_songs: Some(1),
        }
    }

    #[test]
    fn test_songs_projection() {
        let songs = build_songs(&[record("S1", "Test Song", "A1", "Test Artist")]);
        assert_eq!(
            songs,
            vec![SongDimension {
                song_id: "S1".to_string(),
                title: "Test Song".to_string(),
                artist_id: "A1".to_string(),
                year: 2000,
                duration: 180.0,
            }]
        );
    }

    #[test]
    fn test_conflicting_song_rows_collapse_to_first() {
        let mut later = record("S1", "Renamed", "A1", "Test Artist");
        later.year = 2011;
        let catalog = vec![record("S1", "Original", "A1", "Test Artist"), later];

        let songs = build_songs(&catalog);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Original");
        assert_eq!(songs[0].year, 2000);
    }

    #[test]
    fn test_artist_ids_unique() {
        let mut located = record("S3", "Three", "A1", "Test Artist");
        located.artist_location = Some("Memphis, TN".to_string());
        let catalog = vec![
            record("S1", "One", "A1", "Test Artist"),
            record("S2", "Two", "A2", "Other Artist"),
            located,
        ];

        let artists = build_artists(&catalog);
        let ids: HashSet<&str> = artists.iter().map(|a| a.artist_id.as_str()).collect();
        assert_eq!(artists.len(), 2);
        assert_eq!(ids.len(), 2);
        assert_eq!(artists[0].name, "Test Artist");
        assert_eq!(artists[0].location, None);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(build_songs(&[]).is_empty());
        assert!(build_artists(&[]).is_empty());
    }
}

//! Songplay fact table: playback events joined to the catalog.
//!
//! The join is a hash join on (song title, artist name). Duration is then
//! checked against the event length as a validation step, within
//! [`JoinOptions::duration_tolerance`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sparkify_core::emit;
use sparkify_core::metrics::events::SongplaysUnmatched;

use super::calendar::to_timestamp;
use crate::error::TransformError;
use crate::model::{CatalogRecord, EventRecord, SongplayFact};

/// Namespace for `songplay_id` UUIDv5 values.
const SONGPLAY_NAMESPACE: Uuid = Uuid::from_u128(0x6f0d_3c52_9a41_4e7b_b1c8_52d4_0e9a_7f13);

/// What to do with playback events that match no catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Keep the event with null `song_id` and `artist_id`.
    #[default]
    Retain,
    /// Drop the event (inner-join semantics).
    Drop,
}

/// Options for [`build_songplays`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JoinOptions {
    /// Maximum absolute difference between event length and catalog
    /// duration, in seconds. Zero requires exact equality.
    pub duration_tolerance: f64,
    pub unmatched: UnmatchedPolicy,
}

/// Build one fact row per `NextSong` event.
///
/// When several catalog records match an event, the first in input order is
/// used, so the fact table stays at event grain. Repeated identical plays
/// produce repeated rows, each with its own `songplay_id`.
pub fn build_songplays(
    events: &[EventRecord],
    catalog: &[CatalogRecord],
    options: &JoinOptions,
) -> Result<Vec<SongplayFact>, TransformError> {
    let mut by_title_artist: HashMap<(&str, &str), Vec<&CatalogRecord>> = HashMap::new();
    for record in catalog {
        by_title_artist
            .entry((record.title.as_str(), record.artist_name.as_str()))
            .or_default()
            .push(record);
    }

    let mut occurrences: HashMap<String, u64> = HashMap::new();
    let mut facts = Vec::new();
    let mut unmatched = 0;

    for event in events.iter().filter(|event| event.is_playback()) {
        let matched = find_match(event, &by_title_artist, options.duration_tolerance);
        if matched.is_none() {
            unmatched += 1;
            if options.unmatched == UnmatchedPolicy::Drop {
                continue;
            }
        }

        let grain = grain_key(event);
        let occurrence = occurrences.entry(grain.clone()).or_insert(0);
        let songplay_id = Uuid::new_v5(
            &SONGPLAY_NAMESPACE,
            format!("{grain}|{occurrence}").as_bytes(),
        );
        *occurrence += 1;

        facts.push(SongplayFact {
            songplay_id: songplay_id.to_string(),
            start_time: to_timestamp(event.ts)?,
            user_id: event.user_id.clone(),
            level: event.level.clone(),
            song_id: matched.map(|record| record.song_id.clone()),
            artist_id: matched.map(|record| record.artist_id.clone()),
            session_id: event.session_id,
            location: event.location.clone(),
            user_agent: event.user_agent.clone(),
        });
    }

    emit!(SongplaysUnmatched { count: unmatched });

    Ok(facts)
}

fn find_match<'a>(
    event: &EventRecord,
    index: &HashMap<(&str, &str), Vec<&'a CatalogRecord>>,
    tolerance: f64,
) -> Option<&'a CatalogRecord> {
    let (Some(song), Some(artist), Some(length)) =
        (event.song.as_deref(), event.artist.as_deref(), event.length)
    else {
        return None;
    };

    index
        .get(&(song, artist))?
        .iter()
        .copied()
        .find(|record| (record.duration - length).abs() <= tolerance)
}

/// Natural grain of a playback event, used to derive its surrogate key.
fn grain_key(event: &EventRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{:016x}",
        event.ts,
        event.user_id.as_deref().unwrap_or_default(),
        event.session_id,
        event.song.as_deref().unwrap_or_default(),
        event.artist.as_deref().unwrap_or_default(),
        event.length.map(f64::to_bits).unwrap_or_default(),
    )
}

//! User dimension from event logs.

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::model::{EventRecord, UserDimension};

/// One row per non-null `user_id`.
///
/// The attributes come from the user's most recent event (greatest `ts`,
/// later input position on ties), so `level` reflects the latest known
/// subscription state. Rows are in first-seen user order.
pub fn build_users(events: &[EventRecord]) -> Vec<UserDimension> {
    let mut latest: IndexMap<&str, &EventRecord> = IndexMap::new();

    for event in events {
        let Some(user_id) = event.user_id.as_deref() else {
            continue;
        };

        match latest.entry(user_id) {
            Entry::Occupied(mut entry) => {
                if event.ts >= entry.get().ts {
                    entry.insert(event);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(event);
            }
        }
    }

    latest
        .into_iter()
        .map(|(user_id, event)| UserDimension {
            user_id: user_id.to_string(),
            first_name: event.first_name.clone(),
            last_name: event.last_name.clone(),
            gender: event.gender.clone(),
            level: event.level.clone(),
        })
        .collect()
}

//! Pure table transforms.
//!
//! Every transform takes the complete record set by reference and returns a
//! new table. Deduplication and the join are defined over the whole input,
//! never per file or per partition, and no transform mutates its input, so
//! any of them can be re-run safely.

mod calendar;
mod dimensions;
mod songplays;
mod users;

pub use calendar::{derive_time, to_timestamp};
pub use dimensions::{build_artists, build_songs};
pub use songplays::{JoinOptions, UnmatchedPolicy, build_songplays};
pub use users::build_users;

use std::hash::Hash;

use indexmap::IndexMap;

/// Keep the first row seen for each key, in first-seen key order.
pub(crate) fn first_per_key<R, K, F>(rows: impl IntoIterator<Item = R>, key: F) -> Vec<R>
where
    K: Hash + Eq,
    F: Fn(&R) -> K,
{
    let mut kept: IndexMap<K, R> = IndexMap::new();
    for row in rows {
        kept.entry(key(&row)).or_insert(row);
    }
    kept.into_values().collect()
}

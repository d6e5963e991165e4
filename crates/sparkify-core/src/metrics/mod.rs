//! Metric events.
//!
//! Events are recorded through the `metrics` facade. Installing a recorder
//! (Prometheus, statsd, ...) is left to the process embedding the pipeline;
//! without one every emission is a no-op.

pub mod events;

/// Emit a metric event.
///
/// Calls [`events::InternalEvent::emit`] on the given event.
///
/// ```ignore
/// use sparkify_core::emit;
/// use sparkify_core::metrics::events::RecordsRead;
///
/// emit!(RecordsRead { count: 100, source: "log_data".into() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;

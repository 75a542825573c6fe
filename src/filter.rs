//! Pass/drop decision for inbound notification events.

use tracing::debug;

use crate::event::RawNotification;
use crate::store::SourceStore;

/// Decide whether an event should be processed.
///
/// True iff the event's source is registered in the allow-list and its
/// enabled flag is set. Both lookups are taken against one consistent
/// view of the store (see [`SourceStore::check`]). No side effects;
/// this runs once per inbound event.
pub fn should_process(store: &SourceStore, event: &RawNotification) -> bool {
    if store.check(&event.source_id) {
        true
    } else {
        debug!("Source {} is unregistered or disabled, dropping event", event.source_id);
        false
    }
}

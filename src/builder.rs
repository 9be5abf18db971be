use crate::clock::Clock;
use crate::config::ConfigSnapshot;
use crate::model::{
    ActivityEvent, Heartbeat, BRANCH, ENTITY_TYPE, LANGUAGE, NO_ACTIVE_FILE, PLUGIN,
};

/// Turns an editor event into the record sent to the service.
///
/// The heartbeat is stamped with the clock's current time, not the event's
/// own timestamp.
pub fn build(event: &ActivityEvent, config: &ConfigSnapshot, clock: &dyn Clock) -> Heartbeat {
    let entity = if event.source_path.is_empty() {
        NO_ACTIVE_FILE.to_owned()
    } else {
        event.source_path.clone()
    };

    Heartbeat {
        entity,
        kind: ENTITY_TYPE.to_owned(),
        time: clock.now(),
        project: config.project_name.clone(),
        branch: BRANCH.to_owned(),
        plugin: PLUGIN.to_owned(),
        language: LANGUAGE.to_owned(),
        is_write: event.is_forced_write,
        is_debugging: config.debug,
    }
}

use serde::{Deserialize, Serialize};

/// Entity reported when no file is active in the editor.
pub const NO_ACTIVE_FILE: &str = "Unsaved Scene";
pub const ENTITY_TYPE: &str = "file";
pub const BRANCH: &str = "master";
pub const PLUGIN: &str = "unity-wakatime";
pub const LANGUAGE: &str = "Unity";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Heartbeat {
    pub entity: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix epoch seconds.
    pub time: f64,
    pub project: String,
    pub branch: String,
    pub plugin: String,
    pub language: String,
    pub is_write: bool,
    pub is_debugging: bool,
}

impl Heartbeat {
    /// Zero-time value that any real heartbeat is newer than.
    pub fn sentinel() -> Self {
        Heartbeat {
            entity: String::new(),
            kind: String::new(),
            time: 0.0,
            project: String::new(),
            branch: String::new(),
            plugin: String::new(),
            language: String::new(),
            is_write: false,
            is_debugging: false,
        }
    }
}

/// Something happened in the editor.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ActivityEvent {
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub is_forced_write: bool,
    #[serde(default)]
    pub timestamp: f64,
}

impl ActivityEvent {
    pub fn changed(path: impl Into<String>) -> Self {
        ActivityEvent {
            source_path: path.into(),
            ..Default::default()
        }
    }

    pub fn saved(path: impl Into<String>) -> Self {
        ActivityEvent {
            source_path: path.into(),
            is_forced_write: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiEnvelope<T> {
    pub error: Option<String>,
    pub data: Option<T>,
}

/// What the service echoes back for an accepted heartbeat.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HeartbeatData {
    pub id: String,
    pub entity: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Heartbeat {
        Heartbeat {
            entity: "Assets/Scenes/Main.unity".into(),
            kind: ENTITY_TYPE.into(),
            time: 1_700_000_000.25,
            project: "Platformer".into(),
            branch: BRANCH.into(),
            plugin: PLUGIN.into(),
            language: LANGUAGE.into(),
            is_write: true,
            is_debugging: false,
        }
    }

    #[test]
    fn wire_names_are_snake_case() {
        let value = serde_json::to_value(sample()).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();

        assert_eq!(
            keys,
            [
                "branch",
                "entity",
                "is_debugging",
                "is_write",
                "language",
                "plugin",
                "project",
                "time",
                "type"
            ]
        );
        assert_eq!(value["type"], "file");
    }

    #[test]
    fn wire_json_decodes_back_to_same_heartbeat() {
        let heartbeat = sample();
        let json = serde_json::to_string(&heartbeat).unwrap();
        let back: Heartbeat = serde_json::from_str(&json).unwrap();

        assert_eq!(back, heartbeat);
    }

    #[test]
    fn envelope_fields_are_optional() {
        let envelope: ApiEnvelope<HeartbeatData> = serde_json::from_str("{}").unwrap();
        assert_eq!(envelope.error, None);
        assert_eq!(envelope.data, None);

        let envelope: ApiEnvelope<HeartbeatData> =
            serde_json::from_str(r#"{"error": "Duplicate", "data": null}"#).unwrap();
        assert_eq!(envelope.error.as_deref(), Some("Duplicate"));
    }

    #[test]
    fn activity_event_reads_partial_json() {
        let event: ActivityEvent = serde_json::from_str(r#"{"source_path": "a.cs"}"#).unwrap();
        assert_eq!(event, ActivityEvent::changed("a.cs"));
    }
}

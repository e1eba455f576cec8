use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An event published on the bot's event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Dotted event name, e.g. `rpa.task.completed`
    pub event_type: String,

    /// Who published the event
    pub source: String,

    pub data: Map<String, Value>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_new_keeps_object_data() {
        let event = Event::new("plugin.registered", "plugins", json!({"id": "ocr"}));
        assert_eq!(event.data["id"], "ocr");
    }

    #[test]
    fn test_event_new_wraps_scalars() {
        let event = Event::new("tick", "clock", json!(5));
        assert_eq!(event.data["value"], 5);
        assert!(Event::new("tick", "clock", Value::Null).data.is_empty());
    }
}

//! The scripts the debuggee has loaded, as announced to the front end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, warn};

use inspector_core::protocol::ScriptDescriptor;

use crate::application::ports::{FrontendChannel, ScriptRegistry};
use crate::application::translate::{script_name_to_url, script_parsed_params};
use crate::domain::messages::Event;

/// A [`ScriptRegistry`] that announces every new script with
/// `Debugger.scriptParsed`.
///
/// Scripts without a name (eval'd code) are not tracked: the front end has
/// no URL to show for them.
pub struct ScriptStore {
    scripts: Mutex<HashMap<u64, ScriptDescriptor>>,
    frontend: Arc<dyn FrontendChannel>,
}

impl ScriptStore {
    pub fn new(frontend: Arc<dyn FrontendChannel>) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            frontend,
        }
    }

    pub fn len(&self) -> usize {
        self.scripts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts().is_empty()
    }

    pub fn get(&self, id: u64) -> Option<ScriptDescriptor> {
        self.scripts().get(&id).cloned()
    }

    /// Handles the body of a backend `afterCompile` event.
    pub fn handle_after_compile(&self, body: &Value) {
        let Some(script) = body.get("script") else {
            debug!("afterCompile without a script");
            return;
        };
        match serde_json::from_value::<ScriptDescriptor>(script.clone()) {
            Ok(script) => self.add_script(script),
            Err(e) => warn!("unreadable afterCompile script: {e}"),
        }
    }

    fn scripts(&self) -> MutexGuard<'_, HashMap<u64, ScriptDescriptor>> {
        self.scripts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ScriptRegistry for ScriptStore {
    fn reset(&self) {
        self.scripts().clear();
    }

    fn add_script(&self, script: ScriptDescriptor) {
        let Some(url) = script.name.as_deref().filter(|n| !n.is_empty()).map(script_name_to_url)
        else {
            debug!(id = script.id, "skipping unnamed script");
            return;
        };

        let params = script_parsed_params(&script, &url);
        let is_new = self.scripts().insert(script.id, script).is_none();
        // A script announced by afterCompile can come back in the next reload.
        if is_new {
            self.frontend.send_event(Event::new("Debugger.scriptParsed", params));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::mock::RecordingFrontend;
    use serde_json::json;

    fn descriptor(id: u64, name: Option<&str>) -> ScriptDescriptor {
        ScriptDescriptor {
            id,
            name: name.map(str::to_string),
            line_offset: 0,
            column_offset: 0,
            line_count: 12,
            source: None,
            source_length: None,
        }
    }

    #[test]
    fn test_named_script_is_stored_and_announced() {
        // Arrange
        let frontend = Arc::new(RecordingFrontend::new());
        let store = ScriptStore::new(frontend.clone());

        // Act
        store.add_script(descriptor(31, Some("/app/main.js")));

        // Assert
        assert_eq!(store.len(), 1);
        let events = frontend.events();
        assert_eq!(events[0].method, "Debugger.scriptParsed");
        let params = events[0].params.clone().unwrap();
        assert_eq!(params["scriptId"], json!("31"));
        assert_eq!(params["url"], json!("file:///app/main.js"));
        assert_eq!(params["endLine"], json!(12));
    }

    #[test]
    fn test_unnamed_script_is_skipped() {
        let frontend = Arc::new(RecordingFrontend::new());
        let store = ScriptStore::new(frontend.clone());

        store.add_script(descriptor(5, None));
        store.add_script(descriptor(6, Some("")));

        assert!(store.is_empty());
        assert!(frontend.events().is_empty());
    }

    #[test]
    fn test_known_script_is_announced_once() {
        let frontend = Arc::new(RecordingFrontend::new());
        let store = ScriptStore::new(frontend.clone());

        store.add_script(descriptor(31, Some("/a.js")));
        store.add_script(descriptor(31, Some("/a.js")));

        assert_eq!(frontend.events().len(), 1);
    }

    #[test]
    fn test_reset_forgets_everything() {
        let frontend = Arc::new(RecordingFrontend::new());
        let store = ScriptStore::new(frontend.clone());
        store.add_script(descriptor(31, Some("/a.js")));

        store.reset();
        store.add_script(descriptor(31, Some("/a.js")));

        assert_eq!(store.len(), 1);
        assert_eq!(frontend.events().len(), 2);
    }

    #[test]
    fn test_after_compile_adds_its_script() {
        let frontend = Arc::new(RecordingFrontend::new());
        let store = ScriptStore::new(frontend.clone());

        store.handle_after_compile(&json!({
            "script": {"id": 44, "name": "/app/lazy.js", "lineOffset": 0, "columnOffset": 0, "lineCount": 3}
        }));

        assert_eq!(store.get(44).unwrap().line_count, 3);
        assert_eq!(frontend.event_methods(), vec!["Debugger.scriptParsed"]);
    }
}

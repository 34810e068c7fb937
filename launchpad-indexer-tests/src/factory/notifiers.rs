use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use launchpad_indexer::{BusEvent, EventNotifier, NotifierError};

/// Keeps every sent event; can be switched to failing mode.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<BusEvent>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn get_events(&self) -> Vec<BusEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn get_event_names(&self) -> Vec<&'static str> {
        self.get_events().iter().map(BusEvent::get_name).collect()
    }
}

#[async_trait::async_trait]
impl EventNotifier for RecordingNotifier {
    async fn send(&self, event: &BusEvent) -> Result<(), NotifierError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifierError::Unknown("bus unavailable".to_owned()));
        }

        self.events.lock().unwrap().push(event.clone());

        Ok(())
    }
}

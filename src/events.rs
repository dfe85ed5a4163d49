use crate::devices::DeviceKind;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ViewerEvent {
    RoomLoadStarted { room: String },
    RoomReady { room: String, devices: usize },
    RoomLoadFailed { room: String, error: String },
    StaleLoadDiscarded { room: String },
    DeviceSelected { name: String, kind: DeviceKind },
    SelectionCleared,
    DeviceToggled { name: String, on: bool },
}

impl fmt::Display for ViewerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerEvent::RoomLoadStarted { room } => write!(f, "Loading {room}"),
            ViewerEvent::RoomReady { room, devices } => {
                write!(f, "{room} ready, {devices} devices")
            }
            ViewerEvent::RoomLoadFailed { room, error } => {
                write!(f, "{room} failed to load: {error}")
            }
            ViewerEvent::StaleLoadDiscarded { room } => write!(f, "Discarded stale load of {room}"),
            ViewerEvent::DeviceSelected { name, kind } => {
                write!(f, "Selected {name} ({})", kind.label())
            }
            ViewerEvent::SelectionCleared => write!(f, "Selection cleared"),
            ViewerEvent::DeviceToggled { name, on } => {
                write!(f, "{name} switched {}", if *on { "ON" } else { "OFF" })
            }
        }
    }
}

/// Bounded log of recent viewer events, shown in the side panel.
pub struct EventLog {
    events: VecDeque<ViewerEvent>,
    limit: usize,
}

impl EventLog {
    pub fn new(limit: usize) -> Self {
        Self { events: VecDeque::with_capacity(limit), limit }
    }

    pub fn push(&mut self, event: ViewerEvent) {
        if self.events.len() == self.limit {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ViewerEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_drops_oldest_beyond_limit() {
        let mut log = EventLog::new(2);
        log.push(ViewerEvent::SelectionCleared);
        log.push(ViewerEvent::RoomLoadStarted { room: "Kitchen".into() });
        log.push(ViewerEvent::RoomReady { room: "Kitchen".into(), devices: 3 });
        assert_eq!(log.len(), 2);
        assert!(matches!(log.iter().next(), Some(ViewerEvent::RoomLoadStarted { .. })));
    }
}

//! Device state attached to scene-graph nodes, and the panel snapshot the
//! presentation layer reads.

pub const DEFAULT_FRIDGE_TEMP_C: f32 = 4.0;
pub const FRIDGE_TEMP_RANGE_C: (f32, f32) = (-18.0, 8.0);
pub const DEFAULT_STOVE_TEMP_C: f32 = 180.0;
pub const STOVE_TEMP_RANGE_C: (f32, f32) = (50.0, 300.0);
pub const DEFAULT_KETTLE_SECS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Room,
    Lamp,
    Fridge,
    Stove,
    Kettle,
    Computer,
    Unknown,
}

impl DeviceKind {
    pub fn label(self) -> &'static str {
        match self {
            DeviceKind::Room => "Room",
            DeviceKind::Lamp => "Lamp",
            DeviceKind::Fridge => "Fridge",
            DeviceKind::Stove => "Stove",
            DeviceKind::Kettle => "Kettle",
            DeviceKind::Computer => "Computer",
            DeviceKind::Unknown => "Unknown",
        }
    }
}

/// Per-kind device state. Variant payloads carry only the fields that kind
/// actually has; a fridge owns a bounded temperature, a kettle a countdown,
/// a lamp nothing beyond the switch.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceState {
    Room,
    Lamp { on: bool },
    Fridge { on: bool, temperature: f32, min: f32, max: f32 },
    Stove { on: bool, temperature: f32, min: f32, max: f32 },
    Kettle { on: bool, remaining_secs: u32 },
    Computer { on: bool },
}

impl DeviceState {
    pub fn default_for(kind: DeviceKind) -> Option<Self> {
        match kind {
            DeviceKind::Room => Some(DeviceState::Room),
            DeviceKind::Lamp => Some(DeviceState::Lamp { on: true }),
            DeviceKind::Fridge => Some(DeviceState::Fridge {
                on: true,
                temperature: DEFAULT_FRIDGE_TEMP_C,
                min: FRIDGE_TEMP_RANGE_C.0,
                max: FRIDGE_TEMP_RANGE_C.1,
            }),
            DeviceKind::Stove => Some(DeviceState::Stove {
                on: false,
                temperature: DEFAULT_STOVE_TEMP_C,
                min: STOVE_TEMP_RANGE_C.0,
                max: STOVE_TEMP_RANGE_C.1,
            }),
            DeviceKind::Kettle => {
                Some(DeviceState::Kettle { on: false, remaining_secs: DEFAULT_KETTLE_SECS })
            }
            DeviceKind::Computer => Some(DeviceState::Computer { on: true }),
            DeviceKind::Unknown => None,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceState::Room => DeviceKind::Room,
            DeviceState::Lamp { .. } => DeviceKind::Lamp,
            DeviceState::Fridge { .. } => DeviceKind::Fridge,
            DeviceState::Stove { .. } => DeviceKind::Stove,
            DeviceState::Kettle { .. } => DeviceKind::Kettle,
            DeviceState::Computer { .. } => DeviceKind::Computer,
        }
    }

    pub fn is_on(&self) -> Option<bool> {
        match self {
            DeviceState::Room => None,
            DeviceState::Lamp { on }
            | DeviceState::Fridge { on, .. }
            | DeviceState::Stove { on, .. }
            | DeviceState::Kettle { on, .. }
            | DeviceState::Computer { on } => Some(*on),
        }
    }

    /// Flips the on/off switch. Returns the new state, or `None` for kinds
    /// without a switch (the room pseudo-device).
    pub fn toggle(&mut self) -> Option<bool> {
        match self {
            DeviceState::Room => None,
            DeviceState::Lamp { on }
            | DeviceState::Fridge { on, .. }
            | DeviceState::Stove { on, .. }
            | DeviceState::Kettle { on, .. }
            | DeviceState::Computer { on } => {
                *on = !*on;
                Some(*on)
            }
        }
    }

    /// Applies a temperature delta, clamped to the device's bounds. Only
    /// fridges and stoves carry a temperature; anything else is a no-op.
    pub fn adjust_temperature(&mut self, delta: f32) -> bool {
        match self {
            DeviceState::Fridge { temperature, min, max, .. }
            | DeviceState::Stove { temperature, min, max, .. } => {
                *temperature = (*temperature + delta).clamp(*min, *max);
                true
            }
            _ => false,
        }
    }

    pub fn status_line(&self) -> String {
        match self {
            DeviceState::Room => "Active".to_string(),
            other => match other.is_on() {
                Some(true) => "ON".to_string(),
                Some(false) => "OFF".to_string(),
                None => String::new(),
            },
        }
    }
}

/// Tag attached to the one node that roots a physical device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTag {
    pub state: DeviceState,
}

impl DeviceTag {
    pub fn new(state: DeviceState) -> Self {
        Self { state }
    }

    pub fn kind(&self) -> DeviceKind {
        self.state.kind()
    }
}

/// Kind-specific numeric readout shown next to the status string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelReading {
    Temperature { value: f32, min: f32, max: f32 },
    Timer { remaining_secs: u32 },
}

/// Snapshot published by the 3D core for the presentation layer. The panel
/// is write-once per update; presentation code only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePanel {
    pub name: String,
    pub kind: DeviceKind,
    pub status: String,
    pub reading: Option<PanelReading>,
}

impl DevicePanel {
    pub fn idle() -> Self {
        Self {
            name: "No selection".to_string(),
            kind: DeviceKind::Unknown,
            status: "Click an object".to_string(),
            reading: None,
        }
    }

    pub fn room_loading(room_name: &str) -> Self {
        Self {
            name: room_name.to_string(),
            kind: DeviceKind::Room,
            status: "Loading...".to_string(),
            reading: None,
        }
    }

    pub fn room_active(room_name: &str) -> Self {
        Self {
            name: room_name.to_string(),
            kind: DeviceKind::Room,
            status: "Active".to_string(),
            reading: None,
        }
    }

    pub fn room_failed(room_name: &str) -> Self {
        Self {
            name: room_name.to_string(),
            kind: DeviceKind::Room,
            status: "Load failed".to_string(),
            reading: None,
        }
    }

    pub fn for_device(name: &str, state: &DeviceState) -> Self {
        let reading = match state {
            DeviceState::Fridge { temperature, min, max, .. }
            | DeviceState::Stove { temperature, min, max, .. } => {
                Some(PanelReading::Temperature { value: *temperature, min: *min, max: *max })
            }
            DeviceState::Kettle { remaining_secs, .. } => {
                Some(PanelReading::Timer { remaining_secs: *remaining_secs })
            }
            _ => None,
        };
        Self { name: name.to_string(), kind: state.kind(), status: state.status_line(), reading }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fridge_temperature_clamps_to_bounds() {
        let mut state = DeviceState::default_for(DeviceKind::Fridge).expect("fridge default");
        assert!(state.adjust_temperature(100.0));
        match &state {
            DeviceState::Fridge { temperature, .. } => assert_eq!(*temperature, 8.0),
            other => panic!("unexpected state {other:?}"),
        }
        assert!(state.adjust_temperature(-100.0));
        match &state {
            DeviceState::Fridge { temperature, .. } => assert_eq!(*temperature, -18.0),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn lamp_has_no_temperature() {
        let mut state = DeviceState::default_for(DeviceKind::Lamp).expect("lamp default");
        assert!(!state.adjust_temperature(5.0));
        assert_eq!(state.toggle(), Some(false));
        assert_eq!(state.status_line(), "OFF");
    }

    #[test]
    fn room_pseudo_device_has_no_switch() {
        let mut state = DeviceState::Room;
        assert_eq!(state.toggle(), None);
        assert_eq!(state.status_line(), "Active");
    }

    #[test]
    fn kettle_panel_shows_timer_not_temperature() {
        let state = DeviceState::default_for(DeviceKind::Kettle).expect("kettle default");
        let panel = DevicePanel::for_device("Kitchen_Coffee_Maker_01", &state);
        assert_eq!(panel.kind, DeviceKind::Kettle);
        assert_eq!(panel.status, "OFF");
        assert!(matches!(panel.reading, Some(PanelReading::Timer { .. })));
    }
}

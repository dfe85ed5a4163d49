//! egui side panel: room switching, the selected-device readout, and the
//! recent event feed. The panel only reads registry snapshots; everything
//! it wants changed comes back as a `PanelActions` for the app to apply.

use crate::devices::{DeviceKind, PanelReading};
use crate::events::EventLog;
use crate::registry::{RoomDescriptor, SceneRegistry, ROOM_CATALOG};

const FRIDGE_TEMP_STEP_C: f32 = 1.0;
const STOVE_TEMP_STEP_C: f32 = 10.0;

#[derive(Default)]
pub struct PanelActions {
    pub switch_room: Option<&'static RoomDescriptor>,
    pub toggle_device: bool,
    pub clear_selection: bool,
    pub fridge_delta: f32,
    pub stove_delta: f32,
}

pub fn draw(ctx: &egui::Context, registry: &SceneRegistry, events: &EventLog) -> PanelActions {
    let mut actions = PanelActions::default();

    egui::SidePanel::left("control_panel").resizable(false).default_width(240.0).show(ctx, |ui| {
        ui.heading("Hearthview");
        ui.separator();

        ui.label("Rooms");
        ui.horizontal_wrapped(|ui| {
            for room in ROOM_CATALOG {
                let active = registry.current_room_id() == Some(room.id);
                if ui.selectable_label(active, room.name).clicked() && !active {
                    actions.switch_room = Some(room);
                }
            }
        });
        if registry.load_in_flight() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading room...");
            });
        }
        ui.separator();

        let panel = registry.panel();
        ui.label("Selection");
        ui.strong(&panel.name);
        if panel.kind != DeviceKind::Unknown {
            ui.label(panel.kind.label());
        }
        ui.label(&panel.status);

        match panel.reading {
            Some(PanelReading::Temperature { value, min, max }) => {
                let step = if panel.kind == DeviceKind::Stove {
                    STOVE_TEMP_STEP_C
                } else {
                    FRIDGE_TEMP_STEP_C
                };
                ui.horizontal(|ui| {
                    if ui.button("-").clicked() {
                        if panel.kind == DeviceKind::Stove {
                            actions.stove_delta -= step;
                        } else {
                            actions.fridge_delta -= step;
                        }
                    }
                    ui.label(format!("{value:.0} \u{b0}C"));
                    if ui.button("+").clicked() {
                        if panel.kind == DeviceKind::Stove {
                            actions.stove_delta += step;
                        } else {
                            actions.fridge_delta += step;
                        }
                    }
                });
                ui.label(format!("Range {min:.0} to {max:.0} \u{b0}C"));
            }
            Some(PanelReading::Timer { remaining_secs }) => {
                ui.label(format!(
                    "Timer {}:{:02}",
                    remaining_secs / 60,
                    remaining_secs % 60
                ));
            }
            None => {}
        }

        let switchable = !matches!(panel.kind, DeviceKind::Room | DeviceKind::Unknown);
        if switchable {
            let label = if panel.status == "ON" { "Turn off" } else { "Turn on" };
            if ui.button(label).clicked() {
                actions.toggle_device = true;
            }
        }
        if registry.selected().is_some() && ui.button("Deselect").clicked() {
            actions.clear_selection = true;
        }

        ui.separator();
        egui::CollapsingHeader::new("Events").default_open(true).show(ui, |ui| {
            egui::ScrollArea::vertical().max_height(180.0).show(ui, |ui| {
                for event in events.iter().rev() {
                    ui.small(event.to_string());
                }
            });
        });
    });

    actions
}

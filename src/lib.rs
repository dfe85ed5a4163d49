pub mod app;
pub mod asset;
pub mod camera;
pub mod classify;
pub mod cli;
pub mod config;
pub mod devices;
pub mod events;
pub mod input;
pub mod picking;
pub mod registry;
pub mod renderer;
pub mod scene;
pub mod selection;
pub mod time;

pub use app::{run, run_with_args, App};

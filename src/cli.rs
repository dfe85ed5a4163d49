//! Command line handling. Window flags override fields of the JSON config;
//! `--room` picks the startup room and `--config` points at an alternate
//! config file. Flags accept both `--flag value` and `--flag=value`.

use crate::config::AppConfigOverrides;
use crate::registry::{find_room, ROOM_CATALOG};
use anyhow::{anyhow, bail, Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub vsync: Option<bool>,
    /// Validated room id from the catalog.
    pub room: Option<String>,
    pub config_path: Option<String>,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        let mut iter = args.into_iter();
        while let Some(raw) = iter.next() {
            let raw = raw.as_ref();
            let Some(stripped) = raw.strip_prefix("--") else {
                bail!("Unexpected argument '{raw}'. Flags start with '--'.");
            };
            let (key, value) = match stripped.split_once('=') {
                Some((key, inline)) => (key.to_string(), inline.to_string()),
                None => {
                    let next = iter
                        .next()
                        .ok_or_else(|| anyhow!("Expected a value after '--{stripped}'"))?;
                    (stripped.to_string(), next.as_ref().to_string())
                }
            };
            match key.as_str() {
                "width" => {
                    parsed.width =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    parsed.height = Some(
                        value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?,
                    );
                }
                "vsync" => parsed.vsync = Some(parse_bool_flag("vsync", &value)?),
                "room" => parsed.room = Some(parse_room_id(&value)?),
                "config" => parsed.config_path = Some(value),
                _ => bail!(
                    "Unknown flag '--{key}'. Supported flags: --width, --height, --vsync, --room, --config."
                ),
            }
        }
        Ok(parsed)
    }

    /// The window-related subset, for `AppConfig::apply_overrides`.
    pub fn window_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides { width: self.width, height: self.height, vsync: self.vsync }
    }
}

/// Accepts any case, rejects ids not in the room catalog so a typo fails at
/// startup instead of leaving the viewer on an empty scene.
fn parse_room_id(value: &str) -> Result<String> {
    let id = value.to_ascii_lowercase();
    if find_room(&id).is_none() {
        let known: Vec<&str> = ROOM_CATALOG.iter().map(|room| room.id).collect();
        bail!("Unknown room '{value}'. Available rooms: {}.", known.join(", "));
    }
    Ok(id)
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

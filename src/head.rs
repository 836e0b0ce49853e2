//! Instrument construction from the protocol `head` section.
//!
//! Each tool entry is checked against the supported-option set, typed into an
//! [`Instrument`] plus [`ToolSettings`], and cross-referenced against the
//! deck for its tip racks and trash container. The deck map is passed in
//! explicitly; instruments never reach for global robot state.

use crate::deck::Container;
use crate::error::ProtocolError;
use crate::protocol::ToolSpec;
use indexmap::IndexMap;
use serde_json::Value;

/// Tool options the head builder understands. Any other key is fatal.
pub const SUPPORTED_TOOL_OPTIONS: [&str; 13] = [
    "tool",
    "tip-racks",
    "trash-container",
    "multi-channel",
    "axis",
    "volume",
    "down-plunger-speed",
    "up-plunger-speed",
    "tip-plunge",
    "extra-pull-volume",
    "extra-pull-delay",
    "distribute-percentage",
    "points",
];

/// Numeric tuning options retained from the tool configuration.
///
/// All fields are optional; the documented default (0) is applied at the
/// call sites that consume them.
#[derive(Clone, Debug, Default)]
pub struct ToolSettings {
    pub down_plunger_speed: Option<f64>,
    pub up_plunger_speed: Option<f64>,
    pub tip_plunge: Option<f64>,
    pub extra_pull_volume: Option<f64>,
    pub extra_pull_delay: Option<f64>,
    pub distribute_percentage: Option<f64>,
    /// Calibration points, copied verbatim in declared order.
    pub points: Vec<Value>,
}

/// A configured pipetting tool bound to an axis.
///
/// Built once per tool and read-only afterwards. Physical tip and volume
/// state belongs to the instrument driver, never to this structure.
#[derive(Clone, Debug)]
pub struct Instrument {
    pub name: String,
    pub axis: String,
    /// 8 for a multi-channel head, 1 otherwise.
    pub channel_count: u8,
    pub max_volume: f64,
    pub min_volume: f64,
    /// Deck names of the tool's tip racks, verified, in declared order.
    pub tip_racks: Vec<String>,
    /// Deck name of the trash container, verified.
    pub trash_container: String,
    pub settings: ToolSettings,
}

/// Builds every instrument in the `head` section, in declared order.
pub fn build_head(
    head: &IndexMap<String, ToolSpec>,
    containers: &IndexMap<String, Container>,
) -> Result<IndexMap<String, Instrument>, ProtocolError> {
    let mut instruments = IndexMap::new();
    for (tool_name, spec) in head {
        instruments.insert(tool_name.clone(), build_tool(tool_name, spec, containers)?);
    }
    log::debug!("head built: {} instruments", instruments.len());
    Ok(instruments)
}

fn build_tool(
    tool: &str,
    spec: &ToolSpec,
    containers: &IndexMap<String, Container>,
) -> Result<Instrument, ProtocolError> {
    for key in spec.keys() {
        if !SUPPORTED_TOOL_OPTIONS.contains(&key.as_str()) {
            return Err(ProtocolError::ConfigKey {
                tool: tool.to_string(),
                key: key.clone(),
            });
        }
    }

    let axis = require_str(tool, spec, "axis")?;
    let volume = require_f64(tool, spec, "volume")?;
    let multi_channel = require_bool(tool, spec, "multi-channel")?;

    let tip_racks = resolve_tip_racks(tool, spec, containers)?;
    let trash_container = resolve_trash(tool, spec, containers)?;

    let settings = ToolSettings {
        down_plunger_speed: optional_f64(tool, spec, "down-plunger-speed")?,
        up_plunger_speed: optional_f64(tool, spec, "up-plunger-speed")?,
        tip_plunge: optional_f64(tool, spec, "tip-plunge")?,
        extra_pull_volume: optional_f64(tool, spec, "extra-pull-volume")?,
        extra_pull_delay: optional_f64(tool, spec, "extra-pull-delay")?,
        distribute_percentage: optional_f64(tool, spec, "distribute-percentage")?,
        points: points(tool, spec)?,
    };

    Ok(Instrument {
        name: tool.to_string(),
        axis,
        channel_count: if multi_channel { 8 } else { 1 },
        max_volume: volume,
        min_volume: 0.0,
        tip_racks,
        trash_container,
        settings,
    })
}

fn resolve_tip_racks(
    tool: &str,
    spec: &ToolSpec,
    containers: &IndexMap<String, Container>,
) -> Result<Vec<String>, ProtocolError> {
    let entries = spec
        .get("tip-racks")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            config(
                tool,
                "option \"tip-racks\" must be an array of container references",
            )
        })?;

    let mut racks = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = container_ref(tool, entry, "tip-racks")?;
        if !containers.contains_key(&name) {
            return Err(ProtocolError::Reference(format!(
                "tip rack {name:?} for tool {tool:?} is not on the deck"
            )));
        }
        racks.push(name);
    }
    Ok(racks)
}

fn resolve_trash(
    tool: &str,
    spec: &ToolSpec,
    containers: &IndexMap<String, Container>,
) -> Result<String, ProtocolError> {
    let entry = spec.get("trash-container").ok_or_else(|| {
        config(tool, "option \"trash-container\" is required")
    })?;
    let name = container_ref(tool, entry, "trash-container")?;
    if !containers.contains_key(&name) {
        return Err(ProtocolError::Reference(format!(
            "trash container {name:?} for tool {tool:?} is not on the deck"
        )));
    }
    Ok(name)
}

fn points(tool: &str, spec: &ToolSpec) -> Result<Vec<Value>, ProtocolError> {
    match spec.get("points") {
        None => Ok(Vec::new()),
        Some(Value::Array(points)) => Ok(points.clone()),
        Some(_) => Err(config(tool, "option \"points\" must be an array")),
    }
}

fn container_ref(tool: &str, value: &Value, key: &str) -> Result<String, ProtocolError> {
    value
        .get("container")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            config(
                tool,
                &format!("option {key:?} entries must carry a \"container\" name"),
            )
        })
}

fn require_str(tool: &str, spec: &ToolSpec, key: &str) -> Result<String, ProtocolError> {
    spec.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| config(tool, &format!("option {key:?} must be a string")))
}

fn require_f64(tool: &str, spec: &ToolSpec, key: &str) -> Result<f64, ProtocolError> {
    spec.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| config(tool, &format!("option {key:?} must be a number")))
}

fn require_bool(tool: &str, spec: &ToolSpec, key: &str) -> Result<bool, ProtocolError> {
    spec.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| config(tool, &format!("option {key:?} must be a boolean")))
}

fn optional_f64(tool: &str, spec: &ToolSpec, key: &str) -> Result<Option<f64>, ProtocolError> {
    match spec.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| config(tool, &format!("option {key:?} must be a number"))),
    }
}

fn config(tool: &str, message: &str) -> ProtocolError {
    ProtocolError::Config {
        tool: tool.to_string(),
        message: message.to_string(),
    }
}

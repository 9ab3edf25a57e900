use mavlink::common::{MavCmd, MavMessage, MavModeFlag, MavResult};
use strum_macros::Display;

/// The telemetry the session engine understands. Everything else on the wire is ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    Heartbeat { base_mode: MavModeFlag, custom_mode: u32 },
    /// Altitude above the home position in millimeters.
    GlobalPositionInt { relative_alt_mm: i32 },
    CommandAck { command: MavCmd, result: MavResult },
    ParamValue { name: String, value: f32 },
}

/// Discriminant of `TelemetryMessage`, used to select what a wait listens for.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryKind {
    Heartbeat,
    GlobalPositionInt,
    CommandAck,
    ParamValue,
}

impl TelemetryMessage {
    pub fn from_mav(msg: &MavMessage) -> Option<Self> {
        match msg {
            MavMessage::HEARTBEAT(hb) => Some(TelemetryMessage::Heartbeat {
                base_mode: hb.base_mode,
                custom_mode: hb.custom_mode,
            }),
            MavMessage::GLOBAL_POSITION_INT(pos) => {
                Some(TelemetryMessage::GlobalPositionInt { relative_alt_mm: pos.relative_alt })
            }
            MavMessage::COMMAND_ACK(ack) => {
                Some(TelemetryMessage::CommandAck { command: ack.command, result: ack.result })
            }
            MavMessage::PARAM_VALUE(param) => Some(TelemetryMessage::ParamValue {
                name: decode_param_id(&param.param_id),
                value: param.param_value,
            }),
            _ => None,
        }
    }

    pub fn kind(&self) -> TelemetryKind {
        match self {
            TelemetryMessage::Heartbeat { .. } => TelemetryKind::Heartbeat,
            TelemetryMessage::GlobalPositionInt { .. } => TelemetryKind::GlobalPositionInt,
            TelemetryMessage::CommandAck { .. } => TelemetryKind::CommandAck,
            TelemetryMessage::ParamValue { .. } => TelemetryKind::ParamValue,
        }
    }

    /// `Some(armed)` for heartbeats, `None` for every other message.
    pub fn is_armed(&self) -> Option<bool> {
        match self {
            TelemetryMessage::Heartbeat { base_mode, .. } => {
                Some(base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED))
            }
            _ => None,
        }
    }
}

/// Param ids are NUL-padded, but a full 16 byte id carries no terminator.
fn decode_param_id(raw: &[u8; 16]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

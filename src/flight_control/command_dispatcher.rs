use super::PositionTarget;
use crate::error::{EngineError, InputError};
use crate::session::{Session, TelemetryKind, TelemetryMessage};
use crate::{log, warn};
use mavlink::common::{
    COMMAND_LONG_DATA, MavCmd, MavMessage, MavModeFlag, MavParamType, MavResult, PARAM_SET_DATA,
};
use std::time::Duration;

/// A `COMMAND_LONG` to be sent to the session's vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    id: MavCmd,
    params: [f32; 7],
    confirmation: u8,
}

impl Command {
    pub fn new(id: MavCmd, params: [f32; 7]) -> Self { Self { id, params, confirmation: 0 } }

    /// A command whose only meaningful argument is `param1`.
    pub fn with_p1(id: MavCmd, p1: f32) -> Self { Self::new(id, [p1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]) }

    pub fn id(&self) -> MavCmd { self.id }
    pub fn params(&self) -> &[f32; 7] { &self.params }

    fn to_mav(self, session: &Session) -> MavMessage {
        let [param1, param2, param3, param4, param5, param6, param7] = self.params;
        MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            param1,
            param2,
            param3,
            param4,
            param5,
            param6,
            param7,
            command: self.id,
            target_system: session.system_id(),
            target_component: session.component_id(),
            confirmation: self.confirmation,
        })
    }
}

/// Encodes and sends commands, mode changes, setpoints and parameter writes.
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Per attempt wait for a parameter echo.
    pub const PARAM_SETTLE: Duration = Duration::from_millis(500);
    /// Parameter writes are sent at most this often before giving up.
    pub const PARAM_ATTEMPTS: usize = 3;

    /// Sends `command` once. Whether the vehicle accepted it is never known.
    pub async fn send_command(session: &Session, command: Command) -> Result<(), EngineError> {
        log!("Sending {:?} {:?}", command.id(), command.params());
        session.send(&command.to_mav(session)).await
    }

    /// Sends `command` and waits up to `timeout` for its `COMMAND_ACK`.
    ///
    /// # Returns
    /// The result reported by the vehicle, or `None` if no acknowledgment arrived.
    pub async fn command_acked(
        session: &Session,
        command: Command,
        timeout: Duration,
    ) -> Result<Option<MavResult>, EngineError> {
        let mut waiter = session.waiter();
        Self::send_command(session, command).await?;
        let ack = waiter
            .wait_matching(
                TelemetryKind::CommandAck,
                |msg| matches!(msg, TelemetryMessage::CommandAck { command: id, .. } if *id == command.id()),
                Some(timeout),
            )
            .await;
        Ok(match ack {
            Some(TelemetryMessage::CommandAck { result, .. }) => Some(result),
            _ => None,
        })
    }

    /// Switches the flight mode. Fire-and-forget, like `send_command`.
    ///
    /// # Arguments
    /// * `mode_flags` – Base mode flags, `MAV_MODE_FLAG_CUSTOM_MODE_ENABLED` for autopilot
    ///   specific modes.
    /// * `custom_mode` – The autopilot specific mode number.
    #[allow(clippy::cast_precision_loss)]
    pub async fn set_mode(
        session: &Session,
        mode_flags: MavModeFlag,
        custom_mode: u32,
    ) -> Result<(), EngineError> {
        let params = [f32::from(mode_flags.bits()), custom_mode as f32, 0.0, 0.0, 0.0, 0.0, 0.0];
        Self::send_command(session, Command::new(MavCmd::MAV_CMD_DO_SET_MODE, params)).await
    }

    /// Sends a position setpoint.
    pub async fn send_position_target(
        session: &Session,
        target: &PositionTarget,
    ) -> Result<(), EngineError> {
        log!("Sending setpoint {target:?}");
        session.send(&target.to_mav(session.system_id(), session.component_id())).await
    }

    /// Writes a `REAL32` parameter and waits for the vehicle to echo it.
    ///
    /// Each attempt waits `PARAM_SETTLE` for a `PARAM_VALUE` carrying `name`, the write is
    /// repeated up to `PARAM_ATTEMPTS` times.
    ///
    /// # Returns
    /// The value reported back by the vehicle, `EngineError::Unacknowledged` if it never
    /// answered, or `InputError::ParamNameTooLong` for names beyond 16 bytes.
    pub async fn set_param(session: &Session, name: &str, value: f32) -> Result<f32, EngineError> {
        let param_id = Self::encode_param_id(name)?;
        let msg = MavMessage::PARAM_SET(PARAM_SET_DATA {
            param_value: value,
            target_system: session.system_id(),
            target_component: session.component_id(),
            param_id,
            param_type: MavParamType::MAV_PARAM_TYPE_REAL32,
        });
        for attempt in 1..=Self::PARAM_ATTEMPTS {
            let mut waiter = session.waiter();
            log!("Setting {name} = {value}");
            session.send(&msg).await?;
            let echo = waiter
                .wait_matching(
                    TelemetryKind::ParamValue,
                    |msg| matches!(msg, TelemetryMessage::ParamValue { name: n, .. } if n == name),
                    Some(Self::PARAM_SETTLE),
                )
                .await;
            if let Some(TelemetryMessage::ParamValue { value: confirmed, .. }) = echo {
                return Ok(confirmed);
            }
            warn!("No echo for {name} (attempt {attempt}/{}).", Self::PARAM_ATTEMPTS);
        }
        Err(EngineError::Unacknowledged(name.to_string()))
    }

    fn encode_param_id(name: &str) -> Result<[u8; 16], InputError> {
        let bytes = name.as_bytes();
        if bytes.len() > 16 {
            return Err(InputError::ParamNameTooLong(name.to_string()));
        }
        let mut param_id = [0u8; 16];
        param_id[..bytes.len()].copy_from_slice(bytes);
        Ok(param_id)
    }
}

#[cfg(test)]
mod tests {
    use super::CommandDispatcher;
    use crate::error::InputError;

    #[test]
    fn test_param_id_padding() {
        let id = CommandDispatcher::encode_param_id("SIM_WIND_SPD").unwrap();
        assert_eq!(&id[..12], b"SIM_WIND_SPD");
        assert!(id[12..].iter().all(|&b| b == 0));
        let full = CommandDispatcher::encode_param_id("ABCDEFGHIJKLMNOP").unwrap();
        assert_eq!(&full, b"ABCDEFGHIJKLMNOP");
    }

    #[test]
    fn test_param_id_too_long() {
        let res = CommandDispatcher::encode_param_id("SIM_GPS_DISABLE_EXTRA");
        assert_eq!(res, Err(InputError::ParamNameTooLong("SIM_GPS_DISABLE_EXTRA".to_string())));
    }
}

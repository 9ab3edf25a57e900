use crate::session::TelemetryKind;
use crate::wire_link::LinkError;
use mavlink::common::{MavCmd, MavResult};
use strum_macros::Display;

/// Rejections of operator input. These abort the single requested action only.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum InputError {
    /// The given text could not be parsed as a real number.
    NotANumber(String),
    /// A coordinate lies outside of its valid range.
    OutOfRange { what: &'static str, value: f64 },
    /// Parameter ids are limited to 16 bytes on the wire.
    ParamNameTooLong(String),
    /// The menu selection does not name any operation.
    UnknownSelection(String),
}

impl std::error::Error for InputError {}

/// Failures surfaced by the session engine.
///
/// Only `Connection` is fatal. Every other variant aborts the running action
/// and leaves the session usable.
#[derive(Debug, Display)]
pub enum EngineError {
    /// The handshake with the vehicle never completed.
    Connection(LinkError),
    /// The link failed while the session was running.
    Link(LinkError),
    Input(InputError),
    /// A bounded wait for telemetry of the given kind ran out.
    Timeout(TelemetryKind),
    /// The operator cancelled a running wait.
    Cancelled,
    /// The vehicle never echoed a parameter write.
    Unacknowledged(String),
    /// The vehicle answered a command with something else than `MAV_RESULT_ACCEPTED`.
    CommandRejected { command: MavCmd, result: MavResult },
    /// The operation is not allowed in the current flight state.
    InvalidState { operation: &'static str, state: crate::flight_control::FlightState },
}

impl std::error::Error for EngineError {}

impl From<LinkError> for EngineError {
    fn from(value: LinkError) -> Self { EngineError::Link(value) }
}

impl From<InputError> for EngineError {
    fn from(value: InputError) -> Self { EngineError::Input(value) }
}

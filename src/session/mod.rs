//! The handshake-established session with one vehicle and the telemetry it emits.

mod telemetry;
mod telemetry_waiter;
mod vehicle_session;

pub use telemetry::{TelemetryKind, TelemetryMessage};
pub use telemetry_waiter::TelemetryWaiter;
pub use vehicle_session::Session;

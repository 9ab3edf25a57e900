use super::{Command, CommandDispatcher, Direction, FlightState, PositionTarget};
use crate::error::EngineError;
use crate::session::{Session, TelemetryKind, TelemetryMessage, TelemetryWaiter};
use crate::{error, info, warn};
use mavlink::common::{MavCmd, MavModeFlag, MavResult};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a preflight check concludes when the vehicle reports no position at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightPolicy {
    /// Missing telemetry counts as GO.
    Optimistic,
    /// Missing telemetry counts as FAIL.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightVerdict {
    Go { relative_alt_mm: Option<i32> },
    Fail { relative_alt_mm: Option<i32> },
}

impl PreflightVerdict {
    pub fn is_go(&self) -> bool { matches!(self, PreflightVerdict::Go { .. }) }
}

/// Composes commands and telemetry waits into the multi-step flight operations and
/// keeps track of the resulting `FlightState`.
#[derive(Debug)]
pub struct FlightSequencer {
    state: FlightState,
    policy: PreflightPolicy,
    disarm_timeout: Duration,
}

impl FlightSequencer {
    /// How long the preflight check listens for a position report.
    const PREFLIGHT_WINDOW: Duration = Duration::from_secs(1);
    /// Relative altitudes above this mean the vehicle is already flying.
    const AIRBORNE_THRESHOLD_MM: i32 = 1000;
    /// ArduCopter GUIDED.
    const GUIDED_MODE: u32 = 4;
    /// How long the launch waits for the arm acknowledgment before taking off anyway.
    const ARM_ACK_WINDOW: Duration = Duration::from_secs(1);

    pub fn new(policy: PreflightPolicy, disarm_timeout: Duration) -> Self {
        Self { state: FlightState::Grounded, policy, disarm_timeout }
    }

    pub fn state(&self) -> FlightState { self.state }

    fn transition(&mut self, next: FlightState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected flight state transition {} -> {next}.", self.state);
        }
        self.state = next;
    }

    fn require(&self, operation: &'static str, allowed: &[FlightState]) -> Result<(), EngineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::InvalidState { operation, state: self.state })
        }
    }

    /// Checks that the vehicle is still on the ground.
    ///
    /// Listens up to one second for a `GLOBAL_POSITION_INT`. A relative altitude above
    /// one meter fails the check and marks the vehicle as airborne. Without any report the
    /// outcome depends on the `PreflightPolicy`.
    pub async fn preflight_check(&mut self, session: &Session) -> PreflightVerdict {
        info!("Running pre-flight diagnostics...");
        let report = session
            .waiter()
            .wait_for(TelemetryKind::GlobalPositionInt, Some(Self::PREFLIGHT_WINDOW))
            .await;
        let relative_alt_mm = match report {
            Some(TelemetryMessage::GlobalPositionInt { relative_alt_mm }) => Some(relative_alt_mm),
            _ => None,
        };
        match (relative_alt_mm, self.policy) {
            (Some(alt), _) if alt > Self::AIRBORNE_THRESHOLD_MM => {
                error!("[FAIL] Vehicle is already flying ({alt} mm above home)!");
                if self.state == FlightState::Grounded {
                    self.transition(FlightState::Airborne);
                }
                PreflightVerdict::Fail { relative_alt_mm }
            }
            (None, PreflightPolicy::Strict) => {
                error!("[FAIL] No position telemetry received.");
                PreflightVerdict::Fail { relative_alt_mm }
            }
            _ => {
                if relative_alt_mm.is_none() {
                    warn!("No position telemetry received, assuming the vehicle is grounded.");
                }
                info!("All systems go. Ready for launch.");
                PreflightVerdict::Go { relative_alt_mm }
            }
        }
    }

    /// Arms the vehicle in GUIDED mode and commands a takeoff to `altitude_m`.
    ///
    /// Nothing is sent unless the preflight check passes, its verdict is returned either
    /// way. The arm command gets one second to be acknowledged: an explicit rejection
    /// aborts the launch, silence does not. Liftoff itself is not verified.
    pub async fn launch(
        &mut self,
        session: &Session,
        altitude_m: f32,
    ) -> Result<PreflightVerdict, EngineError> {
        self.require("launch", &[FlightState::Grounded])?;
        let verdict = self.preflight_check(session).await;
        if !verdict.is_go() {
            return Ok(verdict);
        }

        info!("Arming & taking off...");
        CommandDispatcher::set_mode(
            session,
            MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            Self::GUIDED_MODE,
        )
        .await?;
        let arm = Command::with_p1(MavCmd::MAV_CMD_COMPONENT_ARM_DISARM, 1.0);
        self.transition(FlightState::Armed);
        match CommandDispatcher::command_acked(session, arm, Self::ARM_ACK_WINDOW).await {
            Ok(Some(MavResult::MAV_RESULT_ACCEPTED | MavResult::MAV_RESULT_IN_PROGRESS)) => {}
            Ok(Some(result)) => {
                self.transition(FlightState::Grounded);
                return Err(EngineError::CommandRejected { command: arm.id(), result });
            }
            Ok(None) => warn!("Arming was not acknowledged, taking off anyway."),
            Err(e) => {
                self.transition(FlightState::Grounded);
                return Err(e);
            }
        }

        let takeoff = Command::new(
            MavCmd::MAV_CMD_NAV_TAKEOFF,
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, altitude_m],
        );
        CommandDispatcher::send_command(session, takeoff).await?;
        self.transition(FlightState::Airborne);
        info!("Launch sequence initiated.");
        Ok(verdict)
    }

    /// Moves `distance` meters in `direction` relative to the current position.
    ///
    /// Unsupported directions still send a (zero) setpoint.
    pub async fn move_relative(
        &mut self,
        session: &Session,
        direction: Direction,
        distance: f32,
    ) -> Result<PositionTarget, EngineError> {
        self.require("manual move", &[FlightState::Airborne])?;
        if direction == Direction::Unsupported {
            warn!("Unknown direction, holding position.");
        }
        let target = PositionTarget::relative(direction, distance);
        info!("Moving {direction:?} by {distance} m...");
        CommandDispatcher::send_position_target(session, &target).await?;
        Ok(target)
    }

    /// Flies to the given coordinates, altitude relative to home.
    pub async fn fly_to(
        &mut self,
        session: &Session,
        lat_deg: f64,
        lon_deg: f64,
        alt_m: f32,
    ) -> Result<PositionTarget, EngineError> {
        self.require("fly to", &[FlightState::Airborne])?;
        let target = PositionTarget::global(lat_deg, lon_deg, alt_m)?;
        info!("Flying to Lat: {lat_deg}, Lon: {lon_deg}, Alt: {alt_m} m...");
        CommandDispatcher::send_position_target(session, &target).await?;
        Ok(target)
    }

    /// Commands a landing and waits for the motors to disarm.
    ///
    /// # Returns
    /// The number of heartbeats inspected, the last one being the first without the
    /// armed flag. `EngineError::Timeout` if the vehicle is still armed after the
    /// configured disarm timeout, `EngineError::Cancelled` if `c_tok` fires first. In both
    /// cases the state stays `Landing` and the landing may be retried.
    pub async fn land(
        &mut self,
        session: &Session,
        c_tok: &CancellationToken,
    ) -> Result<u32, EngineError> {
        self.require("land", &[FlightState::Armed, FlightState::Airborne, FlightState::Landing])?;
        info!("Initiating landing sequence...");
        // subscribed before the command goes out, so the first reply heartbeat is seen
        let waiter = session.waiter();
        CommandDispatcher::send_command(session, Command::new(MavCmd::MAV_CMD_NAV_LAND, [0.0; 7]))
            .await?;
        if self.state != FlightState::Landing {
            self.transition(FlightState::Landing);
        }
        info!("Vehicle is landing... waiting for touchdown.");
        let observed = self.await_disarm(waiter, c_tok).await?;
        self.transition(FlightState::Grounded);
        info!("Motors disarmed. Safe to approach.");
        Ok(observed)
    }

    /// Inspects every heartbeat `waiter` receives, in order, until one has the armed
    /// flag cleared.
    async fn await_disarm(
        &self,
        mut waiter: TelemetryWaiter,
        c_tok: &CancellationToken,
    ) -> Result<u32, EngineError> {
        let deadline = Instant::now() + self.disarm_timeout;
        let mut observed = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let heartbeat =
                waiter.wait_until(TelemetryKind::Heartbeat, |_| true, remaining, c_tok).await?;
            observed += 1;
            if heartbeat.is_armed() == Some(false) {
                return Ok(observed);
            }
        }
    }
}

use super::Operation;
use crate::error::EngineError;
use crate::flight_control::{FlightSequencer, FlightState, ScenarioRunner};
use crate::session::Session;
use crate::{info, warn};
use tokio_util::sync::CancellationToken;

/// Whether the console loop keeps going after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleSignal {
    Continue,
    Exit,
}

/// Maps operator operations onto the session engine.
pub struct Commander {
    session: Session,
    sequencer: FlightSequencer,
    takeoff_alt_m: f32,
}

impl Commander {
    pub fn new(session: Session, sequencer: FlightSequencer, takeoff_alt_m: f32) -> Self {
        Self { session, sequencer, takeoff_alt_m }
    }

    pub fn flight_state(&self) -> FlightState { self.sequencer.state() }

    /// Runs a single operation to completion.
    ///
    /// Errors only concern this operation, the session stays usable afterwards.
    /// `c_tok` interrupts the waits that support it.
    pub async fn execute(
        &mut self,
        operation: Operation,
        c_tok: &CancellationToken,
    ) -> Result<ConsoleSignal, EngineError> {
        match operation {
            Operation::Launch => {
                let verdict = self.sequencer.launch(&self.session, self.takeoff_alt_m).await?;
                if !verdict.is_go() {
                    warn!("Launch aborted by pre-flight check.");
                }
            }
            Operation::InjectWind => {
                ScenarioRunner::inject_wind(&self.session).await?;
            }
            Operation::InjectGps => {
                ScenarioRunner::inject_gps_failure(&self.session).await?;
            }
            Operation::Reset => ScenarioRunner::reset(&self.session).await?,
            Operation::DeathTest => {
                ScenarioRunner::run_death_test(&mut self.sequencer, &self.session).await?;
            }
            Operation::ManualMove { direction, distance } => {
                self.sequencer.move_relative(&self.session, direction, distance).await?;
            }
            Operation::FlyTo { lat_deg, lon_deg, alt_m } => {
                self.sequencer.fly_to(&self.session, lat_deg, lon_deg, alt_m).await?;
            }
            Operation::Land => {
                let observed = self.sequencer.land(&self.session, c_tok).await?;
                info!("Touchdown confirmed after {observed} heartbeats.");
            }
            Operation::Exit => return Ok(ConsoleSignal::Exit),
        }
        Ok(ConsoleSignal::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::{Commander, ConsoleSignal};
    use crate::error::EngineError;
    use crate::flight_control::{Direction, FlightSequencer, FlightState, PreflightPolicy};
    use crate::operator::Operation;
    use crate::wire_link::sim_vehicle::{LandingScript, SimVehicle};
    use mavlink::common::{MavCmd, MavMessage};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    async fn commander(vehicle: SimVehicle) -> (Arc<SimVehicle>, Commander) {
        let vehicle = Arc::new(vehicle);
        let session = vehicle.open_session().await;
        let sequencer = FlightSequencer::new(PreflightPolicy::Optimistic, Duration::from_secs(60));
        (Arc::clone(&vehicle), Commander::new(session, sequencer, 25.0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_flight() {
        let script = LandingScript { armed_heartbeats: 1, spacing: Duration::from_secs(1) };
        let (vehicle, mut commander) = commander(SimVehicle::new(1, 1).with_landing(script)).await;
        let c_tok = CancellationToken::new();

        let ops = [
            Operation::Launch,
            Operation::ManualMove { direction: Direction::North, distance: 10.0 },
            Operation::FlyTo { lat_deg: -35.36, lon_deg: 149.16, alt_m: 30.0 },
            Operation::Land,
        ];
        for op in ops {
            assert_eq!(commander.execute(op, &c_tok).await.unwrap(), ConsoleSignal::Continue);
        }
        assert_eq!(commander.flight_state(), FlightState::Grounded);

        let takeoff = vehicle.sent_commands().into_iter().find(|c| c.1 == MavCmd::MAV_CMD_NAV_TAKEOFF);
        assert_eq!(takeoff.map(|c| c.2[6]), Some(25.0));
        let setpoints = vehicle
            .sent()
            .iter()
            .filter(|s| {
                matches!(
                    s.msg,
                    MavMessage::SET_POSITION_TARGET_LOCAL_NED(_) | MavMessage::SET_POSITION_TARGET_GLOBAL_INT(_)
                )
            })
            .count();
        assert_eq!(setpoints, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_operation_keeps_session() {
        let (vehicle, mut commander) = commander(SimVehicle::new(1, 1)).await;
        let c_tok = CancellationToken::new();
        let res = commander.execute(Operation::Land, &c_tok).await;
        assert!(matches!(res, Err(EngineError::InvalidState { .. })));

        assert_eq!(commander.execute(Operation::InjectWind, &c_tok).await.unwrap(), ConsoleSignal::Continue);
        assert_eq!(commander.execute(Operation::Reset, &c_tok).await.unwrap(), ConsoleSignal::Continue);
        assert_eq!(vehicle.param("SIM_WIND_SPD"), Some(0.0));
        assert_eq!(vehicle.param("SIM_GPS_DISABLE"), Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_sends_nothing() {
        let (vehicle, mut commander) = commander(SimVehicle::new(1, 1)).await;
        let sent_before = vehicle.sent().len();
        let res = commander.execute(Operation::Exit, &CancellationToken::new()).await;
        assert_eq!(res.unwrap(), ConsoleSignal::Exit);
        assert_eq!(vehicle.sent().len(), sent_before);
    }
}

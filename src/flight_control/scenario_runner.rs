use super::{CommandDispatcher, FlightSequencer, FlightState};
use crate::error::EngineError;
use crate::session::Session;
use crate::{fault, info, log, warn};
use std::time::Duration;

/// Simulated wind speed in m/s.
pub const SIM_WIND_SPD: &str = "SIM_WIND_SPD";
/// Non-zero disables the simulated GPS.
pub const SIM_GPS_DISABLE: &str = "SIM_GPS_DISABLE";

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioStep {
    Launch { altitude_m: f32 },
    Hold(Duration),
    SetParam { name: &'static str, value: f32 },
}

/// A named, fixed sequence of flight and fault injection steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    name: &'static str,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn new(name: &'static str, steps: Vec<ScenarioStep>) -> Self { Self { name, steps } }

    /// Take off, climb for ten seconds, then blow a gale and switch off GPS.
    pub fn death_test() -> Self {
        Self::new(
            "Death Test",
            vec![
                ScenarioStep::Launch { altitude_m: 20.0 },
                ScenarioStep::Hold(Duration::from_secs(10)),
                ScenarioStep::SetParam { name: SIM_WIND_SPD, value: 20.0 },
                ScenarioStep::SetParam { name: SIM_GPS_DISABLE, value: 1.0 },
            ],
        )
    }

    pub fn name(&self) -> &'static str { self.name }
    pub fn steps(&self) -> &[ScenarioStep] { &self.steps }
}

/// Runs scenarios and the single shot fault injections of the console.
pub struct ScenarioRunner;

impl ScenarioRunner {
    const WIND_SPEED: f32 = 15.0;

    /// Executes the steps of `scenario` in order.
    ///
    /// A failed preflight check does not stop the scenario, the vehicle is then already
    /// flying and the faults still apply. The same holds for a vehicle that is not
    /// grounded to begin with and for a rejected arm command. Any error aborts the remaining steps, injected
    /// faults are not rolled back.
    pub async fn run(
        sequencer: &mut FlightSequencer,
        session: &Session,
        scenario: &Scenario,
    ) -> Result<(), EngineError> {
        fault!("Running '{}' scenario", scenario.name());
        for step in scenario.steps() {
            match step {
                ScenarioStep::Launch { altitude_m } => {
                    if sequencer.state() != FlightState::Grounded {
                        warn!("Vehicle is {}, skipping launch.", sequencer.state());
                        continue;
                    }
                    match sequencer.launch(session, *altitude_m).await {
                        Ok(verdict) if verdict.is_go() => {}
                        Ok(_) => warn!("Launch skipped, continuing '{}'.", scenario.name()),
                        Err(EngineError::CommandRejected { command, result }) => {
                            warn!("{command:?} rejected ({result:?}), continuing '{}'.", scenario.name());
                        }
                        Err(e) => return Err(e),
                    }
                }
                ScenarioStep::Hold(dt) => {
                    log!("Climbing for {}s...", dt.as_secs_f32());
                    tokio::time::sleep(*dt).await;
                }
                ScenarioStep::SetParam { name, value } => {
                    fault!("Injecting {name} = {value}");
                    CommandDispatcher::set_param(session, name, *value).await?;
                }
            }
        }
        info!("'{}' complete.", scenario.name());
        Ok(())
    }

    pub async fn run_death_test(
        sequencer: &mut FlightSequencer,
        session: &Session,
    ) -> Result<(), EngineError> {
        Self::run(sequencer, session, &Scenario::death_test()).await
    }

    pub async fn inject_wind(session: &Session) -> Result<f32, EngineError> {
        fault!("Injecting high wind ({} m/s)", Self::WIND_SPEED);
        CommandDispatcher::set_param(session, SIM_WIND_SPD, Self::WIND_SPEED).await
    }

    pub async fn inject_gps_failure(session: &Session) -> Result<f32, EngineError> {
        fault!("Injecting GPS failure");
        CommandDispatcher::set_param(session, SIM_GPS_DISABLE, 1.0).await
    }

    /// Calms the wind and restores GPS, regardless of what was injected before.
    pub async fn reset(session: &Session) -> Result<(), EngineError> {
        CommandDispatcher::set_param(session, SIM_WIND_SPD, 0.0).await?;
        CommandDispatcher::set_param(session, SIM_GPS_DISABLE, 0.0).await?;
        info!("Reset done.");
        Ok(())
    }
}

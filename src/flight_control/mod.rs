mod command_dispatcher;
mod flight_sequencer;
mod flight_state;
mod position_target;
mod scenario_runner;

pub use command_dispatcher::{Command, CommandDispatcher};
pub use flight_sequencer::{FlightSequencer, PreflightPolicy, PreflightVerdict};
pub use flight_state::FlightState;
pub use position_target::{Direction, PositionTarget};
pub use scenario_runner::{Scenario, ScenarioRunner, ScenarioStep};

use std::collections::HashSet;
use std::sync::LazyLock;
use strum_macros::Display;

/// Flight phase of the vehicle as tracked by the `FlightSequencer`.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FlightState {
    Grounded,
    Armed,
    Airborne,
    Landing,
}

impl FlightState {
    pub fn can_transition_to(self, next: FlightState) -> bool {
        TRANSITION_LOOKUP.contains(&(self, next))
    }
}

pub static TRANSITION_LOOKUP: LazyLock<HashSet<(FlightState, FlightState)>> =
    LazyLock::new(|| {
        let transitions = [
            // Launch
            (FlightState::Grounded, FlightState::Armed),
            (FlightState::Armed, FlightState::Airborne),
            // Preflight found the vehicle already flying
            (FlightState::Grounded, FlightState::Airborne),
            // Landing, possibly before the takeoff was ever sent
            (FlightState::Airborne, FlightState::Landing),
            (FlightState::Armed, FlightState::Landing),
            (FlightState::Landing, FlightState::Grounded),
            // A rejected arm command
            (FlightState::Armed, FlightState::Grounded),
        ];
        transitions.into_iter().collect()
    });

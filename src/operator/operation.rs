use crate::error::InputError;
use crate::flight_control::Direction;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Entries of the numbered console menu, in display order.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum MenuChoice {
    #[strum(to_string = "Smart Launch (Takeoff)")]
    Launch,
    #[strum(to_string = "Inject High Wind")]
    InjectWind,
    #[strum(to_string = "Inject GPS Failure")]
    InjectGps,
    #[strum(to_string = "Reset Normal")]
    Reset,
    #[strum(to_string = "Run 'Death Test' Scenario")]
    DeathTest,
    #[strum(to_string = "Move (Meters - N/S/E/W/U/D)")]
    ManualMove,
    #[strum(to_string = "Fly to Coordinates (Lat/Lon)")]
    FlyTo,
    #[strum(to_string = "Land & Turn Off (Stop)")]
    Land,
    #[strum(to_string = "Exit")]
    Exit,
}

impl MenuChoice {
    /// The 1-based number shown in front of this entry.
    pub fn number(self) -> usize {
        MenuChoice::iter().position(|c| c == self).map_or(0, |i| i + 1)
    }

    /// Resolves the operator's menu selection.
    pub fn from_selection(selection: &str) -> Result<Self, InputError> {
        let trimmed = selection.trim();
        trimmed
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| MenuChoice::iter().nth(i))
            .ok_or_else(|| InputError::UnknownSelection(trimmed.to_string()))
    }

    /// Operator prompts to answer before this choice becomes an `Operation`.
    pub fn prompts(self) -> &'static [&'static str] {
        match self {
            MenuChoice::ManualMove => &["Enter Direction (N/S/E/W/U/D)", "Enter Distance (meters)"],
            MenuChoice::FlyTo => &[
                "Enter Latitude (e.g., -35.363261)",
                "Enter Longitude (e.g., 149.165230)",
                "Enter Altitude (meters)",
            ],
            _ => &[],
        }
    }

    /// Builds the operation from the answers to `prompts`, in order.
    pub fn into_operation(self, answers: &[String]) -> Result<Operation, InputError> {
        let answer = |i: usize| answers.get(i).map_or("", String::as_str);
        Ok(match self {
            MenuChoice::Launch => Operation::Launch,
            MenuChoice::InjectWind => Operation::InjectWind,
            MenuChoice::InjectGps => Operation::InjectGps,
            MenuChoice::Reset => Operation::Reset,
            MenuChoice::DeathTest => Operation::DeathTest,
            MenuChoice::ManualMove => Operation::manual_move(answer(0), answer(1))?,
            MenuChoice::FlyTo => Operation::fly_to(answer(0), answer(1), answer(2))?,
            MenuChoice::Land => Operation::Land,
            MenuChoice::Exit => Operation::Exit,
        })
    }
}

/// A fully validated operator request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Launch,
    InjectWind,
    InjectGps,
    Reset,
    DeathTest,
    ManualMove { direction: Direction, distance: f32 },
    FlyTo { lat_deg: f64, lon_deg: f64, alt_m: f32 },
    Land,
    Exit,
}

impl Operation {
    /// Unknown direction letters are kept and result in a zero move.
    pub fn manual_move(direction: &str, distance: &str) -> Result<Self, InputError> {
        let distance = parse_real(distance)?;
        Ok(Operation::ManualMove { direction: Direction::from(direction), distance: narrow(distance) })
    }

    pub fn fly_to(lat: &str, lon: &str, alt: &str) -> Result<Self, InputError> {
        Ok(Operation::FlyTo {
            lat_deg: parse_real(lat)?,
            lon_deg: parse_real(lon)?,
            alt_m: narrow(parse_real(alt)?),
        })
    }
}

/// Parses a finite real number, surrounding whitespace is ignored.
pub fn parse_real(raw: &str) -> Result<f64, InputError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InputError::NotANumber(trimmed.to_string())),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn narrow(value: f64) -> f32 { value as f32 }

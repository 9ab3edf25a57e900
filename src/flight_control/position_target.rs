use crate::error::InputError;
use mavlink::common::{
    MavFrame, MavMessage, PositionTargetTypemask, SET_POSITION_TARGET_GLOBAL_INT_DATA,
    SET_POSITION_TARGET_LOCAL_NED_DATA,
};

/// Compass or vertical direction of a manual move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
    /// Anything else. Moves in this direction go nowhere.
    Unsupported,
}

impl From<char> for Direction {
    fn from(value: char) -> Self {
        match value.to_ascii_uppercase() {
            'N' => Direction::North,
            'S' => Direction::South,
            'E' => Direction::East,
            'W' => Direction::West,
            'U' => Direction::Up,
            'D' => Direction::Down,
            _ => Direction::Unsupported,
        }
    }
}

impl From<&str> for Direction {
    fn from(value: &str) -> Self {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => Direction::from(letter),
            _ => Direction::Unsupported,
        }
    }
}

impl Direction {
    /// Offset of `distance` meters in this direction, in the North-East-Down frame.
    ///
    /// Down is positive, so `Up` yields a negative z.
    pub fn ned_offset(self, distance: f32) -> [f32; 3] {
        match self {
            Direction::North => [distance, 0.0, 0.0],
            Direction::South => [-distance, 0.0, 0.0],
            Direction::East => [0.0, distance, 0.0],
            Direction::West => [0.0, -distance, 0.0],
            Direction::Up => [0.0, 0.0, -distance],
            Direction::Down => [0.0, 0.0, distance],
            Direction::Unsupported => [0.0, 0.0, 0.0],
        }
    }
}

/// Degrees as the fixed-point integer used on the wire (`deg * 10^7`, rounded).
#[allow(clippy::cast_possible_truncation)]
pub fn encode_e7(deg: f64) -> i32 { (deg * 1e7).round() as i32 }

pub fn decode_e7(value: i32) -> f64 { f64::from(value) / 1e7 }

/// A position setpoint. Only the position fields are honored by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionTarget {
    /// Offset from the current position, in meters, North-East-Down.
    LocalOffset { x: f32, y: f32, z: f32 },
    /// Absolute position, altitude relative to home.
    GlobalAbsolute { lat_e7: i32, lon_e7: i32, alt_m: f32 },
}

impl PositionTarget {
    /// Bit pattern of `position_only_mask`: ignore velocity, acceleration, yaw and yaw rate.
    pub const POSITION_ONLY_MASK_BITS: u16 = 0b1101_1111_1000;

    pub fn relative(direction: Direction, distance: f32) -> Self {
        let [x, y, z] = direction.ned_offset(distance);
        PositionTarget::LocalOffset { x, y, z }
    }

    /// Builds an absolute target from degrees.
    ///
    /// # Returns
    /// `InputError::OutOfRange` for latitudes beyond ±90° or longitudes beyond ±180°.
    pub fn global(lat_deg: f64, lon_deg: f64, alt_m: f32) -> Result<Self, InputError> {
        if !(-90.0..=90.0).contains(&lat_deg) {
            return Err(InputError::OutOfRange { what: "latitude", value: lat_deg });
        }
        if !(-180.0..=180.0).contains(&lon_deg) {
            return Err(InputError::OutOfRange { what: "longitude", value: lon_deg });
        }
        if !alt_m.is_finite() {
            return Err(InputError::OutOfRange { what: "altitude", value: f64::from(alt_m) });
        }
        Ok(PositionTarget::GlobalAbsolute {
            lat_e7: encode_e7(lat_deg),
            lon_e7: encode_e7(lon_deg),
            alt_m,
        })
    }

    pub fn position_only_mask() -> PositionTargetTypemask {
        PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VY_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VZ_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AX_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AY_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AZ_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_RATE_IGNORE
    }

    pub fn frame(&self) -> MavFrame {
        match self {
            PositionTarget::LocalOffset { .. } => MavFrame::MAV_FRAME_LOCAL_OFFSET_NED,
            PositionTarget::GlobalAbsolute { .. } => MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT_INT,
        }
    }

    pub fn to_mav(&self, target_system: u8, target_component: u8) -> MavMessage {
        match *self {
            PositionTarget::LocalOffset { x, y, z } => {
                MavMessage::SET_POSITION_TARGET_LOCAL_NED(SET_POSITION_TARGET_LOCAL_NED_DATA {
                    time_boot_ms: 0,
                    x,
                    y,
                    z,
                    vx: 0.0,
                    vy: 0.0,
                    vz: 0.0,
                    afx: 0.0,
                    afy: 0.0,
                    afz: 0.0,
                    yaw: 0.0,
                    yaw_rate: 0.0,
                    type_mask: Self::position_only_mask(),
                    target_system,
                    target_component,
                    coordinate_frame: self.frame(),
                })
            }
            PositionTarget::GlobalAbsolute { lat_e7, lon_e7, alt_m } => {
                MavMessage::SET_POSITION_TARGET_GLOBAL_INT(SET_POSITION_TARGET_GLOBAL_INT_DATA {
                    time_boot_ms: 0,
                    lat_int: lat_e7,
                    lon_int: lon_e7,
                    alt: alt_m,
                    vx: 0.0,
                    vy: 0.0,
                    vz: 0.0,
                    afx: 0.0,
                    afy: 0.0,
                    afz: 0.0,
                    yaw: 0.0,
                    yaw_rate: 0.0,
                    type_mask: Self::position_only_mask(),
                    target_system,
                    target_component,
                    coordinate_frame: self.frame(),
                })
            }
        }
    }
}

//! Byte-level connection to the vehicle.
//!
//! The `WireLink` trait is the seam between the session engine and the transport:
//! `UdpLink` speaks MAVLink v2 over UDP, `SimVehicle` stands in for the vehicle in tests.

mod link;
mod link_address;
#[cfg(test)]
pub(crate) mod sim_vehicle;
mod udp_link;

pub use link::{LinkError, WireLink};
pub use link_address::LinkAddress;
pub use udp_link::UdpLink;

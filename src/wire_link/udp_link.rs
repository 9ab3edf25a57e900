use super::{LinkAddress, LinkError, WireLink};
use crate::{event, info};
use async_trait::async_trait;
use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::{MavHeader, Message};
use std::collections::VecDeque;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, RwLock};

const MAV_STX_V1: u8 = 0xFE;
const MAV_STX_V2: u8 = 0xFD;
const MAVLINK_IFLAG_SIGNED: u8 = 0x01;

/// MAVLink v2 over UDP.
///
/// In listen mode the vehicle's address is learned from the first datagram it sends,
/// outgoing frames before that fail with `LinkError::NoPeer`.
#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    peer: RwLock<Option<SocketAddr>>,
    /// Frames decoded from a datagram but not yet handed out by `recv`.
    pending: Mutex<VecDeque<(MavHeader, MavMessage)>>,
    sequence: AtomicU8,
}

impl UdpLink {
    /// Source system id of this console, the conventional ground station id.
    pub const GCS_SYSTEM_ID: u8 = 255;
    /// `MAV_COMP_ID_MISSIONPLANNER`
    pub const GCS_COMPONENT_ID: u8 = 190;
    const MAX_DATAGRAM_LEN: usize = 2048;

    /// Binds the socket described by `address`.
    ///
    /// # Arguments
    /// * `address` – `Listen` binds to the given host/port, `Connect` binds an ephemeral
    ///   port and sends to the given host/port.
    ///
    /// # Returns
    /// The open link, or a `LinkError` if the host cannot be resolved or bound.
    pub async fn open(address: &LinkAddress) -> Result<Self, LinkError> {
        let target = tokio::net::lookup_host(address.host_port())
            .await?
            .next()
            .ok_or_else(|| LinkError::InvalidAddress(address.host_port().to_string()))?;
        let (socket, peer) = match address {
            LinkAddress::Listen(_) => (UdpSocket::bind(target).await?, None),
            LinkAddress::Connect(_) => {
                let local: SocketAddr =
                    if target.is_ipv4() { ([0, 0, 0, 0], 0).into() } else { ([0u16; 8], 0).into() };
                (UdpSocket::bind(local).await?, Some(target))
            }
        };
        Ok(Self {
            socket,
            peer: RwLock::new(peer),
            pending: Mutex::new(VecDeque::new()),
            sequence: AtomicU8::new(0),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> { Ok(self.socket.local_addr()?) }

    pub async fn peer(&self) -> Option<SocketAddr> { *self.peer.read().await }

    async fn learn_peer(&self, from: SocketAddr) {
        if self.peer.read().await.is_some() {
            return;
        }
        let mut peer = self.peer.write().await;
        if peer.is_none() {
            info!("Vehicle link established with {from}.");
            *peer = Some(from);
        }
    }

    /// Total length of the frame starting at `bytes[0]`, if the whole frame is present.
    fn frame_len(bytes: &[u8]) -> Option<usize> {
        let payload_len = usize::from(*bytes.get(1)?);
        let len = if bytes[0] == MAV_STX_V2 {
            let signature_len = if bytes.get(2)? & MAVLINK_IFLAG_SIGNED == 0 { 0 } else { 13 };
            12 + payload_len + signature_len
        } else {
            8 + payload_len
        };
        (bytes.len() >= len).then_some(len)
    }

    /// Splits a datagram into decoded frames, skipping garbage and broken frames.
    pub(crate) fn decode_datagram(datagram: &[u8]) -> Vec<(MavHeader, MavMessage)> {
        let mut frames = Vec::new();
        let mut bytes = datagram;
        while let Some(start) = bytes.iter().position(|&b| b == MAV_STX_V1 || b == MAV_STX_V2) {
            bytes = &bytes[start..];
            let Some(len) = Self::frame_len(bytes) else {
                bytes = &bytes[1..];
                continue;
            };
            let mut reader = PeekReader::new(Cursor::new(&bytes[..len]));
            let result = if bytes[0] == MAV_STX_V2 {
                mavlink::read_v2_msg::<MavMessage, _>(&mut reader)
            } else {
                mavlink::read_v1_msg::<MavMessage, _>(&mut reader)
            };
            match result {
                Ok(frame) => {
                    frames.push(frame);
                    bytes = &bytes[len..];
                }
                Err(e) => {
                    event!("Dropping undecodable frame: {e:?}");
                    bytes = &bytes[1..];
                }
            }
        }
        frames
    }
}

#[async_trait]
impl WireLink for UdpLink {
    async fn send(&self, msg: &MavMessage) -> Result<(), LinkError> {
        let Some(addr) = self.peer().await else {
            return Err(LinkError::NoPeer);
        };
        let header = MavHeader {
            system_id: Self::GCS_SYSTEM_ID,
            component_id: Self::GCS_COMPONENT_ID,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, msg)
            .map_err(|e| LinkError::Encode(format!("{e:?}")))?;
        self.socket.send_to(&buf.into_inner(), addr).await?;
        event!("TX msg_id={} seq={}", msg.message_id(), header.sequence);
        Ok(())
    }

    async fn recv(&self) -> Result<(MavHeader, MavMessage), LinkError> {
        let mut buf = vec![0u8; Self::MAX_DATAGRAM_LEN];
        loop {
            if let Some(frame) = self.pending.lock().await.pop_front() {
                return Ok(frame);
            }
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            self.learn_peer(from).await;
            let frames = Self::decode_datagram(&buf[..len]);
            self.pending.lock().await.extend(frames);
        }
    }
}

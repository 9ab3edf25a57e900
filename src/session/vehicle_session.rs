use super::TelemetryWaiter;
use crate::error::EngineError;
use crate::wire_link::{LinkError, WireLink};
use crate::{event, info, warn};
use mavlink::MavHeader;
use mavlink::common::{MavDataStream, MavMessage, MavType, REQUEST_DATA_STREAM_DATA};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// The addressed connection to one vehicle.
///
/// A `Session` only exists after a successful handshake, its system and component
/// addresses never change afterwards. It owns a background task reading the link and
/// publishing every frame to subscribed `TelemetryWaiter`s. Dropping the session stops
/// that task.
pub struct Session {
    /// The link all commands go out on.
    link: Arc<dyn WireLink>,
    /// System id of the vehicle, learned from its first heartbeat.
    system_id: u8,
    /// Component id of the vehicle, learned from its first heartbeat.
    component_id: u8,
    /// Fan-out of every received frame.
    frames: broadcast::Sender<(MavHeader, MavMessage)>,
    /// Stops the reader task.
    reader_c_tok: CancellationToken,
}

impl Session {
    /// Telemetry categories are requested at this rate right after the handshake.
    pub const STREAM_RATE_HZ: u16 = 4;
    /// Frames buffered per subscriber before it starts lagging.
    const FRAME_BUFFER: usize = 256;
    /// Pause after a failing `recv` before the reader tries again.
    const READER_BACKOFF: Duration = Duration::from_millis(100);

    /// Performs the handshake on `link` and requests the telemetry streams.
    ///
    /// # Arguments
    /// * `link` – The transport to the vehicle.
    /// * `handshake_timeout` – How long to wait for the first vehicle heartbeat.
    ///
    /// # Returns
    /// The connected session or `EngineError::Connection` if no vehicle heartbeat
    /// arrived in time. Heartbeats of other ground stations are not accepted.
    pub async fn open(
        link: Arc<dyn WireLink>,
        handshake_timeout: Duration,
    ) -> Result<Session, EngineError> {
        let (frames, mut rx) = broadcast::channel(Self::FRAME_BUFFER);
        let reader_c_tok = CancellationToken::new();
        tokio::spawn(Self::run_reader(Arc::clone(&link), frames.clone(), reader_c_tok.clone()));

        let handshake = async {
            loop {
                match rx.recv().await {
                    Ok((header, MavMessage::HEARTBEAT(hb))) if hb.mavtype != MavType::MAV_TYPE_GCS => {
                        return Some(header);
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        };
        let header = match tokio::time::timeout(handshake_timeout, handshake).await {
            Ok(Some(header)) => header,
            Ok(None) => {
                reader_c_tok.cancel();
                return Err(EngineError::Connection(LinkError::Closed));
            }
            Err(_) => {
                reader_c_tok.cancel();
                return Err(EngineError::Connection(LinkError::NoHeartbeat(handshake_timeout)));
            }
        };
        info!(
            "Connected to System {} (Component {})",
            header.system_id, header.component_id
        );

        let session = Session {
            link,
            system_id: header.system_id,
            component_id: header.component_id,
            frames,
            reader_c_tok,
        };
        session.request_streams().await?;
        Ok(session)
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn request_streams(&self) -> Result<(), EngineError> {
        self.send(&MavMessage::REQUEST_DATA_STREAM(REQUEST_DATA_STREAM_DATA {
            req_message_rate: Self::STREAM_RATE_HZ,
            target_system: self.system_id,
            target_component: self.component_id,
            req_stream_id: MavDataStream::MAV_DATA_STREAM_ALL as u8,
            start_stop: 1,
        }))
        .await
    }

    async fn run_reader(
        link: Arc<dyn WireLink>,
        frames: broadcast::Sender<(MavHeader, MavMessage)>,
        c_tok: CancellationToken,
    ) {
        loop {
            let res = tokio::select! {
                () = c_tok.cancelled() => break,
                res = link.recv() => res,
            };
            match res {
                Ok((header, msg)) => {
                    event!(
                        "RX sys={} comp={} {:?}",
                        header.system_id,
                        header.component_id,
                        msg
                    );
                    // no subscribers is fine, nobody is waiting right now
                    let _ = frames.send((header, msg));
                }
                Err(e) => {
                    warn!("Telemetry link error: {e:?}");
                    tokio::time::sleep(Self::READER_BACKOFF).await;
                }
            }
        }
    }

    /// Sends `msg` once over the session's link.
    pub async fn send(&self, msg: &MavMessage) -> Result<(), EngineError> {
        Ok(self.link.send(msg).await?)
    }

    /// Starts listening for telemetry. Only frames received from now on are seen.
    pub fn waiter(&self) -> TelemetryWaiter { TelemetryWaiter::new(self.frames.subscribe(), self.system_id) }

    pub fn system_id(&self) -> u8 { self.system_id }
    pub fn component_id(&self) -> u8 { self.component_id }
}

impl Drop for Session {
    fn drop(&mut self) { self.reader_c_tok.cancel(); }
}

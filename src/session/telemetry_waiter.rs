use super::{TelemetryKind, TelemetryMessage};
use crate::error::EngineError;
use crate::wire_link::LinkError;
use mavlink::MavHeader;
use mavlink::common::MavMessage;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

/// Blocking, predicate based receive on the telemetry of one session.
///
/// A waiter sees every frame received after its creation. Frames of other systems and
/// frames the engine does not understand are skipped, as is anything not matching the
/// current wait.
pub struct TelemetryWaiter {
    rx: broadcast::Receiver<(MavHeader, MavMessage)>,
    system_id: u8,
}

impl TelemetryWaiter {
    pub(super) fn new(rx: broadcast::Receiver<(MavHeader, MavMessage)>, system_id: u8) -> Self {
        Self { rx, system_id }
    }

    /// Next message of `kind` satisfying `predicate`, `None` once the reader is gone.
    async fn next_matching<P>(&mut self, kind: TelemetryKind, predicate: &P) -> Option<TelemetryMessage>
    where P: Fn(&TelemetryMessage) -> bool {
        loop {
            let (header, msg) = match self.rx.recv().await {
                Ok(frame) => frame,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            };
            if header.system_id != self.system_id {
                continue;
            }
            match TelemetryMessage::from_mav(&msg) {
                Some(telem) if telem.kind() == kind && predicate(&telem) => return Some(telem),
                _ => {}
            }
        }
    }

    /// Waits for the next message of `kind`.
    ///
    /// # Arguments
    /// * `kind` – The message kind to wait for.
    /// * `timeout` – Upper bound on the wait, `None` waits as long as the link lives.
    ///
    /// # Returns
    /// The message, or `None` on timeout. A timeout is not an error here, callers decide
    /// what missing telemetry means.
    pub async fn wait_for(
        &mut self,
        kind: TelemetryKind,
        timeout: Option<Duration>,
    ) -> Option<TelemetryMessage> {
        self.wait_matching(kind, |_| true, timeout).await
    }

    /// Like `wait_for`, but only returns messages satisfying `predicate`.
    pub async fn wait_matching<P>(
        &mut self,
        kind: TelemetryKind,
        predicate: P,
        timeout: Option<Duration>,
    ) -> Option<TelemetryMessage>
    where
        P: Fn(&TelemetryMessage) -> bool,
    {
        match timeout {
            Some(dt) => tokio::time::timeout(dt, self.next_matching(kind, &predicate)).await.ok().flatten(),
            None => self.next_matching(kind, &predicate).await,
        }
    }

    /// Waits for a message of `kind` satisfying `predicate`, treating every way of not
    /// getting one as an error.
    ///
    /// # Returns
    /// * `EngineError::Timeout` once `timeout` elapsed.
    /// * `EngineError::Cancelled` if `c_tok` fired first.
    /// * `EngineError::Link` if the session stopped reading.
    pub async fn wait_until<P>(
        &mut self,
        kind: TelemetryKind,
        predicate: P,
        timeout: Duration,
        c_tok: &CancellationToken,
    ) -> Result<TelemetryMessage, EngineError>
    where
        P: Fn(&TelemetryMessage) -> bool,
    {
        tokio::select! {
            () = c_tok.cancelled() => Err(EngineError::Cancelled),
            res = tokio::time::timeout(timeout, self.next_matching(kind, &predicate)) => match res {
                Ok(Some(msg)) => Ok(msg),
                Ok(None) => Err(EngineError::Link(LinkError::Closed)),
                Err(_) => Err(EngineError::Timeout(kind)),
            },
        }
    }
}

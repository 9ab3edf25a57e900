use super::{LinkError, WireLink};
use crate::session::Session;
use async_trait::async_trait;
use mavlink::MavHeader;
use mavlink::common::{
    COMMAND_ACK_DATA, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA, MavAutopilot, MavCmd, MavMessage,
    MavModeFlag, MavParamType, MavResult, MavState, MavType, PARAM_VALUE_DATA,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A message the console sent, stamped with the (possibly paused) tokio clock.
#[derive(Debug, Clone)]
pub(crate) struct SentMessage {
    pub(crate) at: Instant,
    pub(crate) msg: MavMessage,
}

/// Heartbeats the vehicle emits once it received a land command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LandingScript {
    /// Heartbeats still carrying the armed flag before the first disarmed one.
    pub(crate) armed_heartbeats: usize,
    pub(crate) spacing: Duration,
}

/// In-memory stand-in for a SITL vehicle.
///
/// Records everything sent to it, keeps the parameters it was given, echoes them like
/// ArduPilot does and acknowledges commands.
pub(crate) struct SimVehicle {
    system_id: u8,
    component_id: u8,
    downlink_tx: mpsc::UnboundedSender<(MavHeader, MavMessage)>,
    downlink_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(MavHeader, MavMessage)>>,
    sent: Mutex<Vec<SentMessage>>,
    params: Mutex<HashMap<String, f32>>,
    echo_params: bool,
    arm_result: Option<MavResult>,
    landing: Option<LandingScript>,
    heartbeats_emitted: Arc<AtomicUsize>,
}

impl SimVehicle {
    pub(crate) fn new(system_id: u8, component_id: u8) -> Self {
        let (downlink_tx, downlink_rx) = mpsc::unbounded_channel();
        Self {
            system_id,
            component_id,
            downlink_tx,
            downlink_rx: tokio::sync::Mutex::new(downlink_rx),
            sent: Mutex::new(Vec::new()),
            params: Mutex::new(HashMap::new()),
            echo_params: true,
            arm_result: Some(MavResult::MAV_RESULT_ACCEPTED),
            landing: None,
            heartbeats_emitted: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Parameter writes are applied but never echoed.
    pub(crate) fn with_silent_params(mut self) -> Self {
        self.echo_params = false;
        self
    }

    /// `None` leaves arm commands unacknowledged.
    pub(crate) fn with_arm_result(mut self, result: Option<MavResult>) -> Self {
        self.arm_result = result;
        self
    }

    pub(crate) fn with_landing(mut self, script: LandingScript) -> Self {
        self.landing = Some(script);
        self
    }

    /// Queues a heartbeat and performs the handshake against this vehicle.
    pub(crate) async fn open_session(self: &Arc<Self>) -> Session {
        self.emit(Self::heartbeat(false));
        let link: Arc<dyn WireLink> = Arc::clone(self) as Arc<dyn WireLink>;
        Session::open(link, Duration::from_secs(5)).await.unwrap()
    }

    fn header(system_id: u8, component_id: u8) -> MavHeader {
        MavHeader { system_id, component_id, sequence: 0 }
    }

    pub(crate) fn emit(&self, msg: MavMessage) { self.emit_from(self.system_id, msg); }

    pub(crate) fn emit_from(&self, system_id: u8, msg: MavMessage) {
        let _ = self.downlink_tx.send((Self::header(system_id, self.component_id), msg));
    }

    /// Emits `msg` after `delay`, giving the caller time to start waiting for it.
    pub(crate) fn emit_after(&self, delay: Duration, system_id: u8, msg: MavMessage) {
        let tx = self.downlink_tx.clone();
        let header = Self::header(system_id, self.component_id);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send((header, msg));
        });
    }

    pub(crate) fn heartbeat(armed: bool) -> MavMessage {
        let base_mode = if armed {
            MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED | MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED
        } else {
            MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
        };
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 4,
            mavtype: MavType::MAV_TYPE_QUADROTOR,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        })
    }

    pub(crate) fn gcs_heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_GCS,
            autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
            base_mode: MavModeFlag::empty(),
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        })
    }

    pub(crate) fn global_position(relative_alt_mm: i32) -> MavMessage {
        MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
            time_boot_ms: 0,
            lat: -353_632_610,
            lon: 1_491_652_300,
            alt: 584_000 + relative_alt_mm,
            relative_alt: relative_alt_mm,
            vx: 0,
            vy: 0,
            vz: 0,
            hdg: 0,
        })
    }

    pub(crate) fn sent(&self) -> Vec<SentMessage> { self.sent.lock().unwrap().clone() }

    /// Every `COMMAND_LONG` sent so far as `(time, command, params)`.
    pub(crate) fn sent_commands(&self) -> Vec<(Instant, MavCmd, [f32; 7])> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s.msg {
                MavMessage::COMMAND_LONG(c) => Some((
                    s.at,
                    c.command,
                    [c.param1, c.param2, c.param3, c.param4, c.param5, c.param6, c.param7],
                )),
                _ => None,
            })
            .collect()
    }

    /// Every `PARAM_SET` sent so far as `(time, name, value)`.
    pub(crate) fn sent_param_sets(&self) -> Vec<(Instant, String, f32)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s.msg {
                MavMessage::PARAM_SET(p) => Some((s.at, decode_name(&p.param_id), p.param_value)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn param(&self, name: &str) -> Option<f32> { self.params.lock().unwrap().get(name).copied() }

    pub(crate) fn heartbeats_emitted(&self) -> usize { self.heartbeats_emitted.load(Ordering::SeqCst) }

    fn react(&self, msg: &MavMessage) {
        match msg {
            MavMessage::PARAM_SET(p) => {
                let name = decode_name(&p.param_id);
                self.params.lock().unwrap().insert(name, p.param_value);
                if self.echo_params {
                    self.emit(MavMessage::PARAM_VALUE(PARAM_VALUE_DATA {
                        param_value: p.param_value,
                        param_count: 1,
                        param_index: 0,
                        param_id: p.param_id,
                        param_type: MavParamType::MAV_PARAM_TYPE_REAL32,
                    }));
                }
            }
            MavMessage::COMMAND_LONG(c) => {
                let result = if c.command == MavCmd::MAV_CMD_COMPONENT_ARM_DISARM {
                    self.arm_result
                } else {
                    Some(MavResult::MAV_RESULT_ACCEPTED)
                };
                if let Some(result) = result {
                    self.emit(MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
                        command: c.command,
                        result,
                        progress: 0,
                        result_param2: 0,
                        target_system: 0,
                        target_component: 0,
                    }));
                }
                if c.command == MavCmd::MAV_CMD_NAV_LAND {
                    if let Some(script) = self.landing {
                        self.start_landing(script);
                    }
                }
            }
            _ => {}
        }
    }

    fn start_landing(&self, script: LandingScript) {
        let tx = self.downlink_tx.clone();
        let header = Self::header(self.system_id, self.component_id);
        let counter = Arc::clone(&self.heartbeats_emitted);
        tokio::spawn(async move {
            for i in 0usize.. {
                tokio::time::sleep(script.spacing).await;
                counter.fetch_add(1, Ordering::SeqCst);
                if tx.send((header, Self::heartbeat(i < script.armed_heartbeats))).is_err() {
                    break;
                }
            }
        });
    }
}

fn decode_name(raw: &[u8; 16]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[async_trait]
impl WireLink for SimVehicle {
    async fn send(&self, msg: &MavMessage) -> Result<(), LinkError> {
        self.sent.lock().unwrap().push(SentMessage { at: Instant::now(), msg: msg.clone() });
        self.react(msg);
        Ok(())
    }

    async fn recv(&self) -> Result<(MavHeader, MavMessage), LinkError> {
        match self.downlink_rx.lock().await.recv().await {
            Some(frame) => Ok(frame),
            None => std::future::pending().await,
        }
    }
}

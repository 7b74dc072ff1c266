//! In-process bridge simulator for session tests.
//!
//! Listens on an ephemeral localhost port and speaks the framed envelope
//! protocol: the session handshake, app registration and RPDO confirms are
//! answered automatically, RMI requests are either auto-answered or handed
//! to the test for scripted replies.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use prost::Message;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use comfoconnect_rs::discovery::BridgeEndpoint;
use comfoconnect_rs::frame;
use comfoconnect_rs::proto::{self, Envelope, GatewayResult, OperationType};
use comfoconnect_rs::types::DeviceUuid;

pub const BRIDGE_UUID: [u8; 16] = [0xBB; 16];

/// Gateway version word reported by the simulator: release 1.4.0.
pub const SIM_VERSION_WORD: u32 = (3 << 30) | (1 << 20) | (4 << 10);

/// Unit clock reported by the simulator, seconds since 2000-01-01 UTC.
pub const SIM_UNIT_TIME: u32 = 820_000_000;

#[derive(Clone)]
pub struct SimulatorConfig {
    /// Pin accepted by `RegisterApp`.
    pub pin: u32,
    /// Apps the bridge already knows.
    pub pre_registered: Vec<DeviceUuid>,
    /// Automatic reply message (including the status byte) for every RMI
    /// request; `None` captures requests for manual replies instead.
    pub auto_rmi: Option<Vec<u8>>,
    /// Never answer `StartSession` (a silently refusing bridge).
    pub mute_start_session: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            pin: 0,
            pre_registered: Vec::new(),
            auto_rmi: Some(vec![0x00]),
            mute_start_session: false,
        }
    }
}

/// An RMI request captured for a manual reply.
#[derive(Debug, Clone)]
pub struct RmiCapture {
    pub reference: u32,
    pub node_id: u32,
    pub message: Vec<u8>,
}

struct Shared {
    config: SimulatorConfig,
    registered: Mutex<HashSet<[u8; 16]>>,
    /// `(pdid, data type, timeout)` of every RPDO request, in order.
    rpdo_requests: Mutex<Vec<(u16, u8, i32)>>,
    close_requests: AtomicU32,
    /// Uuid of the connected client, learned from its first envelope.
    client: Mutex<Vec<u8>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    conn_cancel: Mutex<Option<CancellationToken>>,
    rmi_tx: mpsc::UnboundedSender<RmiCapture>,
}

pub struct Simulator {
    endpoint: BridgeEndpoint,
    shared: Arc<Shared>,
    rmi_rx: mpsc::UnboundedReceiver<RmiCapture>,
}

impl Simulator {
    pub async fn start(config: SimulatorConfig) -> Simulator {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (rmi_tx, rmi_rx) = mpsc::unbounded_channel();
        let registered = config
            .pre_registered
            .iter()
            .map(|uuid| *uuid.as_bytes())
            .collect();
        let shared = Arc::new(Shared {
            config,
            registered: Mutex::new(registered),
            rpdo_requests: Mutex::new(Vec::new()),
            close_requests: AtomicU32::new(0),
            client: Mutex::new(vec![0; 16]),
            writer: tokio::sync::Mutex::new(None),
            conn_cancel: Mutex::new(None),
            rmi_tx,
        });
        tokio::spawn(accept_loop(listener, shared.clone()));

        Simulator {
            endpoint: BridgeEndpoint {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port,
                uuid: DeviceUuid::from_bytes(BRIDGE_UUID),
                version: 1,
            },
            shared,
            rmi_rx,
        }
    }

    pub fn endpoint(&self) -> BridgeEndpoint {
        self.endpoint.clone()
    }

    /// Waits for the next captured RMI request (manual mode only).
    pub async fn next_rmi(&mut self) -> RmiCapture {
        self.rmi_rx.recv().await.expect("simulator stopped")
    }

    pub async fn send_rmi_response(&self, reference: u32, message: Vec<u8>) {
        let payload = proto::encode_payload(&proto::CnRmiResponse { message });
        self.send(
            OperationType::CnRmiResponse,
            Some(reference),
            GatewayResult::Ok,
            payload,
        )
        .await;
    }

    pub async fn push_pdo(&self, pdid: u16, data: &[u8]) {
        let payload = proto::encode_payload(&proto::CnRpdoNotification {
            pdid: u32::from(pdid),
            data: data.to_vec(),
        });
        self.send(
            OperationType::CnRpdoNotification,
            None,
            GatewayResult::Ok,
            payload,
        )
        .await;
    }

    pub async fn push_alarm(&self, node_id: u32, errors: &[u8]) {
        let payload = proto::encode_payload(&proto::CnAlarmNotification {
            zone: 1,
            product_id: 1,
            product_variant: 1,
            serial_number: "SIM0000000000".to_owned(),
            sw_program_version: SIM_VERSION_WORD,
            errors: errors.to_vec(),
            error_id: 0,
            node_id,
        });
        self.send(
            OperationType::CnAlarmNotification,
            None,
            GatewayResult::Ok,
            payload,
        )
        .await;
    }

    /// Drops the TCP connection without a close handshake.
    pub async fn drop_connection(&self) {
        if let Some(cancel) = self.shared.conn_cancel.lock().unwrap().take() {
            cancel.cancel();
        }
        self.shared.writer.lock().await.take();
    }

    pub fn rpdo_requests(&self) -> Vec<(u16, u8, i32)> {
        self.shared.rpdo_requests.lock().unwrap().clone()
    }

    pub fn is_registered(&self, uuid: &DeviceUuid) -> bool {
        self.shared.registered.lock().unwrap().contains(uuid.as_bytes())
    }

    pub fn close_request_count(&self) -> u32 {
        self.shared.close_requests.load(Ordering::SeqCst)
    }

    async fn send(
        &self,
        op: OperationType,
        reference: Option<u32>,
        result: GatewayResult,
        payload: Vec<u8>,
    ) {
        send_from(&self.shared, op, reference, result, payload).await;
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    while let Ok((stream, _)) = listener.accept().await {
        serve(shared.clone(), stream).await;
    }
}

async fn serve(shared: Arc<Shared>, stream: TcpStream) {
    let _ = stream.set_nodelay(true);
    let (mut reader, writer) = stream.into_split();
    let cancel = CancellationToken::new();
    *shared.writer.lock().await = Some(writer);
    *shared.conn_cancel.lock().unwrap() = Some(cancel.clone());

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = frame::read_message(&mut reader) => next,
        };
        let Ok(message) = next else { break };
        let Ok(envelope) = Envelope::decode(message.envelope.as_slice()) else {
            break;
        };
        let Ok(op) = envelope.op() else {
            continue;
        };
        *shared.client.lock().unwrap() = envelope.src.clone();
        handle(&shared, &envelope, op, &message.payload).await;
    }

    shared.writer.lock().await.take();
}

async fn handle(shared: &Arc<Shared>, envelope: &Envelope, op: OperationType, payload: &[u8]) {
    let reference = envelope.reference;
    match op {
        OperationType::StartSessionRequest => {
            if shared.config.mute_start_session {
                return;
            }
            let known = {
                let registered = shared.registered.lock().unwrap();
                DeviceUuid::from_slice(&envelope.src)
                    .is_some_and(|uuid| registered.contains(uuid.as_bytes()))
            };
            if known {
                let confirm = proto::StartSessionConfirm {
                    device_name: "Simulated App".to_owned(),
                    resumed: false,
                };
                send_from(
                    shared,
                    OperationType::StartSessionConfirm,
                    reference,
                    GatewayResult::Ok,
                    proto::encode_payload(&confirm),
                )
                .await;
            } else {
                send_from(
                    shared,
                    OperationType::StartSessionConfirm,
                    reference,
                    GatewayResult::NotAllowed,
                    Vec::new(),
                )
                .await;
            }
        }
        OperationType::RegisterAppRequest => {
            let request = proto::RegisterAppRequest::decode(payload).unwrap();
            let result = if request.pin == shared.config.pin {
                if let Ok(uuid) = <[u8; 16]>::try_from(request.uuid.as_slice()) {
                    shared.registered.lock().unwrap().insert(uuid);
                }
                GatewayResult::Ok
            } else {
                GatewayResult::NotAllowed
            };
            send_from(
                shared,
                OperationType::RegisterAppConfirm,
                reference,
                result,
                Vec::new(),
            )
            .await;
        }
        OperationType::CloseSessionRequest => {
            shared.close_requests.fetch_add(1, Ordering::SeqCst);
            send_from(
                shared,
                OperationType::CloseSessionConfirm,
                reference,
                GatewayResult::Ok,
                proto::encode_payload(&proto::CloseSessionConfirm {}),
            )
            .await;
        }
        OperationType::CnRpdoRequest => {
            let request = proto::CnRpdoRequest::decode(payload).unwrap();
            shared.rpdo_requests.lock().unwrap().push((
                request.pdid as u16,
                request.data_type as u8,
                request.timeout,
            ));
            send_from(
                shared,
                OperationType::CnRpdoConfirm,
                reference,
                GatewayResult::Ok,
                proto::encode_payload(&proto::CnRpdoConfirm {}),
            )
            .await;
        }
        OperationType::CnRmiRequest => {
            let request = proto::CnRmiRequest::decode(payload).unwrap();
            match &shared.config.auto_rmi {
                Some(message) => {
                    let response = proto::CnRmiResponse {
                        message: message.clone(),
                    };
                    send_from(
                        shared,
                        OperationType::CnRmiResponse,
                        reference,
                        GatewayResult::Ok,
                        proto::encode_payload(&response),
                    )
                    .await;
                }
                None => {
                    let _ = shared.rmi_tx.send(RmiCapture {
                        reference: reference.expect("RMI request without reference"),
                        node_id: request.node_id,
                        message: request.message,
                    });
                }
            }
        }
        OperationType::VersionRequest => {
            let confirm = proto::VersionConfirm {
                gateway_version: SIM_VERSION_WORD,
                serial_number: "SIM0000000000".to_owned(),
                comfonet_version: SIM_VERSION_WORD,
            };
            send_from(
                shared,
                OperationType::VersionConfirm,
                reference,
                GatewayResult::Ok,
                proto::encode_payload(&confirm),
            )
            .await;
        }
        OperationType::CnTimeRequest => {
            let confirm = proto::CnTimeConfirm {
                current_time: SIM_UNIT_TIME,
            };
            send_from(
                shared,
                OperationType::CnTimeConfirm,
                reference,
                GatewayResult::Ok,
                proto::encode_payload(&confirm),
            )
            .await;
        }
        OperationType::KeepAlive => {}
        _ => {}
    }
}

async fn send_from(
    shared: &Arc<Shared>,
    op: OperationType,
    reference: Option<u32>,
    result: GatewayResult,
    payload: Vec<u8>,
) {
    let envelope = Envelope {
        src: BRIDGE_UUID.to_vec(),
        dst: shared.client.lock().unwrap().clone(),
        operation: op as i32,
        reference,
        result: Some(result as i32),
    };
    let envelope_bytes = proto::encode_payload(&envelope);
    let mut writer = shared.writer.lock().await;
    if let Some(writer) = writer.as_mut() {
        let _ = frame::write_message(writer, &envelope_bytes, &payload).await;
    }
}

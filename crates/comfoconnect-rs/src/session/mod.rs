//! The bridge session: connect/register handshake, request multiplexing,
//! notification routing, keepalive and ordered teardown.
//!
//! A connected session owns exactly one reader task and one keepalive
//! task. All writes serialize through the writer lock, so request bytes
//! hit the wire in call order. Replies are correlated purely by reference;
//! notifications are fanned out to the subscription manager and the
//! optional event channel.

mod pending;
mod state;

pub use state::SessionState;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, trace, warn};
use prost::Message;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::discovery::BridgeEndpoint;
use crate::error::ComfoError;
use crate::frame;
use crate::pdo::{SensorSubscriptions, SensorUpdate};
use crate::proto::{self, Envelope, GatewayResult, OperationType};
use crate::registry;
use crate::rmi;
use crate::types::DeviceUuid;

use pending::PendingMap;

/// Deadline for the TCP connect and for each handshake request. The
/// handshake in particular must never wait unboundedly: a bridge that
/// silently refuses registration would otherwise hang the caller forever.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for regular requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for the close-session confirm during `disconnect`.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_DEVICE_NAME: &str = "comfoconnect-rs";

/// Unsolicited traffic surfaced through [`Bridge::events`].
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Alarm(proto::CnAlarmNotification),
    Gateway(proto::GatewayNotification),
    Node(proto::CnNodeNotification),
}

/// Everything tied to one TCP connection. Replaced wholesale on
/// reconnect, so stale guards and tasks can never touch a newer session.
struct Connection {
    cancel: CancellationToken,
    pending: PendingMap,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

/// Removes the pending slot when the requesting future goes away, whether
/// by timeout, cancellation or normal completion (then it is a no-op).
struct PendingGuard {
    conn: Arc<Connection>,
    reference: u32,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.conn.pending.discard(self.reference);
    }
}

/// Aborts a half-done connect when its future is dropped.
struct ConnectGuard {
    inner: Arc<BridgeInner>,
    armed: bool,
}

impl Drop for ConnectGuard {
    fn drop(&mut self) {
        if self.armed {
            self.inner.abort_connect();
        }
    }
}

struct BridgeInner {
    endpoint: BridgeEndpoint,
    local_uuid: DeviceUuid,
    device_name: String,
    state: Mutex<SessionState>,
    conn: Mutex<Option<Arc<Connection>>>,
    subscriptions: SensorSubscriptions,
    events: Mutex<Option<mpsc::UnboundedSender<BridgeEvent>>>,
}

/// Client session towards one ComfoConnect LAN C bridge.
///
/// The handle is cheap to clone and all methods take `&self`; concurrent
/// requests on one session are correlated by reference.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    pub fn new(endpoint: BridgeEndpoint, local_uuid: DeviceUuid) -> Self {
        Self::with_device_name(endpoint, local_uuid, DEFAULT_DEVICE_NAME)
    }

    /// Like [`Bridge::new`], with the device name shown in the bridge's
    /// registered-apps list.
    pub fn with_device_name(
        endpoint: BridgeEndpoint,
        local_uuid: DeviceUuid,
        device_name: &str,
    ) -> Self {
        Bridge {
            inner: Arc::new(BridgeInner {
                endpoint,
                local_uuid,
                device_name: device_name.to_owned(),
                state: Mutex::new(SessionState::Disconnected),
                conn: Mutex::new(None),
                subscriptions: SensorSubscriptions::new(),
                events: Mutex::new(None),
            }),
        }
    }

    pub fn endpoint(&self) -> &BridgeEndpoint {
        &self.inner.endpoint
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    /// Subscribes to unsolicited bridge traffic (alarms, gateway and node
    /// notifications). Replaces any previous event channel.
    pub fn events(&self) -> mpsc::UnboundedReceiver<BridgeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.events.lock().unwrap() = Some(tx);
        rx
    }

    /// Connects to the bridge and opens a session.
    ///
    /// When the bridge answers `StartSession` with `NotAllowed` the app is
    /// unknown: with a pin the app is registered and the session start
    /// retried, without one the call fails with `NotRegistered`. Every
    /// handshake step runs under [`HANDSHAKE_TIMEOUT`].
    pub async fn connect(&self, pin: Option<u32>) -> Result<(), ComfoError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != SessionState::Disconnected {
                return Err(ComfoError::AlreadyConnected);
            }
            *state = SessionState::Connecting;
        }

        // Covers cancellation too: dropping the connect future mid-handshake
        // must not leave the session stuck outside `Disconnected`.
        let mut guard = ConnectGuard {
            inner: self.inner.clone(),
            armed: true,
        };
        let outcome = self.handshake(pin).await;
        guard.armed = false;
        match outcome {
            Ok(()) => Ok(()),
            Err(err) => {
                self.inner.abort_connect();
                Err(err)
            }
        }
    }

    async fn handshake(&self, pin: Option<u32>) -> Result<(), ComfoError> {
        let inner = &self.inner;
        info!(
            "[SESSION] Connecting to bridge {} at {}",
            inner.endpoint.uuid, inner.endpoint.host
        );
        let addr = (inner.endpoint.host, inner.endpoint.port);
        let stream = tokio::time::timeout(HANDSHAKE_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ComfoError::NotReachable)?
            .map_err(|_| ComfoError::NotReachable)?;
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();

        let conn = Arc::new(Connection {
            cancel: CancellationToken::new(),
            pending: PendingMap::new(),
            writer: tokio::sync::Mutex::new(write_half),
            reader_task: Mutex::new(None),
        });
        *inner.conn.lock().unwrap() = Some(conn.clone());
        inner.set_state(SessionState::AwaitingStart);

        let reader = tokio::spawn(read_loop(inner.clone(), conn.clone(), read_half));
        *conn.reader_task.lock().unwrap() = Some(reader);

        match inner.start_session(&conn).await {
            Ok(()) => {}
            Err(ComfoError::NotRegistered) => {
                let Some(pin) = pin else {
                    return Err(ComfoError::NotRegistered);
                };
                inner.set_state(SessionState::Registering);
                info!("[SESSION] App unknown to bridge, registering");
                let request = proto::RegisterAppRequest {
                    uuid: inner.local_uuid.as_bytes().to_vec(),
                    pin,
                    device_name: inner.device_name.clone(),
                };
                inner
                    .request_on(
                        &conn,
                        OperationType::RegisterAppRequest,
                        proto::encode_payload(&request),
                        HANDSHAKE_TIMEOUT,
                    )
                    .await?;
                inner.set_state(SessionState::AwaitingStart);
                inner.start_session(&conn).await?;
            }
            Err(err) => return Err(err),
        }

        inner.set_state(SessionState::SessionOpen);
        info!("[SESSION] Session open");
        tokio::spawn(keepalive_loop(inner.clone(), conn));
        Ok(())
    }

    /// Closes the session. Sends `CloseSessionRequest` and waits briefly
    /// for the confirm, then releases the transport unconditionally. All
    /// pending requests are resolved with `SessionClosed` before this
    /// returns. Idempotent.
    pub async fn disconnect(&self) {
        let conn = { self.inner.conn.lock().unwrap().clone() };
        let Some(conn) = conn else {
            return;
        };

        {
            let mut state = self.inner.state.lock().unwrap();
            if *state == SessionState::Disconnected || *state == SessionState::Closing {
                return;
            }
            *state = SessionState::Closing;
        }
        debug!("[SESSION] Disconnecting");

        let close = self
            .inner
            .request_on(
                &conn,
                OperationType::CloseSessionRequest,
                proto::encode_payload(&proto::CloseSessionRequest {}),
                CLOSE_TIMEOUT,
            )
            .await;
        if let Err(err) = close {
            debug!("[SESSION] Close confirm not received: {}", err);
        }

        self.inner.teardown(&conn, "disconnect");

        // Join the reader so no subscriber sees an update after we return.
        let reader = conn.reader_task.lock().unwrap().take();
        if let Some(reader) = reader {
            let _ = reader.await;
        }
    }

    fn open_conn(&self) -> Result<Arc<Connection>, ComfoError> {
        if !self.state().is_open() {
            return Err(ComfoError::NotOpen);
        }
        self.inner
            .conn
            .lock()
            .unwrap()
            .clone()
            .ok_or(ComfoError::NotOpen)
    }

    // --- RMI ---

    /// Sends a raw RMI request and returns the raw response message,
    /// including the leading status byte.
    pub async fn cmd_rmi_request(
        &self,
        node_id: u8,
        message: Vec<u8>,
    ) -> Result<Vec<u8>, ComfoError> {
        let conn = self.open_conn()?;
        let request = proto::CnRmiRequest {
            node_id: u32::from(node_id),
            message,
        };
        let reply = self
            .inner
            .request_on(
                &conn,
                OperationType::CnRmiRequest,
                proto::encode_payload(&request),
                REQUEST_TIMEOUT,
            )
            .await?;
        let response = proto::CnRmiResponse::decode(reply.as_slice())?;
        Ok(response.message)
    }

    /// Sends an RMI request and returns the response body after checking
    /// the status byte. A non-zero status surfaces as `RmiError` and does
    /// not affect the session.
    pub async fn rmi(&self, node_id: u8, message: Vec<u8>) -> Result<Vec<u8>, ComfoError> {
        let response = self.cmd_rmi_request(node_id, message).await?;
        rmi::parse_response(&response)
    }

    /// Sends an asynchronous RMI request: the confirm only acknowledges
    /// acceptance, the result arrives later under the same reference.
    pub async fn rmi_async(&self, node_id: u8, message: Vec<u8>) -> Result<Vec<u8>, ComfoError> {
        let conn = self.open_conn()?;
        let request = proto::CnRmiAsyncRequest {
            node_id: u32::from(node_id),
            message,
        };
        let (reference, confirm) = self
            .inner
            .request_with_reference(
                &conn,
                OperationType::CnRmiAsyncRequest,
                proto::encode_payload(&request),
                REQUEST_TIMEOUT,
            )
            .await?;
        let confirm = proto::CnRmiAsyncConfirm::decode(confirm.as_slice())?;
        if confirm.result != 0 {
            return Err(ComfoError::RmiError(confirm.result as u8));
        }

        let rx = conn
            .pending
            .register_at(reference, OperationType::CnRmiAsyncResponse)?;
        let _guard = PendingGuard {
            conn: conn.clone(),
            reference,
        };
        let outcome = match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(_)) => return Err(ComfoError::SessionClosed),
            Err(_) => return Err(ComfoError::Timeout),
        };
        let response = proto::CnRmiAsyncResponse::decode(outcome.as_slice())?;
        if response.result != 0 {
            return Err(ComfoError::RmiError(response.result as u8));
        }
        Ok(response.message)
    }

    // --- RPDO ---

    /// Raw RPDO subscription request. `timeout` -1 subscribes until
    /// cancelled, 0 cancels.
    pub async fn cmd_rpdo_request(
        &self,
        pdid: u16,
        zone: u8,
        data_type: u8,
        timeout: i32,
    ) -> Result<(), ComfoError> {
        let conn = self.open_conn()?;
        let request = proto::CnRpdoRequest {
            pdid: u32::from(pdid),
            zone: u32::from(zone),
            data_type: u32::from(data_type),
            timeout,
        };
        self.inner
            .request_on(
                &conn,
                OperationType::CnRpdoRequest,
                proto::encode_payload(&request),
                REQUEST_TIMEOUT,
            )
            .await
            .map(|_| ())
    }

    /// Starts delivering updates for a registered sensor.
    ///
    /// The first local subscriber creates the bridge-side subscription;
    /// further subscribers share it and only add a channel. The receiver
    /// closes when the sensor is deregistered or the session ends.
    pub async fn register_sensor(
        &self,
        sensor_id: u16,
    ) -> Result<mpsc::UnboundedReceiver<SensorUpdate>, ComfoError> {
        let sensor = registry::sensor(sensor_id).ok_or(ComfoError::UnknownSensor(sensor_id))?;
        self.open_conn()?;

        let (rx, first) = self.inner.subscriptions.add(sensor);
        if first {
            let subscribe = self
                .cmd_rpdo_request(
                    sensor.id,
                    sensor.zone,
                    sensor.kind.wire_code(),
                    rmi::command::TIMEOUT_INDEFINITE,
                )
                .await;
            if let Err(err) = subscribe {
                self.inner.subscriptions.remove(sensor.id);
                return Err(err);
            }
            info!("[SESSION] Subscribed sensor {} ({})", sensor.id, sensor.name);
        }
        Ok(rx)
    }

    /// Stops delivering updates for a sensor and cancels the bridge-side
    /// subscription. Idempotent.
    pub async fn deregister_sensor(&self, sensor_id: u16) -> Result<(), ComfoError> {
        let sensor = registry::sensor(sensor_id).ok_or(ComfoError::UnknownSensor(sensor_id))?;
        if !self.inner.subscriptions.remove(sensor.id) {
            return Ok(());
        }
        info!("[SESSION] Unsubscribing sensor {}", sensor.id);
        self.cmd_rpdo_request(sensor.id, sensor.zone, sensor.kind.wire_code(), 0)
            .await
    }

    // --- Bridge queries and app management ---

    pub async fn cmd_version_request(&self) -> Result<proto::VersionConfirm, ComfoError> {
        let reply = self
            .simple_request(
                OperationType::VersionRequest,
                proto::encode_payload(&proto::VersionRequest {}),
            )
            .await?;
        Ok(proto::VersionConfirm::decode(reply.as_slice())?)
    }

    /// Reads the unit clock, in seconds since 2000-01-01 UTC.
    pub async fn cmd_time_request(&self) -> Result<u32, ComfoError> {
        let reply = self
            .simple_request(
                OperationType::CnTimeRequest,
                proto::encode_payload(&proto::CnTimeRequest { set_time: None }),
            )
            .await?;
        Ok(proto::CnTimeConfirm::decode(reply.as_slice())?.current_time)
    }

    /// Sets the unit clock and returns the clock after the update.
    pub async fn cmd_time_set(&self, seconds_since_epoch: u32) -> Result<u32, ComfoError> {
        let reply = self
            .simple_request(
                OperationType::CnTimeRequest,
                proto::encode_payload(&proto::CnTimeRequest {
                    set_time: Some(seconds_since_epoch),
                }),
            )
            .await?;
        Ok(proto::CnTimeConfirm::decode(reply.as_slice())?.current_time)
    }

    pub async fn cmd_list_registered_apps(
        &self,
    ) -> Result<Vec<proto::RegisteredApp>, ComfoError> {
        let reply = self
            .simple_request(
                OperationType::ListRegisteredAppsRequest,
                proto::encode_payload(&proto::ListRegisteredAppsRequest {}),
            )
            .await?;
        Ok(proto::ListRegisteredAppsConfirm::decode(reply.as_slice())?.apps)
    }

    pub async fn cmd_register_app(
        &self,
        uuid: DeviceUuid,
        device_name: &str,
        pin: u32,
    ) -> Result<(), ComfoError> {
        let request = proto::RegisterAppRequest {
            uuid: uuid.as_bytes().to_vec(),
            pin,
            device_name: device_name.to_owned(),
        };
        self.simple_request(
            OperationType::RegisterAppRequest,
            proto::encode_payload(&request),
        )
        .await
        .map(|_| ())
    }

    pub async fn cmd_deregister_app(&self, uuid: DeviceUuid) -> Result<(), ComfoError> {
        let request = proto::DeregisterAppRequest {
            uuid: uuid.as_bytes().to_vec(),
        };
        self.simple_request(
            OperationType::DeregisterAppRequest,
            proto::encode_payload(&request),
        )
        .await
        .map(|_| ())
    }

    pub async fn cmd_change_pin(&self, old_pin: u32, new_pin: u32) -> Result<(), ComfoError> {
        let request = proto::ChangePinRequest { old_pin, new_pin };
        self.simple_request(
            OperationType::ChangePinRequest,
            proto::encode_payload(&request),
        )
        .await
        .map(|_| ())
    }

    /// Re-runs the session start handshake on the current connection.
    pub async fn cmd_start_session(&self) -> Result<(), ComfoError> {
        let conn = self.open_conn()?;
        self.inner.start_session(&conn).await
    }

    /// Sends `CloseSessionRequest` without tearing the session down.
    pub async fn cmd_close_session(&self) -> Result<(), ComfoError> {
        self.simple_request(
            OperationType::CloseSessionRequest,
            proto::encode_payload(&proto::CloseSessionRequest {}),
        )
        .await
        .map(|_| ())
    }

    /// Fire-and-forget keepalive; no reply is expected.
    pub async fn cmd_keepalive(&self) -> Result<(), ComfoError> {
        let conn = self.open_conn()?;
        self.inner.send_keepalive(&conn).await
    }

    async fn simple_request(
        &self,
        op: OperationType,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ComfoError> {
        let conn = self.open_conn()?;
        self.inner
            .request_on(&conn, op, payload, REQUEST_TIMEOUT)
            .await
    }
}

impl BridgeInner {
    fn set_state(&self, to: SessionState) {
        let mut state = self.state.lock().unwrap();
        if *state != to {
            debug!("[SESSION] State {} -> {}", *state, to);
            *state = to;
        }
    }

    fn envelope(&self, op: OperationType, reference: Option<u32>) -> Envelope {
        Envelope {
            src: self.local_uuid.as_bytes().to_vec(),
            dst: self.endpoint.uuid.as_bytes().to_vec(),
            operation: op as i32,
            reference,
            result: None,
        }
    }

    async fn send_on(
        &self,
        conn: &Connection,
        envelope: &Envelope,
        payload: &[u8],
    ) -> Result<(), ComfoError> {
        let envelope_bytes = proto::encode_payload(envelope);
        let mut writer = conn.writer.lock().await;
        frame::write_message(&mut *writer, &envelope_bytes, payload).await
    }

    async fn request_on(
        &self,
        conn: &Arc<Connection>,
        op: OperationType,
        payload: Vec<u8>,
        deadline: Duration,
    ) -> Result<Vec<u8>, ComfoError> {
        self.request_with_reference(conn, op, payload, deadline)
            .await
            .map(|(_, reply)| reply)
    }

    async fn request_with_reference(
        &self,
        conn: &Arc<Connection>,
        op: OperationType,
        payload: Vec<u8>,
        deadline: Duration,
    ) -> Result<(u32, Vec<u8>), ComfoError> {
        let expected =
            proto::expected_reply(op).ok_or(ComfoError::ProtocolViolation("not a request"))?;
        let (reference, rx) = conn.pending.register(expected);
        let _guard = PendingGuard {
            conn: conn.clone(),
            reference,
        };

        let envelope = self.envelope(op, Some(reference));
        self.send_on(conn, &envelope, &payload).await?;
        trace!("[SESSION] Sent {:?} (ref={})", op, reference);

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => Ok((reference, outcome?)),
            Ok(Err(_)) => Err(ComfoError::SessionClosed),
            Err(_) => Err(ComfoError::Timeout),
        }
    }

    async fn start_session(&self, conn: &Arc<Connection>) -> Result<(), ComfoError> {
        let request = proto::StartSessionRequest { takeover: true };
        let reply = self
            .request_on(
                conn,
                OperationType::StartSessionRequest,
                proto::encode_payload(&request),
                HANDSHAKE_TIMEOUT,
            )
            .await?;
        let confirm = proto::StartSessionConfirm::decode(reply.as_slice())?;
        if !confirm.device_name.is_empty() {
            debug!("[SESSION] Bridge knows us as '{}'", confirm.device_name);
        }
        Ok(())
    }

    async fn send_keepalive(&self, conn: &Connection) -> Result<(), ComfoError> {
        let envelope = self.envelope(OperationType::KeepAlive, None);
        self.send_on(conn, &envelope, &proto::encode_payload(&proto::KeepAlive {}))
            .await
    }

    /// Tears down one connection: cancels its tasks, fails every pending
    /// slot with `SessionClosed` and drops the subscription table. Safe to
    /// call more than once and from the reader task itself.
    fn teardown(&self, conn: &Arc<Connection>, reason: &str) {
        {
            let mut current = self.conn.lock().unwrap();
            match current.as_ref() {
                Some(active) if Arc::ptr_eq(active, conn) => *current = None,
                // A newer connection exists; only silence the old one.
                _ => {
                    conn.cancel.cancel();
                    conn.pending.fail_all(ComfoError::SessionClosed);
                    return;
                }
            }
        }

        info!("[SESSION] Session closed ({})", reason);
        self.set_state(SessionState::Closing);
        conn.cancel.cancel();
        conn.pending.fail_all(ComfoError::SessionClosed);
        self.subscriptions.reset();
        self.set_state(SessionState::Disconnected);
    }

    /// Failure path of `connect` before or after the connection exists.
    fn abort_connect(&self) {
        let conn = { self.conn.lock().unwrap().clone() };
        match conn {
            Some(conn) => self.teardown(&conn, "handshake failed"),
            None => self.set_state(SessionState::Disconnected),
        }
    }

    fn emit_event(&self, event: BridgeEvent) {
        let mut guard = self.events.lock().unwrap();
        let receiver_gone = match guard.as_ref() {
            Some(tx) => tx.send(event).is_err(),
            None => false,
        };
        if receiver_gone {
            *guard = None;
        }
    }
}

async fn read_loop(inner: Arc<BridgeInner>, conn: Arc<Connection>, mut reader: OwnedReadHalf) {
    loop {
        let next = tokio::select! {
            _ = conn.cancel.cancelled() => break,
            next = frame::read_message(&mut reader) => next,
        };
        match next {
            Ok(message) => {
                if !handle_message(&inner, &conn, message) {
                    inner.teardown(&conn, "peer closed session");
                    break;
                }
            }
            Err(err) => {
                if !conn.cancel.is_cancelled() {
                    warn!("[SESSION] Transport read failed: {}", err);
                    inner.teardown(&conn, "transport failure");
                }
                break;
            }
        }
    }
}

/// Routes one incoming message. Returns false when the session must close.
fn handle_message(
    inner: &Arc<BridgeInner>,
    conn: &Arc<Connection>,
    message: frame::RawMessage,
) -> bool {
    let envelope = match Envelope::decode(message.envelope.as_slice()) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!("[SESSION] Undecodable envelope ({}), closing", err);
            return false;
        }
    };
    let op = match envelope.op() {
        Ok(op) => op,
        Err(_) => {
            debug!(
                "[SESSION] Ignoring unknown operation {}",
                envelope.operation
            );
            return true;
        }
    };

    match op {
        OperationType::CnRpdoNotification => {
            match proto::CnRpdoNotification::decode(message.payload.as_slice()) {
                Ok(notification) => {
                    trace!(
                        "[SESSION] PDO {} sample ({} bytes)",
                        notification.pdid,
                        notification.data.len()
                    );
                    inner
                        .subscriptions
                        .dispatch(notification.pdid as u16, &notification.data);
                }
                Err(err) => warn!("[SESSION] Undecodable PDO notification: {}", err),
            }
            true
        }
        OperationType::CnAlarmNotification => {
            match proto::CnAlarmNotification::decode(message.payload.as_slice()) {
                Ok(alarm) => {
                    for code in registry::decode_error_bitmask(&alarm.errors) {
                        warn!(
                            "[SESSION] Alarm on node {}: {}",
                            alarm.node_id,
                            registry::error_text(code).unwrap_or("unknown error")
                        );
                    }
                    inner.emit_event(BridgeEvent::Alarm(alarm));
                }
                Err(err) => warn!("[SESSION] Undecodable alarm notification: {}", err),
            }
            true
        }
        OperationType::GatewayNotification => {
            if let Ok(notification) =
                proto::GatewayNotification::decode(message.payload.as_slice())
            {
                inner.emit_event(BridgeEvent::Gateway(notification));
            }
            true
        }
        OperationType::CnNodeNotification => {
            if let Ok(notification) =
                proto::CnNodeNotification::decode(message.payload.as_slice())
            {
                debug!(
                    "[SESSION] Node {} (product {}) mode {}",
                    notification.node_id, notification.product_id, notification.mode
                );
                inner.emit_event(BridgeEvent::Node(notification));
            }
            true
        }
        OperationType::KeepAlive => {
            trace!("[SESSION] Keepalive from bridge");
            true
        }
        OperationType::CloseSessionRequest | OperationType::CloseSessionNotification => {
            info!("[SESSION] Bridge requested session close");
            false
        }
        _ => {
            let Some(reference) = envelope.reference else {
                debug!("[SESSION] {:?} without reference, ignoring", op);
                return true;
            };
            let outcome = match envelope.gateway_result() {
                GatewayResult::Ok => Ok(message.payload),
                result => Err(ComfoError::from_gateway_result(result, op)),
            };
            if !conn.pending.complete(reference, op, outcome) {
                debug!(
                    "[SESSION] Reply {:?} for unknown reference {}, discarding",
                    op, reference
                );
            }
            true
        }
    }
}

async fn keepalive_loop(inner: Arc<BridgeInner>, conn: Arc<Connection>) {
    loop {
        tokio::select! {
            _ = conn.cancel.cancelled() => break,
            _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {}
        }
        trace!("[SESSION] Keepalive");
        if let Err(err) = inner.send_keepalive(&conn).await {
            warn!("[SESSION] Keepalive send failed: {}", err);
            inner.teardown(&conn, "keepalive failure");
            break;
        }
    }
}

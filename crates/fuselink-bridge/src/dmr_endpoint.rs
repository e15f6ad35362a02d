//! DMR Homebrew master endpoint.
//!
//! Owns the master socket and the authentication session. A reader task
//! feeds raw datagrams to the driver; the driver runs the state machine
//! on a one-second tick, classifies inbound signaling, and turns the
//! bridge's transmit requests into sequenced `DMRD` packets; a writer
//! task is the single send path.
//!
//! Per-slot stream IDs are randomized at construction and again at every
//! voice LC header, which also resets the wire sequence counter. LC
//! headers go out twice with a 5 ms gap so receivers lock reliably.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use fuselink_core::{
    Emb, HomebrewSession, LcKind, LinkControl, SessionAction, SessionState, dmr_payload,
    session::SessionConfig,
};
use fuselink_proto::{DmrSlot, DmrdPacket, FrameKind, dmrd::DataType, homebrew, homebrew::Signaling};
use tokio::{
    net::UdpSocket,
    sync::{mpsc, watch},
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{config::DmrConfig, error::BridgeError};

/// Bounded queue depth for inbound and outbound traffic.
const QUEUE_DEPTH: usize = 10;

/// Session timer granularity; the state machine spaces retries itself.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Blocking-receive bound so shutdown stays responsive.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Gap between the duplicated voice LC header transmissions.
const HEADER_REPEAT_GAP: Duration = Duration::from_millis(5);

/// Transmit requests from the bridge controller.
#[derive(Debug, Clone)]
pub enum DmrTx {
    /// Open a stream: fresh stream ID, duplicated LC header.
    Header(LinkControl),
    /// One voice payload at superframe position 0..=5 (0 carries sync).
    Voice {
        /// The 33-byte voice payload (sync field written here).
        payload: [u8; 33],
        /// Superframe position.
        position: u8,
    },
    /// Close the stream with a terminator-with-LC.
    Terminator(LinkControl),
}

/// Channel set the bridge controller talks through.
#[derive(Debug)]
pub struct DmrHandle {
    /// Raw 55-byte `DMRD` packets, only while the session is running.
    pub inbound: mpsc::Receiver<Bytes>,
    /// Transmit requests toward the master.
    pub outbound: mpsc::Sender<DmrTx>,
    /// Read-only session state for logs and gating.
    pub status: watch::Receiver<SessionState>,
}

/// Bind the socket and start the endpoint tasks.
///
/// # Errors
///
/// Bind and master-resolution failures are fatal startup errors.
pub async fn spawn(
    config: &DmrConfig,
    session_config: SessionConfig,
    cancel: CancellationToken,
) -> Result<DmrHandle, BridgeError> {
    let socket = UdpSocket::bind(("0.0.0.0", config.local_port)).await?;
    let remote = config.remote();
    socket.connect(&remote).await?;
    info!(local = %socket.local_addr()?, master = %remote, "DMR endpoint up");

    let socket = Arc::new(socket);
    let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_DEPTH);
    let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_DEPTH);
    let (wire_tx, wire_rx) = mpsc::channel::<Bytes>(QUEUE_DEPTH);
    let (datagram_tx, datagram_rx) = mpsc::channel(QUEUE_DEPTH);
    let (status_tx, status_rx) = watch::channel(SessionState::WaitingConnect);

    tokio::spawn(reader(Arc::clone(&socket), datagram_tx, cancel.clone()));
    tokio::spawn(writer(Arc::clone(&socket), wire_rx, cancel.clone()));

    let driver = Driver {
        session: HomebrewSession::new(session_config),
        slot: if config.slot == 1 { DmrSlot::Slot1 } else { DmrSlot::Slot2 },
        repeater_id: config.repeater_id,
        color_code: config.color_code,
        stream_id: rand::random(),
        sequence: 0,
        current_lc: None,
        lc_fragments: [0; 3],
        inbound: inbound_tx,
        wire: wire_tx,
        status: status_tx,
    };
    tokio::spawn(driver.run(datagram_rx, outbound_rx, cancel));

    Ok(DmrHandle { inbound: inbound_rx, outbound: outbound_tx, status: status_rx })
}

async fn reader(socket: Arc<UdpSocket>, datagrams: mpsc::Sender<Bytes>, cancel: CancellationToken) {
    let mut buf = [0u8; 1024];
    loop {
        let received = tokio::select! {
            () = cancel.cancelled() => break,
            result = time::timeout(RECV_TIMEOUT, socket.recv(&mut buf)) => result,
        };
        let len = match received {
            Err(_) => continue,
            Ok(Err(e)) => {
                warn!(error = %e, "DMR receive failed");
                continue;
            }
            Ok(Ok(len)) => len,
        };
        if datagrams.try_send(Bytes::copy_from_slice(&buf[..len])).is_err() {
            debug!("DMR datagram queue full, dropping packet");
        }
    }
    debug!("DMR reader stopped");
}

async fn writer(socket: Arc<UdpSocket>, mut wire: mpsc::Receiver<Bytes>, cancel: CancellationToken) {
    loop {
        let packet = tokio::select! {
            () = cancel.cancelled() => break,
            packet = wire.recv() => packet,
        };
        let Some(packet) = packet else { break };
        if let Err(e) = socket.send(&packet).await {
            warn!(error = %e, "DMR send failed");
        }
    }
    // Drain whatever the driver queued during shutdown (the RPTCL close)
    while let Ok(packet) = wire.try_recv() {
        if socket.send(&packet).await.is_err() {
            break;
        }
    }
    debug!("DMR writer stopped");
}

/// Session driver: state machine plus `DMRD` packetization.
struct Driver {
    session: HomebrewSession,
    slot: DmrSlot,
    repeater_id: u32,
    color_code: u8,
    stream_id: u32,
    sequence: u8,
    current_lc: Option<LinkControl>,
    /// Protected LC split for the embedded signalling of frames B..F.
    lc_fragments: [u32; 3],
    inbound: mpsc::Sender<Bytes>,
    wire: mpsc::Sender<Bytes>,
    status: watch::Sender<SessionState>,
}

impl Driver {
    async fn run(
        mut self,
        mut datagrams: mpsc::Receiver<Bytes>,
        mut outbound: mpsc::Receiver<DmrTx>,
        cancel: CancellationToken,
    ) {
        let mut tick = time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = tick.tick() => {
                    let actions = self.session.poll(time::Instant::now().into_std());
                    self.execute(actions).await;
                }
                datagram = datagrams.recv() => {
                    let Some(datagram) = datagram else { break };
                    self.handle_datagram(&datagram).await;
                }
                request = outbound.recv() => {
                    let Some(request) = request else { break };
                    self.transmit(request).await;
                }
            }
            self.publish_state();
        }

        let actions = self.session.close();
        self.execute(actions).await;
        self.publish_state();
        debug!("DMR driver stopped");
    }

    fn publish_state(&self) {
        self.status.send_if_modified(|state| {
            let new = self.session.state();
            if *state == new {
                false
            } else {
                *state = new;
                true
            }
        });
    }

    async fn handle_datagram(&mut self, datagram: &[u8]) {
        match homebrew::classify(datagram) {
            Signaling::Dmrd => {
                if !self.session.is_running() {
                    debug!("DMRD before session is up, dropping");
                    return;
                }
                if datagram.len() < DmrdPacket::SIZE {
                    debug!(len = datagram.len(), "short DMRD, dropping");
                    return;
                }
                if self.inbound.try_send(Bytes::copy_from_slice(datagram)).is_err() {
                    debug!("DMR inbound queue full, dropping frame");
                }
            }
            Signaling::Beacon => debug!("site beacon request ignored"),
            Signaling::Other => debug!(len = datagram.len(), "unrecognized master packet"),
            signaling => {
                let actions = self.session.handle(signaling, time::Instant::now().into_std());
                self.execute(actions).await;
            }
        }
    }

    async fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::Send(packet) => self.send(Bytes::from(packet)).await,
                SessionAction::Reconnect => {
                    // UDP has no connection to rebuild; the restarted
                    // login sequence is the actual recovery
                    warn!("master connection timed out, session restarting");
                }
            }
        }
    }

    async fn send(&self, packet: Bytes) {
        if self.wire.send(packet).await.is_err() {
            debug!("DMR wire queue closed");
        }
    }

    async fn transmit(&mut self, request: DmrTx) {
        if !self.session.is_running() {
            debug!("dropping outbound voice, session not running");
            return;
        }
        match request {
            DmrTx::Header(lc) => {
                self.stream_id = rand::random();
                self.sequence = 0;
                self.current_lc = Some(lc);
                self.lc_fragments = lc.embedded_fragments();

                let mut payload = [0u8; 33];
                lc.encode_into(LcKind::Header, &mut payload);
                let kind = FrameKind::DataSync(DataType::VoiceLcHeader);
                let first = self.build(&lc, kind, &payload);
                let second = self.build(&lc, kind, &payload);
                self.send(first).await;
                time::sleep(HEADER_REPEAT_GAP).await;
                self.send(second).await;
                info!(
                    source = lc.source,
                    destination = lc.destination,
                    stream = %format_args!("{:#010x}", self.stream_id),
                    "DMR stream opened"
                );
            }
            DmrTx::Voice { mut payload, position } => {
                let Some(lc) = self.current_lc else {
                    debug!("voice without an open stream, dropping");
                    return;
                };
                let kind = if position == 0 {
                    dmr_payload::write_voice_sync(&mut payload);
                    FrameKind::VoiceSync
                } else {
                    // Frames B..D carry the LC fragments, E and F a null EMB
                    let (lcss, fragment) = match position {
                        1 => (1, self.lc_fragments[0]),
                        2 => (3, self.lc_fragments[1]),
                        3 => (2, self.lc_fragments[2]),
                        _ => (0, 0),
                    };
                    let emb = Emb { color_code: self.color_code, privacy: lc.private, lcss };
                    dmr_payload::write_emb(&mut payload, emb, fragment);
                    FrameKind::Voice(position)
                };
                let packet = self.build(&lc, kind, &payload);
                self.send(packet).await;
            }
            DmrTx::Terminator(lc) => {
                let mut payload = [0u8; 33];
                lc.encode_into(LcKind::Terminator, &mut payload);
                let packet =
                    self.build(&lc, FrameKind::DataSync(DataType::TerminatorWithLc), &payload);
                self.send(packet).await;
                self.current_lc = None;
                info!(source = lc.source, "DMR stream closed");
            }
        }
    }

    fn build(&mut self, lc: &LinkControl, kind: FrameKind, payload: &[u8; 33]) -> Bytes {
        let mut packet = DmrdPacket::new();
        packet.set_sequence(self.sequence);
        self.sequence = self.sequence.wrapping_add(1);
        // IDs came from a validated LinkControl; the masks keep them in range
        let _ = packet.set_source_id(lc.source & 0x00FF_FFFF);
        let _ = packet.set_destination_id(lc.destination & 0x00FF_FFFF);
        packet.set_repeater_id(self.repeater_id);
        packet.set_flags(self.slot, lc.private, kind);
        packet.set_stream_id(self.stream_id);
        packet.set_payload(payload);
        Bytes::copy_from_slice(&packet.to_bytes())
    }
}

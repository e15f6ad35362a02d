//! YSF reflector endpoint.
//!
//! One UDP socket speaking to a fixed reflector address through three
//! tasks: a reader that stages datagrams through a length-prefixed ring
//! and forwards whole 155-byte frames, a writer that is the socket's
//! single send path, and a keep-alive task that polls the reflector
//! every five seconds. Graceful shutdown sends the `YSFU` unlink.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use fuselink_core::RingBuffer;
use fuselink_proto::{Callsign, YsfFrame, ysf};
use tokio::{net::UdpSocket, sync::mpsc, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{config::YsfConfig, error::BridgeError};

/// Bounded queue depth for inbound and outbound frames.
const QUEUE_DEPTH: usize = 10;

/// Reflector poll cadence.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Blocking-receive bound so shutdown stays responsive.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Staging ring: a handful of worst-case frames plus prefixes.
const RING_CAPACITY: usize = (YsfFrame::SIZE + 2) * 16;

/// Channel pair the bridge controller talks through.
#[derive(Debug)]
pub struct YsfHandle {
    /// Whole 155-byte frames from the reflector.
    pub inbound: mpsc::Receiver<Bytes>,
    /// Frames and signaling toward the reflector.
    pub outbound: mpsc::Sender<Bytes>,
}

/// Bind the socket and start the endpoint tasks.
///
/// # Errors
///
/// Bind and remote-resolution failures are fatal startup errors.
pub async fn spawn(config: &YsfConfig, cancel: CancellationToken) -> Result<YsfHandle, BridgeError> {
    let callsign = Callsign::new(&config.callsign)
        .map_err(|e| BridgeError::Config(format!("ysf.callsign: {e}")))?;

    let socket = UdpSocket::bind(("0.0.0.0", config.local_port)).await?;
    let remote = config.remote();
    socket.connect(&remote).await?;
    info!(local = %socket.local_addr()?, remote = %remote, "YSF endpoint up");

    let socket = Arc::new(socket);
    let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_DEPTH);
    let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(QUEUE_DEPTH);

    tokio::spawn(reader(Arc::clone(&socket), inbound_tx, cancel.clone()));
    tokio::spawn(writer(Arc::clone(&socket), outbound_rx, callsign, cancel.clone()));
    tokio::spawn(keepalive(outbound_tx.clone(), callsign, cancel));

    Ok(YsfHandle { inbound: inbound_rx, outbound: outbound_tx })
}

async fn reader(socket: Arc<UdpSocket>, inbound: mpsc::Sender<Bytes>, cancel: CancellationToken) {
    let mut ring = RingBuffer::new(RING_CAPACITY);
    let mut datagram = [0u8; 512];
    let mut record = [0u8; YsfFrame::SIZE];

    loop {
        let received = tokio::select! {
            () = cancel.cancelled() => break,
            result = time::timeout(RECV_TIMEOUT, socket.recv(&mut datagram)) => result,
        };
        let len = match received {
            Err(_) => continue, // timeout: re-check cancellation
            Ok(Err(e)) => {
                warn!(error = %e, "YSF receive failed");
                continue;
            }
            Ok(Ok(len)) => len,
        };

        if len != YsfFrame::SIZE {
            debug!(len, "dropping non-frame YSF datagram");
            continue;
        }
        if let Err(e) = ring.add_length(&datagram[..len]) {
            debug!(error = %e, "YSF inbound ring overflow");
        }
        while let Some(len) = ring.get_length(&mut record) {
            if inbound.try_send(Bytes::copy_from_slice(&record[..len])).is_err() {
                debug!("YSF inbound queue full, dropping frame");
            }
        }
    }
    debug!("YSF reader stopped");
}

async fn writer(
    socket: Arc<UdpSocket>,
    mut outbound: mpsc::Receiver<Bytes>,
    callsign: Callsign,
    cancel: CancellationToken,
) {
    loop {
        let packet = tokio::select! {
            () = cancel.cancelled() => break,
            packet = outbound.recv() => packet,
        };
        let Some(packet) = packet else { break };
        if let Err(e) = socket.send(&packet).await {
            warn!(error = %e, "YSF send failed");
        }
    }

    // Unlink politely on the way out
    if let Err(e) = socket.send(&ysf::unlink_packet(callsign)).await {
        debug!(error = %e, "YSF unlink failed");
    }
    info!("YSF endpoint unlinked");
}

async fn keepalive(outbound: mpsc::Sender<Bytes>, callsign: Callsign, cancel: CancellationToken) {
    let poll = Bytes::copy_from_slice(&ysf::poll_packet(callsign));
    let mut interval = time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if outbound.try_send(poll.clone()).is_err() {
                    debug!("YSF outbound queue full, skipping poll");
                }
            }
        }
    }
}

//! Bridge controller.
//!
//! Consumes both endpoints' inbound queues and drives the codec
//! pipeline. YSF frames route by their FICH role: headers open a DMR
//! stream, communications frames feed the 3:5 ratio adapter, terminators
//! close the stream. Inbound DMR rides a per-slot jitter delay buffer
//! and is released on the 60 ms tick, feeding the 5:3 adapter back into
//! YSF frames. A per-direction inactivity timer forges a terminator when
//! a stream dies mid-air.

use std::time::{Duration, Instant};

use bytes::Bytes;
use fuselink_core::{
    DelayBuffer, DmrToYsf, JitterStatus, LcKind, LinkControl, SessionState, YsfToDmr, dmr_payload,
    ysf_payload,
};
use fuselink_proto::{
    Callsign, DmrdPacket, Fich, FrameKind, YsfFrame,
    dmrd::DataType,
    fich::{CallMode, DataType as FichDataType, FrameIndicator},
};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    dmr_endpoint::{DmrHandle, DmrTx},
    lookup::IdLookup,
    ysf_endpoint::YsfHandle,
};

/// Outbound DMR block cadence.
const BLOCK_TIME: Duration = Duration::from_millis(60);

/// Voice superframe length (sync frame plus five plain frames).
const SUPERFRAME: u8 = 6;

/// YSF frame-number cycle.
const FN_CYCLE: u8 = 8;

/// An active YSF-to-DMR transmission.
struct TxStream {
    lc: LinkControl,
    source: Callsign,
    /// Next superframe position, 0..SUPERFRAME.
    position: u8,
    frames: u32,
    errors: u32,
    last_frame: Instant,
}

/// An active DMR-to-YSF transmission.
struct RxStream {
    source: Callsign,
    /// Next YSF frame number, 0..FN_CYCLE.
    frame_number: u8,
    frames: u32,
    lost: u32,
    errors: u32,
    last_frame: Instant,
}

/// The controller that owns the pipeline state between both endpoints.
pub struct Bridge {
    ysf: YsfHandle,
    dmr: DmrHandle,
    lookup: IdLookup,
    talkgroup: u32,
    slot_flag: bool,
    inactivity: Duration,
    forward: YsfToDmr,
    backward: DmrToYsf,
    delay: DelayBuffer,
    tx_stream: Option<TxStream>,
    rx_stream: Option<RxStream>,
}

impl Bridge {
    /// Assemble the controller from the endpoint handles.
    #[must_use]
    pub fn new(config: &Config, ysf: YsfHandle, dmr: DmrHandle, lookup: IdLookup) -> Self {
        Self {
            ysf,
            dmr,
            lookup,
            talkgroup: config.dmr.talkgroup,
            slot_flag: config.dmr.slot == 2,
            inactivity: config.inactivity(),
            forward: YsfToDmr::new(),
            backward: DmrToYsf::new(),
            delay: DelayBuffer::new(
                "dmr-inbound",
                DmrdPacket::SIZE,
                BLOCK_TIME.as_millis() as u64,
                config.bridge.jitter_ms,
            ),
            tx_stream: None,
            rx_stream: None,
        }
    }

    /// Run until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut tick = time::interval(BLOCK_TIME);
        info!("bridge controller running");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = self.ysf.inbound.recv() => {
                    let Some(frame) = frame else { break };
                    self.handle_ysf(&frame).await;
                }
                packet = self.dmr.inbound.recv() => {
                    let Some(packet) = packet else { break };
                    self.absorb_dmrd(&packet);
                }
                _ = tick.tick() => {
                    self.delay.clock(BLOCK_TIME.as_millis() as u64);
                    self.release_dmr().await;
                    self.check_inactivity().await;
                }
            }
        }
        info!("bridge controller stopped");
    }

    // --- YSF to DMR ---

    async fn handle_ysf(&mut self, datagram: &Bytes) {
        let frame = match YsfFrame::from_bytes(datagram) {
            Ok(frame) => *frame,
            Err(e) => {
                debug!(error = %e, "dropping malformed YSF frame");
                return;
            }
        };
        let (fich, fich_errors) = match Fich::decode(frame.fich_bytes()) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(error = %e, "dropping YSF frame with bad FICH");
                return;
            }
        };

        match fich.frame_indicator {
            FrameIndicator::Header => self.open_tx_stream(&frame).await,
            FrameIndicator::Communications => {
                if self.tx_stream.is_none() {
                    debug!("voice before header, opening stream implicitly");
                    self.open_tx_stream(&frame).await;
                }
                if fich.data_type == FichDataType::VdMode2 {
                    self.push_tx_voice(&frame, fich_errors).await;
                } else {
                    debug!(data_type = ?fich.data_type, "unsupported YSF payload mode");
                }
            }
            FrameIndicator::Terminator => self.close_tx_stream("terminator").await,
        }
    }

    async fn open_tx_stream(&mut self, frame: &YsfFrame) {
        if self.tx_stream.is_some() {
            self.close_tx_stream("new header").await;
        }
        if *self.dmr.status.borrow() != SessionState::Running {
            debug!("master link not up, stream will be dropped at the endpoint");
        }
        let source = frame.source();
        let source_id = self.lookup.find_id(source.trimmed());
        let lc = LinkControl::voice(source_id, self.talkgroup, false);

        info!(%source, source_id, talkgroup = self.talkgroup, "YSF stream opened");
        self.forward.reset();
        self.tx_stream = Some(TxStream {
            lc,
            source,
            position: 0,
            frames: 0,
            errors: 0,
            last_frame: Instant::now(),
        });
        self.send_dmr(DmrTx::Header(lc)).await;
    }

    async fn push_tx_voice(&mut self, frame: &YsfFrame, fich_errors: u32) {
        let sections = ysf_payload::extract_voice(frame.payload());
        let tribit_errors: u32 = sections.iter().map(ysf_payload::VchSection::tribit_errors).sum();

        // Dead-air screen: a payload whose every section is carrier
        // garbage is not worth a DMR superframe slot
        let usable = sections
            .iter()
            .filter(|s| s.is_valid() && s.to_triple().estimate_ber() < 1.0)
            .count();
        if usable == 0 {
            debug!("payload carries no usable voice, skipping");
            return;
        }

        let Some(stream) = self.tx_stream.as_mut() else { return };
        stream.frames += 1;
        stream.errors += fich_errors + tribit_errors;
        stream.last_frame = Instant::now();

        if let Some(payloads) = self.forward.push_sections(&sections) {
            let mut positions = [0u8; 5];
            if let Some(stream) = self.tx_stream.as_mut() {
                for slot in &mut positions {
                    *slot = stream.position;
                    stream.position = (stream.position + 1) % SUPERFRAME;
                }
            }
            for (payload, position) in payloads.into_iter().zip(positions) {
                self.send_dmr(DmrTx::Voice { payload, position }).await;
            }
        }
    }

    async fn close_tx_stream(&mut self, reason: &str) {
        let Some(stream) = self.tx_stream.take() else { return };
        info!(
            source = %stream.source,
            frames = stream.frames,
            errors = stream.errors,
            reason,
            "YSF stream closed"
        );
        self.forward.reset();
        self.send_dmr(DmrTx::Terminator(stream.lc)).await;
    }

    async fn send_dmr(&mut self, tx: DmrTx) {
        if self.dmr.outbound.try_send(tx).is_err() {
            debug!("DMR outbound queue full, dropping frame");
        }
    }

    // --- DMR to YSF ---

    fn absorb_dmrd(&mut self, datagram: &Bytes) {
        let packet = match DmrdPacket::from_bytes(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, "dropping malformed DMRD");
                return;
            }
        };
        if (packet.slot() == fuselink_proto::DmrSlot::Slot2) != self.slot_flag {
            debug!(slot = ?packet.slot(), "ignoring traffic on the other slot");
            return;
        }
        self.delay.add(&datagram[..DmrdPacket::SIZE], packet.sequence());
    }

    async fn release_dmr(&mut self) {
        let mut block = [0u8; DmrdPacket::SIZE];
        match self.delay.get(&mut block) {
            JitterStatus::NoData => {}
            JitterStatus::Missing => {
                if let Some(stream) = self.rx_stream.as_mut() {
                    stream.lost += 1;
                    debug!("missing DMR frame, skipping tick");
                }
            }
            JitterStatus::Data => {
                if let Ok(packet) = DmrdPacket::from_bytes(&block) {
                    let packet = *packet;
                    self.handle_dmrd(&packet).await;
                }
            }
        }
    }

    async fn handle_dmrd(&mut self, packet: &DmrdPacket) {
        match packet.frame_kind() {
            FrameKind::DataSync(DataType::VoiceLcHeader) => {
                let lc = match LinkControl::decode_from(LcKind::Header, packet.payload()) {
                    Ok((lc, _)) => lc,
                    Err(_) => {
                        debug!("unreadable LC header, falling back to packet addressing");
                        LinkControl::voice(
                            packet.source_id(),
                            packet.destination_id(),
                            packet.is_private_call(),
                        )
                    }
                };
                self.open_rx_stream(lc.source).await;
            }
            FrameKind::VoiceSync | FrameKind::Voice(_) => {
                if self.rx_stream.is_none() {
                    debug!("voice before LC header, opening stream implicitly");
                    self.open_rx_stream(packet.source_id()).await;
                }
                if let FrameKind::Voice(_) = packet.frame_kind() {
                    let (_, _, emb_errors, emb_ok) = dmr_payload::read_emb(packet.payload());
                    if let Some(stream) = self.rx_stream.as_mut() {
                        stream.errors += if emb_ok { emb_errors } else { 16 };
                    }
                }
                if let Some((payloads, corrections)) = self.backward.push(packet.payload()) {
                    if let Some(stream) = self.rx_stream.as_mut() {
                        stream.errors += corrections;
                    }
                    for payload in payloads {
                        self.emit_ysf_voice(payload).await;
                    }
                }
                if let Some(stream) = self.rx_stream.as_mut() {
                    stream.frames += 1;
                    stream.last_frame = Instant::now();
                }
            }
            FrameKind::DataSync(DataType::TerminatorWithLc) => {
                self.close_rx_stream("terminator").await;
            }
            FrameKind::DataSync(DataType::Other(kind)) => {
                debug!(kind, "ignoring unhandled DMR data type");
            }
        }
    }

    async fn open_rx_stream(&mut self, source_id: u32) {
        if self.rx_stream.is_some() {
            self.close_rx_stream("new header").await;
        }
        let callsign_text = self.lookup.find_callsign(source_id);
        let source = Callsign::new(&callsign_text)
            .unwrap_or_else(|_| Callsign::new("N0CALL").unwrap_or_else(|_| unreachable!()));

        info!(source_id, source = %source, "DMR stream opened");
        self.backward.reset();
        self.rx_stream = Some(RxStream {
            source,
            frame_number: 0,
            frames: 0,
            lost: 0,
            errors: 0,
            last_frame: Instant::now(),
        });
        self.emit_ysf(FrameIndicator::Header, [0u8; 90]).await;
    }

    async fn emit_ysf_voice(&mut self, payload: [u8; 90]) {
        self.emit_ysf(FrameIndicator::Communications, payload).await;
    }

    async fn close_rx_stream(&mut self, reason: &str) {
        let Some(stream) = self.rx_stream.take() else { return };
        info!(
            source = %stream.source,
            frames = stream.frames,
            lost = stream.lost,
            errors = stream.errors,
            reason,
            "DMR stream closed"
        );
        self.backward.reset();
        self.rx_stream = Some(stream);
        self.emit_ysf(FrameIndicator::Terminator, [0u8; 90]).await;
        self.rx_stream = None;
    }

    async fn emit_ysf(&mut self, role: FrameIndicator, mut payload: [u8; 90]) {
        let Some(stream) = self.rx_stream.as_mut() else { return };

        let frame_number = match role {
            FrameIndicator::Communications => {
                let fn_ = stream.frame_number;
                stream.frame_number = (stream.frame_number + 1) % FN_CYCLE;
                fn_
            }
            FrameIndicator::Header | FrameIndicator::Terminator => 0,
        };

        ysf_payload::insert_callsign(stream.source, &mut payload);

        let fich = Fich {
            frame_indicator: role,
            call_mode: CallMode::Group,
            frame_number,
            data_type: FichDataType::VdMode2,
            source_id: 0,
            destination_id: 0,
        };

        let mut frame = YsfFrame::new(stream.source, destination_all());
        frame.set_fich_bytes(&fich.encode());
        frame.set_payload(&payload);

        if self.ysf.outbound.try_send(Bytes::copy_from_slice(&frame.to_bytes())).is_err() {
            debug!("YSF outbound queue full, dropping frame");
        }
    }

    // --- Housekeeping ---

    async fn check_inactivity(&mut self) {
        let now = Instant::now();
        if self
            .tx_stream
            .as_ref()
            .is_some_and(|s| now.duration_since(s.last_frame) >= self.inactivity)
        {
            warn!("YSF stream went silent, forging terminator");
            self.close_tx_stream("inactivity").await;
        }
        if self
            .rx_stream
            .as_ref()
            .is_some_and(|s| now.duration_since(s.last_frame) >= self.inactivity)
        {
            warn!("DMR stream went silent, forging terminator");
            self.close_rx_stream("inactivity").await;
        }
    }
}

fn destination_all() -> Callsign {
    Callsign::new("ALL").unwrap_or_else(|_| unreachable!("static callsign is valid"))
}

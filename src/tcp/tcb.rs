//! The Transmission Control Block: per-connection state and the RFC 9293
//! segment-arrival / timer-tick state machine.
//!
//! Grounded on `tcp/mod.rs`'s `TCB::on_segment`/`is_segment_valid` for the
//! synchronized-state switch and on `tcp/tcb.rs`'s richer (but, in the
//! retrieved snapshot, unwired) congestion/retransmission/timer fields. The
//! two had diverged in the source snapshot; this is the single reconciled
//! version, plus active-open (`connect`) support that neither teacher
//! variant finished.

use std::time::{Duration, Instant};

use crate::buffer::ChunkedBuffer;
use crate::config::Config;

use super::congestion;
use super::segment::{self, InSegment, OutSegment};
use super::{is_between_wrapped, wrapping_lt, Events, Kind, Quad, ShutdownHow, State, SynQueueItem};

/*
                RFC 9293 - S3.3.1 - Fig 3

           1         2          3          4
      ----------|----------|----------|----------
             SND.UNA    SND.NXT    SND.UNA
                                  +SND.WND

1 - old sequence numbers that have been acknowledged
2 - sequence numbers of unacknowledged data
3 - sequence numbers allowed for new data transmission
4 - future sequence numbers that are not yet allowed
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendSpace {
    pub una: u32,
    pub nxt: u32,
    pub wnd: u16,
    pub wl1: u32,
    pub wl2: u32,
    pub iss: u32,
}

/*
                RFC 9293 - S3.3.1 - Fig 4

                       1          2          3
                   ----------|----------|----------
                          RCV.NXT    RCV.NXT
                                    +RCV.WND

        1 - old sequence numbers that have been acknowledged
        2 - sequence numbers allowed for new reception
        3 - future sequence numbers that are not yet allowed
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvSpace {
    pub nxt: u32,
    pub wnd: u16,
    pub irs: u32,
}

fn chunk_count(total: usize, chunk_size: usize) -> usize {
    (total + chunk_size - 1) / chunk_size
}

fn backoff(rto: Duration) -> Duration {
    (rto * 2).min(Duration::from_secs(60))
}

#[derive(Debug)]
pub struct Tcb {
    pub kind: Kind,
    pub state: State,
    pub quad: Quad,
    pub mss: u16,

    pub snd: SendSpace,
    pub rcv: RecvSpace,

    tx: ChunkedBuffer,
    rx: ChunkedBuffer,

    srtt: Option<f64>,
    rttvar: f64,
    rto: Duration,

    cwnd: u32,
    ssthresh: u32,

    rtx_deadline: Option<Instant>,
    rtx_retries: u32,

    syn_deadline: Option<Instant>,
    syn_retries: u32,

    fin_queued: bool,
    fin_sent: bool,
    fin_seq: Option<u32>,

    read_closed: bool,
    pub reset: bool,
    abort_requested: bool,

    override_deadline: Option<Instant>,

    probe_deadline: Option<Instant>,
    probe_backoff: Duration,

    time_wait_deadline: Option<Instant>,

    need_window_update_ack: bool,
    last_segment_sent_at: Option<Instant>,

    config: Config,
}

impl Tcb {
    /// Active open (`connect`): we send the first SYN.
    pub fn connect(quad: Quad, iss: u32, config: Config) -> Tcb {
        let mss = config.default_mss;
        let rx_capacity = config.rx_buffer_size;
        let tx_capacity = config.tx_buffer_size;
        let chunk_size = config.chunk_size;
        let cwnd = config.initial_window_segments * mss as u32;

        Tcb {
            kind: Kind::Active,
            state: State::SynSent,
            quad,
            mss,
            snd: SendSpace {
                una: iss,
                nxt: iss.wrapping_add(1),
                wnd: 0,
                wl1: 0,
                wl2: 0,
                iss,
            },
            rcv: RecvSpace {
                nxt: 0,
                wnd: rx_capacity.min(u16::MAX as usize) as u16,
                irs: 0,
            },
            tx: ChunkedBuffer::new(chunk_size, chunk_count(tx_capacity, chunk_size)),
            rx: ChunkedBuffer::new(chunk_size, chunk_count(rx_capacity, chunk_size)),
            srtt: None,
            rttvar: 0.0,
            rto: config.initial_rto,
            cwnd,
            ssthresh: u32::MAX,
            rtx_deadline: None,
            rtx_retries: 0,
            syn_deadline: None,
            syn_retries: 0,
            fin_queued: false,
            fin_sent: false,
            fin_seq: None,
            read_closed: false,
            reset: false,
            abort_requested: false,
            override_deadline: None,
            probe_deadline: None,
            probe_backoff: config.initial_rto,
            time_wait_deadline: None,
            need_window_update_ack: false,
            last_segment_sent_at: None,
            config,
        }
    }

    /// Passive open: a SYN arrived on a bound, listening port.
    pub fn from_inbound_syn(quad: Quad, seg: &InSegment, iss: u32, config: Config) -> Tcb {
        let mut mss = config.default_mss;
        if let Some(peer_mss) = seg.mss {
            mss = mss.min(peer_mss).min(config.max_mss);
        }
        let rx_capacity = config.rx_buffer_size;
        let tx_capacity = config.tx_buffer_size;
        let chunk_size = config.chunk_size;
        let cwnd = config.initial_window_segments * mss as u32;

        Tcb {
            kind: Kind::Passive,
            state: State::SynRcvd,
            quad,
            mss,
            snd: SendSpace {
                una: iss,
                nxt: iss.wrapping_add(1),
                wnd: seg.window,
                wl1: seg.seq,
                wl2: 0,
                iss,
            },
            rcv: RecvSpace {
                nxt: seg.seq.wrapping_add(1),
                wnd: rx_capacity.min(u16::MAX as usize) as u16,
                irs: seg.seq,
            },
            tx: ChunkedBuffer::new(chunk_size, chunk_count(tx_capacity, chunk_size)),
            rx: ChunkedBuffer::new(chunk_size, chunk_count(rx_capacity, chunk_size)),
            srtt: None,
            rttvar: 0.0,
            rto: config.initial_rto,
            cwnd,
            ssthresh: u32::MAX,
            rtx_deadline: None,
            rtx_retries: 0,
            syn_deadline: None,
            syn_retries: 0,
            fin_queued: false,
            fin_sent: false,
            fin_seq: None,
            read_closed: false,
            reset: false,
            abort_requested: false,
            override_deadline: None,
            probe_deadline: None,
            probe_backoff: config.initial_rto,
            time_wait_deadline: None,
            need_window_update_ack: false,
            last_segment_sent_at: None,
            config,
        }
    }

    /// Passive open from a queued SYN: `accept` pops a [`SynQueueItem`] and
    /// calls this instead of reparsing the original segment, since only its
    /// seq/window/MSS fields ever mattered.
    pub(crate) fn from_syn_queue_item(item: SynQueueItem, iss: u32, config: Config) -> Tcb {
        let seg = InSegment {
            local: item.quad.dst,
            remote: item.quad.src,
            seq: item.peer_seq,
            ack: 0,
            ack_flag: false,
            syn: true,
            fin: false,
            rst: false,
            psh: false,
            window: item.peer_window,
            mss: item.peer_mss,
            payload: &[],
        };
        Tcb::from_inbound_syn(item.quad, &seg, iss, config)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn advertised_window(&self) -> u16 {
        let free = self.rx.capacity().saturating_sub(self.rx.len());
        free.min(u16::MAX as usize) as u16
    }

    pub fn available_data_len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_outgoing_full(&self) -> bool {
        self.tx.len() >= self.tx.capacity()
    }

    /// Whatever events are currently true of this connection. Computed on
    /// demand from state rather than tracked incrementally, so it can never
    /// drift out of sync with `state`/`rx`/`tx`.
    pub fn events(&self) -> Events {
        let mut e = Events::empty();

        if matches!(
            self.state,
            State::Estab
                | State::FinWait1
                | State::FinWait2
                | State::CloseWait
                | State::Closing
                | State::LastAck
                | State::TimeWait
        ) {
            e.insert(Events::CONNECTED);
        }
        if self.state == State::Closed || self.reset {
            e.insert(Events::CLOSED);
        }
        if !self.rx.is_empty() || self.read_closed {
            e.insert(Events::RX_READY);
        }
        if self.read_closed {
            e.insert(Events::RX_SHUTDOWN);
        }
        if !self.is_outgoing_full() {
            e.insert(Events::TX_READY);
        }
        if self.tx.is_empty() && !(self.fin_queued && !self.fin_sent) {
            e.insert(Events::TX_COMPLETE);
        }
        if self.fin_sent {
            e.insert(Events::TX_SHUTDOWN);
        }

        e
    }

    /// Queues up to `data.len()` bytes for transmission, returning how many
    /// were actually accepted (bounded by free space in the send buffer).
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.fin_queued {
            return 0;
        }

        let free = self.tx.capacity().saturating_sub(self.tx.len());
        let n = data.len().min(free);
        if n == 0 {
            return 0;
        }

        let was_empty = self.tx.is_empty();
        let pos = self.snd.una.wrapping_add(self.tx.len() as u32);
        self.tx.write(pos, &data[..n]);
        self.tx
            .set_length(self.tx.len() + n)
            .expect("bounded by the free-space check above");

        if was_empty {
            // Quirk preserved intentionally: the override timer only arms on
            // the empty-to-nonempty transition, not on every write.
            self.override_deadline = Some(Instant::now() + self.config.override_timeout);
        }

        n
    }

    /// Copies up to `buf.len()` bytes of already-received data out of the
    /// receive buffer, returning how many were copied.
    pub fn recv(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.rx.len());
        if n == 0 {
            return 0;
        }

        let base = self.rcv.nxt.wrapping_sub(self.rx.len() as u32);
        let was_zero_window = self.advertised_window() == 0;

        self.rx.read(base, &mut buf[..n]);
        self.rx.advance_base(base.wrapping_add(n as u32));

        if was_zero_window && self.advertised_window() > 0 {
            self.need_window_update_ack = true;
        }

        n
    }

    pub fn close(&mut self) {
        self.shutdown(ShutdownHow::Send);
    }

    pub fn shutdown(&mut self, how: ShutdownHow) {
        match how {
            ShutdownHow::Send => self.queue_fin(),
            ShutdownHow::Receive => self.read_closed = true,
            ShutdownHow::Both => {
                self.queue_fin();
                self.read_closed = true;
            }
        }
    }

    pub fn abort(&mut self) {
        self.abort_requested = true;
    }

    fn queue_fin(&mut self) {
        if self.fin_queued {
            return;
        }
        match self.state {
            State::Estab => self.state = State::FinWait1,
            State::CloseWait => self.state = State::LastAck,
            _ => return,
        }
        self.fin_queued = true;
        self.fin_seq = Some(self.snd.una.wrapping_add(self.tx.len() as u32));
    }

    fn override_due(&self, now: Instant) -> bool {
        self.override_deadline.map(|d| now >= d).unwrap_or(false)
    }

    fn update_rto(&mut self, sample_ms: f64) {
        match self.srtt {
            None => {
                self.srtt = Some(sample_ms);
                self.rttvar = sample_ms / 2.0;
            }
            Some(srtt) => {
                self.rttvar = 0.75 * self.rttvar + 0.25 * (srtt - sample_ms).abs();
                self.srtt = Some(0.875 * srtt + 0.125 * sample_ms);
            }
        }

        let srtt = self.srtt.unwrap();
        let rto_ms = srtt + (4.0 * self.rttvar).max(100.0);
        // RFC 6298: if the computed RTO is less than 1 second, round up to 1 second.
        self.rto = Duration::from_millis(rto_ms.max(1000.0) as u64);
    }

    /*
    There are four cases for the acceptability test for an
    incoming segment:

    Segment Length  Receive Window  Test
    0                0               SEG.SEQ = RCV.NXT
    0                >0              RCV.NXT =< SEG.SEQ < RCV.NXT+RCV.WND
    >0               0               not acceptable
    >0               >0              RCV.NXT =< SEG.SEQ < RCV.NXT+RCV.WND
                                      or
                                      RCV.NXT =< SEG.SEQ+SEG.LEN-1 < RCV.NXT+RCV.WND
    */
    fn is_segment_valid(&self, seg: &InSegment, seg_len: u32) -> bool {
        let seg_seq = seg.seq;
        let rcv_wnd = self.advertised_window() as u32;
        let rcv_nxt = self.rcv.nxt;

        if seg_len == 0 && rcv_wnd == 0 {
            seg_seq == rcv_nxt
        } else if seg_len == 0 {
            is_between_wrapped(rcv_nxt.wrapping_sub(1), seg_seq, rcv_nxt.wrapping_add(rcv_wnd))
        } else if rcv_wnd == 0 {
            false
        } else {
            is_between_wrapped(rcv_nxt.wrapping_sub(1), seg_seq, rcv_nxt.wrapping_add(rcv_wnd))
                || is_between_wrapped(
                    rcv_nxt.wrapping_sub(1),
                    seg_seq.wrapping_add(seg_len).wrapping_sub(1),
                    rcv_nxt.wrapping_add(rcv_wnd),
                )
        }
    }

    fn ack_segment(&self) -> OutSegment<'static> {
        OutSegment::new(self.quad.dst, self.quad.src, self.snd.nxt, self.advertised_window())
            .ack(self.rcv.nxt)
    }

    fn rst_segment(&self) -> OutSegment<'static> {
        OutSegment::new(self.quad.dst, self.quad.src, self.snd.nxt, 0).rst()
    }

    fn rst_segment_with_seq(&self, seq: u32) -> OutSegment<'static> {
        OutSegment::new(self.quad.dst, self.quad.src, seq, 0).rst()
    }

    /// Drives segment arrival processing (RFC 9293 S3.10.7), appending any
    /// segments the reaction produces to `out` rather than writing them
    /// anywhere itself — the caller owns the only live `Tun` handle.
    pub fn on_segment(&mut self, seg: &InSegment, out: &mut Vec<Vec<u8>>) {
        let now = Instant::now();
        if self.state == State::SynSent {
            self.on_segment_syn_sent(seg, out);
        } else {
            self.on_segment_synchronized(seg, out, now);
        }
    }

    fn on_segment_syn_sent(&mut self, seg: &InSegment, out: &mut Vec<Vec<u8>>) {
        if seg.ack_flag
            && !is_between_wrapped(
                self.snd.iss.wrapping_sub(1),
                seg.ack,
                self.snd.nxt.wrapping_add(1),
            )
        {
            if !seg.rst {
                out.push(segment::build(&self.rst_segment_with_seq(seg.ack)));
            }
            return;
        }

        if seg.rst {
            if seg.ack_flag {
                self.reset = true;
                self.state = State::Closed;
            }
            return;
        }

        if !seg.syn {
            return;
        }

        self.rcv.irs = seg.seq;
        self.rcv.nxt = seg.seq.wrapping_add(1);
        if let Some(peer_mss) = seg.mss {
            self.mss = self.mss.min(peer_mss).min(self.config.max_mss);
        }

        if seg.ack_flag {
            self.snd.una = seg.ack;
            self.tx.advance_base(self.snd.una);
            self.state = State::Estab;
            self.snd.wnd = seg.window;
            self.snd.wl1 = seg.seq;
            self.snd.wl2 = seg.ack;
            self.syn_deadline = None;
            out.push(segment::build(&self.ack_segment()));
        } else {
            // Simultaneous open (RFC 9293 S3.10.7.3 case 2).
            self.state = State::SynRcvd;
            self.syn_deadline = None;
        }
    }

    fn on_segment_synchronized(&mut self, seg: &InSegment, out: &mut Vec<Vec<u8>>, now: Instant) {
        let seg_len = seg.seg_len();

        if !self.is_segment_valid(seg, seg_len) {
            if !seg.rst {
                out.push(segment::build(&self.ack_segment()));
            }
            return;
        }

        if seg.rst {
            match self.state {
                State::SynRcvd if self.kind == Kind::Passive => {
                    // Passive open refused: caller drops this from the SYN queue silently.
                    self.state = State::Closed;
                }
                State::SynRcvd
                | State::Estab
                | State::FinWait1
                | State::FinWait2
                | State::CloseWait => {
                    self.reset = true;
                    self.state = State::Closed;
                }
                _ => {}
            }
            return;
        }

        if seg.syn {
            if self.state == State::SynRcvd && self.kind == Kind::Passive {
                self.state = State::Closed;
            } else {
                // RFC 5961 challenge ACK instead of an RFC 793 reset.
                out.push(segment::build(&self.ack_segment()));
            }
            return;
        }

        if !seg.ack_flag {
            return;
        }

        if self.state == State::SynRcvd {
            if is_between_wrapped(
                self.snd.una.wrapping_sub(1),
                seg.ack,
                self.snd.nxt.wrapping_add(1),
            ) {
                self.state = State::Estab;
                self.snd.una = seg.ack;
                self.tx.advance_base(self.snd.una);
                self.snd.wnd = seg.window;
                self.snd.wl1 = seg.seq;
                self.snd.wl2 = seg.ack;
                self.syn_deadline = None;
            } else {
                out.push(segment::build(&self.rst_segment_with_seq(seg.ack)));
                return;
            }
        } else if matches!(
            self.state,
            State::Estab
                | State::FinWait1
                | State::FinWait2
                | State::Closing
                | State::LastAck
                | State::TimeWait
        ) {
            self.process_ack(seg, out, now);
            if self.state == State::Closed {
                return;
            }
        }

        if matches!(self.state, State::Estab | State::FinWait1 | State::FinWait2) {
            self.accept_incoming_data(seg, out);
        }

        if seg.fin {
            self.accept_fin(out);
        }
    }

    fn process_ack(&mut self, seg: &InSegment, out: &mut Vec<Vec<u8>>, now: Instant) {
        if is_between_wrapped(
            self.snd.una.wrapping_sub(1),
            seg.ack,
            self.snd.nxt.wrapping_add(1),
        ) {
            let acked = seg.ack.wrapping_sub(self.snd.una);
            if acked > 0 {
                congestion::on_ack(&mut self.cwnd, self.ssthresh, acked, self.mss as u32);
                self.snd.una = seg.ack;
                self.tx.advance_base(self.snd.una);

                if self.rtx_retries == 0 {
                    if let Some(sent_at) = self.last_segment_sent_at.take() {
                        let sample_ms = now.duration_since(sent_at).as_secs_f64() * 1000.0;
                        self.update_rto(sample_ms);
                    }
                }
                self.rtx_retries = 0;
                self.rtx_deadline = if self.snd.una == self.snd.nxt {
                    None
                } else {
                    Some(now + self.rto)
                };

                if self.fin_sent {
                    if let Some(fin_seq) = self.fin_seq {
                        if !wrapping_lt(self.snd.una, fin_seq.wrapping_add(1)) {
                            match self.state {
                                State::FinWait1 => self.state = State::FinWait2,
                                State::Closing => {
                                    self.state = State::TimeWait;
                                    self.time_wait_deadline =
                                        Some(now + self.config.two_msl_timeout);
                                }
                                State::LastAck => self.state = State::Closed,
                                _ => {}
                            }
                        }
                    }
                }
            }
        } else if wrapping_lt(self.snd.nxt, seg.ack) {
            out.push(segment::build(&self.ack_segment()));
            return;
        }

        if is_between_wrapped(
            self.snd.una.wrapping_sub(1),
            seg.ack,
            self.snd.nxt.wrapping_add(1),
        ) && (wrapping_lt(self.snd.wl1, seg.seq)
            || (self.snd.wl1 == seg.seq && !wrapping_lt(seg.ack, self.snd.wl2)))
        {
            self.snd.wnd = seg.window;
            self.snd.wl1 = seg.seq;
            self.snd.wl2 = seg.ack;
        }
    }

    fn accept_incoming_data(&mut self, seg: &InSegment, out: &mut Vec<Vec<u8>>) {
        if !seg.payload.is_empty() {
            let new_offset = self.rcv.nxt.wrapping_sub(seg.seq) as usize;
            if new_offset < seg.payload.len() {
                let fresh = &seg.payload[new_offset..];
                let free = self.rx.capacity().saturating_sub(self.rx.len());
                let accept_len = fresh.len().min(free);

                if accept_len > 0 {
                    let was_zero_window = self.advertised_window() == 0;

                    self.rx.write(self.rcv.nxt, &fresh[..accept_len]);
                    self.rx
                        .set_length(self.rx.len() + accept_len)
                        .expect("bounded by the free-space check above");
                    self.rcv.nxt = self.rcv.nxt.wrapping_add(accept_len as u32);

                    if was_zero_window && self.advertised_window() > 0 {
                        self.need_window_update_ack = true;
                    }
                }
            }
        }

        out.push(segment::build(&self.ack_segment()));
    }

    fn accept_fin(&mut self, out: &mut Vec<Vec<u8>>) {
        self.rcv.nxt = self.rcv.nxt.wrapping_add(1);
        self.read_closed = true;

        match self.state {
            State::Estab => self.state = State::CloseWait,
            State::FinWait1 => self.state = State::Closing,
            State::FinWait2 => {
                self.state = State::TimeWait;
                self.time_wait_deadline = Some(Instant::now() + self.config.two_msl_timeout);
            }
            _ => {}
        }

        out.push(segment::build(&self.ack_segment()));
    }

    fn send_handshake_segment(&self, out: &mut Vec<Vec<u8>>) {
        match self.state {
            State::SynSent => {
                out.push(segment::build(
                    &OutSegment::new(
                        self.quad.dst,
                        self.quad.src,
                        self.snd.iss,
                        self.advertised_window(),
                    )
                    .syn()
                    .mss(self.mss),
                ));
            }
            State::SynRcvd => {
                out.push(segment::build(
                    &OutSegment::new(
                        self.quad.dst,
                        self.quad.src,
                        self.snd.iss,
                        self.advertised_window(),
                    )
                    .syn()
                    .ack(self.rcv.nxt)
                    .mss(self.mss),
                ));
            }
            _ => {}
        }
    }

    fn try_send(&mut self, out: &mut Vec<Vec<u8>>, now: Instant) {
        if self.snd.wnd != 0 {
            let in_flight = self.snd.nxt.wrapping_sub(self.snd.una);
            let effective_wnd = (self.snd.wnd as u32).min(self.cwnd);

            if in_flight < effective_wnd {
                let sendable_window = effective_wnd - in_flight;
                let unsent = self.tx.len() as u32 - in_flight;
                let to_send = unsent.min(sendable_window).min(self.mss as u32);

                let has_unacked = in_flight > 0;
                let send_now = to_send > 0
                    && (congestion::sws_allows_send(
                        to_send,
                        self.mss as u32,
                        self.snd.wnd as u32,
                        has_unacked,
                    ) || self.override_due(now));

                if send_now {
                    let seq = self.snd.nxt;
                    let payload = self.tx.read_to_vec(seq, to_send as usize);
                    let push = to_send == unsent;

                    let mut seg_out =
                        OutSegment::new(self.quad.dst, self.quad.src, seq, self.advertised_window())
                            .ack(self.rcv.nxt)
                            .payload(&payload);
                    if push {
                        seg_out = seg_out.psh();
                    }
                    out.push(segment::build(&seg_out));

                    self.snd.nxt = self.snd.nxt.wrapping_add(to_send);
                    self.override_deadline = None;
                    self.last_segment_sent_at = Some(now);
                    if self.rtx_deadline.is_none() {
                        self.rtx_deadline = Some(now + self.rto);
                    }
                    return;
                }
            }
        }

        if self.fin_queued && !self.fin_sent {
            if let Some(fin_seq) = self.fin_seq {
                if self.snd.nxt == fin_seq && self.snd.wnd != 0 {
                    out.push(segment::build(
                        &OutSegment::new(
                            self.quad.dst,
                            self.quad.src,
                            fin_seq,
                            self.advertised_window(),
                        )
                        .ack(self.rcv.nxt)
                        .fin(),
                    ));
                    self.snd.nxt = fin_seq.wrapping_add(1);
                    self.fin_sent = true;
                    self.last_segment_sent_at = Some(now);
                    if self.rtx_deadline.is_none() {
                        self.rtx_deadline = Some(now + self.rto);
                    }
                }
            }
        }
    }

    fn maybe_probe(&mut self, out: &mut Vec<Vec<u8>>, now: Instant) {
        let in_flight = self.snd.nxt.wrapping_sub(self.snd.una);
        let unsent = self.tx.len() as u32 - in_flight.min(self.tx.len() as u32);

        if self.snd.wnd != 0 || unsent == 0 {
            self.probe_deadline = None;
            self.probe_backoff = self.config.initial_rto;
            return;
        }

        let due = self.probe_deadline.map(|d| now >= d).unwrap_or(true);
        if due {
            let byte = self.tx.read_to_vec(self.snd.nxt, 1);
            out.push(segment::build(
                &OutSegment::new(self.quad.dst, self.quad.src, self.snd.nxt, self.advertised_window())
                    .ack(self.rcv.nxt)
                    .payload(&byte),
            ));
            self.probe_backoff = backoff(self.probe_backoff);
            self.probe_deadline = Some(now + self.probe_backoff);
        }
    }

    /// Drives timer-based behavior: handshake (re)transmission, data
    /// retransmission, new-data transmission, zero-window probing, and
    /// TIME-WAIT expiry. Returns `true` once the TCB should be deleted.
    /// Any segments the tick produces are appended to `out` rather than
    /// written directly — the caller owns the only live `Tun` handle.
    pub fn on_tick(&mut self, out: &mut Vec<Vec<u8>>) -> bool {
        let now = Instant::now();

        if self.state == State::TimeWait {
            return now >= self.time_wait_deadline.unwrap_or(now);
        }
        if self.state == State::Closed {
            return true;
        }

        if matches!(self.state, State::SynSent | State::SynRcvd) {
            let due = self.syn_deadline.map(|d| now >= d).unwrap_or(true);
            if due {
                if self.syn_retries > self.config.r2_syn {
                    self.reset = true;
                    self.state = State::Closed;
                    return true;
                }
                self.send_handshake_segment(out);
                self.syn_retries += 1;
                self.rto = backoff(self.rto);
                self.syn_deadline = Some(now + self.rto);
            }
            return false;
        }

        if self.abort_requested {
            out.push(segment::build(&self.rst_segment()));
            self.state = State::Closed;
            self.reset = true;
            return true;
        }

        if self.snd.nxt != self.snd.una {
            let due = self.rtx_deadline.map(|d| now >= d).unwrap_or(false);
            if due {
                if self.rtx_retries >= self.config.r2 {
                    out.push(segment::build(&self.rst_segment()));
                    self.state = State::Closed;
                    self.reset = true;
                    return true;
                }

                let flight_size = self.snd.nxt.wrapping_sub(self.snd.una);
                congestion::on_retransmit_timeout(
                    &mut self.cwnd,
                    &mut self.ssthresh,
                    flight_size,
                    self.mss as u32,
                );
                self.snd.nxt = self.snd.una;
                if self.fin_queued {
                    self.fin_sent = false;
                }
                self.rtx_retries += 1;
                self.rto = backoff(self.rto);
                self.rtx_deadline = None;
            }
        }

        self.try_send(out, now);
        self.maybe_probe(out, now);

        if self.need_window_update_ack {
            out.push(segment::build(&self.ack_segment()));
            self.need_window_update_ack = false;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcp::Dual;
    use std::net::Ipv4Addr;

    fn quad() -> Quad {
        Quad {
            src: Dual {
                ipv4: Ipv4Addr::new(10, 0, 0, 2),
                port: 4000,
            },
            dst: Dual {
                ipv4: Ipv4Addr::new(10, 0, 0, 1),
                port: 9000,
            },
        }
    }

    fn inbound(seq: u32, ack: u32, ack_flag: bool, syn: bool, fin: bool, rst: bool) -> InSegment<'static> {
        let q = quad();
        InSegment {
            local: q.dst,
            remote: q.src,
            seq,
            ack,
            ack_flag,
            syn,
            fin,
            rst,
            psh: false,
            window: 4096,
            mss: None,
            payload: &[],
        }
    }

    /// Drives an active-open `Tcb` through the handshake and returns it
    /// sitting in `Estab`, ready for a close/reset/Nagle scenario to build on.
    fn established() -> Tcb {
        let q = quad();
        let mut tcb = Tcb::connect(q, 1000, Config::default());
        let our_ack = tcb.snd.nxt;

        let mut out = Vec::new();
        tcb.on_tick(&mut out);
        let syn = segment::parse(&out[0]).unwrap();
        assert!(syn.syn && !syn.ack_flag);

        let syn_ack = inbound(5000, our_ack, true, true, false, false);
        let mut out2 = Vec::new();
        tcb.on_segment(&syn_ack, &mut out2);
        assert_eq!(tcb.state(), State::Estab);
        tcb
    }

    #[test]
    fn active_open_completes_three_way_handshake() {
        let q = quad();
        let mut tcb = Tcb::connect(q, 1000, Config::default());
        assert_eq!(tcb.state(), State::SynSent);

        let mut out = Vec::new();
        assert!(!tcb.on_tick(&mut out));
        assert_eq!(out.len(), 1);
        let sent = segment::parse(&out[0]).unwrap();
        assert!(sent.syn);
        assert!(!sent.ack_flag);
        assert_eq!(sent.mss, Some(Config::default().default_mss));

        let syn_ack = inbound(5000, tcb.snd.nxt, true, true, false, false);
        let mut out2 = Vec::new();
        tcb.on_segment(&syn_ack, &mut out2);
        assert_eq!(tcb.state(), State::Estab);
        assert_eq!(tcb.rcv.irs, 5000);
        let ack = segment::parse(&out2[0]).unwrap();
        assert!(ack.ack_flag);
        assert!(!ack.syn);
    }

    #[test]
    fn passive_open_completes_three_way_handshake() {
        let q = quad();
        let item = SynQueueItem {
            quad: q,
            peer_seq: 7000,
            peer_window: 4096,
            peer_mss: Some(1400),
        };
        let mut tcb = Tcb::from_syn_queue_item(item, 2000, Config::default());
        assert_eq!(tcb.state(), State::SynRcvd);
        assert_eq!(tcb.rcv.nxt, 7001);

        let mut out = Vec::new();
        tcb.on_tick(&mut out);
        assert_eq!(out.len(), 1);
        let synack = segment::parse(&out[0]).unwrap();
        assert!(synack.syn && synack.ack_flag);

        let final_ack = inbound(7001, tcb.snd.nxt, true, false, false, false);
        let mut out2 = Vec::new();
        tcb.on_segment(&final_ack, &mut out2);
        assert_eq!(tcb.state(), State::Estab);
    }

    #[test]
    fn graceful_close_reaches_time_wait_after_peer_fin() {
        let mut tcb = established();

        tcb.close();
        assert_eq!(tcb.state(), State::FinWait1);

        let mut out = Vec::new();
        tcb.on_tick(&mut out);
        assert!(
            out.iter().any(|b| segment::parse(b).unwrap().fin),
            "queued close should have emitted a FIN"
        );

        let ack_of_fin = tcb.snd.nxt;
        let peer_ack_of_fin = inbound(tcb.rcv.nxt, ack_of_fin, true, false, false, false);
        let mut out2 = Vec::new();
        tcb.on_segment(&peer_ack_of_fin, &mut out2);
        assert_eq!(tcb.state(), State::FinWait2);

        let peer_fin = inbound(tcb.rcv.nxt, ack_of_fin, true, false, true, false);
        let mut out3 = Vec::new();
        tcb.on_segment(&peer_fin, &mut out3);
        assert_eq!(tcb.state(), State::TimeWait);
    }

    #[test]
    fn abort_sends_rst_and_tears_down_immediately() {
        let mut tcb = established();

        tcb.abort();
        let mut out = Vec::new();
        let dead = tcb.on_tick(&mut out);
        assert!(dead);
        assert_eq!(tcb.state(), State::Closed);
        assert!(tcb.reset);
        assert_eq!(out.len(), 1);
        assert!(segment::parse(&out[0]).unwrap().rst);
    }

    #[test]
    fn peer_reset_in_established_tears_down_connection() {
        let mut tcb = established();

        let rst = inbound(tcb.rcv.nxt, 0, false, false, false, true);
        let mut out = Vec::new();
        tcb.on_segment(&rst, &mut out);
        assert_eq!(tcb.state(), State::Closed);
        assert!(tcb.reset);
    }

    #[test]
    fn small_write_is_held_back_while_earlier_data_is_unacked() {
        let mut tcb = established();

        assert_eq!(tcb.write(b"hi"), 2);
        let mut out = Vec::new();
        tcb.on_tick(&mut out);
        assert_eq!(
            out.len(),
            1,
            "nothing was outstanding yet, so even a tiny write goes straight out"
        );
        assert_eq!(segment::parse(&out[0]).unwrap().payload, b"hi");

        assert_eq!(tcb.write(b"!"), 1);
        let mut out2 = Vec::new();
        tcb.on_tick(&mut out2);
        assert!(
            out2.is_empty(),
            "a 1-byte write behind unacked data and far under the window should be withheld"
        );
    }
}

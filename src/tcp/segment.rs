//! Wire encoding/decoding for TCP segments over the raw IPv4 TUN device.
//!
//! Grounded on `tcp/ioutil.rs`'s `generate_reset`/`generate_synack`, widened
//! into one builder that covers every flag combination the state machine
//! needs (plain ACKs, data segments, FIN, RST) plus the MSS option, and a
//! matching parser.

use std::io::Write;

use etherparse::{Ipv4Header, Ipv4HeaderSlice, TcpHeader, TcpHeaderSlice, TcpOptionElement};
use tidy_tuntap::Tun;

use super::Dual;

const TTL: u8 = 64;
const TCP_PROTOCOL: u8 = 6;

/// Everything needed to build one outbound TCP segment.
#[derive(Debug, Clone, Copy)]
pub struct OutSegment<'a> {
    pub local: Dual,
    pub remote: Dual,
    pub seq: u32,
    pub ack: u32,
    pub ack_flag: bool,
    pub syn: bool,
    pub fin: bool,
    pub rst: bool,
    pub psh: bool,
    pub window: u16,
    pub mss: Option<u16>,
    pub payload: &'a [u8],
}

impl<'a> OutSegment<'a> {
    pub fn new(local: Dual, remote: Dual, seq: u32, window: u16) -> Self {
        OutSegment {
            local,
            remote,
            seq,
            ack: 0,
            ack_flag: false,
            syn: false,
            fin: false,
            rst: false,
            psh: false,
            window,
            mss: None,
            payload: &[],
        }
    }

    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = ack;
        self.ack_flag = true;
        self
    }

    pub fn syn(mut self) -> Self {
        self.syn = true;
        self
    }

    pub fn fin(mut self) -> Self {
        self.fin = true;
        self
    }

    pub fn rst(mut self) -> Self {
        self.rst = true;
        self
    }

    pub fn psh(mut self) -> Self {
        self.psh = true;
        self
    }

    pub fn mss(mut self, mss: u16) -> Self {
        self.mss = Some(mss);
        self
    }

    pub fn payload(mut self, payload: &'a [u8]) -> Self {
        self.payload = payload;
        self
    }
}

/// Builds the raw IPv4+TCP bytes for `seg`, checksummed and ready to write
/// to the TUN device.
pub fn build(seg: &OutSegment) -> Vec<u8> {
    let mut tcph = TcpHeader::new(seg.local.port, seg.remote.port, seg.seq, seg.window);
    tcph.ack = seg.ack_flag;
    tcph.acknowledgment_number = seg.ack;
    tcph.syn = seg.syn;
    tcph.fin = seg.fin;
    tcph.rst = seg.rst;
    tcph.psh = seg.psh;

    if let Some(mss) = seg.mss {
        tcph.set_options(&[TcpOptionElement::MaximumSegmentSize(mss)])
            .expect("a single MSS option always fits in the option space");
    }

    let payload_len = tcph.header_len() as usize + seg.payload.len();
    let mut ip4h = Ipv4Header::new(
        payload_len as u16,
        TTL,
        TCP_PROTOCOL,
        seg.local.ipv4.octets(),
        seg.remote.ipv4.octets(),
    );
    ip4h.identification = 0;

    tcph.checksum = tcph
        .calc_checksum_ipv4(&ip4h, seg.payload)
        .expect("payload fits within a TCP segment's checksum limits");

    let mut out = Vec::with_capacity(ip4h.header_len() + payload_len);
    ip4h.write(&mut out).unwrap();
    tcph.write(&mut out).unwrap();
    out.write_all(seg.payload).unwrap();
    out
}

/// Builds and writes `seg` to `tun`, logging but not propagating I/O errors
/// the way the rest of the segment-processing path does (best-effort, like
/// the reference TCP stack's own ACK/RST emission).
pub fn send(tun: &mut Tun, seg: &OutSegment) {
    let bytes = build(seg);
    if let Err(err) = tun.write_all(&bytes) {
        log::warn!("failed to write segment to tun device: {err}");
    }
}

/// A segment as received off the wire, borrowing its payload from the
/// caller's read buffer.
#[derive(Debug, Clone, Copy)]
pub struct InSegment<'a> {
    pub local: Dual,
    pub remote: Dual,
    pub seq: u32,
    pub ack: u32,
    pub ack_flag: bool,
    pub syn: bool,
    pub fin: bool,
    pub rst: bool,
    pub psh: bool,
    pub window: u16,
    pub mss: Option<u16>,
    pub payload: &'a [u8],
}

impl<'a> InSegment<'a> {
    /// Segment length for sequence-space accounting purposes: payload bytes
    /// plus one each for SYN and FIN (RFC 9293 S3.4).
    pub fn seg_len(&self) -> u32 {
        self.payload.len() as u32 + self.syn as u32 + self.fin as u32
    }
}

/// Parses one IPv4+TCP datagram, returning `None` on any malformed input
/// (dropped silently, matching how a real stack discards garbage off the
/// wire rather than erroring).
pub fn parse(buf: &[u8]) -> Option<InSegment<'_>> {
    let ip4h = Ipv4HeaderSlice::from_slice(buf).ok()?;
    if ip4h.protocol() != TCP_PROTOCOL {
        return None;
    }

    let ip_header_len = (ip4h.ihl() as usize) * 4;
    let tcph = TcpHeaderSlice::from_slice(&buf[ip_header_len..]).ok()?;
    let tcp_header_len = tcph.data_offset() as usize * 4;
    let payload = &buf[ip_header_len + tcp_header_len..];

    let ip4h_owned = ip4h.to_header();
    let expected = tcph.to_header().ok()?.calc_checksum_ipv4(&ip4h_owned, payload).ok()?;
    if expected != tcph.checksum() {
        return None;
    }

    let mss = tcph.options_iterator().find_map(|opt| match opt.ok()? {
        TcpOptionElement::MaximumSegmentSize(mss) => Some(mss),
        _ => None,
    });

    Some(InSegment {
        local: Dual {
            ipv4: ip4h.destination_addr(),
            port: tcph.destination_port(),
        },
        remote: Dual {
            ipv4: ip4h.source_addr(),
            port: tcph.source_port(),
        },
        seq: tcph.sequence_number(),
        ack: tcph.acknowledgment_number(),
        ack_flag: tcph.ack(),
        syn: tcph.syn(),
        fin: tcph.fin(),
        rst: tcph.rst(),
        psh: tcph.psh(),
        window: tcph.window_size(),
        mss,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn dual(ip: [u8; 4], port: u16) -> Dual {
        Dual {
            ipv4: Ipv4Addr::from(ip),
            port,
        }
    }

    #[test]
    fn build_then_parse_roundtrips_a_data_segment() {
        let local = dual([10, 0, 0, 1], 9000);
        let remote = dual([10, 0, 0, 2], 4000);

        let payload = b"hello";
        let seg = OutSegment::new(local, remote, 1000, 4096)
            .ack(2000)
            .psh()
            .mss(1400)
            .payload(payload);

        let bytes = build(&seg);
        let parsed = parse(&bytes).unwrap();

        assert_eq!(parsed.local, remote);
        assert_eq!(parsed.remote, local);
        assert_eq!(parsed.seq, 1000);
        assert_eq!(parsed.ack, 2000);
        assert!(parsed.ack_flag);
        assert!(parsed.psh);
        assert!(!parsed.syn);
        assert_eq!(parsed.mss, Some(1400));
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn seg_len_counts_syn_and_fin() {
        let local = dual([10, 0, 0, 1], 1);
        let remote = dual([10, 0, 0, 2], 2);
        let seg = OutSegment::new(local, remote, 0, 0).syn();
        let bytes = build(&seg);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.seg_len(), 1);
    }
}

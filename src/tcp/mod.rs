use std::net::Ipv4Addr;

pub mod congestion;
pub mod listen;
pub mod segment;
pub mod stream;
pub mod tcb;

pub use listen::TcpListener;
pub use stream::TcpStream;

/// An IPv4 address paired with a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dual {
    pub ipv4: Ipv4Addr,
    pub port: u16,
}

/// A connection identity: remote endpoint (`src`) and local endpoint (`dst`),
/// named to match the segment's own source/destination fields as received
/// off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quad {
    pub src: Dual,
    pub dst: Dual,
}

/// Everything `TcpListener::accept` needs to build a `Tcb` for a connection
/// that hasn't been allocated yet: the quad and the three inbound-SYN fields
/// `Tcb::from_syn_queue_item` reads off the segment itself. Grounded on
/// `tcpAccept`'s deferred-allocation socket queue (`cyclone_tcp/core/tcp.c`):
/// a queued SYN costs a few bytes, not a whole socket's buffers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SynQueueItem {
    pub(crate) quad: Quad,
    pub(crate) peer_seq: u32,
    pub(crate) peer_window: u16,
    pub(crate) peer_mss: Option<u16>,
}

/*
                    RFC 9293 - S3.3.2 - Fig 5

                            +---------+ ---------\      active OPEN
                            |  CLOSED |            \    -----------
                            +---------+<---------\   \   create TCB
                              |     ^              \   \  snd SYN
                 passive OPEN |     |   CLOSE        \   \
                 ------------ |     | ----------       \   \
                  create TCB  |     | delete TCB         \   \
                              V     |                      \   \
          rcv RST (note 1)  +---------+            CLOSE    |    \
       -------------------->|  LISTEN |          ---------- |     |
      /                     +---------+          delete TCB |     |
     /           rcv SYN      |     |     SEND              |     |
    /           -----------   |     |    -------            |     V
+--------+      snd SYN,ACK  /       \   snd SYN          +--------+
|        |<-----------------           ------------------>|        |
|  SYN   |                    rcv SYN                     |  SYN   |
|  RCVD  |<-----------------------------------------------|  SENT  |
|        |                  snd SYN,ACK                   |        |
|        |------------------           -------------------|        |
+--------+   rcv ACK of SYN  \       /  rcv SYN,ACK       +--------+
   |         --------------   |     |   -----------
   |                x         |     |     snd ACK
   |                          V     V
   |  CLOSE                 +---------+
   | -------                |  ESTAB  |
   | snd FIN                +---------+
   |                 CLOSE    |     |    rcv FIN
   V                -------   |     |    -------
+---------+         snd FIN  /       \   snd ACK         +---------+
|  FIN    |<----------------          ------------------>|  CLOSE  |
| WAIT-1  |------------------                            |   WAIT  |
+---------+          rcv FIN  \                          +---------+
  | rcv ACK of FIN   -------   |                          CLOSE  |
  | --------------   snd ACK   |                         ------- |
  V        x                   V                         snd FIN V
+---------+               +---------+                    +---------+
|FINWAIT-2|               | CLOSING |                    | LAST-ACK|
+---------+               +---------+                    +---------+
  |              rcv ACK of FIN |                 rcv ACK of FIN |
  |  rcv FIN     -------------- |    Timeout=2MSL -------------- |
  |  -------            x       V    ------------        x       V
   \ snd ACK              +---------+delete TCB          +---------+
     -------------------->|TIME-WAIT|------------------->| CLOSED  |
                          +---------+                    +---------+
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Listen,
    SynSent,
    SynRcvd,
    Estab,
    FinWait1,
    FinWait2,
    Closing,
    TimeWait,
    CloseWait,
    LastAck,
}

/// Whether the TCB resulted from a passive `listen`/`accept` or an active
/// `connect`. Error handling on an unexpected RST/SYN differs between the
/// two (RFC 9293 SS3.10.7.3, SYN-RECEIVED state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Active,
    Passive,
}

/// Which half (or both) of a full-duplex stream to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownHow {
    Send,
    Receive,
    Both,
}

bitflags::bitflags! {
    /// Events a blocking call can wait on, mirroring the single
    /// `socketEventMask`/`socketEvent` pair each CycloneTCP socket carries
    /// instead of one condition variable per condition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Events: u32 {
        const CONNECTED    = 1 << 0;
        const CLOSED       = 1 << 1;
        const RX_READY     = 1 << 2;
        const TX_READY     = 1 << 3;
        const TX_COMPLETE  = 1 << 4;
        const TX_SHUTDOWN  = 1 << 5;
        const RX_SHUTDOWN  = 1 << 6;
    }
}

/// Flags controlling [`TcpStream::send`](stream::TcpStream::send).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendFlags {
    /// Block until the peer has acknowledged every byte submitted.
    pub wait_ack: bool,
}

/// Flags controlling [`TcpStream::recv`](stream::TcpStream::recv).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecvFlags {
    /// Block until the caller's buffer is completely filled (or the
    /// connection is closed/reset), instead of returning as soon as any
    /// data is available.
    pub wait_all: bool,
    /// Stop as soon as this byte value is read, returning the data up to
    /// and including it.
    pub break_char: Option<u8>,
}

/// From RFC 1323: whether `lhs` is strictly before `rhs` in sequence-number
/// order, accounting for wraparound. Sequence numbers are considered old if
/// more than half the space (2**31) behind the reference point.
pub fn wrapping_lt(lhs: u32, rhs: u32) -> bool {
    lhs.wrapping_sub(rhs) > (1u32 << 31)
}

/// Whether `x` lies strictly between `start` and `end` in sequence-number
/// order (mod 2**32).
pub fn is_between_wrapped(start: u32, x: u32, end: u32) -> bool {
    wrapping_lt(start, x) && wrapping_lt(x, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_lt_handles_u32_wraparound() {
        assert!(wrapping_lt(u32::MAX, 0));
        assert!(!wrapping_lt(0, u32::MAX));
        assert!(wrapping_lt(10, 20));
        assert!(!wrapping_lt(20, 10));
    }

    #[test]
    fn is_between_wrapped_across_boundary() {
        assert!(is_between_wrapped(u32::MAX - 1, u32::MAX, 1));
        assert!(!is_between_wrapped(0, 100, 50));
    }
}

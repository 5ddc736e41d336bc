use std::time::Duration;

/// Tunables for a [`crate::NetStack`], gathering the constants that
/// `cyclone_tcp/core/tcp.c` hardcodes (MSS, retransmission bounds, buffer
/// sizes) into one place with RFC-793-sane defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// MSS advertised and assumed absent an MSS option from the peer.
    pub default_mss: u16,
    /// Upper bound accepted from a peer's MSS option.
    pub max_mss: u16,
    /// RTO used before any RTT sample has been taken.
    pub initial_rto: Duration,
    /// Initial congestion window, expressed in MSS-sized segments.
    pub initial_window_segments: u32,
    /// How long output may sit unacknowledged-but-unsent before the override
    /// timer forces a short segment out (defeats a Nagle/SWS deadlock).
    pub override_timeout: Duration,
    /// 2*MSL hold time in TIME-WAIT.
    pub two_msl_timeout: Duration,
    /// Send buffer size in bytes.
    pub tx_buffer_size: usize,
    /// Receive buffer size in bytes.
    pub rx_buffer_size: usize,
    /// Chunk size backing both buffers' `ChunkedBuffer` storage.
    pub chunk_size: usize,
    /// Maximum number of connections queued per listener awaiting `accept`.
    pub syn_queue_depth: usize,
    /// Retransmission threshold before giving up on a data segment.
    pub r2: u32,
    /// Retransmission threshold before giving up on a SYN.
    pub r2_syn: u32,
    /// Upper bound on how long a blocking socket call (`connect`, `accept`,
    /// `send`/`recv` with a wait flag, `shutdown`) sits on its condvar before
    /// giving up with `Error::Timeout`.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_mss: 536,
            max_mss: 1460,
            initial_rto: Duration::from_secs(1),
            initial_window_segments: 4,
            override_timeout: Duration::from_millis(200),
            two_msl_timeout: Duration::from_secs(120),
            tx_buffer_size: 64240,
            rx_buffer_size: 64240,
            chunk_size: 2048,
            syn_queue_depth: 8,
            r2: 12,
            r2_syn: 6,
            timeout: Duration::from_secs(60),
        }
    }
}

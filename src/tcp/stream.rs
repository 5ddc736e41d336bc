use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex};

use crate::{Error, Manager};

use super::{Events, Quad, RecvFlags, SendFlags, ShutdownHow, State};

#[derive(Debug)]
pub struct TcpStream {
    manager: Arc<Mutex<Manager>>,
    quad: Quad,
    cvar: Arc<Condvar>,
    closed: bool,
}

impl TcpStream {
    pub(crate) fn new(manager: Arc<Mutex<Manager>>, quad: Quad, cvar: Arc<Condvar>) -> TcpStream {
        TcpStream {
            manager,
            quad,
            cvar,
            closed: false,
        }
    }

    /// Current RFC 9293 state of the connection, or `Closed` once the TCB has
    /// been torn down.
    pub fn state(&self) -> State {
        let manager = self.manager.lock().unwrap();
        manager
            .streams
            .get(&self.quad)
            .map(|entry| entry.tcb.state())
            .unwrap_or(State::Closed)
    }

    /// Submits `buf` for transmission, honoring [`SendFlags::wait_ack`].
    /// Blocks while the send buffer is full; returns once at least one byte
    /// has been accepted (and, if requested, once everything queued so far
    /// has been acknowledged).
    pub fn send(&mut self, buf: &[u8], flags: SendFlags) -> Result<usize, Error> {
        if self.closed {
            return Err(Error::NotConnected);
        }

        let mut manager = self.manager.lock().unwrap();
        let mut total = 0;

        while total < buf.len() {
            let timeout = manager.config.timeout;
            let quad = self.quad;
            let (guard, result) = self
                .cvar
                .wait_timeout_while(manager, timeout, |m| {
                    m.streams
                        .get(&quad)
                        .map(|e| !e.tcb.reset && e.tcb.is_outgoing_full())
                        .unwrap_or(false)
                })
                .unwrap();
            manager = guard;

            let entry = manager.streams.get(&self.quad).ok_or(Error::NotConnected)?;
            if entry.tcb.reset {
                return Err(Error::ConnectionReset);
            }
            if result.timed_out() {
                return Err(Error::Timeout);
            }

            let n = manager
                .streams
                .get_mut(&self.quad)
                .ok_or(Error::NotConnected)?
                .tcb
                .write(&buf[total..]);
            total += n;
        }

        if flags.wait_ack {
            let timeout = manager.config.timeout;
            let quad = self.quad;
            let (guard, result) = self
                .cvar
                .wait_timeout_while(manager, timeout, |m| {
                    m.streams
                        .get(&quad)
                        .map(|e| !e.tcb.reset && !e.tcb.events().contains(Events::TX_COMPLETE))
                        .unwrap_or(false)
                })
                .unwrap();
            manager = guard;

            let entry = manager.streams.get(&self.quad).ok_or(Error::NotConnected)?;
            if entry.tcb.reset {
                return Err(Error::ConnectionReset);
            }
            if result.timed_out() {
                return Err(Error::Timeout);
            }
        }

        Ok(total)
    }

    /// Reads data, honoring [`RecvFlags::wait_all`] and
    /// [`RecvFlags::break_char`]. Blocks while no data is available; returns
    /// `Ok(0)`/`Err(EndOfStream)` once the peer's FIN has been processed and
    /// everything it sent has already been delivered.
    pub fn recv(&mut self, buf: &mut [u8], flags: RecvFlags) -> Result<usize, Error> {
        let mut manager = self.manager.lock().unwrap();
        let mut total = 0;

        loop {
            let entry = manager.streams.get(&self.quad).ok_or(Error::NotConnected)?;
            if entry.tcb.reset {
                return Err(Error::ConnectionReset);
            }

            if entry.tcb.available_data_len() == 0 {
                if entry.tcb.events().contains(Events::RX_SHUTDOWN) {
                    return if total > 0 {
                        Ok(total)
                    } else {
                        Err(Error::EndOfStream)
                    };
                }

                let timeout = manager.config.timeout;
                let quad = self.quad;
                let (guard, result) = self
                    .cvar
                    .wait_timeout_while(manager, timeout, |m| {
                        m.streams
                            .get(&quad)
                            .map(|e| {
                                !e.tcb.reset
                                    && e.tcb.available_data_len() == 0
                                    && !e.tcb.events().contains(Events::RX_SHUTDOWN)
                            })
                            .unwrap_or(false)
                    })
                    .unwrap();
                manager = guard;

                if result.timed_out() {
                    let entry = manager.streams.get(&self.quad).ok_or(Error::NotConnected)?;
                    if entry.tcb.available_data_len() == 0
                        && !entry.tcb.events().contains(Events::RX_SHUTDOWN)
                    {
                        return if total > 0 {
                            Ok(total)
                        } else {
                            Err(Error::Timeout)
                        };
                    }
                }
                continue;
            }

            let before = total;
            let n = manager
                .streams
                .get_mut(&self.quad)
                .ok_or(Error::NotConnected)?
                .tcb
                .recv(&mut buf[before..]);
            total += n;

            if let Some(bc) = flags.break_char {
                if let Some(pos) = buf[before..total].iter().position(|&b| b == bc) {
                    return Ok(before + pos + 1);
                }
            }

            if !flags.wait_all || total == buf.len() {
                return Ok(total);
            }
        }
    }

    /// Shuts down one or both halves of the connection (RFC 9293 CLOSE-call
    /// semantics for `Send`; a purely local suppression of further reads for
    /// `Receive`).
    pub fn shutdown(&mut self, how: ShutdownHow) -> Result<(), Error> {
        let mut manager = self.manager.lock().unwrap();
        let entry = manager
            .streams
            .get_mut(&self.quad)
            .ok_or(Error::NotConnected)?;
        entry.tcb.shutdown(how);
        entry.cvar.notify_all();

        let wanted = match how {
            ShutdownHow::Send => Events::TX_SHUTDOWN | Events::TX_COMPLETE,
            ShutdownHow::Receive => Events::RX_SHUTDOWN,
            ShutdownHow::Both => Events::TX_SHUTDOWN | Events::TX_COMPLETE | Events::RX_SHUTDOWN,
        };

        let timeout = manager.config.timeout;
        let quad = self.quad;
        let (guard, result) = self
            .cvar
            .wait_timeout_while(manager, timeout, |m| {
                m.streams
                    .get(&quad)
                    .map(|e| !e.tcb.reset && !e.tcb.events().contains(wanted))
                    .unwrap_or(false)
            })
            .unwrap();
        manager = guard;

        let entry = match manager.streams.get(&self.quad) {
            Some(entry) => entry,
            None => return Ok(()),
        };
        if entry.tcb.reset {
            return Err(Error::ConnectionReset);
        }
        if result.timed_out() {
            return Err(Error::Timeout);
        }
        Ok(())
    }

    /// Abortive close: the next tick sends a RST and tears the TCB down
    /// immediately, skipping the graceful FIN exchange.
    pub fn abort(&mut self) {
        let mut manager = self.manager.lock().unwrap();
        if let Some(entry) = manager.streams.get_mut(&self.quad) {
            entry.tcb.abort();
            entry.cvar.notify_all();
        }
    }

    /// Graceful close of the send half; same as `shutdown(ShutdownHow::Send)`
    /// but infallible, matching `Drop`'s best-effort teardown.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut manager = self.manager.lock().unwrap();
        if let Some(entry) = manager.streams.get_mut(&self.quad) {
            entry.tcb.close();
            entry.cvar.notify_all();
        }
    }
}

impl Read for TcpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf, RecvFlags::default()).map_err(io::Error::from)
    }
}

impl Write for TcpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf, SendFlags::default()).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        let manager = self.manager.lock().unwrap();
        let timeout = manager.config.timeout;
        let quad = self.quad;
        let (manager, result) = self
            .cvar
            .wait_timeout_while(manager, timeout, |m| {
                m.streams
                    .get(&quad)
                    .map(|e| !e.tcb.reset && !e.tcb.events().contains(Events::TX_COMPLETE))
                    .unwrap_or(false)
            })
            .unwrap();

        let entry = match manager.streams.get(&self.quad) {
            Some(entry) => entry,
            None => return Ok(()),
        };
        if entry.tcb.reset {
            return Err(io::Error::from(Error::ConnectionReset));
        }
        if result.timed_out() {
            return Err(io::Error::from(Error::Timeout));
        }
        Ok(())
    }
}

impl Drop for TcpStream {
    fn drop(&mut self) {
        self.close();
    }
}

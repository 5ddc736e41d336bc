use std::sync::{Arc, Condvar, Mutex};

use crate::{Error, Manager, StreamEntry, Tcb};

use super::stream::TcpStream;
use super::State;

#[derive(Debug)]
pub struct TcpListener {
    pub(crate) port: u16,
    pub(crate) manager: Arc<Mutex<Manager>>,
    pub(crate) cvar: Arc<Condvar>,
}

impl TcpListener {
    /// Pops one queued SYN, allocates its `Tcb` and sends the SYN+ACK, then
    /// blocks until the handshake completes. Allocation only needs memory
    /// here (there's no fallible-socket-table exhaustion to retry past, the
    /// way `tcpAccept` retries the next queued SYN when one socket can't be
    /// allocated), so a single queue item is all a call to `accept` consumes.
    pub fn accept(&self) -> Result<TcpStream, Error> {
        let mut manager = self.manager.lock().unwrap();
        let timeout = manager.config.timeout;

        let (guard, _) = self
            .cvar
            .wait_timeout_while(manager, timeout, |m| {
                m.listeners
                    .get(&self.port)
                    .map(|l| l.syn_queue.is_empty())
                    .unwrap_or(false)
            })
            .unwrap();
        manager = guard;

        let listener = manager
            .listeners
            .get_mut(&self.port)
            .ok_or(Error::PortClosed(self.port))?;
        let item = match listener.syn_queue.pop_front() {
            Some(item) => item,
            None => return Err(Error::Timeout),
        };

        let quad = item.quad;
        let iss = manager.next_iss();
        let tcb = Tcb::from_syn_queue_item(item, iss, manager.config.clone());
        let cvar = Arc::new(Condvar::new());
        manager.streams.insert(
            quad,
            StreamEntry {
                tcb,
                cvar: cvar.clone(),
            },
        );

        let timeout = manager.config.timeout;
        let (guard, result) = cvar
            .wait_timeout_while(manager, timeout, |m| {
                m.streams
                    .get(&quad)
                    .map(|e| !e.tcb.reset && e.tcb.state() != State::Estab)
                    .unwrap_or(false)
            })
            .unwrap();
        manager = guard;

        let estab = match manager.streams.get(&quad) {
            Some(entry) => {
                if entry.tcb.reset {
                    manager.streams.remove(&quad);
                    return Err(Error::ConnectionFailed);
                }
                entry.tcb.state() == State::Estab
            }
            None => return Err(Error::ConnectionFailed),
        };
        if !estab {
            if result.timed_out() {
                manager.streams.remove(&quad);
                return Err(Error::Timeout);
            }
            return Err(Error::ConnectionFailed);
        }

        Ok(TcpStream::new(self.manager.clone(), quad, cvar))
    }
}

impl Drop for TcpListener {
    fn drop(&mut self) {
        let mut manager = self.manager.lock().unwrap();
        manager.listeners.remove(&self.port);
        manager.bound_ports.remove(&self.port);
    }
}

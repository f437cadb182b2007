//! The engine: the single-threaded, cooperative event loop the spec's
//! concurrency model (§5) calls for. One `Engine::poll` call advances
//! every connection's TIME-WAIT timer, drains whatever the injected
//! `Transport` has waiting, demultiplexes each datagram through the
//! `ConnectionTable` (exact 4-tuple match preferred over listener
//! match, spec §3), and dispatches it to the matched connection's
//! current `State`. There are no locks and no suspension points: every
//! application callback fires synchronously, in line, before `poll`
//! returns (spec §5's ordering guarantees).

use crate::bufstore::BufferStore;
use crate::config::Config;
use crate::err::Error;
use crate::iss::IssGenerator;
use crate::tcp::connection::Connection;
use crate::tcp::listener::Listener;
use crate::tcp::segment::Segment;
use crate::tcp::state::{self, Disposition, ListenVerdict, State};
use crate::tcp::table::ConnectionTable;
use crate::tcp::tcb::TCB;
use crate::tcp::transport::Transport;
use crate::tcp::{Dual, Quad};

pub struct Engine<T, I> {
    transport: T,
    iss_gen: I,
    bufstore: BufferStore,
    config: Config,
    table: ConnectionTable,
}

impl<T: Transport, I: IssGenerator> Engine<T, I> {
    pub fn new(transport: T, iss_gen: I, bufstore: BufferStore, config: Config) -> Self {
        Engine {
            transport,
            iss_gen,
            bufstore,
            config,
            table: ConnectionTable::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Exposes the injected transport directly; used by tests built
    /// against [`crate::tcp::transport::RecordingTransport`] to pipe
    /// one engine's outbound segments into another's ingress without
    /// a real network underneath (spec §8's test harness).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// `bind(port) -> Listener` (spec §6), minus the handle: the
    /// engine owns the `Listener` record and the caller addresses it
    /// by the local socket it bound.
    pub fn bind(&mut self, local: Dual) -> Result<(), Error> {
        if self.table.listeners.contains_key(&local) {
            return Err(Error::PortInUse(local.port));
        }
        self.table.listeners.insert(local, Listener::default());
        Ok(())
    }

    pub fn unbind(&mut self, local: Dual) {
        self.table.listeners.remove(&local);
    }

    pub fn set_on_accept(&mut self, local: Dual, cb: impl FnMut(Quad) + 'static) -> Result<(), Error> {
        let listener = self
            .table
            .listeners
            .get_mut(&local)
            .ok_or(Error::NoSuchConnection)?;
        listener.on_accept = Some(Box::new(cb));
        Ok(())
    }

    pub fn set_on_connect(&mut self, local: Dual, cb: impl FnMut(Quad) + 'static) -> Result<(), Error> {
        let listener = self
            .table
            .listeners
            .get_mut(&local)
            .ok_or(Error::NoSuchConnection)?;
        listener.on_connect = Some(Box::new(cb));
        Ok(())
    }

    pub fn set_on_receive(&mut self, quad: Quad, cb: impl FnMut(Quad, bool) + 'static) -> Result<(), Error> {
        self.conn_mut(quad)?.callbacks.on_receive = Some(Box::new(cb));
        Ok(())
    }

    pub fn set_on_disconnect(&mut self, quad: Quad, cb: impl FnMut(Quad, &'static str) + 'static) -> Result<(), Error> {
        self.conn_mut(quad)?.callbacks.on_disconnect = Some(Box::new(cb));
        Ok(())
    }

    pub fn set_on_error(&mut self, quad: Quad, cb: impl FnMut(Quad, Error) + 'static) -> Result<(), Error> {
        self.conn_mut(quad)?.callbacks.on_error = Some(Box::new(cb));
        Ok(())
    }

    /// `connect(remote) -> Connection` (spec §6): active open.
    pub fn connect(&mut self, local: Dual, remote: Dual) -> Result<Quad, Error> {
        use std::net::Ipv4Addr;
        if remote.addr == Ipv4Addr::UNSPECIFIED || remote.port == 0 {
            return Err(Error::NoRemote);
        }
        let quad = Quad { local, remote };
        if self.table.connections.contains_key(&quad) {
            return Err(Error::PortInUse(local.port));
        }
        let lease = self.bufstore.acquire().ok_or(Error::BufferStoreExhausted)?;
        let tcb = TCB::new(quad, self.config.buffer_capacity_bytes());
        let mut conn = Connection::new(
            tcb,
            self.config.buffer_capacity_bytes(),
            self.config.time_wait_duration(),
            lease,
        );
        let iss = self.iss_gen.generate();
        State::Closed.open(&mut conn, true, iss)?;
        self.table.connections.insert(quad, conn);
        self.transmit(quad);
        Ok(quad)
    }

    pub fn write(&mut self, quad: Quad, bytes: &[u8], push: bool) -> Result<usize, Error> {
        let conn = self.conn_mut(quad)?;
        let state = conn.state;
        let n = state.send(conn, bytes, push)?;
        self.transmit(quad);
        Ok(n)
    }

    pub fn read(&mut self, quad: Quad, dst: &mut [u8]) -> Result<usize, Error> {
        let conn = self.conn_mut(quad)?;
        let state = conn.state;
        state.receive(conn, dst)
    }

    pub fn close(&mut self, quad: Quad) -> Result<(), Error> {
        let conn = self.conn_mut(quad)?;
        let state = conn.state;
        state.close(conn)?;
        self.transmit(quad);
        if matches!(self.table.connections.get(&quad).map(|c| c.state), Some(State::Closed)) {
            self.table.connections.remove(&quad);
        }
        Ok(())
    }

    pub fn abort(&mut self, quad: Quad) -> Result<(), Error> {
        let conn = self.conn_mut(quad)?;
        let state = conn.state;
        state.abort(conn);
        self.transmit(quad);
        self.table.connections.remove(&quad);
        Ok(())
    }

    pub fn is_connected(&self, quad: Quad) -> bool {
        self.table.connections.get(&quad).map_or(false, Connection::is_connected)
    }

    pub fn is_writable(&self, quad: Quad) -> bool {
        self.table.connections.get(&quad).map_or(false, Connection::is_writable)
    }

    pub fn is_state(&self, quad: Quad, name: &str) -> bool {
        self.table.connections.get(&quad).map_or(false, |c| c.is_state(name))
    }

    pub fn active_connections(&self) -> usize {
        self.table.active_connections()
    }

    pub fn open_ports(&self) -> Vec<u16> {
        self.table.open_ports()
    }

    fn conn_mut(&mut self, quad: Quad) -> Result<&mut Connection, Error> {
        self.table.connections.get_mut(&quad).ok_or(Error::NoSuchConnection)
    }

    fn transmit(&mut self, quad: Quad) {
        if let Some(conn) = self.table.connections.get_mut(&quad) {
            for seg in conn.drain_out() {
                self.transport.send(quad, &seg);
            }
        }
    }

    /// Advances the TIME-WAIT timer sweep and drains everything the
    /// transport currently has ready. Non-blocking: returns as soon as
    /// the transport reports nothing pending.
    pub fn poll(&mut self) {
        self.expire_time_wait();
        while let Ok(Some((quad, seg))) = self.transport.try_recv() {
            self.dispatch(quad, seg);
        }
    }

    fn expire_time_wait(&mut self) {
        let expired: Vec<Quad> = self
            .table
            .connections
            .iter()
            .filter(|(_, c)| c.time_wait_expired())
            .map(|(q, _)| *q)
            .collect();
        for quad in expired {
            log::debug!("{quad:?}: TIME-WAIT expired, removing connection");
            self.table.connections.remove(&quad);
        }
    }

    fn dispatch(&mut self, quad: Quad, seg: Segment) {
        if self.table.connections.contains_key(&quad) {
            self.dispatch_to_connection(quad, seg);
            return;
        }

        if self.table.listeners.contains_key(&quad.local) {
            self.dispatch_to_listener(quad, seg);
            return;
        }

        if !seg.flags.rst {
            self.transport.send(quad, &state::reset_reply(&seg));
        }
    }

    fn dispatch_to_connection(&mut self, quad: Quad, seg: Segment) {
        let was_syn_rcvd_from_listen = {
            let conn = self.table.connections.get(&quad).unwrap();
            conn.state == State::SynRcvd && conn.prev_state == State::Listen
        };

        let disposition = {
            let conn = self.table.connections.get_mut(&quad).unwrap();
            let state = conn.state;
            state.handle(conn, &seg)
        };

        if was_syn_rcvd_from_listen {
            let became_established = self
                .table
                .connections
                .get(&quad)
                .map_or(false, |c| c.state == State::Estab);
            if became_established {
                if let Some(listener) = self.table.listeners.get_mut(&quad.local) {
                    if let Some(cb) = listener.on_connect.as_mut() {
                        cb(quad);
                    }
                }
            }
        }

        self.transmit(quad);

        if let Disposition::Closed = disposition {
            self.table.connections.remove(&quad);
        }
    }

    fn dispatch_to_listener(&mut self, quad: Quad, seg: Segment) {
        match state::listen_handle(&seg) {
            ListenVerdict::Drop => {}
            ListenVerdict::SendReset => {
                self.transport.send(quad, &state::reset_reply(&seg));
            }
            ListenVerdict::Accept => self.accept(quad, seg),
        }
    }

    fn accept(&mut self, quad: Quad, seg: Segment) {
        let Some(lease) = self.bufstore.acquire() else {
            log::warn!("{quad:?}: buffer store exhausted, dropping SYN");
            return;
        };

        let iss = self.iss_gen.generate();
        let buffer_capacity = self.config.buffer_capacity_bytes();
        let (tcb, synack) = state::accept(quad.local, quad.remote, &seg, iss, buffer_capacity);
        let mut conn = Connection::new(
            tcb,
            self.config.buffer_capacity_bytes(),
            self.config.time_wait_duration(),
            lease,
        );
        conn.state = State::SynRcvd;
        conn.prev_state = State::Listen;
        conn.enqueue(synack);

        if let Some(listener) = self.table.listeners.get_mut(&quad.local) {
            if let Some(cb) = listener.on_accept.as_mut() {
                cb(quad);
            }
        }

        self.table.connections.insert(quad, conn);
        self.transmit(quad);
    }
}

//! The connection table (spec §3): maps a 4-tuple to its `Connection`,
//! plus a separate set of listening sockets keyed on local address
//! alone. Lookup prefers an exact 4-tuple match over a listener match.

use std::collections::HashMap;

use super::listener::Listener;
use super::{Dual, Quad};
use crate::tcp::connection::Connection;

#[derive(Default)]
pub struct ConnectionTable {
    pub connections: HashMap<Quad, Connection>,
    pub listeners: HashMap<Dual, Listener>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn open_ports(&self) -> Vec<u16> {
        self.listeners.keys().map(|d| d.port).collect()
    }
}

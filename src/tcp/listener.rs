//! A bound, passively-open socket (spec §6: `bind(port) -> Listener`).
//!
//! Unlike an active `Connection` a `Listener` carries no sequence-space
//! state of its own: RFC 793's LISTEN checks (`state::listen_handle`)
//! are pure functions of the inbound segment, so there is nothing here
//! to mutate until a SYN arrives and the engine spawns a child
//! `Connection` for it (spec §4.4's note that LISTEN's SYN branch is
//! handled one layer above the state machine).

use super::Quad;

#[derive(Default)]
pub struct Listener {
    /// Fired once, at SYN arrival, before the three-way handshake
    /// completes — mirrors the grounding source's `signal_accept()`
    /// call in `Connection::Listen::handle`.
    pub on_accept: Option<Box<dyn FnMut(Quad)>>,
    /// Fired once the spawned child reaches ESTABLISHED, handing the
    /// application the quad it now reads/writes through — the spec §6
    /// `Listener.on_connect(cb)` passive-open notification.
    pub on_connect: Option<Box<dyn FnMut(Quad)>>,
}

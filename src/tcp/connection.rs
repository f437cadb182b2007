//! The connection facade (spec §4.5): owns the TCB, the two buffers,
//! the current/previous state, the callback slots, and the TIME-WAIT
//! timer handle. It is the sole mutator of the TCB — every state
//! handler in `state.rs` takes one of these by mutable reference and
//! must leave the invariants of spec §3 intact on return.

use std::time::{Duration, Instant};

use crate::bufstore::BufferLease;
use crate::err::Error;

use super::buffer::{ReceiveBuffer, SendBuffer};
use super::segment::OutSegment;
use super::state::State;
use super::tcb::TCB;
use super::Quad;

/// Application callback slots (spec §4.5, §6). Stored as boxed
/// closures rather than a trait object per connection: the engine is
/// single-threaded and callbacks never escape the `poll` call that
/// invokes them, so there is no need for `Send`/`Sync` bounds.
#[derive(Default)]
pub struct Callbacks {
    pub on_connect: Option<Box<dyn FnMut(Quad)>>,
    pub on_receive: Option<Box<dyn FnMut(Quad, bool)>>,
    pub on_disconnect: Option<Box<dyn FnMut(Quad, &'static str)>>,
    pub on_error: Option<Box<dyn FnMut(Quad, Error)>>,
}

pub struct Connection {
    pub tcb: TCB,
    pub send_buf: SendBuffer,
    pub recv_buf: ReceiveBuffer,
    pub state: State,
    /// Needed by SYN-RECEIVED's RST handling (spec §4.4 step 2) and by
    /// the engine to tell a just-accepted child from an actively
    /// opened connection when deciding whether to fire a listener's
    /// `on_connect`.
    pub prev_state: State,
    pub callbacks: Callbacks,
    /// Segments produced by the last `State::handle`/user-operation
    /// call, drained and transmitted by the engine in program order
    /// (spec §5's ordering guarantee) before the call returns.
    out_queue: Vec<OutSegment>,
    time_wait_duration: Duration,
    time_wait_deadline: Option<Instant>,
    /// Held for the connection's whole lifetime; dropped (returning
    /// its slot to the global pool) when the `Connection` itself is
    /// dropped, per spec §5's resource-conservation invariant.
    _lease: BufferLease,
}

impl Connection {
    pub fn new(tcb: TCB, buffer_capacity: usize, time_wait_duration: Duration, lease: BufferLease) -> Self {
        Connection {
            tcb,
            send_buf: SendBuffer::new(buffer_capacity),
            recv_buf: ReceiveBuffer::new(buffer_capacity),
            state: State::Closed,
            prev_state: State::Closed,
            callbacks: Callbacks::default(),
            out_queue: Vec::new(),
            time_wait_duration,
            time_wait_deadline: None,
            _lease: lease,
        }
    }

    pub fn quad(&self) -> Quad {
        self.tcb.quad
    }

    pub fn enqueue(&mut self, seg: OutSegment) {
        self.out_queue.push(seg);
    }

    /// Drains the segments accumulated by the last operation, in the
    /// order they were enqueued.
    pub fn drain_out(&mut self) -> Vec<OutSegment> {
        std::mem::take(&mut self.out_queue)
    }

    /// Pushes as much unsent data out as the peer's advertised window
    /// (spec §4.3/§4.4) currently allows, chunked to the default MSS.
    /// Called after every `write` and after every ACK that advances
    /// `SND.UNA` or updates `SND.WND`.
    pub fn pump_send_buffer(&mut self) {
        use super::segment::Flags;
        use super::tcb::DEFAULT_MSS;

        loop {
            let window = self.tcb.snd.wnd as usize;
            let in_flight = self.send_buf.unacked_len();
            let capacity = window.saturating_sub(in_flight);
            if capacity == 0 {
                break;
            }
            let chunk_max = capacity.min(DEFAULT_MSS as usize);
            let (bytes, push) = self.send_buf.peek_unsent(chunk_max);
            if bytes.is_empty() {
                break;
            }
            let seq = self.tcb.snd.nxt;
            self.send_buf.mark_sent(bytes.len());
            self.tcb.snd.nxt = self.tcb.snd.nxt.wrapping_add(bytes.len() as u32);
            let mut flags = Flags::ack();
            flags.psh = push;
            let seg = OutSegment::new(seq, self.tcb.rcv.nxt, self.tcb.rcv.wnd, flags).with_data(bytes);
            self.enqueue(seg);
        }
    }

    /// Flushes any data that fits in the current window, then queues
    /// a FIN consuming one sequence number, per the "User close"
    /// column of spec §4.4's transition table. Data left over because
    /// the window is closed is not retransmitted (spec's stated
    /// minimum-retransmission scope); the peer re-requests it as with
    /// any other unacknowledged segment.
    pub fn send_fin(&mut self) {
        self.pump_send_buffer();
        let seq = self.tcb.snd.nxt;
        self.tcb.snd.nxt = self.tcb.snd.nxt.wrapping_add(1);
        let seg = OutSegment::new(
            seq,
            self.tcb.rcv.nxt,
            self.tcb.rcv.wnd,
            super::segment::Flags::fin_ack(),
        );
        self.enqueue(seg);
    }

    /// Whether our FIN — the last sequence number we ever send — has
    /// been acknowledged. `SND.NXT` is fixed once a FIN is queued, so
    /// equality with `SND.UNA` is exactly "fully acked".
    pub fn our_fin_acked(&self) -> bool {
        self.tcb.snd.una == self.tcb.snd.nxt
    }

    pub fn enter_time_wait(&mut self) {
        self.state = State::TimeWait;
        self.time_wait_deadline = Some(Instant::now() + self.time_wait_duration);
    }

    pub fn restart_time_wait(&mut self) {
        self.time_wait_deadline = Some(Instant::now() + self.time_wait_duration);
    }

    /// `None` unless in TIME-WAIT; used by the engine's timer sweep.
    pub fn time_wait_expired(&self) -> bool {
        matches!(self.time_wait_deadline, Some(deadline) if Instant::now() >= deadline)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Estab)
    }

    /// True while the application may still call `write` (spec §8
    /// scenario 4: false the instant `close()` moves past ESTABLISHED
    /// /CLOSE-WAIT).
    pub fn is_writable(&self) -> bool {
        matches!(self.state, State::Estab | State::CloseWait)
    }

    pub fn is_state(&self, name: &str) -> bool {
        self.state.name() == name
    }

    pub fn fire_on_connect(&mut self) {
        let Connection { callbacks, tcb, .. } = self;
        if let Some(cb) = callbacks.on_connect.as_mut() {
            cb(tcb.quad);
        }
    }

    pub fn fire_on_receive(&mut self, push: bool) {
        let Connection { callbacks, tcb, .. } = self;
        if let Some(cb) = callbacks.on_receive.as_mut() {
            cb(tcb.quad, push);
        }
    }

    pub fn fire_on_disconnect(&mut self, reason: &'static str) {
        let Connection { callbacks, tcb, .. } = self;
        if let Some(cb) = callbacks.on_disconnect.as_mut() {
            cb(tcb.quad, reason);
        }
    }

    pub fn fire_on_error(&mut self, err: Error) {
        let Connection { callbacks, tcb, .. } = self;
        if let Some(cb) = callbacks.on_error.as_mut() {
            cb(tcb.quad, err);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("tcb", &self.tcb)
            .field("state", &self.state.name())
            .field("prev_state", &self.prev_state.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bufstore::BufferStore;
    use crate::tcp::{Dual, Quad};
    use std::net::Ipv4Addr;

    fn quad() -> Quad {
        Quad {
            local: Dual {
                addr: Ipv4Addr::new(10, 0, 0, 1),
                port: 80,
            },
            remote: Dual {
                addr: Ipv4Addr::new(10, 0, 0, 2),
                port: 9090,
            },
        }
    }

    fn conn() -> Connection {
        let store = BufferStore::new(4);
        let lease = store.acquire().unwrap();
        let mut tcb = TCB::new(quad(), 4096);
        tcb.select_iss(0);
        Connection::new(tcb, 4096, Duration::from_millis(10), lease)
    }

    #[test]
    fn pump_send_buffer_respects_peer_window() {
        let mut c = conn();
        c.tcb.snd.wnd = 5;
        c.send_buf.write(b"hello world", false);
        c.pump_send_buffer();
        let out = c.drain_out();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data.len(), 5);
        assert_eq!(c.send_buf.unacked_len(), 5);
    }

    #[test]
    fn pump_send_buffer_chunks_to_mss() {
        let mut c = conn();
        c.tcb.snd.wnd = u16::MAX;
        let payload = vec![7u8; 1200];
        c.send_buf.write(&payload, true);
        c.pump_send_buffer();
        let out = c.drain_out();
        assert_eq!(out.iter().map(|s| s.data.len()).sum::<usize>(), 1200);
        assert!(out.len() >= 3);
        assert!(out.last().unwrap().flags.psh);
    }

    #[test]
    fn fin_acked_once_una_reaches_nxt() {
        let mut c = conn();
        c.tcb.snd.wnd = u16::MAX;
        c.send_fin();
        assert!(!c.our_fin_acked());
        c.tcb.snd.una = c.tcb.snd.nxt;
        assert!(c.our_fin_acked());
    }

    #[test]
    fn is_writable_tracks_state() {
        let mut c = conn();
        c.state = State::Estab;
        assert!(c.is_writable());
        c.state = State::CloseWait;
        assert!(c.is_writable());
        c.state = State::FinWait1;
        assert!(!c.is_writable());
    }
}

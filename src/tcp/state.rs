//! The eleven-state automaton (RFC 793 §3.2, spec §4.4).
//!
//! `State` is a tagged variant per connection rather than one object
//! per state (spec §9's design note): it carries no data of its own,
//! so every operation takes the owning `Connection` by mutable
//! reference and the exhaustive `match` is the compiler-checked
//! guarantee that every state answers every operation. The shared
//! inbound steps below keep the grounding source's own factoring
//! (`check_seq`/`check_ack`/`process_segment`/`process_fin`/
//! `unallowed_syn_reset`/`send_reset`) since that factoring is itself
//! a generalization of RFC 793's step list, not an invention.

use super::connection::Connection;
use super::segment::{Flags, OutSegment, Segment};
use super::seq::{seq_geq, seq_gt, seq_leq, seq_lt};
use super::tcb::TCB;
use super::{Dual, Quad};
use crate::err::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    Listen,
    SynSent,
    SynRcvd,
    Estab,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
}

impl State {
    /// The name `is_state("...")` introspection matches against (spec §6).
    pub fn name(&self) -> &'static str {
        match self {
            State::Closed => "CLOSED",
            State::Listen => "LISTEN",
            State::SynSent => "SYN-SENT",
            State::SynRcvd => "SYN-RECEIVED",
            State::Estab => "ESTABLISHED",
            State::FinWait1 => "FIN-WAIT-1",
            State::FinWait2 => "FIN-WAIT-2",
            State::CloseWait => "CLOSE-WAIT",
            State::Closing => "CLOSING",
            State::LastAck => "LAST-ACK",
            State::TimeWait => "TIME-WAIT",
        }
    }

    pub fn is_synchronized(&self) -> bool {
        !matches!(self, State::Closed | State::Listen | State::SynSent)
    }
}

/// What the owning table should do with a connection after a segment
/// has been processed (spec §2, §9's resolved Open Question): retain
/// it unchanged, retain it but notify the application of a half-close,
/// or remove it from the table entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ok,
    Close,
    Closed,
}

/// Outcome of a segment arriving at a `Listen` connection. Spawning a
/// child connection needs a freshly generated ISS and a buffer lease,
/// neither of which a bare `State`/`Connection` pair carries (spec
/// §9's injected-collaborators note), so the engine performs the
/// spawn itself once this signals `Accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenVerdict {
    Drop,
    SendReset,
    Accept,
}

/// RFC 793's LISTEN-state checks: not the shared acceptability
/// pipeline below (LISTEN and SYN-SENT are the two states that table
/// excludes from it), just the three checks in order.
pub fn listen_handle(seg: &Segment) -> ListenVerdict {
    if seg.flags.rst {
        return ListenVerdict::Drop;
    }
    if seg.flags.ack {
        return ListenVerdict::SendReset;
    }
    if seg.flags.syn {
        return ListenVerdict::Accept;
    }
    ListenVerdict::Drop
}

/// Builds the spawned child's TCB and its SYN+ACK, given a freshly
/// drawn ISS (spec §4.4's "Passive open" + handshake-completion text).
pub fn accept(local: Dual, remote: Dual, seg: &Segment, iss: u32, buffer_capacity: usize) -> (TCB, OutSegment) {
    let mut tcb = TCB::new(Quad { local, remote }, buffer_capacity);
    tcb.select_iss(iss);
    tcb.rcv.nxt = seg.seq.wrapping_add(1);
    tcb.rcv.irs = seg.seq;
    tcb.snd.wnd = seg.wnd;
    let out = OutSegment::new(tcb.snd.iss, tcb.rcv.nxt, tcb.rcv.wnd, Flags::syn_ack());
    (tcb, out)
}

/// `<SEQ=SND.NXT, ACK=0, CTL=RST>`, flushing the send buffer. The
/// caller transitions to CLOSED (spec §4.4 "Reset generation").
pub fn send_reset(conn: &mut Connection) {
    conn.send_buf.clear();
    let seg = OutSegment::new(conn.tcb.snd.nxt, 0, 0, Flags::rst());
    conn.enqueue(seg);
}

/// Reset built in answer to an unacceptable or illegal inbound
/// segment, per spec §4.4's "Reset generation" second paragraph.
/// `pub(crate)`: the engine also needs it for segments that match no
/// connection and no listener at all (the true CLOSED-state case in
/// spec §3's connection table, which has no `Connection` object to
/// dispatch to).
pub(crate) fn reset_reply(seg: &Segment) -> OutSegment {
    if seg.flags.ack {
        OutSegment::new(seg.ack, 0, 0, Flags::rst())
    } else {
        OutSegment::new(0, seg.seq.wrapping_add(seg.len()), 0, Flags::rst_ack())
    }
}

fn bare_ack(conn: &Connection) -> OutSegment {
    OutSegment::new(conn.tcb.snd.nxt, conn.tcb.rcv.nxt, conn.tcb.rcv.wnd, Flags::ack())
}

/// Step 1: sequence acceptability (spec §4.4 step 1 table). Returns
/// `false` when the caller must stop processing (a corrective reply
/// has already been queued, or the segment was silently dropped).
fn check_seq(conn: &mut Connection, seg: &Segment) -> bool {
    let len = seg.len();
    let rcv_nxt = conn.tcb.rcv.nxt;
    let rcv_wnd = conn.tcb.rcv.wnd as u32;

    let acceptable = match (len, rcv_wnd) {
        (0, 0) => seg.seq == rcv_nxt,
        (0, w) if w > 0 => seq_geq(seg.seq, rcv_nxt) && seq_lt(seg.seq, rcv_nxt.wrapping_add(rcv_wnd)),
        (_, 0) => false,
        (l, w) => {
            let last = seg.seq.wrapping_add(l).wrapping_sub(1);
            let in_window =
                |x: u32| seq_geq(x, rcv_nxt) && seq_lt(x, rcv_nxt.wrapping_add(w));
            in_window(seg.seq) || in_window(last)
        }
    };

    if !acceptable {
        if !seg.flags.rst {
            let ack = bare_ack(conn);
            conn.enqueue(ack);
        }
        return false;
    }
    true
}

/// Step 2: RST check, state-dependent per spec §4.4 step 2.
/// Returns `Some(disposition)` when the connection must stop here.
fn check_rst(conn: &mut Connection, seg: &Segment) -> Option<Disposition> {
    if !seg.flags.rst {
        return None;
    }
    match conn.state {
        State::SynRcvd => match conn.prev_state {
            State::Listen => Some(Disposition::Closed),
            _ => {
                conn.fire_on_error(Error::Refused);
                conn.fire_on_disconnect("connection refused");
                Some(Disposition::Closed)
            }
        },
        State::Estab | State::FinWait1 | State::FinWait2 | State::CloseWait => {
            conn.fire_on_error(Error::PeerReset);
            conn.fire_on_disconnect("connection reset");
            Some(Disposition::Closed)
        }
        State::Closing | State::LastAck | State::TimeWait => Some(Disposition::Closed),
        _ => None,
    }
}

/// Step 3: SYN-in-window is always illegal once synchronized.
fn check_syn(conn: &mut Connection, seg: &Segment) -> Option<Disposition> {
    if !seg.flags.syn {
        return None;
    }
    send_reset(conn);
    conn.send_buf.clear();
    conn.recv_buf.clear();
    conn.fire_on_error(Error::PeerReset);
    conn.fire_on_disconnect("connection reset");
    Some(Disposition::Closed)
}

/// Step 4: ACK check and window update (spec §4.4 step 4, with both
/// REDESIGN fixes applied: CLOSE-WAIT's own `close()` goes to
/// LAST-ACK elsewhere, and the window-update predicate below uses
/// equality, not assignment).
fn process_ack(conn: &mut Connection, seg: &Segment) -> AckOutcome {
    if !seg.flags.ack {
        return AckOutcome::Drop;
    }

    if seq_gt(seg.ack, conn.tcb.snd.nxt) {
        let ack = bare_ack(conn);
        conn.enqueue(ack);
        return AckOutcome::Drop;
    }

    if seq_lt(conn.tcb.snd.una, seg.ack) || conn.tcb.snd.una == seg.ack {
        if seq_gt(seg.ack, conn.tcb.snd.una) {
            let newly_acked = seg.ack.wrapping_sub(conn.tcb.snd.una) as usize;
            conn.send_buf.advance_una(newly_acked);
            conn.tcb.snd.una = seg.ack;
        }

        if seq_lt(conn.tcb.snd.wl1, seg.seq)
            || (conn.tcb.snd.wl1 == seg.seq && seq_leq(conn.tcb.snd.wl2, seg.ack))
        {
            conn.tcb.snd.wnd = seg.wnd;
            conn.tcb.snd.wl1 = seg.seq;
            conn.tcb.snd.wl2 = seg.ack;
        }
    }

    AckOutcome::Continue
}

enum AckOutcome {
    Drop,
    Continue,
}

/// Step 6: segment text, only in data-accepting states.
fn process_segment_text(conn: &mut Connection, seg: &Segment) {
    if seg.data.is_empty() {
        return;
    }
    if !conn.recv_buf.append(&seg.data) {
        log::debug!(
            "{}: receive buffer full, dropping {} bytes without ACK",
            conn.tcb.to_string(),
            seg.data.len()
        );
        return;
    }
    conn.tcb.rcv.nxt = conn.tcb.rcv.nxt.wrapping_add(seg.data.len() as u32);
    conn.tcb.rcv.wnd = conn.recv_buf.window();
    conn.fire_on_receive(seg.flags.psh);
    let ack = bare_ack(conn);
    conn.enqueue(ack);
}

/// Step 7: FIN processing; returns the next state the enclosing
/// per-state handler should transition to.
fn process_fin(conn: &mut Connection) {
    conn.tcb.rcv.nxt = conn.tcb.rcv.nxt.wrapping_add(1);
    let ack = bare_ack(conn);
    conn.enqueue(ack);
    conn.fire_on_disconnect("connection closing");
    if !conn.recv_buf.empty() {
        conn.fire_on_receive(true);
    }
}

/// Runs the common inbound pipeline (steps 1-5) shared by
/// SYN-RECEIVED, ESTABLISHED, and the four closing states. Returns
/// `None` once a step has decided processing must stop; `Some(())`
/// when the per-state handler should continue into steps 6/7.
fn common_inbound(conn: &mut Connection, seg: &Segment) -> Option<Disposition> {
    if !check_seq(conn, seg) {
        return Some(if matches!(conn.state, State::Closed) {
            Disposition::Closed
        } else {
            Disposition::Ok
        });
    }
    if let Some(d) = check_rst(conn, seg) {
        return Some(d);
    }
    if let Some(d) = check_syn(conn, seg) {
        return Some(d);
    }
    match process_ack(conn, seg) {
        AckOutcome::Drop => Some(Disposition::Ok),
        AckOutcome::Continue => {
            // An accepted ACK may have advanced SND.UNA and/or raised
            // SND.WND (step 4 above); re-drain whatever now fits in the
            // peer's window instead of leaving it queued until the next
            // `write()` call.
            conn.pump_send_buffer();
            None
        }
    }
}

impl State {
    /// `open(conn, active)`. Only CLOSED can open; everything else
    /// fails with "connection already exists" (spec §4.4 default
    /// fallback). `iss` is only consumed for active opens; passive
    /// opens pick theirs later, per connection, once a SYN actually
    /// arrives (spec §9's injected-ISS-generator note).
    pub fn open(self, conn: &mut Connection, active: bool, iss: u32) -> Result<(), Error> {
        match self {
            State::Closed if active => {
                conn.tcb.select_iss(iss);
                let seg = OutSegment::new(conn.tcb.snd.iss, 0, conn.tcb.rcv.wnd, Flags::syn());
                conn.enqueue(seg);
                conn.state = State::SynSent;
                Ok(())
            }
            State::Closed => {
                conn.state = State::Listen;
                Ok(())
            }
            _ => Err(Error::Closing),
        }
    }

    /// `send(conn, bytes, push) -> bytes_accepted`.
    pub fn send(self, conn: &mut Connection, bytes: &[u8], push: bool) -> Result<usize, Error> {
        match self {
            State::Estab | State::CloseWait => {
                let n = conn.send_buf.write(bytes, push);
                conn.pump_send_buffer();
                Ok(n)
            }
            _ => Err(Error::Closing),
        }
    }

    /// `receive(conn, dst) -> bytes_read`. Reading is harmless in any
    /// post-handshake state (it only drains already-buffered bytes);
    /// pre-handshake states have nothing to read yet.
    pub fn receive(self, conn: &mut Connection, dst: &mut [u8]) -> Result<usize, Error> {
        match self {
            State::Closed | State::Listen | State::SynSent | State::SynRcvd => {
                Err(Error::Closing)
            }
            _ => Ok(conn.recv_buf.read(dst)),
        }
    }

    /// `close(conn)`: the per-state transition table's "User close →"
    /// column, with the CLOSE-WAIT REDESIGN fix applied (→ LAST-ACK,
    /// not CLOSING).
    pub fn close(self, conn: &mut Connection) -> Result<(), Error> {
        match self {
            State::Listen | State::SynSent => {
                conn.state = State::Closed;
                Ok(())
            }
            State::SynRcvd | State::Estab => {
                conn.send_fin();
                conn.state = State::FinWait1;
                Ok(())
            }
            State::CloseWait => {
                conn.send_fin();
                conn.state = State::LastAck;
                Ok(())
            }
            State::Closed => Err(Error::Closing),
            _ => Err(Error::Closing),
        }
    }

    /// `abort(conn)`: RST in every synchronized state, no-op in
    /// CLOSED; LISTEN has no peer to reset so it just closes (spec
    /// §4.4 default fallback: "abort is a no-op" where there is
    /// nothing to reset).
    pub fn abort(self, conn: &mut Connection) {
        match self {
            State::Closed => {}
            State::Listen => conn.state = State::Closed,
            _ => {
                send_reset(conn);
                conn.state = State::Closed;
            }
        }
    }

    /// `handle(conn, seg) -> Disposition`: the segment-arrival
    /// dispatch. LISTEN's SYN branch is handled one layer up by the
    /// engine (see `listen_handle`/`accept`), since spawning a child
    /// needs collaborators a bare `Connection` does not hold; this
    /// covers LISTEN's RST/ACK branches and every other state.
    pub fn handle(self, conn: &mut Connection, seg: &Segment) -> Disposition {
        match self {
            State::Closed => {
                if !seg.flags.rst {
                    conn.enqueue(reset_reply(seg));
                }
                Disposition::Closed
            }

            State::Listen => match listen_handle(seg) {
                ListenVerdict::Drop => Disposition::Ok,
                ListenVerdict::SendReset => {
                    conn.enqueue(reset_reply(seg));
                    Disposition::Ok
                }
                ListenVerdict::Accept => Disposition::Ok,
            },

            State::SynSent => handle_syn_sent(conn, seg),

            State::SynRcvd => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                if conn.tcb.our_syn_acked() {
                    conn.state = State::Estab;
                    conn.fire_on_connect();
                }
                finish_data_and_fin(conn, seg)
            }

            State::Estab => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                finish_data_and_fin(conn, seg)
            }

            State::FinWait1 => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                process_segment_text(conn, seg);
                if seg.flags.fin {
                    process_fin(conn);
                    if conn.our_fin_acked() {
                        conn.enter_time_wait();
                    } else {
                        conn.state = State::Closing;
                    }
                    Disposition::Close
                } else if conn.our_fin_acked() {
                    conn.state = State::FinWait2;
                    Disposition::Ok
                } else {
                    Disposition::Ok
                }
            }

            State::FinWait2 => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                process_segment_text(conn, seg);
                if seg.flags.fin {
                    process_fin(conn);
                    conn.enter_time_wait();
                    Disposition::Close
                } else {
                    Disposition::Ok
                }
            }

            State::CloseWait => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                Disposition::Ok
            }

            State::Closing => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                if conn.our_fin_acked() {
                    conn.enter_time_wait();
                }
                Disposition::Ok
            }

            State::LastAck => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                if conn.our_fin_acked() {
                    return Disposition::Closed;
                }
                Disposition::Ok
            }

            State::TimeWait => {
                if let Some(d) = common_inbound(conn, seg) {
                    return d;
                }
                if seg.flags.fin {
                    let ack = bare_ack(conn);
                    conn.enqueue(ack);
                    conn.restart_time_wait();
                }
                Disposition::Ok
            }
        }
    }
}

/// SYN-SENT has its own handshake logic (spec §4.4 "Handshake
/// completion in SYN-SENT"), outside the common pipeline.
fn handle_syn_sent(conn: &mut Connection, seg: &Segment) -> Disposition {
    if seg.flags.rst {
        if seg.flags.ack {
            conn.fire_on_error(Error::Refused);
            conn.fire_on_disconnect("connection refused");
            return Disposition::Closed;
        }
        return Disposition::Ok;
    }

    if !seg.flags.syn {
        return Disposition::Ok;
    }

    if seg.flags.ack && (seq_lt(seg.ack, conn.tcb.snd.iss) || seq_gt(seg.ack, conn.tcb.snd.nxt)) {
        conn.enqueue(reset_reply(seg));
        return Disposition::Ok;
    }

    conn.tcb.rcv.nxt = seg.seq.wrapping_add(1);
    conn.tcb.rcv.irs = seg.seq;
    conn.tcb.snd.wnd = seg.wnd;
    conn.tcb.snd.wl1 = seg.seq;
    if seg.flags.ack {
        conn.tcb.snd.una = seg.ack;
        conn.tcb.snd.wl2 = seg.ack;
    }

    if conn.tcb.our_syn_acked() {
        conn.state = State::Estab;
        let out = OutSegment::new(conn.tcb.snd.nxt, conn.tcb.rcv.nxt, conn.tcb.rcv.wnd, Flags::ack());
        conn.enqueue(out);
        conn.fire_on_connect();
    } else {
        conn.state = State::SynRcvd;
        let out = OutSegment::new(
            conn.tcb.snd.iss,
            conn.tcb.rcv.nxt,
            conn.tcb.rcv.wnd,
            Flags::syn_ack(),
        );
        conn.enqueue(out);
    }
    Disposition::Ok
}

/// Steps 6 and 7 for SYN-RECEIVED/ESTABLISHED: segment text, then a
/// FIN (if present) takes the connection straight to CLOSE-WAIT (spec
/// §4.4's transition table; the closing states have their own FIN
/// handling inline, since each lands somewhere different).
fn finish_data_and_fin(conn: &mut Connection, seg: &Segment) -> Disposition {
    process_segment_text(conn, seg);
    if seg.flags.fin {
        process_fin(conn);
        conn.state = State::CloseWait;
        return Disposition::Close;
    }
    Disposition::Ok
}

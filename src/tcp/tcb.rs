//! The Transmission Control Block: the per-connection sequence-space
//! record (RFC 793 §3.2).

use super::seq::{seq_leq, seq_lt};
use super::Quad;

/// RFC 793 §3.2 Figure 3: the send sequence space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendSpace {
    /// oldest unacknowledged sequence number
    pub una: u32,
    /// next sequence number to send
    pub nxt: u32,
    /// peer-advertised send window
    pub wnd: u16,
    /// sequence number of the segment that last updated the window
    pub wl1: u32,
    /// ack number of the segment that last updated the window
    pub wl2: u32,
    /// our initial send sequence number
    pub iss: u32,
}

/// RFC 793 §3.2 Figure 4: the receive sequence space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvSpace {
    /// next sequence number expected
    pub nxt: u32,
    /// our advertised receive window
    pub wnd: u16,
    /// peer's initial send sequence number
    pub irs: u32,
}

/// Default receive/send window and MSS, absent an MSS option negotiated
/// on the SYN. RFC 793's default MSS when none is announced.
pub const DEFAULT_MSS: u16 = 536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TCB {
    pub quad: Quad,
    pub snd: SendSpace,
    pub rcv: RecvSpace,
}

impl TCB {
    /// A TCB with no initial sequence number chosen yet (pre-LISTEN/pre-SYN-SENT).
    /// `buffer_capacity` is the connection's configured receive-buffer size
    /// (`Config::buffer_capacity_bytes`); `RCV.WND` starts there, clamped to
    /// what a 16-bit window field can express, the same clamp
    /// `ReceiveBuffer::window` applies as bytes are consumed.
    pub fn new(quad: Quad, buffer_capacity: usize) -> Self {
        TCB {
            quad,
            snd: SendSpace {
                una: 0,
                nxt: 0,
                wnd: 0,
                wl1: 0,
                wl2: 0,
                iss: 0,
            },
            rcv: RecvSpace {
                nxt: 0,
                wnd: buffer_capacity.min(u16::MAX as usize) as u16,
                irs: 0,
            },
        }
    }

    /// Called on an active or passive open once an ISS has been chosen:
    /// `SND.UNA <- ISS`, `SND.NXT <- ISS + 1`.
    pub fn select_iss(&mut self, iss: u32) {
        self.snd.iss = iss;
        self.snd.una = iss;
        self.snd.nxt = iss.wrapping_add(1);
    }

    /// Reinitialize a TCB's sequence-space fields; used when a `Connection`
    /// slot is reused rather than reallocated.
    pub fn reset(&mut self, buffer_capacity: usize) {
        self.snd = SendSpace {
            una: 0,
            nxt: 0,
            wnd: 0,
            wl1: 0,
            wl2: 0,
            iss: 0,
        };
        self.rcv = RecvSpace {
            nxt: 0,
            wnd: buffer_capacity.min(u16::MAX as usize) as u16,
            irs: 0,
        };
    }

    /// `SND.UNA <= SND.NXT`, required after every transition (spec §3).
    pub fn send_invariant_holds(&self) -> bool {
        seq_leq(self.snd.una, self.snd.nxt)
    }

    /// `ISS < SND.UNA`: our SYN has been acknowledged. Only meaningful
    /// once past SYN-SENT/SYN-RECEIVED.
    pub fn our_syn_acked(&self) -> bool {
        seq_lt(self.snd.iss, self.snd.una)
    }

    pub fn to_string(&self) -> String {
        format!(
            "TCB{{quad={:?} SND.UNA={} SND.NXT={} SND.WND={} SND.WL1={} SND.WL2={} ISS={} \
             RCV.NXT={} RCV.WND={} IRS={}}}",
            self.quad,
            self.snd.una,
            self.snd.nxt,
            self.snd.wnd,
            self.snd.wl1,
            self.snd.wl2,
            self.snd.iss,
            self.rcv.nxt,
            self.rcv.wnd,
            self.rcv.irs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn select_iss_sets_una_and_nxt() {
        let mut tcb = TCB::new(quad(), DEFAULT_MSS as usize * 10);
        tcb.select_iss(42);
        assert_eq!(tcb.snd.una, 42);
        assert_eq!(tcb.snd.nxt, 43);
        assert!(tcb.send_invariant_holds());
    }

    #[test]
    fn our_syn_acked_only_after_una_advances_past_iss() {
        let mut tcb = TCB::new(quad(), DEFAULT_MSS as usize * 10);
        tcb.select_iss(100);
        assert!(!tcb.our_syn_acked());
        tcb.snd.una = 101;
        assert!(tcb.our_syn_acked());
    }

    #[test]
    fn new_clamps_rcv_wnd_to_u16_max() {
        let tcb = TCB::new(quad(), 200_000);
        assert_eq!(tcb.rcv.wnd, u16::MAX);
    }

    #[test]
    fn reset_clears_sequence_state() {
        let mut tcb = TCB::new(quad(), DEFAULT_MSS as usize * 10);
        tcb.select_iss(7);
        tcb.rcv.nxt = 55;
        tcb.reset(DEFAULT_MSS as usize * 10);
        assert_eq!(tcb.snd.iss, 0);
        assert_eq!(tcb.rcv.nxt, 0);
    }
}

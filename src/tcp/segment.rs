//! The wire-independent view of a TCP segment that the state machine
//! actually works with (spec §3/§6). Decoding from and encoding to
//! `etherparse` header types happens at the transport boundary
//! (`tcp::transport`), never inside a state handler.

use etherparse::TcpHeaderSlice;

/// The six RFC 793 control bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

impl Flags {
    pub const fn syn() -> Self {
        Flags {
            syn: true,
            ..EMPTY
        }
    }
    pub const fn syn_ack() -> Self {
        Flags {
            syn: true,
            ack: true,
            ..EMPTY
        }
    }
    pub const fn ack() -> Self {
        Flags { ack: true, ..EMPTY }
    }
    pub const fn fin_ack() -> Self {
        Flags {
            fin: true,
            ack: true,
            ..EMPTY
        }
    }
    pub const fn rst() -> Self {
        Flags { rst: true, ..EMPTY }
    }
    pub const fn rst_ack() -> Self {
        Flags {
            rst: true,
            ack: true,
            ..EMPTY
        }
    }
}

const EMPTY: Flags = Flags {
    urg: false,
    ack: false,
    psh: false,
    rst: false,
    syn: false,
    fin: false,
};

/// An inbound segment, decoded once at the ingress boundary.
#[derive(Debug, Clone)]
pub struct Segment {
    pub seq: u32,
    pub ack: u32,
    pub wnd: u16,
    pub flags: Flags,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn from_wire(tcph: &TcpHeaderSlice<'_>, data: &[u8]) -> Self {
        Segment {
            seq: tcph.sequence_number(),
            ack: tcph.acknowledgment_number(),
            wnd: tcph.window_size(),
            flags: Flags {
                urg: tcph.urg(),
                ack: tcph.ack(),
                psh: tcph.psh(),
                rst: tcph.rst(),
                syn: tcph.syn(),
                fin: tcph.fin(),
            },
            data: data.to_vec(),
        }
    }

    /// SEG.LEN: data octets plus one each for SYN and FIN, per the
    /// acceptability-test table in spec §4.4.
    pub fn len(&self) -> u32 {
        self.data.len() as u32 + self.flags.syn as u32 + self.flags.fin as u32
    }
}

/// An outbound segment prototype. The `Connection` facade fills in the
/// local/remote socket pair and hands this to the transport for wire
/// encoding (spec §4.5, §6).
#[derive(Debug, Clone)]
pub struct OutSegment {
    pub seq: u32,
    pub ack: u32,
    pub wnd: u16,
    pub flags: Flags,
    pub data: Vec<u8>,
}

impl OutSegment {
    pub fn new(seq: u32, ack: u32, wnd: u16, flags: Flags) -> Self {
        OutSegment {
            seq,
            ack,
            wnd,
            flags,
            data: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_len_counts_syn_and_fin() {
        let mut seg = Segment {
            seq: 0,
            ack: 0,
            wnd: 0,
            flags: Flags::default(),
            data: vec![1, 2, 3],
        };
        assert_eq!(seg.len(), 3);
        seg.flags.syn = true;
        assert_eq!(seg.len(), 4);
        seg.flags.fin = true;
        assert_eq!(seg.len(), 5);
    }
}

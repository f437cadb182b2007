//! The network-layer collaborator the core is deliberately decoupled
//! from (spec §1: "IP/Ethernet framing... are external collaborators").
//!
//! `Transport` is the seam: production code drives a TUN device
//! (`TunTransport`), tests drive an in-memory queue
//! (`RecordingTransport`), and the state machine never sees either —
//! it only ever produces `OutSegment`s and consumes `Segment`s.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::Ipv4Addr;
use std::os::fd::AsRawFd;

use etherparse::{Ipv4Header, Ipv4HeaderSlice, TcpHeader, TcpHeaderSlice};
use nix::poll::{poll, PollFd, PollFlags};
use tidy_tuntap::Tun;

use super::segment::{OutSegment, Segment};
use super::{Dual, Quad};

/// Injected at `Engine` construction, per the design note on global
/// singletons (spec §9): the core never reaches for a device, a clock,
/// or a socket table on its own.
pub trait Transport {
    fn send(&mut self, quad: Quad, seg: &OutSegment);

    /// Non-blocking: `Ok(None)` if nothing is waiting.
    fn try_recv(&mut self) -> io::Result<Option<(Quad, Segment)>>;
}

/// Default IPv4 TTL for frames this engine originates.
const TTL: u8 = 64;
const TCP_PROTOCOL: u8 = 6;

pub struct TunTransport {
    tun: Tun,
    local_addr: Ipv4Addr,
}

impl TunTransport {
    pub fn new(name: &str, local_addr: Ipv4Addr, netmask: Ipv4Addr) -> io::Result<Self> {
        let tun = Tun::new(name, false).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        tun.set_addr(local_addr)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        tun.set_netmask(netmask)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        tun.bring_up()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(TunTransport { tun, local_addr })
    }
}

impl Transport for TunTransport {
    fn send(&mut self, quad: Quad, seg: &OutSegment) {
        let mut tcph = TcpHeader::new(quad.local.port, quad.remote.port, seg.seq, seg.wnd);
        tcph.ack = seg.flags.ack;
        tcph.acknowledgment_number = seg.ack;
        tcph.rst = seg.flags.rst;
        tcph.syn = seg.flags.syn;
        tcph.fin = seg.flags.fin;
        tcph.psh = seg.flags.psh;
        tcph.urg = seg.flags.urg;

        let ip4h = Ipv4Header::new(
            tcph.header_len() + seg.data.len() as u16,
            TTL,
            TCP_PROTOCOL,
            quad.local.addr.octets(),
            quad.remote.addr.octets(),
        );
        tcph.checksum = tcph
            .calc_checksum_ipv4(&ip4h, &seg.data)
            .expect("tcp checksum over a well-formed ipv4 pseudo-header");

        let mut out = Vec::with_capacity(ip4h.header_len() + tcph.header_len() as usize + seg.data.len());
        ip4h.write(&mut out).expect("write to Vec never fails");
        tcph.write(&mut out).expect("write to Vec never fails");
        out.extend_from_slice(&seg.data);

        if let Err(e) = self.tun.write(&out) {
            log::warn!("tun write failed: {e}");
        }
    }

    fn try_recv(&mut self) -> io::Result<Option<(Quad, Segment)>> {
        let mut pfd = [PollFd::new(self.tun.as_raw_fd(), PollFlags::POLLIN)];
        if poll(&mut pfd[..], 0).map_err(|e| io::Error::new(io::ErrorKind::Other, e))? == 0 {
            return Ok(None);
        }

        let mut buf = [0u8; 1500];
        let n = self.tun.read(&mut buf)?;

        let Ok(ip4h) = Ipv4HeaderSlice::from_slice(&buf[..n]) else {
            return Ok(None);
        };
        let ip_header_len = (ip4h.ihl() * 4) as usize;
        let Ok(tcph) = TcpHeaderSlice::from_slice(&buf[ip_header_len..n]) else {
            return Ok(None);
        };
        let data_offset = ip_header_len + (tcph.data_offset() * 4) as usize;
        let data = &buf[data_offset..n];

        let quad = Quad {
            local: Dual {
                addr: ip4h.destination_addr(),
                port: tcph.destination_port(),
            },
            remote: Dual {
                addr: ip4h.source_addr(),
                port: tcph.source_port(),
            },
        };
        debug_assert_eq!(quad.local.addr, self.local_addr);

        Ok(Some((quad, Segment::from_wire(&tcph, data))))
    }
}

/// An in-memory transport for tests: segments pushed with `inject` are
/// handed back out through `try_recv` in FIFO order, and everything
/// sent through `send` is captured for assertions (`PetrichorIT-inet`'s
/// `tcp2::tests` harness pipes two connections together the same way,
/// just with a richer packet type).
#[derive(Debug, Default)]
pub struct RecordingTransport {
    inbound: VecDeque<(Quad, Segment)>,
    pub outbound: Vec<(Quad, OutSegment)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, quad: Quad, seg: Segment) {
        self.inbound.push_back((quad, seg));
    }

    pub fn drain_outbound(&mut self) -> Vec<(Quad, OutSegment)> {
        std::mem::take(&mut self.outbound)
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, quad: Quad, seg: &OutSegment) {
        self.outbound.push((quad, seg.clone()));
    }

    fn try_recv(&mut self) -> io::Result<Option<(Quad, Segment)>> {
        Ok(self.inbound.pop_front())
    }
}

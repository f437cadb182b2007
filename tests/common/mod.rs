//! Test harness piping two in-process engines together over
//! `RecordingTransport`, in the style of the `PetrichorIT-inet`
//! `tcp2::tests` helper (`TcpTestUnit::pipe`): no real socket or
//! kernel TCP stack underneath, just each side's outbound segments
//! handed directly to the other's ingress.

use std::net::Ipv4Addr;
use std::time::Duration;

use tcp_engine::tcp::segment::Segment;
use tcp_engine::tcp::transport::RecordingTransport;
use tcp_engine::{BufferStore, Config, Dual, Engine, Quad, SequentialIssGenerator};

pub type TestEngine = Engine<RecordingTransport, SequentialIssGenerator>;

/// A MSL short enough that a test can wait out 2*MSL with a real
/// `thread::sleep` instead of mocking the clock.
pub const TEST_MSL: Duration = Duration::from_millis(5);

pub fn addr(last_octet: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last_octet)
}

pub fn engine(iss_seed: u32, buffer_limit: usize) -> TestEngine {
    let mut cfg = Config::new();
    cfg.set_buffer_limit(buffer_limit);
    cfg.set_msl(TEST_MSL);
    Engine::new(
        RecordingTransport::new(),
        SequentialIssGenerator::starting_at(iss_seed),
        BufferStore::new(16),
        cfg,
    )
}

/// One round: let both engines process whatever is already queued,
/// then ship each side's fresh outbound segments to the other's
/// ingress queue. Returns whether anything moved, so callers can loop
/// until quiescent.
pub fn tick(a: &mut TestEngine, b: &mut TestEngine) -> bool {
    a.poll();
    b.poll();

    let from_a = a.transport_mut().drain_outbound();
    let from_b = b.transport_mut().drain_outbound();
    let progressed = !from_a.is_empty() || !from_b.is_empty();

    for (quad, seg) in from_a {
        b.transport_mut().inject(flip(quad), to_inbound(seg));
    }
    for (quad, seg) in from_b {
        a.transport_mut().inject(flip(quad), to_inbound(seg));
    }

    progressed
}

/// Runs `tick` until neither side has anything left to deliver, or a
/// generous round budget is exhausted (a stuck test should fail loudly
/// rather than hang).
pub fn run_to_quiescence(a: &mut TestEngine, b: &mut TestEngine) {
    for _ in 0..10_000 {
        if !tick(a, b) {
            return;
        }
    }
    panic!("engines did not quiesce within the round budget");
}

fn flip(quad: Quad) -> Quad {
    Quad {
        local: quad.remote,
        remote: quad.local,
    }
}

fn to_inbound(seg: tcp_engine::tcp::segment::OutSegment) -> Segment {
    Segment {
        seq: seg.seq,
        ack: seg.ack,
        wnd: seg.wnd,
        flags: seg.flags,
        data: seg.data,
    }
}

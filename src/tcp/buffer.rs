//! Send and receive buffers (spec §4.3): bounded, byte-oriented,
//! never blocking.

use std::collections::VecDeque;

/// Bytes the application has queued for transmission, indexed from
/// `SND.UNA`. The prefix `[0, sent)` has been handed to the wire and is
/// awaiting acknowledgment; `[sent, len)` is still unsent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendBuffer {
    data: VecDeque<u8>,
    sent: usize,
    /// Absolute index (from the front of `data`) of the last byte
    /// written with `push = true`, if any byte sent since then hasn't
    /// yet carried it out on the wire.
    push_mark: Option<usize>,
    capacity: usize,
}

impl SendBuffer {
    pub fn new(capacity: usize) -> Self {
        SendBuffer {
            data: VecDeque::with_capacity(capacity),
            sent: 0,
            push_mark: None,
            capacity,
        }
    }

    /// Enqueues as many of `bytes` as capacity allows and returns the
    /// count actually accepted. Never blocks; a short write means the
    /// caller must retry later (the application learns capacity freed
    /// up again via the connection's write-ready callback).
    pub fn write(&mut self, bytes: &[u8], push: bool) -> usize {
        let room = self.capacity.saturating_sub(self.data.len());
        let n = room.min(bytes.len());
        self.data.extend(&bytes[..n]);
        if push && n > 0 {
            self.push_mark = Some(self.data.len() - 1);
        }
        n
    }

    /// Copies up to `max` unsent bytes out without consuming them (they
    /// remain pending acknowledgment once `mark_sent` is called), along
    /// with whether the chunk should carry PSH.
    pub fn peek_unsent(&self, max: usize) -> (Vec<u8>, bool) {
        let avail = self.data.len() - self.sent;
        let take = max.min(avail);
        let out: Vec<u8> = self
            .data
            .iter()
            .skip(self.sent)
            .take(take)
            .copied()
            .collect();
        let push = matches!(self.push_mark, Some(mark) if mark < self.sent + take);
        (out, push)
    }

    /// Records that `n` more unsent bytes have just been put on the wire.
    pub fn mark_sent(&mut self, n: usize) {
        self.sent += n;
        if matches!(self.push_mark, Some(mark) if mark < self.sent) {
            self.push_mark = None;
        }
    }

    /// Discards the prefix that has now been acknowledged. `acked` is a
    /// byte count (the caller converts `SEG.ACK - SND.UNA` before
    /// calling), not an absolute sequence number.
    pub fn advance_una(&mut self, acked: usize) {
        let acked = acked.min(self.data.len());
        self.data.drain(..acked);
        self.sent = self.sent.saturating_sub(acked);
        self.push_mark = self.push_mark.map(|m| m.saturating_sub(acked));
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.sent = 0;
        self.push_mark = None;
    }

    pub fn unsent_len(&self) -> usize {
        self.data.len() - self.sent
    }

    pub fn unacked_len(&self) -> usize {
        self.sent
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }
}

/// Bytes received in order and not yet read by the application.
/// Out-of-order segments are never appended here (spec §9): the
/// connection keeps no reassembly queue, so the peer is relied on to
/// retransmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveBuffer {
    data: VecDeque<u8>,
    capacity: usize,
}

impl ReceiveBuffer {
    pub fn new(capacity: usize) -> Self {
        ReceiveBuffer {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends in-order bytes. Returns `false` (and appends nothing) if
    /// they would not all fit; the caller must not acknowledge them in
    /// that case so the peer retransmits.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.capacity - self.data.len() {
            return false;
        }
        self.data.extend(bytes);
        true
    }

    /// Copies up to `dst.len()` bytes out, removing them from the
    /// buffer, and returns the count copied.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.data.len());
        for slot in dst.iter_mut().take(n) {
            *slot = self.data.pop_front().unwrap();
        }
        n
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Remaining room, advertised to the peer as `RCV.WND`.
    pub fn window(&self) -> u16 {
        (self.capacity - self.data.len()).min(u16::MAX as usize) as u16
    }
}

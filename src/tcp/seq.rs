//! 32-bit sequence-space arithmetic (RFC 793 §3.3).
//!
//! Sequence numbers wrap modulo 2^32. Ordering between two sequence
//! numbers is defined by the sign of their difference interpreted as a
//! signed 32-bit quantity, not by plain unsigned comparison.

/// `a < b` in sequence-space order: `(b - a) mod 2^32` lies in `[1, 2^31)`.
pub fn seq_lt(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// `a <= b` in sequence-space order.
pub fn seq_leq(a: u32, b: u32) -> bool {
    a == b || seq_lt(a, b)
}

/// `a > b` in sequence-space order.
pub fn seq_gt(a: u32, b: u32) -> bool {
    seq_lt(b, a)
}

/// `a >= b` in sequence-space order.
pub fn seq_geq(a: u32, b: u32) -> bool {
    seq_leq(b, a)
}

/// `left <= x < left + wnd`, computed in wrapping sequence space.
///
/// `wnd == 0` is never satisfied: an empty window admits nothing.
pub fn seq_in_window(x: u32, left: u32, wnd: u32) -> bool {
    if wnd == 0 {
        return false;
    }
    x.wrapping_sub(left) < wnd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lt_handles_wraparound() {
        assert!(seq_lt(0xFFFF_FFFF, 0));
        assert!(!seq_lt(0, 0xFFFF_FFFF));
        assert!(seq_lt(10, 20));
        assert!(!seq_lt(20, 10));
        assert!(!seq_lt(5, 5));
    }

    #[test]
    fn leq_is_reflexive() {
        for x in [0u32, 1, u32::MAX / 2, u32::MAX] {
            assert!(seq_leq(x, x));
        }
    }

    #[test]
    fn gt_geq_are_the_mirror_of_lt_leq() {
        let pairs = [(10u32, 20u32), (20, 10), (0, 0xFFFF_FFFF), (5, 5)];
        for (a, b) in pairs {
            assert_eq!(seq_gt(a, b), seq_lt(b, a));
            assert_eq!(seq_geq(a, b), seq_leq(b, a));
        }
    }

    #[test]
    fn window_membership_basic() {
        assert!(seq_in_window(100, 100, 10));
        assert!(seq_in_window(109, 100, 10));
        assert!(!seq_in_window(110, 100, 10));
        assert!(!seq_in_window(99, 100, 10));
    }

    #[test]
    fn window_membership_zero_window_rejects_everything() {
        for x in [0u32, 1, 100, u32::MAX] {
            assert!(!seq_in_window(x, 100, 0));
        }
    }

    #[test]
    fn window_membership_wraps_across_zero() {
        let left = u32::MAX - 4;
        assert!(seq_in_window(u32::MAX, left, 10));
        assert!(seq_in_window(4, left, 10));
        assert!(!seq_in_window(5, left, 10));
    }

    #[test]
    fn ordering_is_transitive_over_a_local_neighbourhood() {
        // Exhaustively check a window of values around wraparound: no naive
        // unsigned comparison would pass this, only the signed-difference test.
        let base = u32::MAX - 50;
        for i in 0..100u32 {
            let a = base.wrapping_add(i);
            let b = base.wrapping_add(i + 1);
            assert!(seq_lt(a, b), "{a} should precede {b}");
        }
    }
}

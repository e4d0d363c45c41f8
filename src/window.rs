//! Sliding-window send-side state machine.
//!
//! [`Window`] owns everything the transfer loop needs to decide what to
//! (re)transmit: the window bounds, per-fragment send timers, and (in SACK
//! mode) per-fragment acknowledged flags.  It performs no I/O — the caller
//! sends the bytes and feeds back timestamps and ack events.
//!
//! # Protocol contract
//!
//! - At most `window_size` fragments may be in flight at once: eligibility is
//!   `base ≤ i < min(base + window_size, len)`.
//! - ACKs are **cumulative**: boundary `v` means every fragment with index
//!   `< v` has been received.  `base` jumps straight to `v` (the jump-to-value
//!   policy; it subsumes advance-by-one and is required for SACK correctness).
//! - On timeout at index `i` the sender goes back to N: `next` is reset to `i`
//!   and everything from `i` onward is resent — except fragments already
//!   marked acknowledged in SACK mode, which are skipped even on resend.
//! - Only the **first** expired timer fires per poll pass.  This is a
//!   deliberate cap: one restart point per loop iteration bounds the size of
//!   a retransmission burst.
//!
//! # Index layout
//!
//! ```text
//!      base               next
//!       │                  │
//!   ────┼──────────────────┼──────────────────▶ fragment index
//!       │ <── in flight ──▶│ <── sendable ───▶│
//!       └──── at most window_size wide ───────┘
//! ```

use std::time::{Duration, Instant};

use crate::ack::AckEvent;

/// Default number of fragments allowed in flight simultaneously.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Acknowledgement interpretation mode for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Plain cumulative ACKs; out-of-order information is unavailable, so
    /// go-back-N resends every in-range fragment.
    Cumulative,
    /// Selective ACKs; fragments reported in the out-of-order set are never
    /// resent while they stay inside the window.
    Selective,
}

/// What applying an ack event did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// `base` advanced (possibly past several fragments at once).
    Advanced,
    /// Duplicate or stale ack (`boundary < base`); no state change.
    Stale,
    /// Boundary beyond the fragment count; dropped as a protocol violation.
    OutOfRange,
}

/// Send-side sliding window over a fixed fragment sequence.
#[derive(Debug)]
pub struct Window {
    /// Index of the oldest unacknowledged fragment (left window edge).
    /// Monotonically non-decreasing.
    base: usize,

    /// Index of the next fragment not yet sent in the current pass.
    /// Reset backwards only by [`on_timeout`](Self::on_timeout).
    next: usize,

    /// Total number of fragments in the transfer (fixed at construction).
    len: usize,

    /// Maximum number of fragments in flight (N).
    window_size: usize,

    /// Retransmission timeout applied per fragment.
    timeout: Duration,

    mode: AckMode,

    /// Last-send timestamp per fragment; `None` until first transmission.
    last_sent: Vec<Option<Instant>>,

    /// Sticky acknowledged flag per fragment.  Only consulted in
    /// [`AckMode::Selective`]; never reset once set.
    acked: Vec<bool>,
}

impl Window {
    /// Create a window over `len` fragments.
    ///
    /// # Panics
    ///
    /// Panics if `len` or `window_size` is zero.
    pub fn new(len: usize, window_size: usize, timeout: Duration, mode: AckMode) -> Self {
        assert!(len >= 1, "fragment sequence must be non-empty");
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            base: 0,
            next: 0,
            len,
            window_size,
            timeout,
            mode,
            last_sent: vec![None; len],
            acked: vec![false; len],
        }
    }

    /// Index of the oldest unacknowledged fragment.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Index of the next fragment to send in the current pass.
    pub fn next(&self) -> usize {
        self.next
    }

    /// `true` once every fragment has been acknowledged (`base == len`).
    pub fn is_complete(&self) -> bool {
        self.base == self.len
    }

    /// Exclusive upper bound of the send-eligible range.
    fn send_limit(&self) -> usize {
        (self.base + self.window_size).min(self.len)
    }

    /// Pop the next index the caller should transmit, advancing `next`.
    ///
    /// Returns `None` when the window is exhausted for this pass.  In SACK
    /// mode, indices already marked acknowledged are stepped over without
    /// being returned.  The caller must transmit the fragment and then call
    /// [`record_sent`](Self::record_sent).
    pub fn next_eligible(&mut self) -> Option<usize> {
        while self.next < self.send_limit() {
            let i = self.next;
            self.next += 1;
            if self.mode == AckMode::Selective && self.acked[i] {
                continue;
            }
            return Some(i);
        }
        None
    }

    /// Record that fragment `i` was transmitted at `now`, (re)arming its timer.
    pub fn record_sent(&mut self, i: usize, now: Instant) {
        self.last_sent[i] = Some(now);
    }

    /// Find the first expired fragment in `[base, next)`, ascending.
    ///
    /// At most one index is returned per call — the caller handles it via
    /// [`on_timeout`](Self::on_timeout) and moves on.  Fragments marked
    /// acknowledged (SACK mode) and fragments never sent are skipped.
    pub fn first_expired(&self, now: Instant) -> Option<usize> {
        (self.base..self.next).find(|&i| {
            if self.mode == AckMode::Selective && self.acked[i] {
                return false;
            }
            self.last_sent[i]
                .is_some_and(|sent| now.duration_since(sent) >= self.timeout)
        })
    }

    /// Go back to N: re-enter the "not yet sent" state from index `i` onward.
    ///
    /// The next send pass retransmits from `i`, skipping acknowledged
    /// fragments in SACK mode.
    pub fn on_timeout(&mut self, i: usize) {
        debug_assert!(i >= self.base && i < self.next, "timeout outside window");
        log::debug!("[window] timeout at seq={i}; next {} -> {i}", self.next);
        self.next = i;
    }

    /// Apply an interpreted acknowledgement to the window state.
    ///
    /// Both variants advance `base` under the jump-to-value rule; the
    /// selective variant additionally marks `boundary - 1` and every index in
    /// the out-of-order set as acknowledged.  Stale and out-of-range
    /// boundaries leave the window untouched.
    pub fn apply(&mut self, event: &AckEvent) -> AckOutcome {
        match event {
            AckEvent::Cumulative(v) => self.advance_base(*v),
            AckEvent::Selective { boundary, seen } => {
                if *boundary > self.len as u64 {
                    return AckOutcome::OutOfRange;
                }
                // The boundary is "next expected": one past the highest
                // contiguous acknowledged index.
                if *boundary >= 1 {
                    self.acked[(boundary - 1) as usize] = true;
                }
                for &e in seen {
                    // Out-of-range extras are a protocol violation; ignore
                    // them individually rather than discarding the boundary.
                    if (e as usize) < self.len {
                        self.acked[e as usize] = true;
                    } else {
                        log::debug!("[window] ignoring out-of-range sack index {e}");
                    }
                }
                self.advance_base(*boundary)
            }
        }
    }

    fn advance_base(&mut self, v: u64) -> AckOutcome {
        if v > self.len as u64 {
            log::debug!("[window] ignoring ack boundary {v} > len {}", self.len);
            return AckOutcome::OutOfRange;
        }
        let v = v as usize;
        if v < self.base {
            return AckOutcome::Stale;
        }
        if v == self.base {
            // `v == base` carries no new information; treat as stale.
            return AckOutcome::Stale;
        }
        log::debug!("[window] base {} -> {v}", self.base);
        self.base = v;
        // Keep `next` monotone relative to the new base.
        self.next = self.next.max(self.base);
        AckOutcome::Advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(500);

    fn window(len: usize, mode: AckMode) -> Window {
        Window::new(len, DEFAULT_WINDOW_SIZE, TIMEOUT, mode)
    }

    /// Drain the current send pass, recording sends at `now`.
    fn send_pass(w: &mut Window, now: Instant) -> Vec<usize> {
        let mut sent = Vec::new();
        while let Some(i) = w.next_eligible() {
            w.record_sent(i, now);
            sent.push(i);
        }
        sent
    }

    #[test]
    fn initial_send_pass_fills_window() {
        let mut w = window(10, AckMode::Cumulative);
        let sent = send_pass(&mut w, Instant::now());
        assert_eq!(sent, vec![0, 1, 2, 3, 4]);
        assert_eq!(w.base(), 0);
        assert_eq!(w.next(), 5);
    }

    #[test]
    fn short_transfer_is_bounded_by_len() {
        let mut w = window(3, AckMode::Cumulative);
        let sent = send_pass(&mut w, Instant::now());
        assert_eq!(sent, vec![0, 1, 2]);
        assert_eq!(w.next(), 3);
    }

    #[test]
    fn never_more_than_window_size_in_flight() {
        let mut w = window(20, AckMode::Cumulative);
        let now = Instant::now();
        send_pass(&mut w, now);
        assert_eq!(w.next() - w.base(), DEFAULT_WINDOW_SIZE);

        w.apply(&AckEvent::Cumulative(2));
        send_pass(&mut w, now);
        assert_eq!(w.next() - w.base(), DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn ack_jumps_base_to_value() {
        let mut w = window(10, AckMode::Cumulative);
        send_pass(&mut w, Instant::now());

        assert_eq!(w.apply(&AckEvent::Cumulative(4)), AckOutcome::Advanced);
        assert_eq!(w.base(), 4);
    }

    #[test]
    fn stale_ack_leaves_base_unchanged() {
        let mut w = window(10, AckMode::Cumulative);
        send_pass(&mut w, Instant::now());
        w.apply(&AckEvent::Cumulative(4));

        assert_eq!(w.apply(&AckEvent::Cumulative(2)), AckOutcome::Stale);
        assert_eq!(w.apply(&AckEvent::Cumulative(4)), AckOutcome::Stale);
        assert_eq!(w.base(), 4);
    }

    #[test]
    fn ack_beyond_len_is_rejected() {
        let mut w = window(5, AckMode::Cumulative);
        send_pass(&mut w, Instant::now());

        assert_eq!(w.apply(&AckEvent::Cumulative(99)), AckOutcome::OutOfRange);
        assert_eq!(w.base(), 0);
    }

    #[test]
    fn completion_at_base_equals_len() {
        let mut w = window(5, AckMode::Cumulative);
        send_pass(&mut w, Instant::now());
        assert!(!w.is_complete());

        w.apply(&AckEvent::Cumulative(5));
        assert!(w.is_complete());
    }

    #[test]
    fn no_timeout_before_deadline() {
        let mut w = window(5, AckMode::Cumulative);
        let t0 = Instant::now();
        send_pass(&mut w, t0);

        assert_eq!(w.first_expired(t0 + TIMEOUT / 2), None);
    }

    #[test]
    fn first_expired_reports_lowest_index_only() {
        let mut w = window(5, AckMode::Cumulative);
        let t0 = Instant::now();
        send_pass(&mut w, t0);

        // Everything expired, but only the lowest index is reported.
        assert_eq!(w.first_expired(t0 + TIMEOUT * 2), Some(0));
    }

    #[test]
    fn timeout_resets_next_for_go_back_n() {
        let mut w = window(10, AckMode::Cumulative);
        let t0 = Instant::now();
        send_pass(&mut w, t0); // sent 0..5

        w.apply(&AckEvent::Cumulative(2)); // base=2
        let expired = w.first_expired(t0 + TIMEOUT * 2).unwrap();
        assert_eq!(expired, 2);

        w.on_timeout(expired);
        // Resend pass covers 2..7 (base advanced, window slid).
        let resent = send_pass(&mut w, t0 + TIMEOUT * 2);
        assert_eq!(resent, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn resend_refreshes_timers() {
        let mut w = window(5, AckMode::Cumulative);
        let t0 = Instant::now();
        send_pass(&mut w, t0);

        let late = t0 + TIMEOUT * 2;
        w.on_timeout(w.first_expired(late).unwrap());
        send_pass(&mut w, late);

        // Timers were refreshed at `late`; nothing has expired again yet.
        assert_eq!(w.first_expired(late + TIMEOUT / 2), None);
        assert_eq!(w.first_expired(late + TIMEOUT), Some(0));
    }

    #[test]
    fn selective_marks_boundary_and_extras() {
        let mut w = window(5, AckMode::Selective);
        let t0 = Instant::now();
        send_pass(&mut w, t0);

        // Receiver has 0, 1 (boundary 2) plus out-of-order 3 and 4.
        let outcome = w.apply(&AckEvent::Selective {
            boundary: 2,
            seen: vec![3, 4],
        });
        assert_eq!(outcome, AckOutcome::Advanced);
        assert_eq!(w.base(), 2);

        // Timeout on 2 goes back, but the resend pass skips 3 and 4.
        w.on_timeout(w.first_expired(t0 + TIMEOUT * 2).unwrap());
        let resent = send_pass(&mut w, t0 + TIMEOUT * 2);
        assert_eq!(resent, vec![2]);
    }

    #[test]
    fn selective_skips_acked_even_when_window_slides() {
        let mut w = window(10, AckMode::Selective);
        let t0 = Instant::now();
        send_pass(&mut w, t0); // 0..5

        w.apply(&AckEvent::Selective {
            boundary: 1,
            seen: vec![3],
        });
        // base=1, window now 1..6; fresh index 5 becomes eligible.
        let sent = send_pass(&mut w, t0);
        assert_eq!(sent, vec![5]);

        // Go back to 1: resend 1, 2, 4 — 3 stays skipped.
        w.on_timeout(1);
        let resent = send_pass(&mut w, t0 + TIMEOUT * 2);
        assert_eq!(resent, vec![1, 2, 4, 5]);
    }

    #[test]
    fn selective_acked_fragment_never_expires() {
        let mut w = window(5, AckMode::Selective);
        let t0 = Instant::now();
        send_pass(&mut w, t0);

        w.apply(&AckEvent::Selective {
            boundary: 1,
            seen: vec![1, 2, 3, 4],
        });
        // base=1 but every remaining in-flight fragment is acked.
        assert_eq!(w.first_expired(t0 + TIMEOUT * 10), None);
    }

    #[test]
    fn selective_out_of_range_extra_is_ignored() {
        let mut w = window(5, AckMode::Selective);
        send_pass(&mut w, Instant::now());

        let outcome = w.apply(&AckEvent::Selective {
            boundary: 1,
            seen: vec![99],
        });
        assert_eq!(outcome, AckOutcome::Advanced);
        assert_eq!(w.base(), 1);
    }

    #[test]
    fn cumulative_mode_ignores_acked_flags_on_resend() {
        // In cumulative mode the receiver gives no out-of-order information,
        // so go-back-N must resend everything in range.
        let mut w = window(5, AckMode::Cumulative);
        let t0 = Instant::now();
        send_pass(&mut w, t0);

        w.on_timeout(0);
        let resent = send_pass(&mut w, t0 + TIMEOUT * 2);
        assert_eq!(resent, vec![0, 1, 2, 3, 4]);
    }
}

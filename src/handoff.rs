//! Single-slot report handoff between the scan loop and the USB interrupt.
//!
//! The scan loop is the only producer and the start-of-frame handler the
//! only consumer. Both sides go through a blocking mutex, so the report
//! bytes and the `ready` flag always change together: with
//! `CriticalSectionRawMutex` on a single core the consumer can never see a
//! half-written report.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::hid::KeyboardReport;

/// What `try_publish` does with a changed report while the previous one has
/// not been consumed yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PendingPolicy {
    /// Refuse the new report. The scanner recomputes the full report every
    /// cycle, so the change is published on the first cycle after the
    /// pending report goes out.
    #[default]
    RetryNextCycle,
    /// Replace the pending report. The host only ever sees the newest state.
    Overwrite,
}

#[derive(Clone, Copy)]
struct SlotState {
    /// Last accepted report. Meaningful to the consumer only while `ready`.
    report: KeyboardReport,
    ready: bool,
}

/// Single-capacity, non-blocking report channel.
pub struct ReportSlot<M: RawMutex> {
    policy: PendingPolicy,
    state: Mutex<M, Cell<SlotState>>,
}

impl<M: RawMutex> ReportSlot<M> {
    pub const fn new(policy: PendingPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(Cell::new(SlotState {
                report: KeyboardReport::empty(),
                ready: false,
            })),
        }
    }

    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    /// Offer a candidate report.
    ///
    /// Returns `true` when the slot took the report and flagged it ready.
    /// A report equal to the slot's content is always refused, so an
    /// unchanged key state never generates traffic.
    pub fn try_publish(&self, candidate: &KeyboardReport) -> bool {
        let accepted = self.state.lock(|cell| {
            let mut state = cell.get();
            if state.report == *candidate {
                return false;
            }
            if state.ready && self.policy == PendingPolicy::RetryNextCycle {
                return false;
            }
            state.report = *candidate;
            state.ready = true;
            cell.set(state);
            true
        });
        if !accepted {
            trace!("handoff: publish refused");
        }
        accepted
    }

    /// Take the pending report, if any, and mark the slot free.
    pub fn try_consume(&self) -> Option<KeyboardReport> {
        self.state.lock(|cell| {
            let mut state = cell.get();
            if !state.ready {
                return None;
            }
            state.ready = false;
            cell.set(state);
            Some(state.report)
        })
    }

    /// Whether a published report is still waiting for the consumer.
    pub fn is_pending(&self) -> bool {
        self.state.lock(|cell| cell.get().ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keycode::usage;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Slot = ReportSlot<CriticalSectionRawMutex>;

    fn report_with(keys: &[crate::hid::Keycode]) -> KeyboardReport {
        let mut report = KeyboardReport::empty();
        for &k in keys {
            report.press(k);
        }
        report
    }

    #[test]
    fn empty_slot_has_nothing_to_consume() {
        let slot = Slot::new(PendingPolicy::RetryNextCycle);
        assert!(!slot.is_pending());
        assert_eq!(slot.try_consume(), None);
    }

    #[test]
    fn initial_empty_report_is_not_published() {
        // The slot starts out holding the all-released report.
        let slot = Slot::new(PendingPolicy::RetryNextCycle);
        assert!(!slot.try_publish(&KeyboardReport::empty()));
        assert!(!slot.is_pending());
    }

    #[test]
    fn publish_then_consume() {
        let slot = Slot::new(PendingPolicy::RetryNextCycle);
        let a = report_with(&[usage::A]);

        assert!(slot.try_publish(&a));
        assert!(slot.is_pending());
        assert_eq!(slot.try_consume(), Some(a));
        assert!(!slot.is_pending());
        assert_eq!(slot.try_consume(), None);
    }

    #[test]
    fn identical_report_is_suppressed_repeatedly() {
        for policy in [PendingPolicy::RetryNextCycle, PendingPolicy::Overwrite] {
            let slot = Slot::new(policy);
            let a = report_with(&[usage::A]);
            assert!(slot.try_publish(&a));
            for _ in 0..100 {
                assert!(!slot.try_publish(&a));
            }
            assert_eq!(slot.try_consume(), Some(a));

            // Still suppressed after the consumer drained it.
            for _ in 0..100 {
                assert!(!slot.try_publish(&a));
            }
            assert_eq!(slot.try_consume(), None);
        }
    }

    #[test]
    fn retry_policy_refuses_while_pending() {
        let slot = Slot::new(PendingPolicy::RetryNextCycle);
        let a = report_with(&[usage::A]);
        let ab = report_with(&[usage::A, usage::B]);

        assert!(slot.try_publish(&a));
        assert!(!slot.try_publish(&ab));
        assert_eq!(slot.try_consume(), Some(a));

        // The next scan cycle offers the same state again and gets through.
        assert!(slot.try_publish(&ab));
        assert_eq!(slot.try_consume(), Some(ab));
    }

    #[test]
    fn overwrite_policy_replaces_pending() {
        let slot = Slot::new(PendingPolicy::Overwrite);
        let a = report_with(&[usage::A]);
        let ab = report_with(&[usage::A, usage::B]);

        assert!(slot.try_publish(&a));
        assert!(slot.try_publish(&ab));
        assert_eq!(slot.try_consume(), Some(ab));
        assert_eq!(slot.try_consume(), None);
    }

    #[test]
    fn overwrite_back_to_sent_state_is_published() {
        // A -> consumed, then B pending, then back to A before the frame.
        let slot = Slot::new(PendingPolicy::Overwrite);
        let a = report_with(&[usage::A]);
        let b = report_with(&[usage::B]);

        assert!(slot.try_publish(&a));
        assert_eq!(slot.try_consume(), Some(a));
        assert!(slot.try_publish(&b));
        assert!(slot.try_publish(&a));
        assert_eq!(slot.try_consume(), Some(a));
    }

    #[test]
    fn retry_policy_converges_on_final_state() {
        // Producer changes state every cycle, consumer drains every other
        // cycle. Once the keys stop moving the consumer sees the final state.
        let slot = Slot::new(PendingPolicy::RetryNextCycle);
        let states = [
            report_with(&[usage::A]),
            report_with(&[usage::A, usage::S]),
            report_with(&[usage::S]),
            report_with(&[]),
            report_with(&[usage::LEFT_SHIFT, usage::D]),
        ];

        let mut last_seen = KeyboardReport::empty();
        for (cycle, state) in states.iter().enumerate() {
            slot.try_publish(state);
            if cycle % 2 == 1 {
                if let Some(r) = slot.try_consume() {
                    last_seen = r;
                }
            }
        }
        let last = states[states.len() - 1];
        for _ in 0..3 {
            slot.try_publish(&last);
            if let Some(r) = slot.try_consume() {
                last_seen = r;
            }
        }
        assert_eq!(last_seen, last);
    }

    #[test]
    fn consumer_never_sees_torn_report() {
        // Every report published is either all-zero or has both halves set;
        // a torn copy would show one half without the other.
        let slot = Slot::new(PendingPolicy::Overwrite);
        let full = report_with(&[usage::LEFT_CTRL, usage::Q, usage::F12]);

        for i in 0..64 {
            let candidate = if i % 2 == 0 {
                full
            } else {
                KeyboardReport::empty()
            };
            slot.try_publish(&candidate);
            if let Some(r) = slot.try_consume() {
                assert!(r == full || r.is_empty());
            }
        }
    }

    #[test]
    fn default_policy_is_retry() {
        assert_eq!(PendingPolicy::default(), PendingPolicy::RetryNextCycle);
        assert_eq!(crate::config::PENDING_POLICY, PendingPolicy::RetryNextCycle);
    }
}

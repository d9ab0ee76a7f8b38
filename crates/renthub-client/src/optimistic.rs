//! Optimistic state for a toggle control (like, favorite, public).
//!
//! The control flips the instant it is pressed and only the server
//! response settles it: success confirms, failure rolls back to the last
//! confirmed value. Pressing again while a request is in flight
//! supersedes the pending value — last write wins, and whatever the
//! server eventually replies is the truth.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// Showing a server-confirmed value.
    Idle,
    /// Showing a value the server has not confirmed yet.
    Pending,
}

#[derive(Debug, Clone)]
pub struct OptimisticToggle {
    value: bool,
    count: i64,
    /// Confirmed (value, count) snapshot, present while a press is
    /// unsettled. Taken once at the first press so that stacked presses
    /// still roll back to confirmed state.
    confirmed: Option<(bool, i64)>,
}

impl OptimisticToggle {
    pub fn new(value: bool, count: i64) -> Self {
        Self {
            value,
            count,
            confirmed: None,
        }
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// The optimistic like count shown next to the control.
    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn state(&self) -> ToggleState {
        if self.confirmed.is_some() {
            ToggleState::Pending
        } else {
            ToggleState::Idle
        }
    }

    /// Flip immediately and return the new displayed value.
    pub fn press(&mut self) -> bool {
        if self.confirmed.is_none() {
            self.confirmed = Some((self.value, self.count));
        }
        self.value = !self.value;
        self.count += if self.value { 1 } else { -1 };
        self.value
    }

    /// Settle on what the server said; it is the sole authority.
    pub fn settle(&mut self, value: bool, count: i64) {
        self.value = value;
        self.count = count;
        self.confirmed = None;
    }

    /// Revert to the last confirmed state. No-op when idle.
    pub fn rollback(&mut self) {
        if let Some((value, count)) = self.confirmed.take() {
            self.value = value;
            self.count = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_flips_immediately_and_goes_pending() {
        let mut toggle = OptimisticToggle::new(false, 3);
        assert_eq!(toggle.state(), ToggleState::Idle);

        assert!(toggle.press());
        assert_eq!(toggle.state(), ToggleState::Pending);
        assert!(toggle.value());
        assert_eq!(toggle.count(), 4);
    }

    #[test]
    fn settle_confirms_the_server_truth() {
        let mut toggle = OptimisticToggle::new(false, 3);
        toggle.press();
        // Server saw another user's like land in between.
        toggle.settle(true, 5);

        assert_eq!(toggle.state(), ToggleState::Idle);
        assert!(toggle.value());
        assert_eq!(toggle.count(), 5);
    }

    #[test]
    fn rollback_restores_the_confirmed_state() {
        let mut toggle = OptimisticToggle::new(true, 7);
        toggle.press();
        assert!(!toggle.value());
        assert_eq!(toggle.count(), 6);

        toggle.rollback();
        assert_eq!(toggle.state(), ToggleState::Idle);
        assert!(toggle.value());
        assert_eq!(toggle.count(), 7);
    }

    #[test]
    fn second_press_supersedes_but_keeps_the_snapshot() {
        let mut toggle = OptimisticToggle::new(false, 3);
        toggle.press();
        toggle.press();

        // Back to the confirmed value, still pending.
        assert!(!toggle.value());
        assert_eq!(toggle.count(), 3);
        assert_eq!(toggle.state(), ToggleState::Pending);

        // Rolling back from here changes nothing visible.
        toggle.rollback();
        assert!(!toggle.value());
        assert_eq!(toggle.count(), 3);
        assert_eq!(toggle.state(), ToggleState::Idle);
    }

    #[test]
    fn rollback_when_idle_is_a_no_op() {
        let mut toggle = OptimisticToggle::new(true, 1);
        toggle.rollback();
        assert!(toggle.value());
        assert_eq!(toggle.count(), 1);
    }
}

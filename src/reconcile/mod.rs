// src/reconcile/mod.rs

//! Desired-state reconciliation.
//!
//! Every stateful capability goes through the same shape:
//! establish preconditions, read, compare, mutate at most once, verify.
//! Toggling is just reconciling to the opposite of what was read.

use crate::driver::{BlurType, CaptureMode, Facing, WindowState};
use crate::error::CapabilityError;
use std::fmt;
use std::time::Duration;

/// Result of reading live state.
#[derive(Clone, Debug, PartialEq)]
pub enum Reading<S> {
    Known(S),
    Unknown(String),
}

/// States with exactly two values.
pub trait Binary: Copy {
    fn other(self) -> Self;
}

/// ON/OFF state of a switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl From<bool> for Switch {
    fn from(on: bool) -> Self {
        if on { Switch::On } else { Switch::Off }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Switch::On => f.write_str("ON"),
            Switch::Off => f.write_str("OFF"),
        }
    }
}

impl Binary for Switch {
    fn other(self) -> Self {
        match self {
            Switch::On => Switch::Off,
            Switch::Off => Switch::On,
        }
    }
}

impl Binary for WindowState {
    fn other(self) -> Self {
        match self {
            WindowState::Normal => WindowState::Minimized,
            WindowState::Minimized => WindowState::Normal,
        }
    }
}

impl Binary for CaptureMode {
    fn other(self) -> Self {
        match self {
            CaptureMode::Photo => CaptureMode::Video,
            CaptureMode::Video => CaptureMode::Photo,
        }
    }
}

impl Binary for Facing {
    fn other(self) -> Self {
        match self {
            Facing::Front => Facing::Rear,
            Facing::Rear => Facing::Front,
        }
    }
}

impl Binary for BlurType {
    fn other(self) -> Self {
        match self {
            BlurType::Standard => BlurType::Portrait,
            BlurType::Portrait => BlurType::Standard,
        }
    }
}

/// A piece of external state that can be driven to a desired value.
pub trait Reconcile {
    type State: Copy + PartialEq + fmt::Display;

    /// Human-readable name, e.g. "Background effects".
    fn subject(&self) -> &str;

    /// Make sure the state can be read and mutated at all.
    fn prepare(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Read the live state. Must not change it.
    fn read_state(&self) -> Reading<Self::State>;

    /// Issue exactly one mutating action meant to move `current` to `desired`.
    fn mutate(&self, current: Self::State, desired: Self::State) -> Result<(), CapabilityError>;

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How long to wait for a mutation to show up in a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settle {
    pub budget: Duration,
    pub interval: Duration,
}

impl Settle {
    pub const IMMEDIATE: Settle = Settle {
        budget: Duration::ZERO,
        interval: Duration::ZERO,
    };

    pub fn new(budget: Duration, interval: Duration) -> Self {
        Self { budget, interval }
    }

    /// Re-reads allowed after the first post-mutation read.
    pub fn retries(&self) -> u32 {
        if self.interval.is_zero() {
            return 0;
        }
        (self.budget.as_nanos() / self.interval.as_nanos()).min(u32::MAX as u128) as u32
    }
}

impl Default for Settle {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), Duration::from_millis(250))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome<S> {
    /// Already in the desired state; nothing was mutated.
    Unchanged(S),
    Changed { from: S, to: S },
}

impl<S: fmt::Display> Outcome<S> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed { .. })
    }

    pub fn describe(&self, subject: &str) -> String {
        match self {
            Outcome::Unchanged(state) => format!("{subject} already in desired state ({state})."),
            Outcome::Changed { to, .. } => format!("{subject} set to {to} successfully."),
        }
    }
}

/// Drive `target` to `desired`.
pub fn reconcile<R: Reconcile>(
    target: &R,
    desired: R::State,
    settle: Settle,
) -> Result<Outcome<R::State>, CapabilityError> {
    target.prepare()?;
    converge(target, desired, settle)
}

/// Drive `target` to the opposite of its current state.
pub fn toggle<R>(target: &R, settle: Settle) -> Result<Outcome<R::State>, CapabilityError>
where
    R: Reconcile,
    R::State: Binary,
{
    target.prepare()?;
    let current = read_known(target)?;
    converge(target, current.other(), settle)
}

/// Reconcile as a precondition of something else; any failure becomes a
/// `Precondition` error naming the target.
pub fn require<R: Reconcile>(target: &R, desired: R::State, settle: Settle) -> Result<(), CapabilityError> {
    reconcile(target, desired, settle).map(|_| ()).map_err(|err| match err {
        CapabilityError::Precondition(_) => err,
        other => CapabilityError::Precondition(format!(
            "could not set {} to {}: {}",
            target.subject(),
            desired,
            other
        )),
    })
}

fn read_known<R: Reconcile>(target: &R) -> Result<R::State, CapabilityError> {
    match target.read_state() {
        Reading::Known(state) => Ok(state),
        Reading::Unknown(reason) => {
            tracing::warn!(subject = target.subject(), %reason, "state unknown, refusing to mutate");
            Err(CapabilityError::StateUnknown(format!("{} ({reason})", target.subject())))
        }
    }
}

fn converge<R: Reconcile>(
    target: &R,
    desired: R::State,
    settle: Settle,
) -> Result<Outcome<R::State>, CapabilityError> {
    let current = read_known(target)?;
    if current == desired {
        tracing::debug!(subject = target.subject(), state = %current, "already in desired state");
        return Ok(Outcome::Unchanged(current));
    }

    tracing::info!(subject = target.subject(), from = %current, to = %desired, "mutating");
    target.mutate(current, desired)?;

    let mut observed = target.read_state();
    let mut retries = settle.retries();
    while observed != Reading::Known(desired) && retries > 0 {
        target.pause(settle.interval);
        observed = target.read_state();
        retries -= 1;
    }

    match observed {
        Reading::Known(state) if state == desired => Ok(Outcome::Changed {
            from: current,
            to: desired,
        }),
        Reading::Known(state) => Err(CapabilityError::Reconciliation {
            control: target.subject().to_string(),
            desired: desired.to_string(),
            observed: state.to_string(),
        }),
        Reading::Unknown(reason) => Err(CapabilityError::Reconciliation {
            control: target.subject().to_string(),
            desired: desired.to_string(),
            observed: format!("unknown ({reason})"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// A switch whose mutations land after `lag` extra reads.
    struct FakeSwitch {
        state: Cell<Option<Switch>>,
        pending: Cell<Option<(Switch, u32)>>,
        lag: u32,
        sticks: bool,
        mutations: Cell<u32>,
        pauses: RefCell<Vec<Duration>>,
        ready: bool,
    }

    impl FakeSwitch {
        fn new(state: Option<Switch>) -> Self {
            Self {
                state: Cell::new(state),
                pending: Cell::new(None),
                lag: 0,
                sticks: false,
                mutations: Cell::new(0),
                pauses: RefCell::new(Vec::new()),
                ready: true,
            }
        }
    }

    impl Reconcile for FakeSwitch {
        type State = Switch;

        fn subject(&self) -> &str {
            "Fake switch"
        }

        fn prepare(&self) -> Result<(), CapabilityError> {
            if self.ready {
                Ok(())
            } else {
                Err(CapabilityError::Precondition("panel closed".into()))
            }
        }

        fn read_state(&self) -> Reading<Switch> {
            if let Some((target, remaining)) = self.pending.get() {
                if remaining == 0 {
                    self.state.set(Some(target));
                    self.pending.set(None);
                } else {
                    self.pending.set(Some((target, remaining - 1)));
                }
            }
            match self.state.get() {
                Some(s) => Reading::Known(s),
                None => Reading::Unknown("toggle state unreadable".into()),
            }
        }

        fn mutate(&self, _current: Switch, desired: Switch) -> Result<(), CapabilityError> {
            self.mutations.set(self.mutations.get() + 1);
            if !self.sticks {
                self.pending.set(Some((desired, self.lag)));
            }
            Ok(())
        }

        fn pause(&self, duration: Duration) {
            self.pauses.borrow_mut().push(duration);
        }
    }

    #[test]
    fn matching_state_is_left_alone() {
        let switch = FakeSwitch::new(Some(Switch::On));
        let outcome = reconcile(&switch, Switch::On, Settle::IMMEDIATE).unwrap();
        assert_eq!(outcome, Outcome::Unchanged(Switch::On));
        assert_eq!(switch.mutations.get(), 0);
        assert_eq!(
            outcome.describe("Fake switch"),
            "Fake switch already in desired state (ON)."
        );
    }

    #[test]
    fn second_call_is_idempotent() {
        let switch = FakeSwitch::new(Some(Switch::Off));
        assert!(reconcile(&switch, Switch::On, Settle::IMMEDIATE).unwrap().is_changed());
        assert!(!reconcile(&switch, Switch::On, Settle::IMMEDIATE).unwrap().is_changed());
        assert_eq!(switch.mutations.get(), 1);
        assert_eq!(switch.read_state(), Reading::Known(Switch::On));
    }

    #[test]
    fn unknown_state_refuses_to_mutate() {
        let switch = FakeSwitch::new(None);
        let err = reconcile(&switch, Switch::On, Settle::IMMEDIATE).unwrap_err();
        assert!(matches!(err, CapabilityError::StateUnknown(_)));
        assert_eq!(switch.mutations.get(), 0);
    }

    #[test]
    fn failed_precondition_aborts_before_reading() {
        let mut switch = FakeSwitch::new(Some(Switch::Off));
        switch.ready = false;
        let err = reconcile(&switch, Switch::On, Settle::IMMEDIATE).unwrap_err();
        assert!(matches!(err, CapabilityError::Precondition(_)));
        assert_eq!(switch.mutations.get(), 0);
    }

    #[test]
    fn stuck_control_reports_reconciliation_failure() {
        let mut switch = FakeSwitch::new(Some(Switch::Off));
        switch.sticks = true;
        let err = reconcile(&switch, Switch::On, Settle::IMMEDIATE).unwrap_err();
        assert_eq!(
            err,
            CapabilityError::Reconciliation {
                control: "Fake switch".into(),
                desired: "ON".into(),
                observed: "OFF".into(),
            }
        );
        assert_eq!(switch.mutations.get(), 1);
    }

    #[test]
    fn slow_control_converges_within_budget() {
        let mut switch = FakeSwitch::new(Some(Switch::Off));
        switch.lag = 2;
        let settle = Settle::new(Duration::from_millis(1000), Duration::from_millis(250));
        let outcome = reconcile(&switch, Switch::On, settle).unwrap();
        assert!(outcome.is_changed());
        assert_eq!(switch.pauses.borrow().len(), 2);
    }

    #[test]
    fn slow_control_times_out_when_budget_is_short() {
        let mut switch = FakeSwitch::new(Some(Switch::Off));
        switch.lag = 5;
        let settle = Settle::new(Duration::from_millis(500), Duration::from_millis(250));
        let err = reconcile(&switch, Switch::On, settle).unwrap_err();
        assert!(matches!(err, CapabilityError::Reconciliation { .. }));
        assert_eq!(switch.pauses.borrow().len(), 2);
    }

    #[test]
    fn toggle_flips_the_state_it_reads() {
        let switch = FakeSwitch::new(Some(Switch::On));
        let outcome = toggle(&switch, Settle::IMMEDIATE).unwrap();
        assert_eq!(
            outcome,
            Outcome::Changed {
                from: Switch::On,
                to: Switch::Off
            }
        );
    }

    #[test]
    fn require_wraps_failures_as_precondition() {
        let switch = FakeSwitch::new(None);
        let err = require(&switch, Switch::On, Settle::IMMEDIATE).unwrap_err();
        assert!(
            matches!(err, CapabilityError::Precondition(msg) if msg.contains("Fake switch"))
        );
    }

    #[test]
    fn retries_follow_budget() {
        assert_eq!(Settle::IMMEDIATE.retries(), 0);
        assert_eq!(Settle::default().retries(), 8);
    }
}

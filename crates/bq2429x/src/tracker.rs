//! Charger state tracker.
//!
//! Pure state machine over successive [`RegisterSnapshot`]s. A detection
//! pass is split in three steps so a bus failure halfway through leaves the
//! tracker untouched:
//!
//! 1. [`ChargerTracker::plan`] decides transitions and register updates
//! 2. the caller executes the updates
//! 3. [`ChargerTracker::commit`] records the new state
//!
//! VBUS edge rules:
//!
//! - a CHRG_FAULT that is new since the last pass, while input was present,
//!   counts as a (momentary) disconnect; a latched fault does not repeat it
//! - PG_STAT is then re-evaluated; rising edge programs the USB input limit
//!   and, with a battery, switches to "charge battery"; falling edge only
//!   reports

use platform::SupplyEvent;

use crate::codec::{encode_input_current_limit, IinlimSetting};
use crate::config::ChargerConfig;
use crate::registers::{ChargeFault, ChargeMode, RegisterSnapshot};

/// Maximum transitions in one pass (fault-induced removal + re-attach)
pub const MAX_TRANSITIONS: usize = 2;

/// Maximum register updates in one pass
pub const MAX_ACTIONS: usize = 2;

/// Register update requested by a detection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Program EN_HIZ + IINLIM
    SetInputCurrentLimit(IinlimSetting),
    /// Program CHG_CONFIG
    SetChargeMode(ChargeMode),
}

/// Outcome of [`ChargerTracker::plan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionPlan {
    /// Snapshot the plan was made from
    pub snapshot: RegisterSnapshot,
    /// Snapshot differs from the previously reported one
    pub changed: bool,
    /// VBUS presence after the pass
    pub input_present: bool,
    /// Supply transitions, in order
    pub transitions: heapless::Vec<SupplyEvent, MAX_TRANSITIONS>,
    /// Register updates to execute, in order
    pub actions: heapless::Vec<Action, MAX_ACTIONS>,
}

/// Hardware-reflecting runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerTracker {
    last: Option<RegisterSnapshot>,
    previous: RegisterSnapshot,
    input_present: bool,
}

impl Default for ChargerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChargerTracker {
    /// Fresh tracker: no snapshot yet, input assumed absent
    pub const fn new() -> Self {
        Self {
            last: None,
            previous: RegisterSnapshot::UNSEEN,
            input_present: false,
        }
    }

    /// Most recent committed snapshot
    pub fn last(&self) -> Option<RegisterSnapshot> {
        self.last
    }

    /// Last snapshot that was reported as a change
    pub fn previous(&self) -> RegisterSnapshot {
        self.previous
    }

    /// VBUS presence as tracked across passes
    pub fn input_present(&self) -> bool {
        self.input_present
    }

    /// Battery presence derived from the last snapshot (false before the
    /// first pass)
    pub fn battery_present(&self) -> bool {
        self.last.is_some_and(|s| s.battery_present())
    }

    /// Decide what a pass over `snapshot` must do. Does not mutate.
    pub fn plan(&self, snapshot: RegisterSnapshot, config: &ChargerConfig) -> DetectionPlan {
        let mut plan = DetectionPlan {
            snapshot,
            changed: snapshot != self.previous,
            input_present: self.input_present,
            transitions: heapless::Vec::new(),
            actions: heapless::Vec::new(),
        };

        let fault = snapshot.fault.charge();
        let new_fault = !self.last.is_some_and(|last| last.fault.charge() == fault);
        if fault != ChargeFault::Normal && new_fault && plan.input_present {
            plan.input_present = false;
            push(&mut plan.transitions, SupplyEvent::InputRemoved);
        }

        let power_good = snapshot.input_present();
        if power_good && !plan.input_present {
            plan.input_present = true;
            push(&mut plan.transitions, SupplyEvent::InputAttached);
            push(
                &mut plan.actions,
                Action::SetInputCurrentLimit(encode_input_current_limit(
                    config.usb_input_current_limit_ua,
                )),
            );
            if snapshot.battery_present() {
                push(
                    &mut plan.actions,
                    Action::SetChargeMode(ChargeMode::ChargeBattery),
                );
            }
        } else if !power_good && plan.input_present {
            plan.input_present = false;
            push(&mut plan.transitions, SupplyEvent::InputRemoved);
        }

        plan
    }

    /// Record a plan whose actions all succeeded.
    pub fn commit(&mut self, plan: &DetectionPlan) {
        self.last = Some(plan.snapshot);
        if plan.changed {
            self.previous = plan.snapshot;
        }
        self.input_present = plan.input_present;
    }
}

fn push<T, const N: usize>(vec: &mut heapless::Vec<T, N>, item: T) {
    // Capacity covers the worst case of one pass (remove + attach).
    let _ = vec.push(item);
}

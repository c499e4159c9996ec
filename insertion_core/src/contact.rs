//! Debounced contact classification of force/torque samples.

use insertion_traits::Wrench;

use crate::config::ContactCfg;

/// One classified sample. Transient; only `ContactState` is retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub wrench: Wrench,
    /// Axial force over `force_threshold_n` on this sample.
    pub contact: bool,
    /// In-plane force over `lateral_threshold_n` on this sample.
    pub lateral: bool,
}

/// Debounced view of the force stream since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactState {
    pub contact: bool,
    pub lateral: bool,
    pub axial_n: f64,
    pub lateral_n: f64,
    /// Largest axial force seen since the last reset.
    pub peak_axial_n: f64,
    pub samples: u64,
}

#[derive(Debug, Clone)]
pub struct ContactMonitor {
    cfg: ContactCfg,
    state: ContactState,
    contact_run: u8,
    lateral_run: u8,
}

impl ContactMonitor {
    pub fn new(cfg: ContactCfg) -> Self {
        Self {
            cfg,
            state: ContactState::default(),
            contact_run: 0,
            lateral_run: 0,
        }
    }

    /// Classify `wrench` and update the debounced flags. A flag rises after
    /// `debounce_n` consecutive samples over threshold and clears on the first
    /// clean sample. Non-finite samples are dropped.
    pub fn observe(&mut self, wrench: &Wrench) -> ContactEvent {
        let axial = wrench.axial();
        let lateral = wrench.lateral();
        if !axial.is_finite() || !lateral.is_finite() {
            tracing::warn!(?wrench, "dropping non-finite force sample");
            return ContactEvent {
                wrench: *wrench,
                contact: false,
                lateral: false,
            };
        }

        let event = ContactEvent {
            wrench: *wrench,
            contact: axial > self.cfg.force_threshold_n,
            lateral: lateral > self.cfg.lateral_threshold_n,
        };
        let need = self.cfg.debounce_n.max(1);
        self.contact_run = bump(self.contact_run, event.contact);
        self.lateral_run = bump(self.lateral_run, event.lateral);

        let s = &mut self.state;
        if !s.contact && self.contact_run >= need {
            tracing::debug!(axial_n = axial, "contact raised");
        }
        s.contact = self.contact_run >= need;
        s.lateral = self.lateral_run >= need;
        s.axial_n = axial;
        s.lateral_n = lateral;
        s.peak_axial_n = s.peak_axial_n.max(axial);
        s.samples = s.samples.saturating_add(1);
        event
    }

    pub fn state(&self) -> ContactState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = ContactState::default();
        self.contact_run = 0;
        self.lateral_run = 0;
    }
}

#[inline]
fn bump(run: u8, over: bool) -> u8 {
    if over { run.saturating_add(1) } else { 0 }
}

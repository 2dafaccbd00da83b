/**
 * Motor Safety Gate
 *
 * Actuator output is only armed after the kill switch has read ON for a full
 * arming delay. Dropping the kill switch disarms immediately, from any state.
 */

use std::time::{Duration, Instant};

use tracing::info;

use crate::config::GateSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Unarmed,
    Arming { since: Instant },
    Armed,
}

impl ArmState {
    pub fn name(&self) -> &'static str {
        match self {
            ArmState::Unarmed => "unarmed",
            ArmState::Arming { .. } => "arming",
            ArmState::Armed => "armed",
        }
    }
}

/// Transition reported by [`MotorSafetyGate::update`]. The caller owns the
/// side effects: re-initialising actuators on `ArmingStarted`, resetting the
/// controllers on `Armed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    ArmingStarted,
    Armed,
    Disarmed,
}

#[derive(Debug, Clone)]
pub struct MotorSafetyGate {
    state: ArmState,
    arming_delay: Duration,
    threshold: f64,
}

impl MotorSafetyGate {
    pub fn new(settings: &GateSettings) -> Self {
        Self {
            state: ArmState::Unarmed,
            arming_delay: settings.arming_delay(),
            threshold: settings.kill_switch_threshold,
        }
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    pub fn arming_delay(&self) -> Duration {
        self.arming_delay
    }

    /// Threshold a battery reading. A missing or NaN reading counts as OFF.
    pub fn kill_switch_on(&self, voltage: Option<f64>) -> bool {
        voltage.map_or(false, |v| v >= self.threshold)
    }

    pub fn update(&mut self, now: Instant, signal_on: bool) -> Option<GateEvent> {
        let (next, event) = match (self.state, signal_on) {
            (ArmState::Unarmed, true) => (ArmState::Arming { since: now }, Some(GateEvent::ArmingStarted)),
            (ArmState::Arming { since }, true) => {
                if now.saturating_duration_since(since) >= self.arming_delay {
                    (ArmState::Armed, Some(GateEvent::Armed))
                } else {
                    (self.state, None)
                }
            }
            (ArmState::Arming { .. }, false) | (ArmState::Armed, false) => {
                (ArmState::Unarmed, Some(GateEvent::Disarmed))
            }
            (state, _) => (state, None),
        };

        if let Some(event) = event {
            info!(from = self.state.name(), to = next.name(), ?event, "arm state change");
        }
        self.state = next;
        event
    }
}

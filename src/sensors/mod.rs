/**
 * Sensor input
 *
 * Attitude and depth come from the vehicle's IMU and pressure sensor when a
 * hardware source is attached. When it is missing, silent for too long or
 * failing, readings are simulated around the current references so the loop
 * keeps running.
 */

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::SimulationSettings;
use crate::error::SensorError;

/// One set of readings. Angles in degrees, rates in deg/s, depth in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorFrame {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub pitch_rate: f64,
    pub roll_rate: f64,
    pub yaw_rate: f64,
    pub depth: f64,
}

/// A hardware sensor driver.
pub trait SensorSource: Send {
    /// Newest complete frame received since the last call, if any.
    /// Must not block for longer than a few milliseconds.
    fn poll(&mut self) -> Result<Option<SensorFrame>, SensorError>;

    /// Latest battery voltage reported by the power monitor.
    fn battery_voltage(&self) -> Option<f64> {
        None
    }
}

/// What the simulator perturbs around.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Targets {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub depth: f64,
}

pub struct SensorSimulator {
    rng: StdRng,
    angle_noise: f64,
    rate_noise: f64,
    depth_noise: f64,
}

impl SensorSimulator {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            rng: StdRng::seed_from_u64(settings.seed),
            angle_noise: settings.angle_noise,
            rate_noise: settings.rate_noise,
            depth_noise: settings.depth_noise,
        }
    }

    pub fn sample(&mut self, targets: &Targets) -> SensorFrame {
        let angle = self.angle_noise;
        let rate = self.rate_noise;
        SensorFrame {
            pitch: targets.pitch + self.noise(angle),
            roll: targets.roll + self.noise(angle),
            yaw: (targets.yaw + self.noise(angle)).rem_euclid(360.0),
            pitch_rate: self.noise(rate),
            roll_rate: self.noise(rate),
            yaw_rate: self.noise(rate),
            depth: (targets.depth + self.noise(self.depth_noise)).max(0.0),
        }
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        if amplitude > 0.0 {
            self.rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub frame: SensorFrame,
    pub simulated: bool,
}

/// Hardware readings with a simulated fallback.
pub struct SensorFeed {
    source: Option<Box<dyn SensorSource>>,
    simulator: SensorSimulator,
    stale_after: Duration,
    last: Option<(Instant, SensorFrame)>,
    simulated_battery: f64,
    simulating: bool,
}

impl SensorFeed {
    /// A feed with no hardware attached.
    pub fn simulated(settings: &SimulationSettings) -> Self {
        Self {
            source: None,
            simulator: SensorSimulator::new(settings),
            stale_after: settings.stale_after(),
            last: None,
            simulated_battery: settings.battery_voltage,
            simulating: true,
        }
    }

    pub fn with_source(source: Box<dyn SensorSource>, settings: &SimulationSettings) -> Self {
        Self {
            source: Some(source),
            simulating: false,
            ..Self::simulated(settings)
        }
    }

    pub fn has_hardware(&self) -> bool {
        self.source.is_some()
    }

    /// Battery voltage for the kill switch: the hardware report when a source
    /// is attached, otherwise the configured simulated voltage. A hardware
    /// source that has gone stale or failed reports nothing.
    pub fn battery_voltage(&self) -> Option<f64> {
        match &self.source {
            Some(_) if self.simulating => None,
            Some(source) => source.battery_voltage(),
            None => Some(self.simulated_battery),
        }
    }

    /// True while a hardware source is attached but its readings are being
    /// replaced by simulation.
    pub fn hardware_lost(&self) -> bool {
        self.source.is_some() && self.simulating
    }

    pub fn set_simulated_battery(&mut self, voltage: f64) {
        self.simulated_battery = voltage;
    }

    pub fn sample(&mut self, now: Instant, targets: &Targets) -> SensorSample {
        match self.read_hardware(now) {
            Ok(frame) => {
                if self.simulating {
                    info!("hardware sensor readings resumed");
                    self.simulating = false;
                }
                SensorSample { frame, simulated: false }
            }
            Err(e) => {
                if !self.simulating {
                    warn!(error = %e, "falling back to simulated sensor readings");
                    self.simulating = true;
                }
                SensorSample {
                    frame: self.simulator.sample(targets),
                    simulated: true,
                }
            }
        }
    }

    fn read_hardware(&mut self, now: Instant) -> Result<SensorFrame, SensorError> {
        let source = self.source.as_mut().ok_or(SensorError::Unavailable)?;
        if let Some(frame) = source.poll()? {
            self.last = Some((now, frame));
        }

        let (at, frame) = self.last.ok_or(SensorError::Unavailable)?;
        let age = now.saturating_duration_since(at);
        if age > self.stale_after {
            return Err(SensorError::Stale { age });
        }
        Ok(frame)
    }
}

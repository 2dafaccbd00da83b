//! Vehicle settings.
//!
//! Loaded from TOML. Every section falls back to the values shipped in
//! `configs/default.toml`, so a settings file only has to name what it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::pid::MissionMode;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logger {
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Serial link to the vehicle microcontroller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub port: String,
    pub baud: u32,
    /// Upper bound on a single port read. Keep well under the fastest axis period.
    pub timeout_ms: u64,
    /// Age after which the last battery report no longer holds the kill switch ON.
    pub battery_timeout_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
            timeout_ms: 2,
            battery_timeout_ms: 1000,
        }
    }
}

impl LinkSettings {
    pub fn battery_timeout(&self) -> Duration {
        Duration::from_millis(self.battery_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub arming_delay_ms: u64,
    /// Battery voltage at or above which the kill switch counts as ON.
    pub kill_switch_threshold: f64,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            arming_delay_ms: 2000,
            kill_switch_threshold: 10.5,
        }
    }
}

impl GateSettings {
    pub fn arming_delay(&self) -> Duration {
        Duration::from_millis(self.arming_delay_ms)
    }
}

/// Calibration of the vertical thrusters and the two Voith drives.
/// PWM values are pulse widths in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub servo_bound: f64,
    pub total_vertical_bound: f64,
    pub pwm_min: f64,
    pub pwm_max: f64,

    pub deadzone_radius: f64,
    pub dz_offset: f64,
    pub neutral_gain: f64,
    pub left_neutral: f64,
    pub right_neutral: f64,
    pub tail_neutral: f64,

    pub servo_neutral: f64,
    pub servo_gain: f64,
    /// Mounting angle of the left drive, radians.
    pub left_offset: f64,
    /// Mounting angle of the right drive, radians.
    pub right_offset: f64,
    pub voith_gain: f64,
    pub voith_neutral: f64,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            servo_bound: 100.0,
            total_vertical_bound: 150.0,
            pwm_min: 1100.0,
            pwm_max: 1900.0,
            deadzone_radius: 2.0,
            dz_offset: 25.0,
            neutral_gain: 4.0,
            left_neutral: 1500.0,
            right_neutral: 1500.0,
            tail_neutral: 1500.0,
            servo_neutral: 1500.0,
            servo_gain: 2.0,
            left_offset: 0.0,
            right_offset: 0.0,
            voith_gain: 4.0,
            voith_neutral: 1500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSettings {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Limit on `|i_error * ki|`.
    pub integral_bound: f64,
    /// Saturation applied to the channel output.
    pub output_bound: f64,
    pub period_ms: u64,
}

impl AxisSettings {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Per-axis tuning. `fx` and `fy` are evaluated together with yaw, so their
/// `period_ms` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesSettings {
    pub pitch: AxisSettings,
    pub roll: AxisSettings,
    pub yaw: AxisSettings,
    pub depth: AxisSettings,
    pub fx: AxisSettings,
    pub fy: AxisSettings,
    /// Gain on the lateral error fed into roll.
    pub roll_lateral_kp: f64,
}

impl Default for AxesSettings {
    fn default() -> Self {
        Self {
            pitch: AxisSettings {
                kp: 1.2,
                ki: 0.05,
                kd: 0.4,
                integral_bound: 20.0,
                output_bound: 60.0,
                period_ms: 20,
            },
            roll: AxisSettings {
                kp: 1.0,
                ki: 0.05,
                kd: 0.3,
                integral_bound: 20.0,
                output_bound: 50.0,
                period_ms: 20,
            },
            yaw: AxisSettings {
                kp: 0.8,
                ki: 0.02,
                kd: 0.2,
                integral_bound: 15.0,
                output_bound: 40.0,
                period_ms: 20,
            },
            depth: AxisSettings {
                kp: 40.0,
                ki: 2.0,
                kd: 10.0,
                integral_bound: 30.0,
                output_bound: 100.0,
                period_ms: 50,
            },
            fx: AxisSettings {
                kp: 0.1,
                ki: 0.01,
                kd: 0.05,
                integral_bound: 10.0,
                output_bound: 50.0,
                period_ms: 20,
            },
            fy: AxisSettings {
                kp: 0.1,
                ki: 0.01,
                kd: 0.05,
                integral_bound: 10.0,
                output_bound: 50.0,
                period_ms: 20,
            },
            roll_lateral_kp: 0.2,
        }
    }
}

/// Parameters of the sensor simulator used whenever hardware readings are
/// missing or stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub seed: u64,
    /// Degrees.
    pub angle_noise: f64,
    /// Degrees per second.
    pub rate_noise: f64,
    /// Meters.
    pub depth_noise: f64,
    pub battery_voltage: f64,
    pub stale_after_ms: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 7,
            angle_noise: 0.5,
            rate_noise: 1.0,
            depth_noise: 0.02,
            battery_voltage: 12.6,
            stale_after_ms: 200,
        }
    }
}

impl SimulationSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Pause at the end of each outer iteration.
    pub idle_us: u64,
    pub mission: MissionMode,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            idle_us: 500,
            mission: MissionMode::Normal,
        }
    }
}

impl ControllerSettings {
    pub fn idle(&self) -> Duration {
        Duration::from_micros(self.idle_us)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logger: Logger,
    pub link: LinkSettings,
    pub gate: GateSettings,
    pub mixer: MixerSettings,
    pub axes: AxesSettings,
    pub simulation: SimulationSettings,
    pub controller: ControllerSettings,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.mixer;
        if !(m.servo_bound > 0.0) || !(m.total_vertical_bound > 0.0) {
            return Err(ConfigError::Invalid("mixer bounds must be positive".into()));
        }
        if !(m.pwm_min < m.pwm_max) {
            return Err(ConfigError::Invalid(format!(
                "pwm_min {} must be below pwm_max {}",
                m.pwm_min, m.pwm_max
            )));
        }

        let axes = [
            ("pitch", &self.axes.pitch),
            ("roll", &self.axes.roll),
            ("yaw", &self.axes.yaw),
            ("depth", &self.axes.depth),
            ("fx", &self.axes.fx),
            ("fy", &self.axes.fy),
        ];
        for (name, axis) in axes {
            if axis.period_ms == 0 {
                return Err(ConfigError::Invalid(format!("{name}.period_ms must be non-zero")));
            }
            if !(axis.integral_bound >= 0.0) || !(axis.output_bound > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} bounds must be positive")));
            }
        }
        if self.axes.roll.output_bound > m.total_vertical_bound {
            return Err(ConfigError::Invalid(format!(
                "roll.output_bound {} exceeds total_vertical_bound {}",
                self.axes.roll.output_bound, m.total_vertical_bound
            )));
        }

        let sim = &self.simulation;
        let noise = [
            ("angle_noise", sim.angle_noise),
            ("rate_noise", sim.rate_noise),
            ("depth_noise", sim.depth_noise),
        ];
        for (name, amplitude) in noise {
            if !amplitude.is_finite() {
                return Err(ConfigError::Invalid(format!("simulation.{name} must be finite")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_defaults_match() {
        let shipped = Settings::from_toml(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/configs/default.toml"
        )))
        .unwrap();
        assert_eq!(shipped, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [gate]
            arming_delay_ms = 500

            [axes.depth]
            kp = 10.0
            ki = 0.0
            kd = 1.0
            integral_bound = 5.0
            output_bound = 80.0
            period_ms = 40
            "#,
        )
        .unwrap();

        assert_eq!(settings.gate.arming_delay(), Duration::from_millis(500));
        assert_eq!(settings.gate.kill_switch_threshold, 10.5);
        assert_eq!(settings.axes.depth.period(), Duration::from_millis(40));
        assert_eq!(settings.axes.pitch, AxesSettings::default().pitch);
        assert_eq!(settings.mixer, MixerSettings::default());
    }

    #[test]
    fn test_mission_mode_parses() {
        let settings = Settings::from_toml("[controller]\nmission = \"box_pickup\"\n").unwrap();
        assert_eq!(settings.controller.mission, MissionMode::BoxPickup);
    }

    #[test]
    fn test_rejects_zero_period() {
        let mut settings = Settings::default();
        settings.axes.yaw.period_ms = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_roll_bound_over_vertical_budget() {
        let mut settings = Settings::default();
        settings.axes.roll.output_bound = settings.mixer.total_vertical_bound;
        assert!(settings.validate().is_ok());

        settings.axes.roll.output_bound = settings.mixer.total_vertical_bound + 1.0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_infinite_noise() {
        let err = Settings::from_toml("[simulation]\ndepth_noise = inf\n");
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let mut settings = Settings::default();
        settings.simulation.angle_noise = f64::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_pwm_range() {
        let mut settings = Settings::default();
        settings.mixer.pwm_min = 2000.0;
        assert!(settings.validate().is_err());
    }
}

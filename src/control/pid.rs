/**
 * PID channels
 *
 * One channel per controlled axis. Angular axes (pitch, roll, yaw) wrap their
 * error on the circle and take the derivative term straight from the gyro;
 * depth and the image-plane axes (fx, fy) difference their error instead.
 */

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::angle::{bound_integral, subtract_angles};
use crate::config::{AxesSettings, AxisSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Pitch,
    Roll,
    Yaw,
    Depth,
    Fx,
    Fy,
}

impl Axis {
    pub const ALL: [Axis; 6] = [Axis::Pitch, Axis::Roll, Axis::Yaw, Axis::Depth, Axis::Fx, Axis::Fy];

    pub fn is_angular(self) -> bool {
        matches!(self, Axis::Pitch | Axis::Roll | Axis::Yaw)
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Pitch => "pitch",
            Axis::Roll => "roll",
            Axis::Yaw => "yaw",
            Axis::Depth => "depth",
            Axis::Fx => "fx",
            Axis::Fy => "fy",
        }
    }
}

/// Task currently run by the mission layer, as far as the controllers care.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionMode {
    /// fx/fy targets are thrust demands and pass straight through.
    #[default]
    Normal,
    /// fx/fy targets are pixel offsets of the box in the camera image and are
    /// driven to zero through the PID.
    BoxPickup,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Clamp `value` to `[-bound, bound]` by magnitude. NaN passes through.
pub fn saturate(value: f64, bound: f64) -> f64 {
    if value.abs() > bound {
        value.signum() * bound
    } else {
        value
    }
}

#[derive(Debug, Clone)]
pub struct PidChannel {
    axis: Axis,
    pub reference: f64,
    pub gains: Gains,
    pub measured: f64,
    /// Angular rate for this axis in deg/s; only read on angular axes.
    pub rate: f64,
    pub p_error: f64,
    pub i_error: f64,
    pub d_error: f64,
    prev_p_error: f64,
    pub integral_bound: f64,
    pub output_bound: f64,
    pub period: Duration,
    output: f64,
}

impl PidChannel {
    pub fn new(axis: Axis, settings: &AxisSettings) -> Self {
        Self {
            axis,
            reference: 0.0,
            gains: Gains {
                kp: settings.kp,
                ki: settings.ki,
                kd: settings.kd,
            },
            measured: 0.0,
            rate: 0.0,
            p_error: 0.0,
            i_error: 0.0,
            d_error: 0.0,
            prev_p_error: 0.0,
            integral_bound: settings.integral_bound,
            output_bound: settings.output_bound,
            period: settings.period(),
            output: 0.0,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Output of the most recent computation.
    pub fn output(&self) -> f64 {
        self.output
    }

    /// Refresh P, I and D from the current reference and measurement.
    pub fn update_errors(&mut self, dt: Duration) {
        self.p_error = if self.axis.is_angular() {
            subtract_angles(self.measured, self.reference)
        } else {
            self.measured - self.reference
        };

        self.i_error += self.p_error * dt.as_secs_f64();
        self.i_error = bound_integral(self.i_error, self.gains.ki, self.integral_bound);

        self.d_error = if self.axis.is_angular() {
            self.rate
        } else {
            self.p_error - self.prev_p_error
        };
        self.prev_p_error = self.p_error;
    }

    /// Combine the current error terms, plus an extra coupling term, into a
    /// saturated output.
    pub fn output_with(&mut self, coupling: f64) -> f64 {
        let Gains { kp, ki, kd } = self.gains;
        let raw = kp * self.p_error + ki * self.i_error + kd * self.d_error + coupling;
        self.output = saturate(raw, self.output_bound);
        self.output
    }

    pub fn compute(&mut self, dt: Duration) -> f64 {
        self.update_errors(dt);
        self.output_with(0.0)
    }

    /// Use the reference itself as the output, leaving the error terms alone.
    pub fn pass_through(&mut self) -> f64 {
        self.output = saturate(self.reference, self.output_bound);
        self.output
    }

    pub fn zero_errors(&mut self) {
        self.p_error = 0.0;
        self.i_error = 0.0;
        self.d_error = 0.0;
        self.prev_p_error = 0.0;
    }
}

/// The six channels of one vehicle.
#[derive(Debug, Clone)]
pub struct PidSet {
    pub pitch: PidChannel,
    pub roll: PidChannel,
    pub yaw: PidChannel,
    pub depth: PidChannel,
    pub fx: PidChannel,
    pub fy: PidChannel,
    pub roll_lateral_kp: f64,
}

impl PidSet {
    pub fn new(settings: &AxesSettings) -> Self {
        Self {
            pitch: PidChannel::new(Axis::Pitch, &settings.pitch),
            roll: PidChannel::new(Axis::Roll, &settings.roll),
            yaw: PidChannel::new(Axis::Yaw, &settings.yaw),
            depth: PidChannel::new(Axis::Depth, &settings.depth),
            fx: PidChannel::new(Axis::Fx, &settings.fx),
            fy: PidChannel::new(Axis::Fy, &settings.fy),
            roll_lateral_kp: settings.roll_lateral_kp,
        }
    }

    pub fn channel(&self, axis: Axis) -> &PidChannel {
        match axis {
            Axis::Pitch => &self.pitch,
            Axis::Roll => &self.roll,
            Axis::Yaw => &self.yaw,
            Axis::Depth => &self.depth,
            Axis::Fx => &self.fx,
            Axis::Fy => &self.fy,
        }
    }

    pub fn channel_mut(&mut self, axis: Axis) -> &mut PidChannel {
        match axis {
            Axis::Pitch => &mut self.pitch,
            Axis::Roll => &mut self.roll,
            Axis::Yaw => &mut self.yaw,
            Axis::Depth => &mut self.depth,
            Axis::Fx => &mut self.fx,
            Axis::Fy => &mut self.fy,
        }
    }

    /// Run one channel. Roll picks up the lateral coupling term; fx/fy either
    /// run against a zero measurement or pass their reference through,
    /// depending on `mode`.
    pub fn compute(&mut self, axis: Axis, dt: Duration, mode: MissionMode) -> f64 {
        match axis {
            Axis::Roll => {
                let coupling = self.roll_lateral_kp * self.fx.p_error;
                self.roll.update_errors(dt);
                self.roll.output_with(coupling)
            }
            Axis::Fx | Axis::Fy => {
                let channel = self.channel_mut(axis);
                match mode {
                    MissionMode::BoxPickup => {
                        channel.measured = 0.0;
                        channel.compute(dt)
                    }
                    MissionMode::Normal => channel.pass_through(),
                }
            }
            _ => self.channel_mut(axis).compute(dt),
        }
    }

    pub fn zero_errors(&mut self) {
        for axis in Axis::ALL {
            self.channel_mut(axis).zero_errors();
        }
    }
}

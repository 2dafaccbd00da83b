use std::fmt;
use std::time::Duration;

use super::safety::ArmState;
use super::thrust_mixer::{VerticalPwm, VoithPwm};
use crate::control::pid::{MissionMode, PidChannel};

/// Snapshot of one PID channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisTelemetry {
    pub reference: f64,
    pub measured: f64,
    pub p_error: f64,
    pub i_error: f64,
    pub d_error: f64,
    pub output: f64,
    /// Time since controller start at which this axis last fired.
    pub last_fired: Duration,
}

impl AxisTelemetry {
    pub fn capture(channel: &PidChannel, last_fired: Duration) -> Self {
        Self {
            reference: channel.reference,
            measured: channel.measured,
            p_error: channel.p_error,
            i_error: channel.i_error,
            d_error: channel.d_error,
            output: channel.output(),
            last_fired,
        }
    }
}

/// Published once per outer-loop iteration for logging and operator display.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub uptime: Duration,
    pub arm_state: ArmState,
    pub mission: MissionMode,
    pub pitch: AxisTelemetry,
    pub roll: AxisTelemetry,
    pub yaw: AxisTelemetry,
    pub depth: AxisTelemetry,
    pub fx: AxisTelemetry,
    pub fy: AxisTelemetry,
    pub vertical: VerticalPwm,
    pub voith: VoithPwm,
    pub sensors_simulated: bool,
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{:>8.3}s] {} {:?}{}",
            self.uptime.as_secs_f64(),
            self.arm_state.name(),
            self.mission,
            if self.sensors_simulated { " (simulated sensors)" } else { "" }
        )?;
        let axes = [
            ("pitch", &self.pitch),
            ("roll", &self.roll),
            ("yaw", &self.yaw),
            ("depth", &self.depth),
            ("fx", &self.fx),
            ("fy", &self.fy),
        ];
        for (name, a) in axes {
            writeln!(
                f,
                "  {name:<5} ref={:>8.2} meas={:>8.2} p={:>8.3} i={:>8.3} d={:>8.3} out={:>8.2}",
                a.reference, a.measured, a.p_error, a.i_error, a.d_error, a.output
            )?;
        }
        write!(
            f,
            "  vertical L/R/T = {}/{}/{}  voith servos {}/{} {}/{} motors {}/{}",
            self.vertical.left,
            self.vertical.right,
            self.vertical.tail,
            self.voith.left_servo1,
            self.voith.left_servo2,
            self.voith.right_servo1,
            self.voith.right_servo2,
            self.voith.left_motor,
            self.voith.right_motor,
        )
    }
}

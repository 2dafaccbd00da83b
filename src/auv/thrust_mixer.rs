/**
 * Thrust Mixer
 *
 * Converts axis-level demands into pulse widths for the propulsion layout:
 * three vertical thrusters (left, right, tail) and two mirror-mounted Voith
 * drives, each steered by two servos and spun by one motor.
 *
 * Mixing is pure: nothing here talks to hardware.
 */

use crate::config::MixerSettings;
use crate::error::MixError;

/// Demand for the vertical thrusters, in servo units (`±servo_bound`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VerticalCommand {
    pub vertical_force: f64,
    pub roll_torque: f64,
    pub pitch_torque: f64,
}

/// Demand for the Voith drives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoithCommand {
    /// Blade speed, `[0, servo_bound]`.
    pub voith_thrust: f64,
    /// Thrust direction in radians.
    pub voith_angle: f64,
    pub net_thrust: f64,
    pub yaw_torque: f64,
}

/// Everything one scheduler tick asks of the mixer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixerCommand {
    pub vertical: VerticalCommand,
    pub voith: VoithCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalPwm {
    pub left: u16,
    pub right: u16,
    pub tail: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoithPwm {
    pub left_servo1: u16,
    pub left_servo2: u16,
    pub right_servo1: u16,
    pub right_servo2: u16,
    pub left_motor: u16,
    pub right_motor: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ThrustMixer {
    settings: MixerSettings,
}

impl ThrustMixer {
    pub fn new(settings: MixerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    pub fn servo_bound(&self) -> f64 {
        self.settings.servo_bound
    }

    pub fn neutral_vertical(&self) -> VerticalPwm {
        let s = &self.settings;
        VerticalPwm {
            left: self.to_pwm(s.left_neutral, s.left_neutral),
            right: self.to_pwm(s.right_neutral, s.right_neutral),
            tail: self.to_pwm(s.tail_neutral, s.tail_neutral),
        }
    }

    pub fn neutral_voith(&self) -> VoithPwm {
        let servo = self.to_pwm(self.settings.servo_neutral, self.settings.servo_neutral);
        let motor = self.to_pwm(self.settings.voith_neutral, self.settings.voith_neutral);
        VoithPwm {
            left_servo1: servo,
            left_servo2: servo,
            right_servo1: servo,
            right_servo2: servo,
            left_motor: motor,
            right_motor: motor,
        }
    }

    /// Mix heave, roll and pitch into the three vertical thrusters.
    pub fn mix_vertical(&self, cmd: &VerticalCommand) -> Result<VerticalPwm, MixError> {
        let s = &self.settings;
        let bound = s.servo_bound;

        if cmd.vertical_force.is_nan() || cmd.roll_torque.is_nan() || cmd.pitch_torque.is_nan() {
            return Ok(self.neutral_vertical());
        }
        self.check("vertical_force", cmd.vertical_force, -bound, bound)?;
        self.check("roll_torque", cmd.roll_torque, -bound, bound)?;
        self.check("pitch_torque", cmd.pitch_torque, -bound, bound)?;

        let left = (cmd.vertical_force + cmd.roll_torque).clamp(-bound, bound);
        let right = (cmd.vertical_force - cmd.roll_torque).clamp(-bound, bound);
        let tail = cmd.pitch_torque.clamp(-bound, bound);

        Ok(VerticalPwm {
            left: self.vertical_pwm(s.left_neutral, left),
            right: self.vertical_pwm(s.right_neutral, right),
            tail: self.vertical_pwm(s.tail_neutral, tail),
        })
    }

    /// Mix a vectored thrust demand and yaw torque into servo and motor
    /// commands for both Voith drives.
    pub fn mix_voith(&self, cmd: &VoithCommand) -> Result<VoithPwm, MixError> {
        let s = &self.settings;
        let bound = s.servo_bound;

        let inputs = [cmd.voith_thrust, cmd.voith_angle, cmd.net_thrust, cmd.yaw_torque];
        if inputs.iter().any(|v| v.is_nan()) || cmd.voith_angle.is_infinite() {
            return Ok(self.neutral_voith());
        }
        self.check("voith_thrust", cmd.voith_thrust, 0.0, bound)?;
        self.check("net_thrust", cmd.net_thrust, -bound, bound)?;
        self.check("yaw_torque", cmd.yaw_torque, -bound, bound)?;

        let radius_a = cmd.yaw_torque + cmd.net_thrust;
        let radius_b = cmd.yaw_torque - cmd.net_thrust;
        let left_angle = cmd.voith_angle + s.left_offset;
        let right_angle = cmd.voith_angle + s.right_offset;

        // The right drive is mounted mirrored, hence the flipped sign.
        let left_servo1 = s.servo_neutral + s.servo_gain * radius_a * left_angle.cos();
        let left_servo2 = s.servo_neutral + s.servo_gain * radius_a * left_angle.sin();
        let right_servo1 = s.servo_neutral - s.servo_gain * radius_b * right_angle.cos();
        let right_servo2 = s.servo_neutral - s.servo_gain * radius_b * right_angle.sin();

        let motor = self.to_pwm(cmd.voith_thrust * s.voith_gain + s.voith_neutral, s.voith_neutral);

        Ok(VoithPwm {
            left_servo1: self.to_pwm(left_servo1, s.servo_neutral),
            left_servo2: self.to_pwm(left_servo2, s.servo_neutral),
            right_servo1: self.to_pwm(right_servo1, s.servo_neutral),
            right_servo2: self.to_pwm(right_servo2, s.servo_neutral),
            left_motor: motor,
            right_motor: motor,
        })
    }

    fn check(&self, input: &'static str, value: f64, min: f64, max: f64) -> Result<(), MixError> {
        if value < min || value > max {
            return Err(MixError::OutOfRange { input, value, min, max });
        }
        Ok(())
    }

    /// Dead-zone compensated pulse width for one vertical thruster.
    fn vertical_pwm(&self, neutral: f64, value: f64) -> u16 {
        let s = &self.settings;
        let base = if value > s.deadzone_radius {
            neutral + s.dz_offset
        } else if value < -s.deadzone_radius {
            neutral - s.dz_offset
        } else {
            neutral
        };
        self.to_pwm(base + s.neutral_gain * value, neutral)
    }

    /// Clamp to the PWM range; NaN falls back to `neutral`.
    fn to_pwm(&self, value: f64, neutral: f64) -> u16 {
        let s = &self.settings;
        let value = if value.is_nan() { neutral } else { value };
        value.clamp(s.pwm_min, s.pwm_max).round() as u16
    }
}

/**
 * AUV Control Module
 *
 * Vehicle-level control built on the per-axis PID channels:
 * - thrust mixing for the vertical thrusters and Voith drives
 * - the motor arming gate
 * - the independently-timed axis scheduler
 * - the controller loop that ties them to sensors, actuators and topics
 */

pub mod controller;
pub mod safety;
pub mod scheduler;
pub mod telemetry;
pub mod thrust_mixer;

pub use controller::{AuvController, DryRunDriver, VehicleIo};
pub use safety::{ArmState, GateEvent, MotorSafetyGate};
pub use scheduler::{ActuatorDriver, AxisTimer, ControlScheduler, NavCommand, TickReport, VehicleContext};
pub use telemetry::{AxisTelemetry, Telemetry};
pub use thrust_mixer::{MixerCommand, ThrustMixer, VerticalCommand, VerticalPwm, VoithCommand, VoithPwm};

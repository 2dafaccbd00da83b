//! Per-axis feedback control.

pub mod angle;
pub mod pid;

pub use angle::{bound_integral, sub_angle, subtract_angles};
pub use pid::{saturate, Axis, Gains, MissionMode, PidChannel, PidSet};

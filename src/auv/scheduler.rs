/**
 * Control Scheduler
 *
 * Pitch, roll, yaw and depth each keep their own timer and fire only when
 * their own period has elapsed, with a dt measured from their own last
 * firing. Axes are never synchronised with each other. fx and fy are
 * evaluated whenever yaw fires, since they share the Voith drives.
 *
 * One call to `tick` is one outer-loop iteration:
 *   1. sample the kill switch and step the safety gate
 *   2. apply pending commands
 *   3. read (or simulate) sensors
 *   4. fire due axes, mix, and transmit if armed
 */

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::safety::{ArmState, GateEvent, MotorSafetyGate};
use super::telemetry::{AxisTelemetry, Telemetry};
use super::thrust_mixer::{MixerCommand, ThrustMixer, VerticalCommand, VerticalPwm, VoithCommand, VoithPwm};
use crate::config::Settings;
use crate::control::angle::sub_angle;
use crate::control::pid::{saturate, Axis, Gains, MissionMode, PidSet};
use crate::error::LinkError;
use crate::sensors::{SensorFeed, SensorFrame, Targets};

/// Axes that own a timer, in firing order.
pub const SCHEDULED_AXES: [Axis; 4] = [Axis::Pitch, Axis::Roll, Axis::Yaw, Axis::Depth];

/// Requests from mission logic or the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum NavCommand {
    SetReference(Axis, f64),
    SetGains(Axis, Gains),
    SetMission(MissionMode),
    SetNetThrust(f64),
    /// One-shot reset of every channel's error terms.
    ZeroErrors,
}

/// Hardware sink for actuator commands.
pub trait ActuatorDriver: Send {
    fn send_vertical(&mut self, pwm: &VerticalPwm) -> Result<(), LinkError>;
    fn send_voith(&mut self, pwm: &VoithPwm) -> Result<(), LinkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTimer {
    pub last_fired: Instant,
    pub period: Duration,
}

impl AxisTimer {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self { last_fired: start, period }
    }

    /// If the period has elapsed, mark the timer fired and return the dt
    /// since the previous firing.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        let dt = now.saturating_duration_since(self.last_fired);
        if dt < self.period {
            return None;
        }
        self.last_fired = now;
        Some(dt)
    }
}

/// Mutable state of one vehicle, owned by its scheduler.
#[derive(Debug, Clone)]
pub struct VehicleContext {
    pub pids: PidSet,
    pub mission: MissionMode,
    pub net_thrust: f64,
    pub gate: MotorSafetyGate,
    pub sensors: SensorFrame,
    pub sensors_simulated: bool,
}

impl VehicleContext {
    pub fn new(settings: &Settings) -> Self {
        Self {
            pids: PidSet::new(&settings.axes),
            mission: settings.controller.mission,
            net_thrust: 0.0,
            gate: MotorSafetyGate::new(&settings.gate),
            sensors: SensorFrame::default(),
            sensors_simulated: true,
        }
    }

    pub fn targets(&self) -> Targets {
        Targets {
            pitch: self.pids.pitch.reference,
            roll: self.pids.roll.reference,
            yaw: self.pids.yaw.reference,
            depth: self.pids.depth.reference,
        }
    }

    fn apply_sensors(&mut self, frame: &SensorFrame) {
        let pids = &mut self.pids;
        pids.pitch.measured = frame.pitch;
        pids.pitch.rate = frame.pitch_rate;
        pids.roll.measured = frame.roll;
        pids.roll.rate = frame.roll_rate;
        pids.yaw.measured = frame.yaw;
        pids.yaw.rate = frame.yaw_rate;
        pids.depth.measured = frame.depth;
        self.sensors = *frame;
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub gate_event: Option<GateEvent>,
    pub fired: Vec<Axis>,
    /// Vertical PWM computed this tick, transmitted or not.
    pub vertical: Option<VerticalPwm>,
    pub voith: Option<VoithPwm>,
    pub transmitted: bool,
    pub sensors_simulated: bool,
}

pub struct ControlScheduler {
    ctx: VehicleContext,
    mixer: ThrustMixer,
    timers: [AxisTimer; 4],
    total_vertical_bound: f64,
    last_vertical: VerticalPwm,
    last_voith: VoithPwm,
    started: Instant,
}

impl ControlScheduler {
    pub fn new(settings: &Settings, start: Instant) -> Self {
        let axes = &settings.axes;
        let mixer = ThrustMixer::new(settings.mixer.clone());
        Self {
            ctx: VehicleContext::new(settings),
            timers: [
                AxisTimer::new(axes.pitch.period(), start),
                AxisTimer::new(axes.roll.period(), start),
                AxisTimer::new(axes.yaw.period(), start),
                AxisTimer::new(axes.depth.period(), start),
            ],
            total_vertical_bound: settings.mixer.total_vertical_bound,
            last_vertical: mixer.neutral_vertical(),
            last_voith: mixer.neutral_voith(),
            mixer,
            started: start,
        }
    }

    pub fn context(&self) -> &VehicleContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut VehicleContext {
        &mut self.ctx
    }

    pub fn mixer(&self) -> &ThrustMixer {
        &self.mixer
    }

    pub fn timer(&self, axis: Axis) -> Option<&AxisTimer> {
        SCHEDULED_AXES.iter().position(|&a| a == axis).map(|i| &self.timers[i])
    }

    pub fn arm_state(&self) -> ArmState {
        self.ctx.gate.state()
    }

    pub fn tick(
        &mut self,
        now: Instant,
        commands: impl IntoIterator<Item = NavCommand>,
        feed: &mut SensorFeed,
        actuators: &mut dyn ActuatorDriver,
    ) -> TickReport {
        let mut gate_event = self.update_gate(now, feed.battery_voltage(), actuators);

        for command in commands {
            self.apply_command(command);
        }

        let sample = feed.sample(now, &self.ctx.targets());
        self.ctx.apply_sensors(&sample.frame);
        self.ctx.sensors_simulated = sample.simulated;

        // Simulated stand-ins for a dead link never drive real motors.
        if feed.hardware_lost() {
            gate_event = self.update_gate(now, None, actuators).or(gate_event);
        }

        let mission = self.ctx.mission;
        let mut fired = Vec::new();
        for (timer, &axis) in self.timers.iter_mut().zip(SCHEDULED_AXES.iter()) {
            let Some(dt) = timer.poll(now) else { continue };
            let output = self.ctx.pids.compute(axis, dt, mission);
            trace!(axis = axis.name(), dt_ms = dt.as_secs_f64() * 1e3, output, "axis fired");
            if axis == Axis::Yaw {
                self.ctx.pids.compute(Axis::Fx, dt, mission);
                self.ctx.pids.compute(Axis::Fy, dt, mission);
            }
            fired.push(axis);
        }

        let armed = self.ctx.gate.is_armed();
        let mut transmitted = false;

        let vertical_due = fired.iter().any(|a| matches!(a, Axis::Pitch | Axis::Roll | Axis::Depth));
        let vertical = vertical_due.then(|| self.mix_vertical());
        if let (Some(pwm), true) = (vertical, armed) {
            match actuators.send_vertical(&pwm) {
                Ok(()) => transmitted = true,
                Err(e) => warn!(error = %e, "failed to send vertical thruster command"),
            }
        }

        let voith = fired.contains(&Axis::Yaw).then(|| self.mix_voith());
        if let (Some(pwm), true) = (voith, armed) {
            match actuators.send_voith(&pwm) {
                Ok(()) => transmitted = true,
                Err(e) => warn!(error = %e, "failed to send voith command"),
            }
        }

        TickReport {
            gate_event,
            fired,
            vertical,
            voith,
            transmitted,
            sensors_simulated: sample.simulated,
        }
    }

    /// Step the safety gate from a battery reading and carry out the
    /// transition's side effects.
    pub fn update_gate(
        &mut self,
        now: Instant,
        battery_voltage: Option<f64>,
        actuators: &mut dyn ActuatorDriver,
    ) -> Option<GateEvent> {
        let signal = self.ctx.gate.kill_switch_on(battery_voltage);
        let event = self.ctx.gate.update(now, signal);
        match event {
            Some(GateEvent::ArmingStarted) => {
                if let Err(e) = self.send_neutral(actuators) {
                    warn!(error = %e, "failed to re-initialise actuators");
                }
            }
            Some(GateEvent::Armed) => {
                self.ctx.pids.zero_errors();
                self.ctx.pids.yaw.reference = self.ctx.pids.yaw.measured;
            }
            Some(GateEvent::Disarmed) | None => {}
        }
        event
    }

    pub fn apply_command(&mut self, command: NavCommand) {
        debug!(?command, "nav command");
        match command {
            NavCommand::SetReference(axis, value) => self.ctx.pids.channel_mut(axis).reference = value,
            NavCommand::SetGains(axis, gains) => self.ctx.pids.channel_mut(axis).gains = gains,
            NavCommand::SetMission(mode) => self.ctx.mission = mode,
            NavCommand::SetNetThrust(value) => self.ctx.net_thrust = value,
            NavCommand::ZeroErrors => self.ctx.pids.zero_errors(),
        }
    }

    /// Command every actuator to neutral, regardless of arm state.
    pub fn send_neutral(&self, actuators: &mut dyn ActuatorDriver) -> Result<(), LinkError> {
        actuators.send_vertical(&self.mixer.neutral_vertical())?;
        actuators.send_voith(&self.mixer.neutral_voith())
    }

    /// Vertical demand from the latest outputs. Roll keeps priority within
    /// the shared vertical budget; heave gets what is left.
    pub fn vertical_command(&self) -> VerticalCommand {
        let pids = &self.ctx.pids;
        let roll_torque = pids.roll.output();
        let budget = (self.total_vertical_bound - roll_torque.abs()).max(0.0);
        VerticalCommand {
            vertical_force: saturate(pids.depth.output(), budget),
            roll_torque,
            pitch_torque: pids.pitch.output(),
        }
    }

    pub fn voith_command(&self) -> VoithCommand {
        let pids = &self.ctx.pids;
        let (fx, fy) = (pids.fx.output(), pids.fy.output());
        VoithCommand {
            voith_thrust: saturate(fx.hypot(fy), self.mixer.servo_bound()),
            voith_angle: sub_angle(fx, fy),
            net_thrust: self.ctx.net_thrust,
            yaw_torque: pids.yaw.output(),
        }
    }

    /// Both demands as the mixer would see them right now.
    pub fn mixer_command(&self) -> MixerCommand {
        MixerCommand {
            vertical: self.vertical_command(),
            voith: self.voith_command(),
        }
    }

    fn mix_vertical(&mut self) -> VerticalPwm {
        match self.mixer.mix_vertical(&self.vertical_command()) {
            Ok(pwm) => self.last_vertical = pwm,
            Err(e) => warn!(error = %e, "vertical mix rejected, holding last command"),
        }
        self.last_vertical
    }

    fn mix_voith(&mut self) -> VoithPwm {
        match self.mixer.mix_voith(&self.voith_command()) {
            Ok(pwm) => self.last_voith = pwm,
            Err(e) => warn!(error = %e, "voith mix rejected, holding last command"),
        }
        self.last_voith
    }

    pub fn telemetry(&self, now: Instant) -> Telemetry {
        let since_start = |axis: Axis| {
            self.timer(axis)
                .map(|t| t.last_fired.saturating_duration_since(self.started))
                .unwrap_or_default()
        };
        let yaw_fired = since_start(Axis::Yaw);
        let pids = &self.ctx.pids;

        Telemetry {
            uptime: now.saturating_duration_since(self.started),
            arm_state: self.ctx.gate.state(),
            mission: self.ctx.mission,
            pitch: AxisTelemetry::capture(&pids.pitch, since_start(Axis::Pitch)),
            roll: AxisTelemetry::capture(&pids.roll, since_start(Axis::Roll)),
            yaw: AxisTelemetry::capture(&pids.yaw, yaw_fired),
            depth: AxisTelemetry::capture(&pids.depth, since_start(Axis::Depth)),
            fx: AxisTelemetry::capture(&pids.fx, yaw_fired),
            fy: AxisTelemetry::capture(&pids.fy, yaw_fired),
            vertical: self.last_vertical,
            voith: self.last_voith,
            sensors_simulated: self.ctx.sensors_simulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationSettings;

    const NO_COMMANDS: [NavCommand; 0] = [];

    /// Records every command that reaches "hardware".
    #[derive(Default)]
    struct RecordingDriver {
        vertical: Vec<VerticalPwm>,
        voith: Vec<VoithPwm>,
    }

    impl ActuatorDriver for RecordingDriver {
        fn send_vertical(&mut self, pwm: &VerticalPwm) -> Result<(), LinkError> {
            self.vertical.push(*pwm);
            Ok(())
        }

        fn send_voith(&mut self, pwm: &VoithPwm) -> Result<(), LinkError> {
            self.voith.push(*pwm);
            Ok(())
        }
    }

    struct BrokenDriver;

    impl ActuatorDriver for BrokenDriver {
        fn send_vertical(&mut self, _: &VerticalPwm) -> Result<(), LinkError> {
            Err(LinkError::PayloadTooLarge(0))
        }

        fn send_voith(&mut self, _: &VoithPwm) -> Result<(), LinkError> {
            Err(LinkError::PayloadTooLarge(0))
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn quiet_feed(battery: f64) -> SensorFeed {
        let mut feed = SensorFeed::simulated(&SimulationSettings {
            angle_noise: 0.0,
            rate_noise: 0.0,
            depth_noise: 0.0,
            ..Default::default()
        });
        feed.set_simulated_battery(battery);
        feed
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.gate.arming_delay_ms = 100;
        settings
    }

    #[test]
    fn test_axis_timer_measures_own_dt() {
        let t0 = Instant::now();
        let mut timer = AxisTimer::new(ms(20), t0);
        assert_eq!(timer.poll(t0 + ms(19)), None);
        assert_eq!(timer.poll(t0 + ms(27)), Some(ms(27)));
        assert_eq!(timer.poll(t0 + ms(40)), None);
        assert_eq!(timer.poll(t0 + ms(47)), Some(ms(20)));
    }

    #[test]
    fn test_axes_fire_independently() {
        let mut settings = settings();
        settings.axes.pitch.period_ms = 20;
        settings.axes.depth.period_ms = 50;
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();

        let (mut pitch, mut depth) = (0, 0);
        for step in 1..=10 {
            let report = scheduler.tick(t0 + ms(step * 10), NO_COMMANDS, &mut feed, &mut driver);
            pitch += report.fired.contains(&Axis::Pitch) as u32;
            depth += report.fired.contains(&Axis::Depth) as u32;
        }

        assert_eq!(pitch, 5);
        assert_eq!(depth, 2);
        assert_eq!(scheduler.timer(Axis::Depth).unwrap().last_fired, t0 + ms(100));
    }

    #[test]
    fn test_uneven_ticks_use_measured_dt() {
        let mut settings = settings();
        settings.axes.depth.kp = 0.0;
        settings.axes.depth.kd = 0.0;
        settings.axes.depth.ki = 1.0;
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();
        scheduler.apply_command(NavCommand::SetReference(Axis::Depth, -1.0));

        // depth fires at 70 ms (dt = 70 ms), then at 130 ms (dt = 60 ms)
        for t in [30, 70, 110, 130] {
            scheduler.tick(t0 + ms(t), NO_COMMANDS, &mut feed, &mut driver);
        }
        let i_error = scheduler.context().pids.depth.i_error;
        assert!((i_error - 0.13).abs() < 1e-9, "i_error = {i_error}");
    }

    #[test]
    fn test_arming_zeroes_integrators() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut driver = RecordingDriver::default();

        for axis in Axis::ALL {
            scheduler.context_mut().pids.channel_mut(axis).i_error = 3.0;
        }
        scheduler.context_mut().pids.yaw.measured = 123.0;

        assert_eq!(scheduler.update_gate(t0, Some(12.0), &mut driver), Some(GateEvent::ArmingStarted));
        // Re-initialisation sends neutral even though we are not armed.
        assert_eq!(driver.vertical, vec![scheduler.mixer().neutral_vertical()]);
        assert_eq!(driver.voith, vec![scheduler.mixer().neutral_voith()]);

        for t in [1, 50, 99] {
            assert_eq!(scheduler.update_gate(t0 + ms(t), Some(12.0), &mut driver), None);
            assert!(matches!(scheduler.arm_state(), ArmState::Arming { .. }));
        }
        assert_eq!(scheduler.context().pids.pitch.i_error, 3.0);

        assert_eq!(scheduler.update_gate(t0 + ms(100), Some(12.0), &mut driver), Some(GateEvent::Armed));
        assert_eq!(scheduler.arm_state(), ArmState::Armed);
        for axis in Axis::ALL {
            assert_eq!(scheduler.context().pids.channel(axis).i_error, 0.0);
        }
        assert_eq!(scheduler.context().pids.yaw.reference, 123.0);
    }

    #[test]
    fn test_transmits_only_when_armed() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(12.6);
        let mut driver = RecordingDriver::default();

        let report = scheduler.tick(t0, NO_COMMANDS, &mut feed, &mut driver);
        assert_eq!(report.gate_event, Some(GateEvent::ArmingStarted));
        let reinit = driver.vertical.len();

        let report = scheduler.tick(t0 + ms(60), NO_COMMANDS, &mut feed, &mut driver);
        assert!(report.vertical.is_some());
        assert!(!report.transmitted);
        assert_eq!(driver.vertical.len(), reinit);

        let report = scheduler.tick(t0 + ms(100), NO_COMMANDS, &mut feed, &mut driver);
        assert_eq!(report.gate_event, Some(GateEvent::Armed));
        assert!(report.transmitted);
        assert_eq!(driver.vertical.len(), reinit + 1);
        assert_eq!(driver.voith.len(), reinit + 1);

        // Kill switch drops: the very next tick still mixes but sends nothing.
        feed.set_simulated_battery(0.0);
        let report = scheduler.tick(t0 + ms(120), NO_COMMANDS, &mut feed, &mut driver);
        assert_eq!(report.gate_event, Some(GateEvent::Disarmed));
        assert!(report.fired.contains(&Axis::Pitch));
        assert!(report.vertical.is_some());
        assert!(report.voith.is_some());
        assert!(!report.transmitted);
        assert_eq!(driver.vertical.len(), reinit + 1);
        assert_eq!(driver.voith.len(), reinit + 1);
    }

    #[test]
    fn test_zero_errors_is_one_shot() {
        let mut settings = settings();
        settings.axes.depth.period_ms = 10;
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();
        scheduler.apply_command(NavCommand::SetReference(Axis::Depth, -2.0));

        scheduler.tick(t0 + ms(10), NO_COMMANDS, &mut feed, &mut driver);
        assert!(scheduler.context().pids.depth.i_error > 0.0);

        // Applied before the axes fire, then gone.
        scheduler.tick(t0 + ms(15), [NavCommand::ZeroErrors], &mut feed, &mut driver);
        assert_eq!(scheduler.context().pids.depth.i_error, 0.0);

        scheduler.tick(t0 + ms(25), NO_COMMANDS, &mut feed, &mut driver);
        assert!(scheduler.context().pids.depth.i_error > 0.0);
    }

    #[test]
    fn test_mission_switch_changes_fx_path() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();

        scheduler.tick(t0 + ms(20), [NavCommand::SetReference(Axis::Fx, 7.0)], &mut feed, &mut driver);
        assert_eq!(scheduler.context().pids.fx.output(), 7.0);
        assert_eq!(scheduler.context().pids.fx.i_error, 0.0);

        scheduler.tick(t0 + ms(40), [NavCommand::SetMission(MissionMode::BoxPickup)], &mut feed, &mut driver);
        let first = scheduler.context().pids.fx.i_error;
        scheduler.tick(t0 + ms(60), NO_COMMANDS, &mut feed, &mut driver);
        let second = scheduler.context().pids.fx.i_error;
        assert!(first < 0.0 && second < first);
    }

    #[test]
    fn test_voith_command_from_lateral_outputs() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();

        let commands = [
            NavCommand::SetReference(Axis::Fx, 30.0),
            NavCommand::SetReference(Axis::Fy, 40.0),
            NavCommand::SetNetThrust(10.0),
        ];
        scheduler.tick(t0 + ms(20), commands, &mut feed, &mut driver);

        let cmd = scheduler.voith_command();
        assert_eq!(cmd.voith_thrust, 50.0);
        assert!((cmd.voith_angle - 30.0f64.atan2(40.0)).abs() < 1e-12);
        assert_eq!(cmd.net_thrust, 10.0);
    }

    #[test]
    fn test_vertical_budget_favours_roll() {
        let mut settings = settings();
        settings.mixer.total_vertical_bound = 120.0;
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        {
            let pids = &mut scheduler.context_mut().pids;
            pids.roll.output_bound = 100.0;
            pids.roll.gains = Gains { kp: 1.0, ki: 0.0, kd: 0.0 };
            pids.roll.measured = 50.0;
            pids.roll.compute(ms(20));
            pids.depth.gains = Gains { kp: 1.0, ki: 0.0, kd: 0.0 };
            pids.depth.measured = 100.0;
            pids.depth.compute(ms(20));
        }

        let cmd = scheduler.mixer_command().vertical;
        assert_eq!(cmd.roll_torque, 50.0);
        assert_eq!(cmd.vertical_force, 70.0);
        assert!(cmd.vertical_force.abs() + cmd.roll_torque.abs() <= 120.0);
    }

    #[test]
    fn test_out_of_range_holds_last_command() {
        let mut settings = settings();
        // Lets the roll output exceed what the mixer accepts.
        settings.axes.roll.output_bound = 500.0;
        settings.axes.roll_lateral_kp = 10.0;
        settings.controller.mission = MissionMode::BoxPickup;
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();

        let first = scheduler.tick(t0 + ms(20), NO_COMMANDS, &mut feed, &mut driver);
        let held = first.vertical.unwrap();

        // Roll fires before fx, so the coupling shows up one period later.
        scheduler.tick(t0 + ms(40), [NavCommand::SetReference(Axis::Fx, 30.0)], &mut feed, &mut driver);
        let report = scheduler.tick(t0 + ms(60), NO_COMMANDS, &mut feed, &mut driver);
        assert_eq!(scheduler.context().pids.roll.output(), -300.0);
        assert_eq!(report.vertical, Some(held));
    }

    #[test]
    fn test_nan_reference_goes_neutral() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();

        scheduler.apply_command(NavCommand::SetReference(Axis::Yaw, f64::NAN));
        scheduler.apply_command(NavCommand::SetReference(Axis::Roll, f64::NAN));
        let report = scheduler.tick(t0 + ms(20), NO_COMMANDS, &mut feed, &mut driver);
        assert_eq!(report.voith, Some(scheduler.mixer().neutral_voith()));
        assert_eq!(report.vertical, Some(scheduler.mixer().neutral_vertical()));
    }

    #[test]
    fn test_send_failure_is_not_fatal() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(12.6);

        scheduler.tick(t0, NO_COMMANDS, &mut feed, &mut BrokenDriver);
        let report = scheduler.tick(t0 + ms(100), NO_COMMANDS, &mut feed, &mut BrokenDriver);
        assert_eq!(report.gate_event, Some(GateEvent::Armed));
        assert!(!report.transmitted);
    }

    #[test]
    fn test_telemetry_snapshot() {
        let settings = settings();
        let t0 = Instant::now();
        let mut scheduler = ControlScheduler::new(&settings, t0);
        let mut feed = quiet_feed(0.0);
        let mut driver = RecordingDriver::default();

        scheduler.tick(t0 + ms(20), [NavCommand::SetReference(Axis::Depth, 1.0)], &mut feed, &mut driver);
        scheduler.tick(t0 + ms(50), NO_COMMANDS, &mut feed, &mut driver);

        let telemetry = scheduler.telemetry(t0 + ms(55));
        assert_eq!(telemetry.uptime, ms(55));
        assert_eq!(telemetry.arm_state, ArmState::Unarmed);
        assert_eq!(telemetry.pitch.last_fired, ms(50));
        assert_eq!(telemetry.depth.last_fired, ms(50));
        assert_eq!(telemetry.fx.last_fired, ms(50));
        assert_eq!(telemetry.depth.reference, 1.0);
        assert!(telemetry.sensors_simulated);
        assert!(telemetry.to_string().contains("depth"));
    }
}

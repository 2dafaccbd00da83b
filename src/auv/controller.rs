/**
 * AUV Controller
 *
 * Owns the outer loop that:
 * 1. Drains pending navigation commands from the command topic
 * 2. Steps the control scheduler against the monotonic clock
 * 3. Publishes a telemetry snapshot
 * 4. Commands every actuator to neutral on shutdown
 *
 * Mission logic and operators talk to the loop only through topics, so a slow
 * or stuck producer can never stall control.
 */

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread;
use std::time::Instant;

use tracing::{info, trace, warn};

use crate::config::Settings;
use crate::error::LinkError;
use crate::link::SerialLink;
use crate::pubsub::{Topic, TopicRegistry, NAV_COMMAND_TOPIC, TELEMETRY_TOPIC};
use crate::sensors::SensorFeed;
use super::scheduler::{ActuatorDriver, ControlScheduler, NavCommand};
use super::telemetry::Telemetry;
use super::thrust_mixer::{VerticalPwm, VoithPwm};

const COMMAND_CAPACITY: usize = 64;
const TELEMETRY_CAPACITY: usize = 8;

/// Stand-in driver for runs without hardware: commands go nowhere.
#[derive(Debug, Default)]
pub struct DryRunDriver;

impl ActuatorDriver for DryRunDriver {
    fn send_vertical(&mut self, pwm: &VerticalPwm) -> Result<(), LinkError> {
        trace!(?pwm, "dry run: vertical");
        Ok(())
    }

    fn send_voith(&mut self, pwm: &VoithPwm) -> Result<(), LinkError> {
        trace!(?pwm, "dry run: voith");
        Ok(())
    }
}

/// Sensor input and actuator output for one run of the loop.
pub struct VehicleIo {
    pub feed: SensorFeed,
    pub actuators: Box<dyn ActuatorDriver>,
}

impl VehicleIo {
    /// Fully simulated: generated sensor readings, no actuator output.
    pub fn simulated(settings: &Settings) -> Self {
        Self {
            feed: SensorFeed::simulated(&settings.simulation),
            actuators: Box::new(DryRunDriver),
        }
    }

    /// Hardware over the configured serial port. Sensor readings still fall
    /// back to simulation if the link goes quiet.
    pub fn connect(settings: &Settings) -> Result<Self, LinkError> {
        let (reader, writer) = SerialLink::open(&settings.link)?;
        Ok(Self {
            feed: SensorFeed::with_source(Box::new(reader), &settings.simulation),
            actuators: Box::new(writer),
        })
    }
}

/// AUV Controller - runs the control loop until shut down
pub struct AuvController {
    settings: Settings,
    registry: Arc<TopicRegistry>,
    commands: Arc<Topic<NavCommand>>,
    telemetry: Arc<Topic<Telemetry>>,
    running: Arc<AtomicBool>,
}

impl AuvController {
    pub fn new(settings: Settings) -> Self {
        Self::with_registry(settings, Arc::new(TopicRegistry::new()))
    }

    /// Share topics with other components through an existing registry.
    pub fn with_registry(settings: Settings, registry: Arc<TopicRegistry>) -> Self {
        let commands = registry.get_or_create(NAV_COMMAND_TOPIC, COMMAND_CAPACITY);
        let telemetry = registry.get_or_create(TELEMETRY_TOPIC, TELEMETRY_CAPACITY);
        Self {
            settings,
            registry,
            commands,
            telemetry,
            // A controller runs once: shutdown before or during `run` ends it.
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Queue a command for the next iteration. False if the topic was busy.
    pub fn command(&self, cmd: NavCommand) -> bool {
        self.commands.publish(cmd).is_some()
    }

    pub fn latest_telemetry(&self) -> Option<Telemetry> {
        self.telemetry.peek_latest().map(|(t, _)| t)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the loop on this thread until `shutdown` is called.
    pub fn run(&self, mut io: VehicleIo) {
        let idle = self.settings.controller.idle();
        let mut scheduler = ControlScheduler::new(&self.settings, Instant::now());
        info!(
            hardware = io.feed.has_hardware(),
            mission = ?self.settings.controller.mission,
            "control loop started"
        );

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            scheduler.tick(now, self.commands.drain(), &mut io.feed, io.actuators.as_mut());
            self.telemetry.publish(scheduler.telemetry(now));
            thread::sleep(idle);
        }

        info!("commanding actuators to neutral");
        if let Err(e) = scheduler.send_neutral(io.actuators.as_mut()) {
            warn!(error = %e, "failed to neutralise actuators on shutdown");
        }
        self.telemetry.publish(scheduler.telemetry(Instant::now()));
        info!("shutdown complete");
    }

    /// Start in background thread
    pub fn start_background(self: Arc<Self>, io: VehicleIo) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            self.run(io);
        })
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

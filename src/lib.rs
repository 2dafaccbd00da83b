pub mod auv;
pub mod config;
pub mod control;
pub mod error;
pub mod link;
pub mod pubsub;
pub mod ring_buffer;
pub mod sensors;

pub use ring_buffer::RingBuffer;

pub use pubsub::{Message, Topic, TopicRegistry};

pub use auv::{AuvController, ControlScheduler, NavCommand, ThrustMixer};
pub use config::Settings;
pub use control::{Axis, Gains, MissionMode};
pub use error::{ConfigError, LinkError, MixError, SensorError};

pub mod message;
pub mod topic;
pub mod registry;

pub use message::Message;
pub use topic::Topic;
pub use registry::TopicRegistry;

//well-known topic names
pub const NAV_COMMAND_TOPIC: &str = "/nav/command";
pub const TELEMETRY_TOPIC: &str = "/nav/telemetry";

mod broadcast_publisher;
mod composite_publisher;
mod logging_publisher;

pub use broadcast_publisher::BroadcastEventPublisher;
pub use composite_publisher::CompositeEventPublisher;
pub use logging_publisher::LoggingEventPublisher;

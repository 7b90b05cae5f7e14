mod serial_queue;

pub use serial_queue::SerialQueue;

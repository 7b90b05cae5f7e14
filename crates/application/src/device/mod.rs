mod factory;
mod reader;

pub use factory::ConnectionFactory;
pub use reader::{Reader, ReaderState};

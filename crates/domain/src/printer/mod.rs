mod dialect;
mod encoder;
mod job;

pub use dialect::Dialect;
pub use encoder::CommandEncoder;
pub use job::{
    Align, BarcodeElement, ContentElement, ImageElement, PrintConfig, PrintJob, QrElement,
    RawElement, TableColumn, TableElement, TextElement, require_range,
};

//! Printer command encoders, one per dialect.

mod cpcl;
mod escpos;
mod layout;
mod raster;
mod table;
mod text;
mod tsc;

pub use cpcl::CpclEncoder;
pub use escpos::EscPosEncoder;
pub use raster::{MonoBitmap, rasterize};
pub use text::{encode_gbk, gbk_width, pad_gbk};
pub use tsc::TscEncoder;

use domain::printer::{CommandEncoder, Dialect};
use std::sync::Arc;

/// Encoder for a dialect, chosen once when a slot is built
pub fn encoder_for(dialect: Dialect) -> Arc<dyn CommandEncoder> {
    match dialect {
        Dialect::Esc => Arc::new(EscPosEncoder),
        Dialect::Tsc => Arc::new(TscEncoder),
        Dialect::Cpcl => Arc::new(CpclEncoder),
    }
}

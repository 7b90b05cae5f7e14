//! ESC/POS receipt encoder.

use domain::error::Result;
use domain::printer::{
    Align, BarcodeElement, CommandEncoder, ContentElement, Dialect, ImageElement, PrintJob,
    QrElement, TableElement, TextElement, require_range,
};
use domain::DomainError;

use super::raster::{decode_base64, rasterize};
use super::table::column_cells;
use super::text::{encode_gbk, require_printable_ascii};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const FS: u8 = 0x1C;
const LF: u8 = 0x0A;

pub const DEFAULT_PAPER_WIDTH: i32 = 576;
pub const DEFAULT_LINE_WIDTH: i32 = 48;
const DEFAULT_FEED_LINES: i32 = 4;
const DEFAULT_BARCODE_HEIGHT: i32 = 60;
const DEFAULT_QR_SIZE: i32 = 4;
const MAX_QR_BYTES: usize = 7089;
const MAX_BARCODE_LEN: usize = 253;

/// Byte buffer with the ESC/POS commands the receipt renderer needs
struct EscPosBuilder {
    buf: Vec<u8>,
}

impl EscPosBuilder {
    fn new() -> Self {
        let mut buf = Vec::with_capacity(1024);
        // ESC @ then FS & (double-byte GBK mode)
        buf.extend_from_slice(&[ESC, 0x40, FS, 0x26]);
        Self { buf }
    }

    fn align(&mut self, align: Align) -> &mut Self {
        let n = match align {
            Align::Left => 0,
            Align::Center => 1,
            Align::Right => 2,
        };
        self.buf.extend_from_slice(&[ESC, 0x61, n]);
        self
    }

    fn bold(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x45, u8::from(on)]);
        self
    }

    fn underline(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x2D, u8::from(on)]);
        self
    }

    /// GS ! with multipliers already validated to 1..=8
    fn size(&mut self, width: u8, height: u8) -> &mut Self {
        self.buf
            .extend_from_slice(&[GS, 0x21, ((width - 1) << 4) | (height - 1)]);
        self
    }

    fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    fn newline(&mut self) -> &mut Self {
        self.buf.push(LF);
        self
    }

    fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x64, lines]);
        self
    }

    fn cut(&mut self) -> &mut Self {
        // GS V 66 0: feed to cutter then full cut
        self.buf.extend_from_slice(&[GS, 0x56, 0x42, 0x00]);
        self
    }

    fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// ESC/POS encoder for receipt printers
#[derive(Debug, Default, Clone, Copy)]
pub struct EscPosEncoder;

impl EscPosEncoder {
    fn text(b: &mut EscPosBuilder, el: &TextElement) -> Result<()> {
        let width = require_range("text width", el.width, 1..=8)? as u8;
        let height = require_range("text height", el.height, 1..=8)? as u8;
        let bytes = encode_gbk(&el.content)?;
        b.align(el.align)
            .bold(el.weight)
            .underline(el.underline)
            .size(width, height)
            .raw(&bytes);
        if el.linefeed {
            b.newline();
        }
        Ok(())
    }

    fn barcode(b: &mut EscPosBuilder, el: &BarcodeElement) -> Result<()> {
        require_printable_ascii("barcode", &el.content)?;
        if el.content.len() > MAX_BARCODE_LEN {
            return Err(DomainError::ContentError(format!(
                "barcode longer than {} characters",
                MAX_BARCODE_LEN
            )));
        }
        let height = require_range(
            "barcode height",
            el.height.unwrap_or(DEFAULT_BARCODE_HEIGHT),
            1..=255,
        )? as u8;

        b.align(el.align)
            // HRI below, bar height, module width 2
            .raw(&[GS, 0x48, 0x02])
            .raw(&[GS, 0x68, height])
            .raw(&[GS, 0x77, 0x02])
            // CODE128 with code set B
            .raw(&[GS, 0x6B, 0x49, (el.content.len() + 2) as u8, b'{', b'B'])
            .raw(el.content.as_bytes())
            .newline();
        Ok(())
    }

    fn qrcode(b: &mut EscPosBuilder, el: &QrElement) -> Result<()> {
        let data = el.content.as_bytes();
        if data.is_empty() {
            return Err(DomainError::ContentError("qrcode is empty".to_string()));
        }
        if data.len() > MAX_QR_BYTES {
            return Err(DomainError::ContentError(format!(
                "qrcode longer than {} bytes",
                MAX_QR_BYTES
            )));
        }
        let size = el.size.unwrap_or(DEFAULT_QR_SIZE).clamp(1, 16) as u8;
        let len = data.len() + 3;

        b.align(el.align)
            // Model 2
            .raw(&[GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00])
            // Module size
            .raw(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size])
            // Error correction L
            .raw(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x30])
            // Store
            .raw(&[GS, 0x28, 0x6B, (len & 0xFF) as u8, (len >> 8) as u8, 0x31, 0x50, 0x30])
            .raw(data)
            // Print
            .raw(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30])
            .newline();
        Ok(())
    }

    fn image(b: &mut EscPosBuilder, el: &ImageElement, paper_width: i32) -> Result<()> {
        let width = require_range("image width", el.width.unwrap_or(paper_width), 1..=paper_width)?;
        let bitmap = rasterize(&el.content, width as u32)?;
        let wb = bitmap.width_bytes();

        b.align(el.align)
            .raw(&[GS, 0x76, 0x30, 0x00])
            .raw(&[(wb & 0xFF) as u8, (wb >> 8) as u8])
            .raw(&[(bitmap.height & 0xFF) as u8, (bitmap.height >> 8) as u8])
            .raw(&bitmap.data)
            .newline();
        Ok(())
    }

    fn table(b: &mut EscPosBuilder, el: &TableElement, line_width: i32) -> Result<()> {
        let row: String = column_cells(&el.columns, line_width as usize)?.concat();
        let bytes = encode_gbk(&row)?;
        b.align(Align::Left)
            .bold(el.bold)
            .underline(false)
            .size(1, 1)
            .raw(&bytes)
            .newline();
        Ok(())
    }
}

impl CommandEncoder for EscPosEncoder {
    fn dialect(&self) -> Dialect {
        Dialect::Esc
    }

    fn encode_receipt(&self, job: &PrintJob) -> Result<Vec<u8>> {
        let config = &job.config;
        let paper_width = require_range(
            "paper_width",
            config.paper_width.unwrap_or(DEFAULT_PAPER_WIDTH),
            8..=2048,
        )?;
        let line_width = require_range(
            "line_width",
            config.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
            8..=255,
        )?;
        let feed_lines = require_range(
            "feed_lines",
            config.feed_lines.unwrap_or(DEFAULT_FEED_LINES),
            0..=255,
        )?;

        let mut b = EscPosBuilder::new();
        for element in &job.elements {
            match element {
                ContentElement::Text(el) => Self::text(&mut b, el)?,
                ContentElement::Barcode(el) => Self::barcode(&mut b, el)?,
                ContentElement::QrCode(el) => Self::qrcode(&mut b, el)?,
                ContentElement::Image(el) => Self::image(&mut b, el, paper_width)?,
                ContentElement::Table(el) => Self::table(&mut b, el, line_width)?,
                ContentElement::Raw(el) => {
                    b.raw(&decode_base64("raw", &el.content)?);
                }
            }
        }

        b.feed(feed_lines as u8);
        if config.cut {
            b.cut();
        }
        Ok(b.build())
    }

    fn encode_self_test(&self) -> Vec<u8> {
        // GS ( A: execute test print
        vec![GS, 0x28, 0x41, 0x02, 0x00, 0x00, 0x02]
    }
}

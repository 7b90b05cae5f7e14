//! TSC (TSPL) label encoder.

use domain::DomainError;
use domain::error::Result;
use domain::printer::{
    Align, CommandEncoder, ContentElement, Dialect, PrintConfig, PrintJob, require_range,
};

use super::escpos::{DEFAULT_LINE_WIDTH, DEFAULT_PAPER_WIDTH};
use super::layout::{DOTS_PER_MM, Flow, code128_modules, gap_mm, require_gap, resolve_x};
use super::raster::{decode_base64, rasterize};
use super::table::column_cells;
use super::text::{encode_gbk, gbk_width, require_printable_ascii, require_single_line};

const DEFAULT_WIDTH_MM: i32 = 40;
const DEFAULT_HEIGHT_MM: i32 = 30;
/// Hundredths of a millimetre
const DEFAULT_GAP: i32 = 200;
const DEFAULT_BARCODE_HEIGHT: i32 = 100;
const DEFAULT_QR_CELL: i32 = 5;
const FONT: &str = "TSS24.BF2";
/// TSS24 renders single-byte glyphs 12 dots wide, 24 high
const GLYPH_WIDTH: i32 = 12;
const GLYPH_HEIGHT: i32 = 24;

/// TSPL string literal: embedded quotes use the `\["]` escape
fn quote(s: &str) -> String {
    s.replace('"', "\\[\"]")
}

#[derive(Default)]
struct TsplWriter {
    buf: Vec<u8>,
}

impl TsplWriter {
    fn line(&mut self, command: &str) -> Result<()> {
        self.buf.extend_from_slice(&encode_gbk(command)?);
        self.buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// TSPL encoder for label printers
#[derive(Debug, Default, Clone, Copy)]
pub struct TscEncoder;

impl TscEncoder {
    /// Render all elements into `area` dots of width. Returns the commands
    /// and the lowest dot row reached.
    fn body(job: &PrintJob, area: i32) -> Result<(Vec<u8>, i32)> {
        let line_width = require_range(
            "line_width",
            job.config.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
            8..=255,
        )?;
        let mut w = TsplWriter::default();
        let mut flow = Flow::new();

        for element in &job.elements {
            match element {
                ContentElement::Text(el) => {
                    let xm = require_range("text width", el.width, 1..=10)?;
                    let ym = require_range("text height", el.height, 1..=10)?;
                    let mut y = flow.place(el.y)?;
                    for line in el.content.split('\n') {
                        let line = line.strip_suffix('\r').unwrap_or(line);
                        require_single_line("text", line)?;
                        let width = gbk_width(line) as i32 * GLYPH_WIDTH * xm;
                        let x = resolve_x(el.x, el.align, width, area)?;
                        w.line(&format!(
                            "TEXT {},{},\"{}\",0,{},{},\"{}\"",
                            x,
                            y,
                            FONT,
                            xm,
                            ym,
                            quote(line)
                        ))?;
                        y += GLYPH_HEIGHT * ym + 8;
                    }
                    flow.reach(y);
                }
                ContentElement::Barcode(el) => {
                    require_printable_ascii("barcode", &el.content)?;
                    let height = require_range(
                        "barcode height",
                        el.height.unwrap_or(DEFAULT_BARCODE_HEIGHT),
                        1..=1000,
                    )?;
                    let y = flow.place(el.y)?;
                    let width = code128_modules(el.content.len()) * 2;
                    let x = resolve_x(el.x, el.align, width, area)?;
                    w.line(&format!(
                        "BARCODE {},{},\"128\",{},1,0,2,2,\"{}\"",
                        x,
                        y,
                        height,
                        quote(&el.content)
                    ))?;
                    // Room for the human readable line
                    flow.reach(y + height + 30);
                }
                ContentElement::QrCode(el) => {
                    if el.content.is_empty() {
                        return Err(DomainError::ContentError("qrcode is empty".to_string()));
                    }
                    require_single_line("qrcode", &el.content)?;
                    let cell = el.size.unwrap_or(DEFAULT_QR_CELL).clamp(1, 10);
                    let y = flow.place(el.y)?;
                    let x = resolve_x(el.x, el.align, cell * 33, area)?;
                    w.line(&format!(
                        "QRCODE {},{},L,{},A,0,\"{}\"",
                        x,
                        y,
                        cell,
                        quote(&el.content)
                    ))?;
                    flow.reach(y + cell * 33 + 8);
                }
                ContentElement::Image(el) => {
                    let max = area.max(1);
                    let target = require_range("image width", el.width.unwrap_or(max), 1..=max)?;
                    let bitmap = rasterize(&el.content, target as u32)?;
                    let y = flow.place(el.y)?;
                    let x = resolve_x(el.x, el.align, bitmap.width as i32, area)?;
                    w.raw(
                        format!(
                            "BITMAP {},{},{},{},0,",
                            x,
                            y,
                            bitmap.width_bytes(),
                            bitmap.height
                        )
                        .as_bytes(),
                    );
                    w.raw(&bitmap.inverted());
                    w.raw(b"\r\n");
                    flow.reach(y + bitmap.height as i32 + 8);
                }
                ContentElement::Table(el) => {
                    let row = column_cells(&el.columns, line_width as usize)?.concat();
                    require_single_line("table", &row)?;
                    let y = flow.place(el.y)?;
                    let x = resolve_x(el.x, Align::Left, 0, area)?;
                    w.line(&format!(
                        "TEXT {},{},\"{}\",0,1,1,\"{}\"",
                        x,
                        y,
                        FONT,
                        quote(&row)
                    ))?;
                    flow.reach(y + 32);
                }
                ContentElement::Raw(el) => w.raw(&decode_base64("raw", &el.content)?),
            }
        }

        Ok((w.buf, flow.bottom()))
    }

    fn header(config: &PrintConfig, width_mm: i32, height_mm: i32, gap: i32) -> Result<Vec<u8>> {
        let direction = require_range("direction", config.direction.unwrap_or(0), 0..=1)?;
        let mut w = TsplWriter::default();
        w.line(&format!("SIZE {} mm,{} mm", width_mm, height_mm))?;
        w.line(&format!("GAP {} mm,0 mm", gap_mm(gap)))?;
        if let Some(density) = config.density {
            w.line(&format!("DENSITY {}", require_range("density", density, 0..=15)?))?;
        }
        w.line(&format!("DIRECTION {}", direction))?;
        w.line("REFERENCE 0,0")?;
        w.line("CLS")?;
        Ok(w.buf)
    }

    fn assemble(header: Vec<u8>, body: Vec<u8>, copies: i32) -> Vec<u8> {
        let mut out = header;
        out.extend_from_slice(&body);
        out.extend_from_slice(format!("PRINT {},1\r\n", copies).as_bytes());
        out
    }

    fn copies(config: &PrintConfig) -> Result<i32> {
        require_range("copies", config.copies.unwrap_or(1), 1..=999)
    }
}

impl CommandEncoder for TscEncoder {
    fn dialect(&self) -> Dialect {
        Dialect::Tsc
    }

    /// Continuous label sized to the content, no gap
    fn encode_receipt(&self, job: &PrintJob) -> Result<Vec<u8>> {
        let config = &job.config;
        let paper_width = require_range(
            "paper_width",
            config.paper_width.unwrap_or(DEFAULT_PAPER_WIDTH),
            8..=2048,
        )?;
        let width_mm = match config.width {
            Some(width) => require_range("width", width, 1..=500)?,
            None => paper_width / DOTS_PER_MM,
        };
        let copies = Self::copies(config)?;

        let (body, bottom) = Self::body(job, width_mm * DOTS_PER_MM)?;
        let height_mm = ((bottom + DOTS_PER_MM - 1) / DOTS_PER_MM).max(1);
        let header = Self::header(config, width_mm, height_mm, 0)?;
        Ok(Self::assemble(header, body, copies))
    }

    fn encode_label(&self, job: &PrintJob) -> Result<Vec<u8>> {
        let config = &job.config;
        let width_mm = require_range("width", config.width.unwrap_or(DEFAULT_WIDTH_MM), 1..=500)?;
        let height_mm =
            require_range("height", config.height.unwrap_or(DEFAULT_HEIGHT_MM), 1..=1000)?;
        let gap = require_gap(config.gap.unwrap_or(DEFAULT_GAP))?;
        let copies = Self::copies(config)?;

        let header = Self::header(config, width_mm, height_mm, gap)?;
        let (body, _) = Self::body(job, width_mm * DOTS_PER_MM)?;
        Ok(Self::assemble(header, body, copies))
    }

    fn encode_self_test(&self) -> Vec<u8> {
        b"SELFTEST\r\n".to_vec()
    }

    fn encode_job(&self, job: &PrintJob) -> Result<Vec<u8>> {
        self.encode_label(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(config: serde_json::Value, data: serde_json::Value) -> PrintJob {
        PrintJob::from_request(&config, &data).unwrap()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_label_golden() {
        let out = TscEncoder
            .encode_label(&job(
                json!({"width": 40, "height": 30}),
                json!([{"type": "text", "content": "A", "x": 10, "y": 10}]),
            ))
            .unwrap();
        assert_eq!(
            text(out),
            "SIZE 40 mm,30 mm\r\nGAP 2 mm,0 mm\r\nDIRECTION 0\r\nREFERENCE 0,0\r\nCLS\r\n\
             TEXT 10,10,\"TSS24.BF2\",0,1,1,\"A\"\r\nPRINT 1,1\r\n"
        );
    }

    #[test]
    fn test_header_options() {
        let out = text(
            TscEncoder
                .encode_label(&job(
                    json!({"gap": 250, "density": 8, "direction": 1, "copies": 3}),
                    json!([]),
                ))
                .unwrap(),
        );
        assert!(out.contains("GAP 2.5 mm,0 mm\r\n"));
        assert!(out.contains("DENSITY 8\r\n"));
        assert!(out.contains("DIRECTION 1\r\n"));
        assert!(out.ends_with("PRINT 3,1\r\n"));
    }

    #[test]
    fn test_gap_in_hundredths_of_mm() {
        for (gap, rendered) in [(0, "GAP 0 mm,0 mm"), (5, "GAP 0.05 mm,0 mm"), (300, "GAP 3 mm,0 mm")] {
            let out = text(
                TscEncoder
                    .encode_label(&job(json!({"gap": gap}), json!([])))
                    .unwrap(),
            );
            assert!(out.contains(&format!("{}\r\n", rendered)), "{}", out);
        }
    }

    #[test]
    fn test_line_breaks_cannot_smuggle_commands() {
        let cases = [
            json!([{"type": "table", "columns": [{"text": "A\r\nPRINT 9,1\r\nB"}]}]),
            json!([{"type": "qrcode", "content": "x\"\r\nPRINT 9,1\r\n"}]),
            json!([{"type": "text", "content": "A\rPRINT 9,1"}]),
        ];
        for data in cases {
            let err = TscEncoder.encode_label(&job(json!({}), data)).unwrap_err();
            assert!(matches!(err, DomainError::ContentError(_)), "{:?}", err);
        }

        // CRLF between lines is still a line break
        let out = text(
            TscEncoder
                .encode_label(&job(json!({}), json!([{"type": "text", "content": "A\r\nB"}])))
                .unwrap(),
        );
        assert_eq!(out.matches("PRINT").count(), 1);
        assert!(out.contains(",\"B\"\r\n"));
    }

    #[test]
    fn test_elements_flow_down() {
        let out = text(
            TscEncoder
                .encode_label(&job(
                    json!({}),
                    json!([
                        {"type": "text", "content": "Name"},
                        {"type": "barcode", "content": "123", "height": 50},
                        {"type": "qrcode", "content": "q", "size": 2}
                    ]),
                ))
                .unwrap(),
        );
        assert!(out.contains("TEXT 0,0,\"TSS24.BF2\",0,1,1,\"Name\"\r\n"));
        assert!(out.contains("BARCODE 0,32,\"128\",50,1,0,2,2,\"123\"\r\n"));
        assert!(out.contains("QRCODE 0,112,L,2,A,0,\"q\"\r\n"));
    }

    #[test]
    fn test_centered_text() {
        let out = text(
            TscEncoder
                .encode_label(&job(
                    json!({"width": 10}),
                    json!([{"type": "text", "content": "AB", "align": "center"}]),
                ))
                .unwrap(),
        );
        // 80 dots wide, 24 dots of text
        assert!(out.contains("TEXT 28,0,"));
    }

    #[test]
    fn test_quotes_escaped() {
        let out = text(
            TscEncoder
                .encode_label(&job(
                    json!({}),
                    json!([{"type": "text", "content": "say \"hi\""}]),
                ))
                .unwrap(),
        );
        assert!(out.contains("\"say \\[\"]hi\\[\"]\""));
    }

    #[test]
    fn test_receipt_is_continuous() {
        let out = text(
            TscEncoder
                .encode_receipt(&job(
                    json!({}),
                    json!([{"type": "text", "content": "A"}, {"type": "text", "content": "B"}]),
                ))
                .unwrap(),
        );
        // Two lines of 32 dots, 72 mm wide paper
        assert!(out.starts_with("SIZE 72 mm,8 mm\r\nGAP 0 mm,0 mm\r\n"));
        assert!(out.contains("TEXT 0,32,"));
    }

    #[test]
    fn test_qr_cell_clamped() {
        let out = text(
            TscEncoder
                .encode_label(&job(json!({}), json!([{"type": "qrcode", "content": "x", "size": 99}])))
                .unwrap(),
        );
        assert!(out.contains("QRCODE 0,0,L,10,A,0,\"x\""));
    }

    #[test]
    fn test_rejections() {
        let cases = [
            (json!({"density": 16}), json!([])),
            (json!({"gap": -1}), json!([])),
            (json!({"copies": 0}), json!([])),
            (json!({}), json!([{"type": "text", "content": "x", "width": 11}])),
            (json!({}), json!([{"type": "barcode", "content": "x", "height": 1001}])),
            (json!({}), json!([{"type": "text", "content": "x", "x": -5}])),
        ];
        for (config, data) in cases {
            let err = TscEncoder.encode_label(&job(config, data)).unwrap_err();
            assert!(matches!(err, DomainError::ContentError(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_natural_mode_is_label() {
        let j = job(json!({}), json!([{"type": "text", "content": "A"}]));
        assert_eq!(
            TscEncoder.encode_job(&j).unwrap(),
            TscEncoder.encode_label(&j).unwrap()
        );
        assert_eq!(TscEncoder.encode_self_test(), b"SELFTEST\r\n".to_vec());
    }
}

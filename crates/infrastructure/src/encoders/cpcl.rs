//! CPCL encoder for mobile receipt/label printers.
//!
//! The page height has to be known up front in the `!` header, so the
//! body is rendered first and the header sized from where the content ended.

use domain::DomainError;
use domain::error::Result;
use domain::printer::{Align, CommandEncoder, ContentElement, Dialect, PrintJob, require_range};

use super::escpos::{DEFAULT_LINE_WIDTH, DEFAULT_PAPER_WIDTH};
use super::layout::{DOTS_PER_MM, Flow, MAX_COORD, require_gap, resolve_x};
use super::raster::{decode_base64, rasterize};
use super::table::column_cells;
use super::text::{encode_gbk, require_printable_ascii, require_single_line};

const DEFAULT_BARCODE_HEIGHT: i32 = 50;
const DEFAULT_QR_UNIT: i32 = 6;
const LINE_HEIGHT: i32 = 24;

fn justify(align: Align) -> &'static str {
    match align {
        Align::Left => "LEFT",
        Align::Center => "CENTER",
        Align::Right => "RIGHT",
    }
}

fn explicit_x(x: Option<i32>) -> Result<i32> {
    x.map_or(Ok(0), |x| require_range("x", x, 0..=MAX_COORD))
}

#[derive(Default)]
struct CpclWriter {
    buf: Vec<u8>,
}

impl CpclWriter {
    fn line(&mut self, command: &str) -> Result<()> {
        self.buf.extend_from_slice(&encode_gbk(command)?);
        self.buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CpclEncoder;

impl CommandEncoder for CpclEncoder {
    fn dialect(&self) -> Dialect {
        Dialect::Cpcl
    }

    fn encode_receipt(&self, job: &PrintJob) -> Result<Vec<u8>> {
        let config = &job.config;
        let page_width = require_range(
            "paper_width",
            config.paper_width.unwrap_or(DEFAULT_PAPER_WIDTH),
            8..=2048,
        )?;
        let line_width = require_range(
            "line_width",
            config.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
            8..=255,
        )?;
        let copies = require_range("copies", config.copies.unwrap_or(1), 1..=999)?;
        let contrast = config
            .density
            .map(|d| require_range("density", d, 0..=3))
            .transpose()?;
        let gap = config.gap.map(require_gap).transpose()?.unwrap_or(0);

        let mut w = CpclWriter::default();
        let mut flow = Flow::new();

        for element in &job.elements {
            match element {
                ContentElement::Text(el) => {
                    let mag_w = require_range("text width", el.width, 1..=16)?;
                    let mag_h = require_range("text height", el.height, 1..=16)?;
                    let x = explicit_x(el.x)?;
                    let mut y = flow.place(el.y)?;
                    w.line(justify(el.align))?;
                    w.line(&format!("SETMAG {} {}", mag_w, mag_h))?;
                    w.line(&format!("SETBOLD {}", u8::from(el.weight)))?;
                    w.line(if el.underline { "UNDERLINE ON" } else { "UNDERLINE OFF" })?;
                    for line in el.content.split('\n') {
                        let line = line.strip_suffix('\r').unwrap_or(line);
                        require_single_line("text", line)?;
                        w.line(&format!("TEXT 24 0 {} {} {}", x, y, line))?;
                        y += LINE_HEIGHT * mag_h + 8;
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
                    let x = explicit_x(el.x)?;
                    let y = flow.place(el.y)?;
                    w.line(justify(el.align))?;
                    w.line(&format!(
                        "BARCODE 128 1 1 {} {} {} {}",
                        height, x, y, el.content
                    ))?;
                    flow.reach(y + height + 8);
                }
                ContentElement::QrCode(el) => {
                    if el.content.is_empty() {
                        return Err(DomainError::ContentError("qrcode is empty".to_string()));
                    }
                    require_single_line("qrcode", &el.content)?;
                    let unit = el.size.unwrap_or(DEFAULT_QR_UNIT).clamp(1, 32);
                    let x = explicit_x(el.x)?;
                    let y = flow.place(el.y)?;
                    w.line(justify(el.align))?;
                    w.line(&format!("B QR {} {} M 2 U {}", x, y, unit))?;
                    w.line(&format!("MA,{}", el.content))?;
                    w.line("ENDQR")?;
                    flow.reach(y + unit * 33 + 8);
                }
                ContentElement::Image(el) => {
                    let target =
                        require_range("image width", el.width.unwrap_or(page_width), 1..=page_width)?;
                    let bitmap = rasterize(&el.content, target as u32)?;
                    let y = flow.place(el.y)?;
                    // Graphics ignore justification; place them ourselves
                    let x = resolve_x(el.x, el.align, bitmap.width as i32, page_width)?;
                    w.line("LEFT")?;
                    w.line(&format!(
                        "EG {} {} {} {} {}",
                        bitmap.width_bytes(),
                        bitmap.height,
                        x,
                        y,
                        bitmap.to_hex()
                    ))?;
                    flow.reach(y + bitmap.height as i32 + 8);
                }
                ContentElement::Table(el) => {
                    let row = column_cells(&el.columns, line_width as usize)?.concat();
                    require_single_line("table", &row)?;
                    let x = explicit_x(el.x)?;
                    let y = flow.place(el.y)?;
                    w.line("LEFT")?;
                    w.line("SETMAG 1 1")?;
                    w.line(&format!("SETBOLD {}", u8::from(el.bold)))?;
                    w.line("UNDERLINE OFF")?;
                    w.line(&format!("TEXT 24 0 {} {} {}", x, y, row))?;
                    flow.reach(y + LINE_HEIGHT + 8);
                }
                ContentElement::Raw(el) => w.raw(&decode_base64("raw", &el.content)?),
            }
        }

        let height = match config.height {
            Some(mm) => require_range("height", mm, 1..=1000)? * DOTS_PER_MM,
            None => flow.bottom().max(DOTS_PER_MM),
        };

        let mut out = CpclWriter::default();
        out.line(&format!("! 0 200 200 {} {}", height, copies))?;
        out.line(&format!("PAGE-WIDTH {}", page_width))?;
        if let Some(contrast) = contrast {
            out.line(&format!("CONTRAST {}", contrast))?;
        }
        out.raw(&w.buf);
        if gap > 0 {
            out.line("FORM")?;
        }
        out.line("PRINT")?;
        Ok(out.buf)
    }

    fn encode_self_test(&self) -> Vec<u8> {
        b"! U1 do \"device.selftest\" \"\"\r\n".to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(config: serde_json::Value, data: serde_json::Value) -> Result<String> {
        let job = PrintJob::from_request(&config, &data)?;
        CpclEncoder
            .encode_receipt(&job)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn test_text_golden() {
        let out = render(json!({}), json!([{"type": "text", "content": "Hi"}])).unwrap();
        assert_eq!(
            out,
            "! 0 200 200 32 1\r\nPAGE-WIDTH 576\r\nLEFT\r\nSETMAG 1 1\r\nSETBOLD 0\r\n\
             UNDERLINE OFF\r\nTEXT 24 0 0 0 Hi\r\nPRINT\r\n"
        );
    }

    #[test]
    fn test_page_sized_to_content() {
        let out = render(
            json!({"copies": 2, "density": 2}),
            json!([
                {"type": "text", "content": "Title", "align": 1, "height": 2},
                {"type": "barcode", "content": "987", "height": 40},
                {"type": "qrcode", "content": "https://example.com", "size": 4}
            ]),
        )
        .unwrap();
        // 56 for the text, 48 for the barcode, 140 for the QR
        assert!(out.starts_with("! 0 200 200 244 2\r\nPAGE-WIDTH 576\r\nCONTRAST 2\r\n"));
        assert!(out.contains("CENTER\r\nSETMAG 1 2\r\n"));
        assert!(out.contains("BARCODE 128 1 1 40 0 56 987\r\n"));
        assert!(out.contains("B QR 0 104 M 2 U 4\r\nMA,https://example.com\r\nENDQR\r\n"));
        assert!(out.ends_with("PRINT\r\n"));
    }

    #[test]
    fn test_gap_emits_form() {
        let out = render(json!({"gap": 300, "height": 20}), json!([])).unwrap();
        assert!(out.starts_with("! 0 200 200 160 1\r\n"));
        assert!(out.ends_with("FORM\r\nPRINT\r\n"));
    }

    #[test]
    fn test_line_breaks_cannot_smuggle_commands() {
        let cases = [
            json!([{"type": "table", "columns": [{"text": "A\r\nPRINT\r\nB"}]}]),
            json!([{"type": "qrcode", "content": "x\r\nENDQR\r\nPRINT"}]),
            json!([{"type": "text", "content": "A\rPRINT"}]),
        ];
        for data in cases {
            assert!(matches!(render(json!({}), data), Err(DomainError::ContentError(_))));
        }

        let out = render(json!({}), json!([{"type": "text", "content": "A\r\nB"}])).unwrap();
        assert!(out.contains("TEXT 24 0 0 0 A\r\nTEXT 24 0 0 32 B\r\n"));
        assert_eq!(out.matches("PRINT").count(), 1);
    }

    #[test]
    fn test_qr_unit_clamped() {
        let out = render(json!({}), json!([{"type": "qrcode", "content": "x", "size": 0}])).unwrap();
        assert!(out.contains("B QR 0 0 M 2 U 1\r\n"));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            render(json!({"density": 4}), json!([])),
            Err(DomainError::ContentError(_))
        ));
        assert!(matches!(
            render(json!({}), json!([{"type": "text", "content": "x", "width": 17}])),
            Err(DomainError::ContentError(_))
        ));
        assert!(matches!(
            render(json!({}), json!([{"type": "barcode", "content": ""}])),
            Err(DomainError::ContentError(_))
        ));
    }

    #[test]
    fn test_label_mode_unsupported() {
        assert!(matches!(
            CpclEncoder.encode_label(&PrintJob::default()),
            Err(DomainError::ContentError(_))
        ));
    }

    #[test]
    fn test_self_test_golden() {
        assert_eq!(
            CpclEncoder.encode_self_test(),
            b"! U1 do \"device.selftest\" \"\"\r\n".to_vec()
        );
    }
}

//! GBK text helpers shared by the encoders.
//!
//! Thermal printers in this family render text in GBK: ASCII is one byte
//! wide, CJK characters two. Column layout is therefore measured in GBK
//! bytes rather than chars.

use domain::printer::Align;
use domain::DomainError;
use domain::error::Result;

/// Encode text to GBK, rejecting characters with no GBK mapping
pub fn encode_gbk(s: &str) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = encoding_rs::GBK.encode(s);
    if had_errors {
        let offending = s
            .chars()
            .find(|c| encoding_rs::GBK.encode(&c.to_string()).2)
            .unwrap_or('?');
        return Err(DomainError::ContentError(format!(
            "character {:?} cannot be encoded in GBK",
            offending
        )));
    }
    Ok(bytes.into_owned())
}

/// Width of a string in GBK bytes (unmappable characters count as one)
pub fn gbk_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn char_width(c: char) -> usize {
    if c.is_ascii() {
        return 1;
    }
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = encoding_rs::GBK.encode(c.encode_utf8(&mut buf));
    if had_errors { 1 } else { bytes.len() }
}

/// Longest prefix that fits in `max_width` GBK bytes
pub fn truncate_gbk(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Fit a string into exactly `width` GBK bytes, truncating or padding
/// with spaces according to the alignment
pub fn pad_gbk(s: &str, width: usize, align: Align) -> String {
    let fitted = truncate_gbk(s, width);
    let spaces = width - gbk_width(&fitted);
    match align {
        Align::Left => format!("{}{}", fitted, " ".repeat(spaces)),
        Align::Right => format!("{}{}", " ".repeat(spaces), fitted),
        Align::Center => {
            let left = spaces / 2;
            format!("{}{}{}", " ".repeat(left), fitted, " ".repeat(spaces - left))
        }
    }
}

/// Content allowed inside barcode data: printable ASCII only
pub fn require_printable_ascii(field: &str, s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(DomainError::ContentError(format!("{} is empty", field)));
    }
    if let Some(c) = s.chars().find(|c| !(' '..='~').contains(c)) {
        return Err(DomainError::ContentError(format!(
            "{} contains non-ASCII character {:?}",
            field, c
        )));
    }
    Ok(())
}

/// Text embedded in a line-oriented command: control characters would end
/// the command early and let the rest run as commands of its own
pub fn require_single_line(field: &str, s: &str) -> Result<()> {
    if let Some(c) = s.chars().find(|c| c.is_control()) {
        return Err(DomainError::ContentError(format!(
            "{} contains control character {:?}",
            field, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gbk_width() {
        assert_eq!(gbk_width("hello"), 5);
        assert_eq!(gbk_width("你好"), 4);
        assert_eq!(gbk_width("AB中文CD"), 8);
    }

    #[test]
    fn test_encode_gbk() {
        assert_eq!(encode_gbk("A").unwrap(), vec![0x41]);
        assert_eq!(encode_gbk("中").unwrap(), vec![0xD6, 0xD0]);
    }

    #[test]
    fn test_unmappable_is_content_error() {
        let err = encode_gbk("ok \u{1F600}").unwrap_err();
        assert!(matches!(err, DomainError::ContentError(_)));
    }

    #[test]
    fn test_truncate_gbk() {
        assert_eq!(truncate_gbk("hello world", 5), "hello");
        assert_eq!(truncate_gbk("你好世界", 4), "你好");
        assert_eq!(truncate_gbk("AB中文", 3), "AB");
    }

    #[test]
    fn test_pad_gbk() {
        assert_eq!(pad_gbk("hi", 5, Align::Left), "hi   ");
        assert_eq!(pad_gbk("hi", 5, Align::Right), "   hi");
        assert_eq!(pad_gbk("hi", 6, Align::Center), "  hi  ");
        assert_eq!(pad_gbk("hello world", 5, Align::Left), "hello");
        // A double-byte char that does not fit leaves a space
        assert_eq!(pad_gbk("AB中", 3, Align::Left), "AB ");
    }

    #[test]
    fn test_printable_ascii() {
        assert!(require_printable_ascii("barcode", "ABC-123").is_ok());
        assert!(require_printable_ascii("barcode", "").is_err());
        assert!(require_printable_ascii("barcode", "编号").is_err());
    }

    #[test]
    fn test_single_line() {
        assert!(require_single_line("text", "Total: 9.50").is_ok());
        assert!(require_single_line("text", "").is_ok());
        for bad in ["A\r\nPRINT 1", "A\rB", "A\nB", "A\tB", "A\u{1b}B"] {
            assert!(matches!(
                require_single_line("text", bad),
                Err(DomainError::ContentError(_))
            ));
        }
    }
}

//! Placement helpers for the page-description dialects (TSC, CPCL).

use domain::error::Result;
use domain::printer::{Align, require_range};

/// Both dialects address the page in 203 dpi dots
pub const DOTS_PER_MM: i32 = 8;

/// Largest coordinate accepted for `x`/`y`
pub const MAX_COORD: i32 = 32000;

/// Width of a CODE128 set-B symbol in modules (start, data, check, stop)
pub fn code128_modules(len: usize) -> i32 {
    (11 * (len as i32 + 2)) + 13
}

/// Horizontal position: explicit `x` wins, otherwise derived from alignment
pub fn resolve_x(x: Option<i32>, align: Align, content: i32, area: i32) -> Result<i32> {
    if let Some(x) = x {
        return require_range("x", x, 0..=MAX_COORD);
    }
    let free = (area - content).max(0);
    Ok(match align {
        Align::Left => 0,
        Align::Center => free / 2,
        Align::Right => free,
    })
}

/// Top-to-bottom cursor for elements without an explicit `y`
#[derive(Debug, Default)]
pub struct Flow {
    cursor: i32,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&self, y: Option<i32>) -> Result<i32> {
        match y {
            Some(y) => require_range("y", y, 0..=MAX_COORD),
            None => Ok(self.cursor),
        }
    }

    /// Record that content occupies the page down to `bottom`
    pub fn reach(&mut self, bottom: i32) {
        self.cursor = self.cursor.max(bottom);
    }

    pub fn bottom(&self) -> i32 {
        self.cursor
    }
}

/// Validated label gap, in hundredths of a millimetre (0 to 100 mm)
pub fn require_gap(gap: i32) -> Result<i32> {
    require_range("gap", gap, 0..=10_000)
}

/// Hundredths of a millimetre as a TSPL millimetre value: `250` is `2.5`
pub fn gap_mm(hundredths: i32) -> String {
    let (whole, frac) = (hundredths / 100, hundredths % 100);
    match frac {
        0 => whole.to_string(),
        f if f % 10 == 0 => format!("{}.{}", whole, f / 10),
        f => format!("{}.{:02}", whole, f),
    }
}

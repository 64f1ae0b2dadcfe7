//! Procedurally generated atlases, used when no image file is given.

use quadgrid_core::Size;

/// An RGBA8 image.
pub struct Sheet {
    pub size: Size,
    pub rgba: Vec<u8>,
}

impl Sheet {
    fn blank(size: Size) -> Self {
        Self {
            size,
            rgba: vec![0; size.width as usize * size.height as usize * 4],
        }
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, px: [u8; 4]) {
        for row in y..y + h {
            for col in x..x + w {
                let i = (row as usize * self.size.width as usize + col as usize) * 4;
                self.rgba[i..i + 4].copy_from_slice(&px);
            }
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.size.width as usize + x as usize) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }
}

/// A `cols` x `rows` sheet of opaque colored tiles separated by a
/// transparent gutter.
pub fn tile_sheet(item: Size, cols: u32, rows: u32) -> Sheet {
    let mut sheet = Sheet::blank(Size::new(item.width * cols, item.height * rows));
    let gutter = (item.width.min(item.height) / 16).max(1);
    for row in 0..rows {
        for col in 0..cols {
            let hue = (row * cols + col) as f32 / (rows * cols) as f32;
            sheet.fill(
                col * item.width + gutter,
                row * item.height + gutter,
                item.width - 2 * gutter,
                item.height - 2 * gutter,
                hue_to_rgba(hue),
            );
        }
    }
    sheet
}

// 3x5 digit bitmaps, one row per 3 bits, top row in the high bits.
const DIGITS: [u16; 10] = [
    0b111_101_101_101_111,
    0b010_110_010_010_111,
    0b111_001_111_100_111,
    0b111_001_111_001_111,
    0b101_101_111_001_001,
    0b111_100_111_001_111,
    0b111_100_111_101_111,
    0b111_001_001_001_001,
    0b111_101_111_101_111,
    0b111_101_111_001_111,
];

/// Size of one glyph cell of [`digit_sheet`] at `scale`.
pub fn digit_cell(scale: u32) -> Size {
    Size::new(4 * scale, 6 * scale)
}

/// White digits `0`..=`9` on a transparent background, one row of cells.
pub fn digit_sheet(scale: u32) -> Sheet {
    let cell = digit_cell(scale);
    let mut sheet = Sheet::blank(Size::new(cell.width * DIGITS.len() as u32, cell.height));
    for (d, &bits) in DIGITS.iter().enumerate() {
        for y in 0..5 {
            for x in 0..3 {
                if bits >> (14 - (y * 3 + x)) & 1 == 1 {
                    sheet.fill(
                        d as u32 * cell.width + x * scale,
                        y * scale,
                        scale,
                        scale,
                        [255; 4],
                    );
                }
            }
        }
    }
    sheet
}

fn hue_to_rgba(hue: f32) -> [u8; 4] {
    let h = hue.fract() * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let c = |v: f32| (v * 255.0).round() as u8;
    [c(r), c(g), c(b), 255]
}

//! Module matrix construction: function patterns, codeword placement,
//! masking, penalty scoring, and the finished [`QrSymbol`].

use crate::types::Ecc;

/// Alignment pattern center coordinates per version (index 0 unused).
static ALIGN_POSITIONS: [&[usize]; 41] = [
    &[],
    &[],
    &[6, 18],
    &[6, 22],
    &[6, 26],
    &[6, 30],
    &[6, 34],
    &[6, 22, 38],
    &[6, 24, 42],
    &[6, 26, 46],
    &[6, 28, 50],
    &[6, 30, 54],
    &[6, 32, 58],
    &[6, 34, 62],
    &[6, 26, 46, 66],
    &[6, 26, 48, 70],
    &[6, 26, 50, 74],
    &[6, 30, 54, 78],
    &[6, 30, 56, 82],
    &[6, 30, 58, 86],
    &[6, 34, 62, 90],
    &[6, 28, 50, 72, 94],
    &[6, 26, 50, 74, 98],
    &[6, 30, 54, 78, 102],
    &[6, 28, 54, 80, 106],
    &[6, 32, 58, 84, 110],
    &[6, 30, 58, 86, 114],
    &[6, 34, 62, 90, 118],
    &[6, 26, 50, 74, 98, 122],
    &[6, 30, 54, 78, 102, 126],
    &[6, 26, 52, 78, 104, 130],
    &[6, 30, 56, 82, 108, 134],
    &[6, 34, 60, 86, 112, 138],
    &[6, 30, 58, 86, 114, 142],
    &[6, 34, 62, 90, 118, 146],
    &[6, 30, 54, 78, 102, 126, 150],
    &[6, 24, 50, 76, 102, 128, 154],
    &[6, 28, 54, 80, 106, 132, 158],
    &[6, 32, 58, 84, 110, 136, 162],
    &[6, 26, 54, 82, 110, 138, 166],
    &[6, 30, 58, 86, 114, 142, 170],
];

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

/// A mutable module grid under construction. Function modules are tracked
/// separately so masking and placement can skip them.
pub struct Matrix {
    version: u8,
    size: usize,
    dark: Vec<bool>,
    function: Vec<bool>,
}

impl Matrix {
    /// Creates a grid with every function pattern in place: finders with
    /// separators, timing, alignment, the dark module, reserved format areas,
    /// and version information for versions 7+.
    pub fn new(version: u8) -> Self {
        debug_assert!((1..=40).contains(&version));
        let size = usize::from(version) * 4 + 17;
        let mut m = Self {
            version,
            size,
            dark: vec![false; size * size],
            function: vec![false; size * size],
        };
        m.draw_finders();
        m.draw_timing();
        m.draw_alignment();
        m.reserve_format();
        m.draw_version_info();
        m
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size);
        y * self.size + x
    }

    fn get(&self, x: usize, y: usize) -> bool {
        self.dark[self.idx(x, y)]
    }

    fn set_function(&mut self, x: usize, y: usize, dark: bool) {
        let i = self.idx(x, y);
        self.dark[i] = dark;
        self.function[i] = true;
    }

    fn is_function(&self, x: usize, y: usize) -> bool {
        self.function[self.idx(x, y)]
    }

    fn draw_finders(&mut self) {
        let size = self.size as i32;
        for &(cx, cy) in &[(3, 3), (size - 4, 3), (3, size - 4)] {
            // 7x7 finder ring plus the light separator ring around it.
            for dy in -4i32..=4 {
                for dx in -4i32..=4 {
                    let (x, y) = (cx + dx, cy + dy);
                    if !(0..size).contains(&x) || !(0..size).contains(&y) {
                        continue;
                    }
                    let dist = dx.abs().max(dy.abs());
                    self.set_function(x as usize, y as usize, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_timing(&mut self) {
        for i in 8..self.size - 8 {
            let dark = i % 2 == 0;
            self.set_function(i, 6, dark);
            self.set_function(6, i, dark);
        }
    }

    fn draw_alignment(&mut self) {
        let positions = ALIGN_POSITIONS[usize::from(self.version)];
        let last = positions.len().wrapping_sub(1);
        for (i, &cx) in positions.iter().enumerate() {
            for (j, &cy) in positions.iter().enumerate() {
                // The three corners occupied by finder patterns.
                if (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0) {
                    continue;
                }
                for dy in -2i32..=2 {
                    for dx in -2i32..=2 {
                        let dark = dx.abs().max(dy.abs()) != 1;
                        self.set_function(
                            (cx as i32 + dx) as usize,
                            (cy as i32 + dy) as usize,
                            dark,
                        );
                    }
                }
            }
        }
    }

    /// Marks the format information cells as function modules so codeword
    /// placement skips them. Actual bits are written by `draw_format`.
    fn reserve_format(&mut self) {
        let size = self.size;
        for i in 0..9 {
            if i != 6 {
                self.set_function(8, i, false);
                self.set_function(i, 8, false);
            }
        }
        for i in 0..8 {
            self.set_function(size - 1 - i, 8, false);
            self.set_function(8, size - 1 - i, false);
        }
        // Dark module.
        self.set_function(8, size - 8, true);
    }

    fn draw_version_info(&mut self) {
        if self.version < 7 {
            return;
        }
        let ver = u32::from(self.version);
        let mut rem = ver;
        for _ in 0..12 {
            rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
        }
        let bits = (ver << 12) | rem;
        for i in 0..18 {
            let dark = (bits >> i) & 1 != 0;
            let a = self.size - 11 + i % 3;
            let b = i / 3;
            self.set_function(a, b, dark);
            self.set_function(b, a, dark);
        }
    }

    /// Writes the interleaved codewords into the data region along the
    /// standard zigzag path.
    pub fn place_codewords(&mut self, codewords: &[u8]) {
        let size = self.size as i32;
        let total_bits = codewords.len() * 8;
        let mut i = 0usize;
        let mut right = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..size {
                for j in 0..2 {
                    let x = (right - j) as usize;
                    let upward = (right + 1) & 2 == 0;
                    let y = (if upward { size - 1 - vert } else { vert }) as usize;
                    if !self.is_function(x, y) && i < total_bits {
                        let dark = codewords[i / 8] & (0x80 >> (i % 8)) != 0;
                        let idx = self.idx(x, y);
                        self.dark[idx] = dark;
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, total_bits);
    }

    /// XORs the mask pattern over the data region. Applying twice undoes it.
    pub fn apply_mask(&mut self, mask: u8) {
        debug_assert!(mask < 8);
        for y in 0..self.size {
            for x in 0..self.size {
                if self.is_function(x, y) {
                    continue;
                }
                if mask_bit(mask, x, y) {
                    let idx = self.idx(x, y);
                    self.dark[idx] = !self.dark[idx];
                }
            }
        }
    }

    /// Writes both copies of the 15-bit format information (EC level + mask,
    /// BCH-protected).
    pub fn draw_format(&mut self, level: Ecc, mask: u8) {
        let data = u32::from((level.format_bits() << 3) | mask);
        let mut rem = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * 0x537);
        }
        let bits = ((data << 10) | rem) ^ 0x5412;
        let bit = |i: usize| (bits >> i) & 1 != 0;

        // First copy, wrapped around the top-left finder.
        for i in 0..6 {
            self.set_function(8, i, bit(i));
        }
        self.set_function(8, 7, bit(6));
        self.set_function(8, 8, bit(7));
        self.set_function(7, 8, bit(8));
        for i in 9..15 {
            self.set_function(14 - i, 8, bit(i));
        }
        // Second copy, split between the other two finders.
        let size = self.size;
        for i in 0..8 {
            self.set_function(size - 1 - i, 8, bit(i));
        }
        for i in 8..15 {
            self.set_function(8, size - 15 + i, bit(i));
        }
        self.set_function(8, size - 8, true);
    }

    /// Scores the matrix with the four standard penalty rules: long runs,
    /// 2x2 blocks, finder-like patterns, and dark/light imbalance.
    pub fn penalty(&self) -> i32 {
        let mut result = 0;
        let size = self.size;

        for y in 0..size {
            let line: Vec<bool> = (0..size).map(|x| self.get(x, y)).collect();
            result += line_penalty(&line, size);
        }
        for x in 0..size {
            let line: Vec<bool> = (0..size).map(|y| self.get(x, y)).collect();
            result += line_penalty(&line, size);
        }

        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let c = self.get(x, y);
                if c == self.get(x + 1, y) && c == self.get(x, y + 1) && c == self.get(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        let dark = self.dark.iter().filter(|&&d| d).count() as i32;
        let total = (size * size) as i32;
        // Deviation from 50% in 5% steps, rounded up.
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result += k * PENALTY_N4;
        result
    }

    /// Freezes the grid into an immutable symbol.
    pub fn into_symbol(self, level: Ecc, mask: u8) -> QrSymbol {
        QrSymbol {
            version: self.version,
            size: self.size as u32,
            level,
            mask,
            dark: self.dark,
            function: self.function,
        }
    }
}

fn mask_bit(mask: u8, x: usize, y: usize) -> bool {
    match mask {
        0 => (x + y) % 2 == 0,
        1 => y % 2 == 0,
        2 => x % 3 == 0,
        3 => (x + y) % 3 == 0,
        4 => (x / 3 + y / 2) % 2 == 0,
        5 => (x * y) % 2 + (x * y) % 3 == 0,
        6 => ((x * y) % 2 + (x * y) % 3) % 2 == 0,
        7 => ((x + y) % 2 + (x * y) % 3) % 2 == 0,
        _ => unreachable!("mask index out of range"),
    }
}

/// N1 and N3 penalties for one row or column.
fn line_penalty(line: &[bool], size: usize) -> i32 {
    let mut result = 0;

    // Collapse the line into (color, length) runs.
    let mut runs: Vec<(bool, i32)> = Vec::new();
    for &cell in line {
        match runs.last_mut() {
            Some((color, len)) if *color == cell => *len += 1,
            _ => runs.push((cell, 1)),
        }
    }

    // N1: same-color runs of 5 or more.
    for &(_, len) in &runs {
        if len >= 5 {
            result += PENALTY_N1 + (len - 5);
        }
    }

    // N3: dark 1:1:3:1:1 finder-like patterns, scored once per side that
    // carries 4 or more light modules. The area outside the symbol counts
    // as light, so pad the edge runs.
    let pad = size as i32;
    match runs.first_mut() {
        Some((false, len)) => *len += pad,
        _ => runs.insert(0, (false, pad)),
    }
    match runs.last_mut() {
        Some((false, len)) => *len += pad,
        _ => runs.push((false, pad)),
    }
    for j in 3..runs.len().saturating_sub(3) {
        let (color, core) = runs[j];
        if !color || core != 3 {
            continue;
        }
        if runs[j - 2].1 != 1 || runs[j - 1].1 != 1 || runs[j + 1].1 != 1 || runs[j + 2].1 != 1 {
            continue;
        }
        if runs[j - 3].1 >= 4 {
            result += PENALTY_N3;
        }
        if runs[j + 3].1 >= 4 {
            result += PENALTY_N3;
        }
    }
    result
}

/// A finished, immutable QR symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSymbol {
    version: u8,
    size: u32,
    level: Ecc,
    mask: u8,
    dark: Vec<bool>,
    function: Vec<bool>,
}

impl QrSymbol {
    /// Version number, 1 to 40.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Side length in modules, 21 to 177.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn ec_level(&self) -> Ecc {
        self.level
    }

    /// The mask pattern index that was applied, 0 to 7.
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// True when the module at (x, y) is dark. Out-of-bounds reads are light.
    pub fn module(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size && self.dark[(y * self.size + x) as usize]
    }

    /// True when (x, y) belongs to a function pattern rather than data.
    pub fn is_function(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size && self.function[(y * self.size + x) as usize]
    }
}

//! Data analysis and bit-level packing for the encoder: encoding modes,
//! segments, and the bit buffer the data stream is assembled in.

const ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl Mode {
    /// The 4-bit mode indicator at the front of each segment.
    pub fn indicator(self) -> u32 {
        match self {
            Self::Numeric => 0x1,
            Self::Alphanumeric => 0x2,
            Self::Byte => 0x4,
        }
    }

    /// Width of the character count field, which grows with the version.
    pub fn char_count_bits(self, version: u8) -> u8 {
        let bucket = usize::from((version + 7) / 17);
        match self {
            Self::Numeric => [10, 12, 14][bucket],
            Self::Alphanumeric => [9, 11, 13][bucket],
            Self::Byte => [8, 16, 16][bucket],
        }
    }
}

/// A growable MSB-first bit string.
#[derive(Debug, Clone, Default)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length in bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends the low `count` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u32, count: u8) {
        debug_assert!(count <= 31 && value >> count == 0);
        for i in (0..count).rev() {
            let bit = (value >> i) & 1;
            if self.len % 8 == 0 {
                self.bytes.push(0);
            }
            if bit != 0 {
                self.bytes[self.len / 8] |= 0x80 >> (self.len % 8);
            }
            self.len += 1;
        }
    }

    pub fn push_buffer(&mut self, other: &BitBuffer) {
        for i in 0..other.len {
            self.push_bits(u32::from(other.bit(i)), 1);
        }
    }

    fn bit(&self, i: usize) -> bool {
        self.bytes[i / 8] & (0x80 >> (i % 8)) != 0
    }

    /// The packed bytes; the final partial byte, if any, is zero-padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// One run of input encoded in a single mode.
#[derive(Debug, Clone)]
pub struct Segment {
    pub mode: Mode,
    pub num_chars: usize,
    pub bits: BitBuffer,
}

impl Segment {
    /// Picks the cheapest mode the whole input fits in.
    pub fn for_text(text: &str) -> Segment {
        if is_numeric(text) {
            Self::numeric(text)
        } else if is_alphanumeric(text) {
            Self::alphanumeric(text)
        } else {
            Self::bytes(text.as_bytes())
        }
    }

    /// Digits packed three at a time into 10 bits.
    pub fn numeric(text: &str) -> Segment {
        debug_assert!(is_numeric(text));
        let mut bits = BitBuffer::new();
        for chunk in text.as_bytes().chunks(3) {
            let mut value: u32 = 0;
            for b in chunk {
                value = value * 10 + u32::from(b - b'0');
            }
            bits.push_bits(value, (chunk.len() as u8) * 3 + 1);
        }
        Segment {
            mode: Mode::Numeric,
            num_chars: text.len(),
            bits,
        }
    }

    /// Characters from the 45-symbol set packed two at a time into 11 bits.
    pub fn alphanumeric(text: &str) -> Segment {
        let values: Vec<u32> = text
            .chars()
            .map(|c| {
                ALPHANUMERIC_CHARSET
                    .find(c)
                    .map(|i| i as u32)
                    .unwrap_or_else(|| unreachable!("checked by is_alphanumeric"))
            })
            .collect();
        let mut bits = BitBuffer::new();
        for pair in values.chunks(2) {
            match pair {
                [a, b] => bits.push_bits(a * 45 + b, 11),
                [a] => bits.push_bits(*a, 6),
                _ => unreachable!(),
            }
        }
        Segment {
            mode: Mode::Alphanumeric,
            num_chars: text.len(),
            bits,
        }
    }

    pub fn bytes(data: &[u8]) -> Segment {
        let mut bits = BitBuffer::new();
        for &b in data {
            bits.push_bits(u32::from(b), 8);
        }
        Segment {
            mode: Mode::Byte,
            num_chars: data.len(),
            bits,
        }
    }

    /// Bits this segment occupies at `version`, or `None` when the character
    /// count overflows its field.
    pub fn encoded_len(&self, version: u8) -> Option<usize> {
        let cc_bits = self.mode.char_count_bits(version);
        if self.num_chars >= 1 << cc_bits {
            return None;
        }
        Some(4 + usize::from(cc_bits) + self.bits.len())
    }
}

pub fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

pub fn is_alphanumeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
}

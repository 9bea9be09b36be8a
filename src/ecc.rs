//! Reed-Solomon error correction over GF(256) and the version/level block
//! structure tables, including the data/EC codeword interleaving step.

use crate::types::Ecc;

/// EC codewords per block, indexed by `[level.ordinal()][version]` (index 0 unused).
static ECC_CODEWORDS_PER_BLOCK: [[u8; 41]; 4] = [
    [
        0, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        0, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        0, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        0, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

/// Number of EC blocks, same indexing.
static NUM_EC_BLOCKS: [[u8; 41]; 4] = [
    [
        0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        0, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        0, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        0, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

pub fn ecc_per_block(version: u8, level: Ecc) -> usize {
    usize::from(ECC_CODEWORDS_PER_BLOCK[level.ordinal()][usize::from(version)])
}

pub fn num_blocks(version: u8, level: Ecc) -> usize {
    usize::from(NUM_EC_BLOCKS[level.ordinal()][usize::from(version)])
}

/// Total modules available for codewords once function patterns are placed.
pub fn raw_data_modules(version: u8) -> usize {
    let v = usize::from(version);
    let mut result = (16 * v + 128) * v + 64;
    if v >= 2 {
        let num_align = v / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if v >= 7 {
            result -= 36;
        }
    }
    result
}

/// Data codewords available at this version and level.
pub fn data_codewords(version: u8, level: Ecc) -> usize {
    raw_data_modules(version) / 8 - ecc_per_block(version, level) * num_blocks(version, level)
}

/// Multiplication in GF(2^8) with the QR reduction polynomial 0x11d.
fn gf_mul(x: u8, y: u8) -> u8 {
    let mut z: u8 = 0;
    for i in (0..8).rev() {
        z = (z << 1) ^ ((z >> 7).wrapping_mul(0x1d));
        z ^= ((y >> i) & 1) * x;
    }
    z
}

/// A Reed-Solomon generator polynomial of the given degree.
pub struct Generator {
    coeffs: Vec<u8>,
}

impl Generator {
    /// Builds the product (x - α^0)(x - α^1)...(x - α^(degree-1)).
    pub fn new(degree: usize) -> Self {
        debug_assert!((1..=30).contains(&degree));
        // Coefficients of the monic polynomial, highest power first,
        // leading term dropped.
        let mut coeffs = vec![0u8; degree];
        coeffs[degree - 1] = 1;
        let mut root: u8 = 1;
        for _ in 0..degree {
            for j in 0..degree {
                coeffs[j] = gf_mul(coeffs[j], root);
                if j + 1 < degree {
                    coeffs[j] ^= coeffs[j + 1];
                }
            }
            root = gf_mul(root, 0x02);
        }
        Self { coeffs }
    }

    /// Polynomial-division remainder of `data`, i.e. the EC codewords.
    pub fn remainder(&self, data: &[u8]) -> Vec<u8> {
        let degree = self.coeffs.len();
        let mut rem = vec![0u8; degree];
        for &b in data {
            let factor = b ^ rem[0];
            rem.rotate_left(1);
            rem[degree - 1] = 0;
            for (r, &c) in rem.iter_mut().zip(self.coeffs.iter()) {
                *r ^= gf_mul(c, factor);
            }
        }
        rem
    }
}

/// Splits `data` into the version's blocks, appends EC codewords to each, and
/// interleaves everything into the final codeword sequence.
pub fn add_ecc_and_interleave(data: &[u8], version: u8, level: Ecc) -> Vec<u8> {
    debug_assert_eq!(data.len(), data_codewords(version, level));
    let blocks = num_blocks(version, level);
    let ecc_len = ecc_per_block(version, level);
    let raw_codewords = raw_data_modules(version) / 8;
    let num_short = blocks - raw_codewords % blocks;
    let short_len = raw_codewords / blocks - ecc_len;

    let generator = Generator::new(ecc_len);
    let mut data_blocks: Vec<&[u8]> = Vec::with_capacity(blocks);
    let mut ecc_blocks: Vec<Vec<u8>> = Vec::with_capacity(blocks);
    let mut pos = 0;
    for i in 0..blocks {
        let len = short_len + usize::from(i >= num_short);
        let block = &data[pos..pos + len];
        pos += len;
        ecc_blocks.push(generator.remainder(block));
        data_blocks.push(block);
    }
    debug_assert_eq!(pos, data.len());

    // Column-wise: codeword j of every block, short blocks simply run out
    // one column early, then all EC columns.
    let mut out = Vec::with_capacity(raw_codewords);
    for j in 0..=short_len {
        for block in &data_blocks {
            if j < block.len() {
                out.push(block[j]);
            }
        }
    }
    for j in 0..ecc_len {
        for ecc in &ecc_blocks {
            out.push(ecc[j]);
        }
    }
    debug_assert_eq!(out.len(), raw_codewords);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gf_mul_identities() {
        for x in 0..=255u8 {
            assert_eq!(gf_mul(x, 1), x);
            assert_eq!(gf_mul(1, x), x);
            assert_eq!(gf_mul(x, 0), 0);
        }
    }

    #[test]
    fn gf_mul_reduction() {
        // 0x80 * 2 = 0x100, reduced by 0x11d.
        assert_eq!(gf_mul(0x80, 0x02), 0x1d);
        assert_eq!(gf_mul(0x02, 0x80), 0x1d);
    }

    #[test]
    fn generator_degree_one() {
        // (x + 1)
        assert_eq!(Generator::new(1).coeffs, vec![1]);
    }

    #[test]
    fn generator_degree_two() {
        // (x + 1)(x + 2) = x^2 + 3x + 2
        assert_eq!(Generator::new(2).coeffs, vec![3, 2]);
    }

    #[test]
    fn remainder_makes_data_divisible() {
        // Appending the remainder must leave a remainder of zero.
        let generator = Generator::new(10);
        let data: Vec<u8> = (0u8..16).map(|i| i.wrapping_mul(37).wrapping_add(5)).collect();
        let ecc = generator.remainder(&data);
        assert_eq!(ecc.len(), 10);
        let mut message = data;
        message.extend_from_slice(&ecc);
        assert_eq!(generator.remainder(&message), vec![0u8; 10]);
    }

    #[test]
    fn remainder_of_zeros_is_zero() {
        let generator = Generator::new(7);
        assert_eq!(generator.remainder(&[0u8; 19]), vec![0u8; 7]);
    }

    #[test]
    fn data_codeword_counts_match_standard() {
        assert_eq!(data_codewords(1, Ecc::Low), 19);
        assert_eq!(data_codewords(1, Ecc::Medium), 16);
        assert_eq!(data_codewords(1, Ecc::High), 9);
        assert_eq!(data_codewords(5, Ecc::Quartile), 62);
        assert_eq!(data_codewords(40, Ecc::Low), 2956);
    }

    #[test]
    fn raw_modules_match_standard() {
        assert_eq!(raw_data_modules(1), 208);
        assert_eq!(raw_data_modules(2), 359);
        assert_eq!(raw_data_modules(7), 1568);
        assert_eq!(raw_data_modules(40), 29648);
    }

    #[test]
    fn interleave_single_block_is_concat() {
        // Version 1 has one block: output is data followed by its ECC.
        let data: Vec<u8> = (0u8..16).collect();
        let out = add_ecc_and_interleave(&data, 1, Ecc::Medium);
        assert_eq!(out.len(), 26);
        assert_eq!(&out[..16], &data[..]);
        assert_eq!(&out[16..], &Generator::new(10).remainder(&data)[..]);
    }

    #[test]
    fn interleave_multi_block_layout() {
        // Version 3 Quartile: 2 blocks of 17 data + 18 ecc codewords.
        let data: Vec<u8> = (0u8..34).collect();
        let out = add_ecc_and_interleave(&data, 3, Ecc::Quartile);
        assert_eq!(out.len(), 70);
        // Data columns alternate between the two blocks.
        assert_eq!(out[0], data[0]);
        assert_eq!(out[1], data[17]);
        assert_eq!(out[2], data[1]);
        assert_eq!(out[3], data[18]);
    }
}

//! Per-block coefficient transcoding.
//!
//! Decodes one 8x8 block of quantized DCT coefficients from the entropy-
//! coded segment (DC differential plus AC run/size pairs) and re-encodes a
//! block against caller-supplied tables. Coefficients stay in zigzag order
//! throughout; no dequantization happens here.

use std::io::{Read, Write};

use crate::error::{Result, StegJpegError};
use crate::jpeg::bitio::{BitReader, BitWriter};
use crate::jpeg::huffman::{encode_coefficient, HuffmanTable};

/// End-of-block symbol in the AC stream.
const EOB: u8 = 0x00;
/// Zero-run-length-16 symbol in the AC stream.
const ZRL: u8 = 0xF0;

/// One block of quantized DCT coefficients in zigzag order.
pub type CoefficientBlock = [i16; 64];

/// Decode one block. `prev_dc` is the component's DC predictor; it is
/// advanced to this block's DC value.
pub fn decode_block<R: Read>(
    reader: &mut BitReader<R>,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    prev_dc: &mut i16,
) -> Result<CoefficientBlock> {
    let mut block = [0i16; 64];

    let dc_size = dc_table.decode(reader)?;
    if dc_size > 11 {
        return Err(StegJpegError::malformed(format!(
            "DC size category {dc_size} out of range"
        )));
    }
    let diff = reader.read_signed(dc_size)? as i16;
    *prev_dc = prev_dc.wrapping_add(diff);
    block[0] = *prev_dc;

    let mut k = 1;
    while k < 64 {
        let symbol = ac_table.decode(reader)?;
        let run = (symbol >> 4) as usize;
        let size = symbol & 0x0F;

        if size == 0 {
            if run == 15 {
                k += 16;
                continue;
            }
            break; // EOB
        }

        k += run;
        if k >= 64 {
            return Err(StegJpegError::malformed(
                "AC coefficient index out of range",
            ));
        }
        block[k] = reader.read_signed(size)? as i16;
        k += 1;
    }

    Ok(block)
}

/// Encode one block. `prev_dc` is the DC value of the previous block of
/// the same component; the DC coefficient is stored as the difference.
pub fn encode_block<W: Write>(
    writer: &mut BitWriter<W>,
    block: &CoefficientBlock,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    prev_dc: i16,
) -> Result<()> {
    let diff = block[0].wrapping_sub(prev_dc);
    let (dc_size, dc_bits) = encode_coefficient(diff);
    dc_table.encode(writer, dc_size)?;
    writer.write_bits(u32::from(dc_bits), dc_size)?;

    let mut zero_run = 0u8;
    for &coefficient in &block[1..] {
        if coefficient == 0 {
            zero_run += 1;
            continue;
        }
        while zero_run > 15 {
            ac_table.encode(writer, ZRL)?;
            zero_run -= 16;
        }
        let (size, bits) = encode_coefficient(coefficient);
        let symbol = (zero_run << 4) | size;
        ac_table.encode(writer, symbol)?;
        writer.write_bits(u32::from(bits), size)?;
        zero_run = 0;
    }
    if zero_run > 0 {
        ac_table.encode(writer, EOB)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::tables::LUMA_AC;

    fn dc_table() -> HuffmanTable {
        HuffmanTable::new(
            0,
            0,
            [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        )
        .unwrap()
    }

    fn ac_table() -> HuffmanTable {
        HuffmanTable::from_value_lists(1, 0, &LUMA_AC).unwrap()
    }

    fn roundtrip(blocks: &[CoefficientBlock]) -> Vec<CoefficientBlock> {
        let dc = dc_table();
        let ac = ac_table();

        let mut encoded = Vec::new();
        let mut writer = BitWriter::new(&mut encoded);
        let mut prev_dc = 0i16;
        for block in blocks {
            encode_block(&mut writer, block, &dc, &ac, prev_dc).unwrap();
            prev_dc = block[0];
        }
        writer.flush().unwrap();

        let mut reader = BitReader::new(&encoded[..]);
        let mut prev_dc = 0i16;
        blocks
            .iter()
            .map(|_| decode_block(&mut reader, &dc, &ac, &mut prev_dc).unwrap())
            .collect()
    }

    #[test]
    fn all_zero_block_roundtrips() {
        let blocks = [[0i16; 64]];
        assert_eq!(roundtrip(&blocks), blocks.to_vec());
    }

    #[test]
    fn dense_block_roundtrips() {
        let mut block = [0i16; 64];
        block[0] = 120;
        for (k, c) in block.iter_mut().enumerate().skip(1) {
            *c = if k % 3 == 0 { -(k as i16) } else { k as i16 };
        }
        let blocks = [block];
        assert_eq!(roundtrip(&blocks), blocks.to_vec());
    }

    #[test]
    fn long_zero_runs_use_zrl() {
        let mut block = [0i16; 64];
        block[0] = 5;
        block[1] = 3;
        block[40] = -2; // run of 38 zeros: two ZRLs then (6, size)
        block[63] = 1; // ends exactly at the last position, no EOB
        let blocks = [block];
        assert_eq!(roundtrip(&blocks), blocks.to_vec());
    }

    #[test]
    fn dc_differences_chain_across_blocks() {
        let mut a = [0i16; 64];
        a[0] = 100;
        let mut b = [0i16; 64];
        b[0] = 90;
        let mut c = [0i16; 64];
        c[0] = 90; // zero difference encodes size category 0

        let blocks = [a, b, c];
        assert_eq!(roundtrip(&blocks), blocks.to_vec());
    }

    #[test]
    fn payload_range_coefficients_roundtrip() {
        // Raw byte values 0-255 stored as positive coefficients.
        let mut block = [0i16; 64];
        block[61] = 0;
        block[62] = 0xFF;
        block[63] = 0x41;
        let blocks = [block];
        assert_eq!(roundtrip(&blocks), blocks.to_vec());
    }
}

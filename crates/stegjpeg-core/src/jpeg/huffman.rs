//! Canonical Huffman coding for JPEG entropy-coded data.
//!
//! Tables are built with the canonical algorithm of ITU T.81 Annex C:
//! codes of each length are assigned consecutively, and the first code of
//! length `l+1` is `(first_code(l) + count(l)) << 1`.

use std::io::{Read, Write};

use crate::error::{Result, StegJpegError};
use crate::jpeg::bitio::{BitReader, BitWriter};

/// Longest code length JPEG permits.
const MAX_CODE_LENGTH: usize = 16;

/// A Huffman table: the parsed DHT payload plus its derived code maps.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Table class: 0 = DC, 1 = AC.
    pub class: u8,
    /// Table destination id (0-3).
    pub id: u8,
    /// Number of codes of each length (1-16 bits).
    pub code_lengths: [u8; 16],
    /// Symbol values in code-length order.
    pub values: Vec<u8>,
    codes: HuffmanCodes,
}

impl HuffmanTable {
    /// Build a table from DHT fields, deriving the canonical codes.
    pub fn new(class: u8, id: u8, code_lengths: [u8; 16], values: Vec<u8>) -> Result<Self> {
        let codes = HuffmanCodes::derive(&code_lengths, &values)?;
        Ok(HuffmanTable {
            class,
            id,
            code_lengths,
            values,
            codes,
        })
    }

    /// Build a table from one value list per code length, the layout DHT
    /// segments use on the wire.
    pub fn from_value_lists(class: u8, id: u8, lists: &[&[u8]; 16]) -> Result<Self> {
        let mut code_lengths = [0u8; 16];
        let mut values = Vec::new();
        for (i, list) in lists.iter().enumerate() {
            code_lengths[i] = list.len() as u8;
            values.extend_from_slice(list);
        }
        Self::new(class, id, code_lengths, values)
    }

    /// Decode one symbol by accumulating bits until a code matches.
    ///
    /// Fails with `InvalidHuffmanCode` when no code matches within 16 bits.
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u8> {
        let mut code: i32 = 0;
        for length in 1..=MAX_CODE_LENGTH {
            code = (code << 1) | i32::from(reader.read_bit()?);
            let count = i32::from(self.codes.counts[length]);
            let offset = code - self.codes.first_code[length];
            if offset >= 0 && offset < count {
                let index = self.codes.first_index[length] + offset as usize;
                return Ok(self.values[index]);
            }
        }
        Err(StegJpegError::InvalidHuffmanCode)
    }

    /// Encode one symbol, or fail with `UnencodableSymbol` when the table
    /// has no code for it.
    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>, symbol: u8) -> Result<()> {
        let (code, length) = self
            .code_of(symbol)
            .ok_or(StegJpegError::UnencodableSymbol { symbol })?;
        writer.write_bits(u32::from(code), length)
    }

    /// Look up the `(code, length)` pair for a symbol.
    pub fn code_of(&self, symbol: u8) -> Option<(u16, u8)> {
        self.codes.encode_map[symbol as usize]
    }
}

/// Derived canonical code maps: a per-length `(first_code, first_index)`
/// pair for decoding plus a flat symbol-to-code map for encoding.
#[derive(Debug, Clone)]
struct HuffmanCodes {
    first_code: [i32; MAX_CODE_LENGTH + 1],
    first_index: [usize; MAX_CODE_LENGTH + 1],
    counts: [u8; MAX_CODE_LENGTH + 1],
    encode_map: [Option<(u16, u8)>; 256],
}

impl HuffmanCodes {
    fn derive(code_lengths: &[u8; 16], values: &[u8]) -> Result<Self> {
        let total: usize = code_lengths.iter().map(|&n| n as usize).sum();
        if total > 256 {
            return Err(StegJpegError::malformed(
                "Huffman table has more than 256 symbols",
            ));
        }
        if total != values.len() {
            return Err(StegJpegError::malformed(format!(
                "Huffman table declares {} codes but carries {} values",
                total,
                values.len()
            )));
        }

        let mut first_code = [0i32; MAX_CODE_LENGTH + 1];
        let mut first_index = [0usize; MAX_CODE_LENGTH + 1];
        let mut counts = [0u8; MAX_CODE_LENGTH + 1];
        let mut encode_map = [None; 256];

        let mut code: i32 = 0;
        let mut index = 0usize;
        for length in 1..=MAX_CODE_LENGTH {
            let count = code_lengths[length - 1];
            counts[length] = count;
            first_code[length] = code;
            first_index[length] = index;
            for k in 0..count {
                let assigned = code + i32::from(k);
                if assigned >= 1 << length {
                    return Err(StegJpegError::malformed(
                        "Huffman code exceeds its bit length",
                    ));
                }
                encode_map[values[index + k as usize] as usize] =
                    Some((assigned as u16, length as u8));
            }
            code += i32::from(count);
            index += count as usize;
            code <<= 1;
        }

        Ok(HuffmanCodes {
            first_code,
            first_index,
            counts,
            encode_map,
        })
    }
}

/// Compute the size category and amplitude bits for a coefficient.
///
/// Returns `(size, bits)`: the number of additional bits and their value.
/// Positive values are stored as-is; negative values use the JPEG
/// complement representation `(2^size - 1) - |value|`. The inverse of
/// `BitReader::read_signed`.
#[inline]
pub fn encode_coefficient(value: i16) -> (u8, u16) {
    if value == 0 {
        return (0, 0);
    }

    let abs_value = value.unsigned_abs();
    let size = (16 - abs_value.leading_zeros()) as u8;

    let bits = if value < 0 {
        ((1u16 << size) - 1) - abs_value
    } else {
        abs_value
    };

    (size, bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The typical DC luminance table (T.81 Table K.3).
    fn standard_dc_table() -> HuffmanTable {
        HuffmanTable::new(
            0,
            0,
            [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        )
        .unwrap()
    }

    #[test]
    fn canonical_code_assignment() {
        // One code of length 2, one of length 3: 00 and 010.
        let table =
            HuffmanTable::new(0, 0, [0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], vec![7, 9])
                .unwrap();
        assert_eq!(table.code_of(7), Some((0b00, 2)));
        assert_eq!(table.code_of(9), Some((0b010, 3)));
    }

    #[test]
    fn canonical_first_code_recurrence() {
        // The k-th value of length l gets first_code(l) + k where
        // first_code(l + 1) = (first_code(l) + count(l)) << 1.
        let table = standard_dc_table();

        let mut first_code: u32 = 0;
        let mut index = 0;
        for length in 1..=16u8 {
            let count = table.code_lengths[length as usize - 1];
            for k in 0..count {
                let symbol = table.values[index];
                assert_eq!(
                    table.code_of(symbol),
                    Some(((first_code + u32::from(k)) as u16, length)),
                    "symbol {symbol}"
                );
                index += 1;
            }
            first_code = (first_code + u32::from(count)) << 1;
        }
    }

    #[test]
    fn all_symbols_survive_an_encode_decode_cycle() {
        let table = standard_dc_table();

        let mut encoded = Vec::new();
        let mut writer = BitWriter::new(&mut encoded);
        for &symbol in &table.values {
            table.encode(&mut writer, symbol).unwrap();
        }
        writer.flush().unwrap();

        let mut reader = BitReader::new(&encoded[..]);
        for &symbol in &table.values {
            assert_eq!(table.decode(&mut reader).unwrap(), symbol);
        }
    }

    #[test]
    fn oversubscribed_lengths_are_rejected() {
        // Three codes of length 1 cannot exist.
        let result = HuffmanTable::new(
            0,
            0,
            [3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![1, 2, 3],
        );
        assert!(matches!(
            result,
            Err(StegJpegError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn count_value_mismatch_is_rejected() {
        let result = HuffmanTable::new(
            0,
            0,
            [0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![1],
        );
        assert!(matches!(
            result,
            Err(StegJpegError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn encoding_a_missing_symbol_fails() {
        let table = standard_dc_table();
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        assert!(matches!(
            table.encode(&mut writer, 0xAB),
            Err(StegJpegError::UnencodableSymbol { symbol: 0xAB })
        ));
    }

    #[test]
    fn garbage_bits_fail_within_16_bits() {
        // A single code 0 of length 1 leaves every all-ones prefix unmatched.
        let table = HuffmanTable::new(
            0,
            0,
            [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![5],
        )
        .unwrap();
        let data = [0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00];
        let mut reader = BitReader::new(&data[..]);
        assert!(matches!(
            table.decode(&mut reader),
            Err(StegJpegError::InvalidHuffmanCode)
        ));
    }

    #[test]
    fn coefficient_size_and_amplitude() {
        assert_eq!(encode_coefficient(0), (0, 0));

        assert_eq!(encode_coefficient(1), (1, 1));
        assert_eq!(encode_coefficient(2), (2, 2));
        assert_eq!(encode_coefficient(3), (2, 3));
        assert_eq!(encode_coefficient(7), (3, 7));
        assert_eq!(encode_coefficient(255), (8, 255));

        assert_eq!(encode_coefficient(-1), (1, 0));
        assert_eq!(encode_coefficient(-2), (2, 1));
        assert_eq!(encode_coefficient(-3), (2, 0));
        assert_eq!(encode_coefficient(-6), (3, 1));
        assert_eq!(encode_coefficient(-7), (3, 0));
    }

    #[test]
    fn coefficient_roundtrip_against_read_signed() {
        for value in -1023i16..=1023 {
            let (size, bits) = encode_coefficient(value);
            if value == 0 {
                assert_eq!(size, 0);
                continue;
            }

            let mut encoded = Vec::new();
            let mut writer = BitWriter::new(&mut encoded);
            writer.write_bits(u32::from(bits), size).unwrap();
            writer.flush().unwrap();

            let mut reader = BitReader::new(&encoded[..]);
            assert_eq!(
                reader.read_signed(size).unwrap(),
                i32::from(value),
                "roundtrip failed for {value}"
            );
        }
    }
}

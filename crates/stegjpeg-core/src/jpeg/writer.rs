//! Output assembly for the transcoded JPEG.
//!
//! Re-emits the retained segments in their original order. DQT segments
//! are rebuilt from the (possibly rewritten) quantization tables and DHT
//! segments from the Huffman table list, with AC tables swapped for their
//! replacements; every other segment is reproduced verbatim. The
//! entropy-coded data follows the SOS segment, then EOI.

use std::io::{self, Read, Write};

use crate::error::Result;
use crate::jpeg::huffman::HuffmanTable;
use crate::jpeg::marker::Marker;
use crate::jpeg::parser::{QuantizationTable, Segment};

/// Write the complete output JPEG.
///
/// `ac_swaps` maps original AC table indices to the replacement tables
/// registered for the components that used them; the ECS reader must be
/// positioned at the start of the transcoded scan data.
pub fn write_stego<W: Write, E: Read>(
    output: &mut W,
    segments: &[Segment],
    quant_tables: &[QuantizationTable],
    huffman_tables: &[HuffmanTable],
    ac_swaps: &[(usize, usize)],
    ecs: &mut E,
) -> Result<()> {
    output.write_all(&[0xFF, Marker::SOI.to_u8()])?;

    for segment in segments {
        match segment.marker {
            Marker::DQT => {
                let mut data = Vec::with_capacity(segment.quant_indices.len() * 65);
                for &idx in &segment.quant_indices {
                    let table = &quant_tables[idx];
                    data.push((table.precision << 4) | table.id);
                    data.extend_from_slice(&table.values);
                }
                write_segment(output, segment.marker, &data)?;
            }
            Marker::DHT => {
                let mut data = Vec::new();
                for &idx in &segment.huffman_indices {
                    let idx = ac_swaps
                        .iter()
                        .find(|&&(original, _)| original == idx)
                        .map_or(idx, |&(_, replacement)| replacement);
                    let table = &huffman_tables[idx];
                    data.push((table.class << 4) | table.id);
                    data.extend_from_slice(&table.code_lengths);
                    data.extend_from_slice(&table.values);
                }
                write_segment(output, segment.marker, &data)?;
            }
            _ => write_segment(output, segment.marker, &segment.data)?,
        }
    }

    io::copy(ecs, output)?;
    output.write_all(&[0xFF, Marker::EOI.to_u8()])?;

    Ok(())
}

fn write_segment<W: Write>(output: &mut W, marker: Marker, data: &[u8]) -> Result<()> {
    output.write_all(&[0xFF, marker.to_u8()])?;
    output.write_all(&((data.len() + 2) as u16).to_be_bytes())?;
    output.write_all(data)?;
    Ok(())
}

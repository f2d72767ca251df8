//! The cover-image handle and the embed/extract drivers.

use std::fmt::Write as _;
use std::io::{Read, Seek, SeekFrom, Write};

use log::{debug, trace};
use tempfile::SpooledTempFile;

use crate::error::{Result, StegJpegError};
use crate::jpeg::bitio::{BitReader, BitWriter};
use crate::jpeg::parser::{self, Component, FrameInfo, QuantizationTable, Segment};
use crate::jpeg::scan::{self, CoefficientBlock};
use crate::jpeg::writer::write_stego;
use crate::jpeg::{tables, HuffmanTable};
use crate::payload::PayloadSource;
use crate::HideOptions;

/// Transcoded scan data stays in memory up to this size, then spills to a
/// temp file.
const ECS_SPOOL_LIMIT: usize = 8 * 1024 * 1024;

/// A parsed baseline JPEG ready for hiding or extraction.
///
/// Parsing happens once in [`CoverJpeg::open`]; the entropy-coded data is
/// re-read from the source on every operation, so extraction is
/// repeatable. [`CoverJpeg::hide`] rewrites the in-memory quantization
/// tables to mark the hiding positions; reopen the source to extract from
/// the unmodified original afterwards.
pub struct CoverJpeg<R> {
    source: R,
    segments: Vec<Segment>,
    quant_tables: Vec<QuantizationTable>,
    huffman_tables: Vec<HuffmanTable>,
    frame: FrameInfo,
    ecs_offset: u64,
}

impl<R: Read + Seek> CoverJpeg<R> {
    /// Parse the JPEG headers from a seekable source.
    pub fn open(mut source: R) -> Result<Self> {
        let parsed = parser::parse(&mut source)?;
        Ok(CoverJpeg {
            source,
            segments: parsed.segments,
            quant_tables: parsed.quant_tables,
            huffman_tables: parsed.huffman_tables,
            frame: parsed.frame,
            ecs_offset: parsed.ecs_offset,
        })
    }

    /// Frame parameters of the cover image.
    pub fn frame(&self) -> &FrameInfo {
        &self.frame
    }

    /// Quantization tables in definition order.
    pub fn quantization_tables(&self) -> &[QuantizationTable] {
        &self.quant_tables
    }

    /// Upper bound on the number of payload bytes `hide` can place at the
    /// given depth.
    pub fn capacity(&self, depth: usize) -> Result<usize> {
        validate_depth(depth)?;
        Ok(self.frame.total_blocks() * depth)
    }

    /// Hide the payload and write the stego JPEG to `output`.
    ///
    /// Marks `depth` positions per component quantization table, replaces
    /// the coefficients at those positions with payload bytes while
    /// transcoding the scan, and assembles the output with the rewritten
    /// DQT/DHT segments. With `repeat`, an exhausted payload is rewound
    /// and embedded again until the image is full.
    pub fn hide<W: Write>(
        &mut self,
        payload: &mut dyn PayloadSource,
        options: &HideOptions,
        output: &mut W,
    ) -> Result<()> {
        validate_depth(options.depth)?;

        // Register one replacement AC table per component and mark the
        // hiding positions before any block is touched.
        let mut ac_swaps = Vec::with_capacity(self.frame.components.len());
        let mut replacement_idx = Vec::with_capacity(self.frame.components.len());
        for component in &self.frame.components {
            let replacement =
                tables::replacement_for(&self.huffman_tables[component.ac_table_idx], component.id)?;
            self.huffman_tables.push(replacement);
            let idx = self.huffman_tables.len() - 1;
            ac_swaps.push((component.ac_table_idx, idx));
            replacement_idx.push(idx);

            mark_hiding_positions(&mut self.quant_tables[component.quant_idx], options.depth);
        }

        let components = self.frame.components.clone();
        let mut ecs = SpooledTempFile::new(ECS_SPOOL_LIMIT);

        self.source.seek(SeekFrom::Start(self.ecs_offset))?;
        let mut reader = BitReader::new(&mut self.source);
        let mut writer = BitWriter::new(&mut ecs);
        let mut dc_predictors = vec![0i16; components.len()];
        let mut exhausted_blocks = 0usize;

        for _mcu_row in 0..self.frame.mcu_rows {
            for _mcu_col in 0..self.frame.mcu_cols {
                for (ci, component) in components.iter().enumerate() {
                    let dc_table = &self.huffman_tables[component.dc_table_idx];
                    let ac_table = &self.huffman_tables[component.ac_table_idx];
                    let replacement = &self.huffman_tables[replacement_idx[ci]];
                    let quant = &self.quant_tables[component.quant_idx];

                    for _v in 0..component.v_sampling {
                        for _h in 0..component.h_sampling {
                            let prev_dc = dc_predictors[ci];
                            let mut block = scan::decode_block(
                                &mut reader,
                                dc_table,
                                ac_table,
                                &mut dc_predictors[ci],
                            )?;

                            if !substitute_payload(&mut block, quant, payload, options.repeat)? {
                                exhausted_blocks += 1;
                            }

                            scan::encode_block(
                                &mut writer,
                                &block,
                                dc_table,
                                replacement,
                                prev_dc,
                            )?;
                        }
                    }
                }
            }
        }
        writer.flush()?;

        if exhausted_blocks > 0 {
            debug!("payload exhausted; {exhausted_blocks} blocks keep their original coefficients");
        }

        ecs.rewind()?;
        write_stego(
            output,
            &self.segments,
            &self.quant_tables,
            &self.huffman_tables,
            &ac_swaps,
            &mut ecs,
        )
    }

    /// Recover the hidden byte stream: the coefficient at every zero
    /// quantization-table position of every block, in scan order.
    pub fn extract(&mut self) -> Result<Vec<u8>> {
        let mut hidden = Vec::new();
        self.for_each_block(|_, quant, block| {
            for i in quant.zero_positions() {
                hidden.push(block[i] as u8);
            }
        })?;
        debug!("extracted {} hidden bytes", hidden.len());
        Ok(hidden)
    }

    /// Produce the verbose extraction report: every block's coefficients
    /// with the recovered bytes lined up underneath, the quantization
    /// tables, and the block count.
    pub fn extract_report(&mut self) -> Result<String> {
        let mut report = String::from("QUANTIZED COEFFICIENTS AND HIDDEN DATA:\n\n");

        self.for_each_block(|_, quant, block| {
            let mut coefficients = String::new();
            let mut recovered = String::from("     ");
            let _ = write!(coefficients, "[{:4}", block[0]);
            for k in 1..64 {
                let _ = write!(coefficients, " {:3}", block[k]);
                if quant.values[k] == 0 {
                    let _ = write!(recovered, "   {}", char::from(block[k] as u8));
                } else {
                    recovered.push_str("    ");
                }
            }
            coefficients.push(']');
            report.push_str(&coefficients);
            report.push('\n');
            report.push_str(&recovered);
            report.push('\n');
        })?;

        report.push_str("\nQUANTIZATION TABLES:\n");
        for component in &self.frame.components {
            let _ = writeln!(report, "component {}:", component.id);
            report.push_str(&self.quant_tables[component.quant_idx].to_ascii_table());
        }

        let _ = write!(
            report,
            "\nNUMBER OF BLOCKS:\n{}\n",
            self.frame.total_blocks()
        );

        Ok(report)
    }

    /// Decode every block of the scan in interleaved MCU order.
    fn for_each_block<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Component, &QuantizationTable, &CoefficientBlock),
    {
        let components = self.frame.components.clone();

        self.source.seek(SeekFrom::Start(self.ecs_offset))?;
        let mut reader = BitReader::new(&mut self.source);
        let mut dc_predictors = vec![0i16; components.len()];

        for _mcu_row in 0..self.frame.mcu_rows {
            for _mcu_col in 0..self.frame.mcu_cols {
                for (ci, component) in components.iter().enumerate() {
                    let dc_table = &self.huffman_tables[component.dc_table_idx];
                    let ac_table = &self.huffman_tables[component.ac_table_idx];
                    let quant = &self.quant_tables[component.quant_idx];

                    for _v in 0..component.v_sampling {
                        for _h in 0..component.h_sampling {
                            let block = scan::decode_block(
                                &mut reader,
                                dc_table,
                                ac_table,
                                &mut dc_predictors[ci],
                            )?;
                            visit(component, quant, &block);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_depth(depth: usize) -> Result<()> {
    if !(1..=63).contains(&depth) {
        return Err(StegJpegError::InvalidDepth(depth));
    }
    Ok(())
}

/// Replace the coefficients at the zero quantization positions with
/// payload bytes. Returns `false` once the payload ran dry and at least
/// one position kept its original coefficient.
fn substitute_payload(
    block: &mut CoefficientBlock,
    quant: &QuantizationTable,
    payload: &mut dyn PayloadSource,
    repeat: bool,
) -> Result<bool> {
    let mut filled_all = true;
    for i in quant.zero_positions() {
        let mut byte = payload.next_byte()?;
        if byte.is_none() && repeat && payload.rewind()? {
            byte = payload.next_byte()?;
        }
        match byte {
            Some(b) => block[i] = i16::from(b),
            None => filled_all = false,
        }
    }
    Ok(filled_all)
}

/// Mark `depth` hiding positions by zeroing quantization entries.
///
/// A table that already contains zeros keeps them as the hiding
/// positions. Otherwise the `depth` largest entries are zeroed, each at
/// the last remaining occurrence of its value, so equal entries get
/// zeroed back to front. Zeroing the coarsest quantizers first keeps the
/// visual damage smallest, and preferring high zigzag indices pushes the
/// payload into high-frequency coefficients.
fn mark_hiding_positions(table: &mut QuantizationTable, depth: usize) {
    if table.values.contains(&0) {
        return;
    }

    let mut sorted = table.values;
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    for &value in &sorted[..depth] {
        if let Some(pos) = table.values.iter().rposition(|&q| q == value) {
            table.values[pos] = 0;
        }
    }

    trace!(
        "quantization table {} hides at positions {:?}",
        table.id,
        table.zero_positions().collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: [u8; 64]) -> QuantizationTable {
        QuantizationTable {
            precision: 0,
            id: 0,
            values,
        }
    }

    #[test]
    fn uniform_table_marks_the_last_position() {
        let mut qt = table([50; 64]);
        mark_hiding_positions(&mut qt, 1);
        assert_eq!(qt.values[63], 0);
        assert_eq!(qt.zero_positions().collect::<Vec<_>>(), vec![63]);
    }

    #[test]
    fn distinct_values_mark_the_largest_entries() {
        let mut values = [0u8; 64];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i + 1) as u8;
        }
        let mut qt = table(values);
        mark_hiding_positions(&mut qt, 3);
        assert_eq!(qt.zero_positions().collect::<Vec<_>>(), vec![61, 62, 63]);
    }

    #[test]
    fn duplicate_largest_values_zero_successive_occurrences() {
        let mut values = [1u8; 64];
        values[10] = 200;
        values[20] = 200;
        values[30] = 200;
        let mut qt = table(values);
        mark_hiding_positions(&mut qt, 2);
        // The last occurrence goes first, then the one before it.
        assert_eq!(qt.zero_positions().collect::<Vec<_>>(), vec![20, 30]);
    }

    #[test]
    fn tables_with_existing_zeros_are_left_alone() {
        let mut values = [7u8; 64];
        values[5] = 0;
        let mut qt = table(values);
        mark_hiding_positions(&mut qt, 9);
        assert_eq!(qt.zero_positions().collect::<Vec<_>>(), vec![5]);
        assert_eq!(qt.values[63], 7);
    }

    #[test]
    fn depth_outside_range_is_rejected() {
        assert!(matches!(
            validate_depth(0),
            Err(StegJpegError::InvalidDepth(0))
        ));
        assert!(matches!(
            validate_depth(64),
            Err(StegJpegError::InvalidDepth(64))
        ));
        assert!(validate_depth(1).is_ok());
        assert!(validate_depth(63).is_ok());
    }
}

//! Structural JPEG parsing.
//!
//! Walks the marker segments of a baseline JPEG, retains them in order for
//! later re-emission, materializes the quantization tables, Huffman
//! tables, frame and scan parameters, and records where the entropy-coded
//! segment starts. No pixel decoding happens here.

use std::io::{Read, Seek};

use log::debug;

use crate::error::{Result, StegJpegError};
use crate::jpeg::huffman::HuffmanTable;
use crate::jpeg::marker::Marker;

/// Zigzag order to natural (row-major) order mapping.
pub const ZIGZAG_TO_NATURAL: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58,
    59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Natural (row-major) order to zigzag order mapping.
pub const NATURAL_TO_ZIGZAG: [usize; 64] = [
    0, 1, 5, 6, 14, 15, 27, 28, 2, 4, 7, 13, 16, 26, 29, 42, 3, 8, 12, 17, 25, 30, 41, 43, 9, 11,
    18, 24, 31, 40, 44, 53, 10, 19, 23, 32, 39, 45, 52, 54, 20, 22, 33, 38, 46, 51, 55, 60, 21,
    34, 37, 47, 50, 56, 59, 61, 35, 36, 48, 49, 57, 58, 62, 63,
];

/// An 8-bit quantization table, 64 values in zigzag order.
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    /// Precision nibble (always 0: 8-bit).
    pub precision: u8,
    /// Destination id (0-3).
    pub id: u8,
    /// Table values in zigzag order, as stored in the DQT segment.
    pub values: [u8; 64],
}

impl QuantizationTable {
    /// Zigzag positions whose entry is zero are the hiding positions.
    pub fn zero_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
    }

    /// Format the table as an ASCII grid in natural (row-major) order.
    pub fn to_ascii_table(&self) -> String {
        let mut out = String::new();

        out.push_str("|    |");
        for x in 0..8 {
            out.push_str(&format!("   x{x} |"));
        }
        out.push('\n');

        out.push_str("|----|");
        for _ in 0..8 {
            out.push_str("------|");
        }
        out.push('\n');

        for y in 0..8 {
            out.push_str(&format!("| y{y} "));
            for x in 0..8 {
                let zigzag_idx = NATURAL_TO_ZIGZAG[y * 8 + x];
                out.push_str(&format!("| {:4} ", self.values[zigzag_idx]));
            }
            out.push_str("|\n");
        }

        out
    }
}

/// One frame component and its resolved table bindings.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component id (1 = luma by convention).
    pub id: u8,
    /// Horizontal sampling factor (1-4).
    pub h_sampling: u8,
    /// Vertical sampling factor (1-4).
    pub v_sampling: u8,
    /// Quantization table destination id from SOF0.
    pub quant_table_id: u8,
    /// Index into the parsed quantization table list.
    pub quant_idx: usize,
    /// Index of the DC Huffman table, resolved from the scan header.
    pub dc_table_idx: usize,
    /// Index of the AC Huffman table, resolved from the scan header.
    pub ac_table_idx: usize,
}

/// Frame parameters from SOF0, with the derived MCU grid.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Sample precision in bits (8 for baseline).
    pub precision: u8,
    /// Image height in pixels.
    pub height: u16,
    /// Image width in pixels.
    pub width: u16,
    /// Components in frame order.
    pub components: Vec<Component>,
    /// Largest horizontal sampling factor.
    pub max_h: u8,
    /// Largest vertical sampling factor.
    pub max_v: u8,
    /// MCU columns.
    pub mcu_cols: usize,
    /// MCU rows.
    pub mcu_rows: usize,
}

impl FrameInfo {
    /// Total number of 8x8 blocks in the interleaved scan.
    pub fn total_blocks(&self) -> usize {
        let per_mcu: usize = self
            .components
            .iter()
            .map(|c| c.h_sampling as usize * c.v_sampling as usize)
            .sum();
        self.mcu_rows * self.mcu_cols * per_mcu
    }
}

/// A retained marker segment.
#[derive(Debug, Clone)]
pub struct Segment {
    /// The marker type.
    pub marker: Marker,
    /// Segment payload (excluding marker and length bytes).
    pub data: Vec<u8>,
    /// Indices of the quantization tables this segment defined.
    pub quant_indices: Vec<usize>,
    /// Indices of the Huffman tables this segment defined.
    pub huffman_indices: Vec<usize>,
}

/// Everything the transcoder needs from the header part of a JPEG.
#[derive(Debug)]
pub struct ParsedJpeg {
    /// Retained segments in input order.
    pub segments: Vec<Segment>,
    /// Quantization tables in definition order.
    pub quant_tables: Vec<QuantizationTable>,
    /// Huffman tables in definition order.
    pub huffman_tables: Vec<HuffmanTable>,
    /// Frame parameters with resolved table bindings.
    pub frame: FrameInfo,
    /// Byte offset of the first entropy-coded byte (right after the SOS
    /// segment).
    pub ecs_offset: u64,
}

/// Parse the header part of a JPEG up to and including the SOS segment.
pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<ParsedJpeg> {
    let mut soi = [0u8; 2];
    read_exactly(reader, &mut soi)?;
    if soi != [0xFF, 0xD8] {
        return Err(StegJpegError::malformed("missing SOI marker"));
    }

    // Collect segments until the scan begins.
    let mut segments = Vec::new();
    let ecs_offset;
    loop {
        let marker = read_marker(reader)?;
        if marker == Marker::EOI {
            return Err(StegJpegError::malformed("EOI before SOS"));
        }
        if !marker.has_length() {
            // RST and TEM carry no payload; nothing to retain.
            continue;
        }
        let length = read_length(reader)?;
        let mut data = vec![0u8; length];
        read_exactly(reader, &mut data)?;

        let is_sos = marker == Marker::SOS;
        segments.push(Segment {
            marker,
            data,
            quant_indices: Vec::new(),
            huffman_indices: Vec::new(),
        });

        if is_sos {
            ecs_offset = reader.stream_position()?;
            break;
        }
    }

    // Interpret the retained segments in order.
    let mut quant_tables: Vec<QuantizationTable> = Vec::new();
    let mut huffman_tables: Vec<HuffmanTable> = Vec::new();
    let mut frame: Option<FrameInfo> = None;

    for segment in &mut segments {
        match segment.marker {
            Marker::DQT => parse_dqt(segment, &mut quant_tables)?,
            Marker::DHT => parse_dht(segment, &mut huffman_tables)?,
            Marker::SOF(0) => {
                if frame.is_some() {
                    return Err(StegJpegError::malformed("multiple SOF segments"));
                }
                frame = Some(parse_sof(&segment.data)?);
            }
            Marker::SOF(_) | Marker::DAC | Marker::DNL => {
                return Err(StegJpegError::UnsupportedFormat);
            }
            Marker::DRI => {
                if segment.data.len() < 2 {
                    return Err(StegJpegError::malformed("DRI segment too short"));
                }
                let interval = u16::from_be_bytes([segment.data[0], segment.data[1]]);
                if interval != 0 {
                    // Restart markers would desynchronize the bit reader.
                    return Err(StegJpegError::UnsupportedFormat);
                }
            }
            Marker::SOS => {
                let frame = frame
                    .as_mut()
                    .ok_or_else(|| StegJpegError::malformed("SOS before SOF0"))?;
                parse_sos(&segment.data, frame, &huffman_tables)?;
            }
            _ => {}
        }
    }

    let mut frame = frame.ok_or_else(|| StegJpegError::malformed("missing SOF0 segment"))?;
    if quant_tables.is_empty() {
        return Err(StegJpegError::malformed("missing DQT segment"));
    }

    // Bind each component to the latest table defined for its id.
    for component in &mut frame.components {
        component.quant_idx = quant_tables
            .iter()
            .rposition(|qt| qt.id == component.quant_table_id)
            .ok_or_else(|| {
                StegJpegError::malformed(format!(
                    "no quantization table with id {}",
                    component.quant_table_id
                ))
            })?;
    }

    debug!(
        "parsed JPEG: {}x{}, {} components, {} MCUs, {} quantization tables, {} Huffman tables",
        frame.width,
        frame.height,
        frame.components.len(),
        frame.mcu_rows * frame.mcu_cols,
        quant_tables.len(),
        huffman_tables.len(),
    );

    Ok(ParsedJpeg {
        segments,
        quant_tables,
        huffman_tables,
        frame,
        ecs_offset,
    })
}

fn read_exactly<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader
        .read_exact(buf)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                StegJpegError::malformed("unexpected end of stream")
            }
            _ => StegJpegError::Io(e),
        })
}

fn read_marker<R: Read>(reader: &mut R) -> Result<Marker> {
    let mut bytes = [0u8; 2];
    read_exactly(reader, &mut bytes)?;
    if bytes[0] != 0xFF {
        return Err(StegJpegError::malformed(format!(
            "expected marker, found 0x{:02X}{:02X}",
            bytes[0], bytes[1]
        )));
    }
    Marker::from_u8(bytes[1])
        .ok_or_else(|| StegJpegError::malformed(format!("invalid marker byte 0x{:02X}", bytes[1])))
}

/// Read a segment length (big-endian, including its own two bytes) and
/// return the payload size.
fn read_length<R: Read>(reader: &mut R) -> Result<usize> {
    let mut bytes = [0u8; 2];
    read_exactly(reader, &mut bytes)?;
    let length = u16::from_be_bytes(bytes) as usize;
    if length < 2 {
        return Err(StegJpegError::malformed("segment length too small"));
    }
    Ok(length - 2)
}

/// Parse a DQT segment: one or more `(pq, tq)` bytes each followed by 64
/// table values.
fn parse_dqt(segment: &mut Segment, quant_tables: &mut Vec<QuantizationTable>) -> Result<()> {
    let data = &segment.data;
    let mut pos = 0;

    while pos < data.len() {
        let precision = data[pos] >> 4;
        let id = data[pos] & 0x0F;
        pos += 1;

        if precision != 0 {
            // 16-bit tables cannot express the rewritten hiding positions.
            return Err(StegJpegError::UnsupportedFormat);
        }
        if id > 3 {
            return Err(StegJpegError::malformed(format!(
                "invalid quantization table id {id}"
            )));
        }
        if pos + 64 > data.len() {
            return Err(StegJpegError::malformed("DQT segment too short"));
        }

        let mut values = [0u8; 64];
        values.copy_from_slice(&data[pos..pos + 64]);
        pos += 64;

        quant_tables.push(QuantizationTable {
            precision,
            id,
            values,
        });
        segment.quant_indices.push(quant_tables.len() - 1);
    }

    Ok(())
}

/// Parse a DHT segment: one or more `(tc, th)` bytes each followed by 16
/// length counts and the value lists.
fn parse_dht(segment: &mut Segment, huffman_tables: &mut Vec<HuffmanTable>) -> Result<()> {
    let data = &segment.data;
    let mut pos = 0;

    while pos < data.len() {
        let class = data[pos] >> 4;
        let id = data[pos] & 0x0F;
        pos += 1;

        if class > 1 || id > 3 {
            return Err(StegJpegError::malformed(format!(
                "invalid Huffman table: class {class}, id {id}"
            )));
        }
        if pos + 16 > data.len() {
            return Err(StegJpegError::malformed(
                "DHT segment too short for code lengths",
            ));
        }

        let mut code_lengths = [0u8; 16];
        code_lengths.copy_from_slice(&data[pos..pos + 16]);
        pos += 16;

        let total: usize = code_lengths.iter().map(|&n| n as usize).sum();
        if pos + total > data.len() {
            return Err(StegJpegError::malformed(
                "DHT segment too short for symbol values",
            ));
        }
        let values = data[pos..pos + total].to_vec();
        pos += total;

        huffman_tables.push(HuffmanTable::new(class, id, code_lengths, values)?);
        segment.huffman_indices.push(huffman_tables.len() - 1);
    }

    Ok(())
}

/// Parse the SOF0 payload into frame parameters and the MCU grid.
fn parse_sof(data: &[u8]) -> Result<FrameInfo> {
    if data.len() < 6 {
        return Err(StegJpegError::malformed("SOF0 segment too short"));
    }

    let precision = data[0];
    let height = u16::from_be_bytes([data[1], data[2]]);
    let width = u16::from_be_bytes([data[3], data[4]]);
    let component_count = data[5] as usize;

    if height == 0 || width == 0 {
        return Err(StegJpegError::malformed("SOF0 declares an empty image"));
    }
    if !(1..=3).contains(&component_count) {
        // Four-component (CMYK) scans are out of scope.
        return Err(StegJpegError::UnsupportedFormat);
    }
    if data.len() < 6 + component_count * 3 {
        return Err(StegJpegError::malformed(
            "SOF0 segment too short for components",
        ));
    }

    let mut components = Vec::with_capacity(component_count);
    let mut max_h = 0u8;
    let mut max_v = 0u8;
    for i in 0..component_count {
        let offset = 6 + i * 3;
        let id = data[offset];
        let h_sampling = data[offset + 1] >> 4;
        let v_sampling = data[offset + 1] & 0x0F;
        let quant_table_id = data[offset + 2];

        if !(1..=4).contains(&h_sampling) || !(1..=4).contains(&v_sampling) {
            return Err(StegJpegError::malformed(format!(
                "invalid sampling factors {h_sampling}x{v_sampling} for component {id}"
            )));
        }
        max_h = max_h.max(h_sampling);
        max_v = max_v.max(v_sampling);

        components.push(Component {
            id,
            h_sampling,
            v_sampling,
            quant_table_id,
            quant_idx: 0,
            dc_table_idx: 0,
            ac_table_idx: 0,
        });
    }

    let mcu_width = 8 * max_h as usize;
    let mcu_height = 8 * max_v as usize;
    let mcu_cols = (width as usize).div_ceil(mcu_width);
    let mcu_rows = (height as usize).div_ceil(mcu_height);

    Ok(FrameInfo {
        precision,
        height,
        width,
        components,
        max_h,
        max_v,
        mcu_cols,
        mcu_rows,
    })
}

/// Parse the SOS payload and bind each component to its DC and AC tables.
fn parse_sos(data: &[u8], frame: &mut FrameInfo, huffman_tables: &[HuffmanTable]) -> Result<()> {
    if data.is_empty() {
        return Err(StegJpegError::malformed("SOS header empty"));
    }

    let scan_components = data[0] as usize;
    if data.len() < 1 + scan_components * 2 + 3 {
        return Err(StegJpegError::malformed("SOS header too short"));
    }
    if scan_components != frame.components.len() {
        // A scan covering only part of the frame is not interleaved.
        return Err(StegJpegError::UnsupportedFormat);
    }

    let mut bound = vec![false; frame.components.len()];
    for i in 0..scan_components {
        let offset = 1 + i * 2;
        let component_id = data[offset];
        let dc_table_id = data[offset + 1] >> 4;
        let ac_table_id = data[offset + 1] & 0x0F;

        let (ci, component) = frame
            .components
            .iter_mut()
            .enumerate()
            .find(|(_, c)| c.id == component_id)
            .ok_or_else(|| {
                StegJpegError::malformed(format!("scan references unknown component {component_id}"))
            })?;

        component.dc_table_idx = huffman_tables
            .iter()
            .rposition(|ht| ht.class == 0 && ht.id == dc_table_id)
            .ok_or_else(|| {
                StegJpegError::malformed(format!("no DC Huffman table with id {dc_table_id}"))
            })?;
        component.ac_table_idx = huffman_tables
            .iter()
            .rposition(|ht| ht.class == 1 && ht.id == ac_table_id)
            .ok_or_else(|| {
                StegJpegError::malformed(format!("no AC Huffman table with id {ac_table_id}"))
            })?;
        bound[ci] = true;
    }

    if !bound.iter().all(|&b| b) {
        return Err(StegJpegError::malformed(
            "scan does not cover every frame component",
        ));
    }

    Ok(())
}

//! Payload byte sources.
//!
//! The embedder pulls payload bytes one at a time and, when configured to
//! repeat, rewinds the source once it is exhausted. Rewinding needs a
//! seekable source; wrapping a plain reader degrades repeat to a single
//! pass.

use std::io::{self, Read, Seek, SeekFrom};

/// A source of payload bytes for the embedder.
pub trait PayloadSource {
    /// Read the next payload byte, or `None` when the source is exhausted.
    fn next_byte(&mut self) -> io::Result<Option<u8>>;

    /// Rewind to the first byte. Returns `false` when the source cannot
    /// seek, in which case repeating is silently skipped.
    fn rewind(&mut self) -> io::Result<bool>;
}

/// A payload backed by a seekable reader; supports repeating.
pub struct SeekablePayload<R> {
    src: R,
}

impl<R: Read + Seek> SeekablePayload<R> {
    pub fn new(src: R) -> Self {
        SeekablePayload { src }
    }
}

impl<R: Read + Seek> PayloadSource for SeekablePayload<R> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        read_one(&mut self.src)
    }

    fn rewind(&mut self) -> io::Result<bool> {
        self.src.seek(SeekFrom::Start(0))?;
        Ok(true)
    }
}

/// A payload backed by a plain reader; repeat degrades to a single pass.
pub struct StreamingPayload<R> {
    src: R,
}

impl<R: Read> StreamingPayload<R> {
    pub fn new(src: R) -> Self {
        StreamingPayload { src }
    }
}

impl<R: Read> PayloadSource for StreamingPayload<R> {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        read_one(&mut self.src)
    }

    fn rewind(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

fn read_one<R: Read>(src: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match src.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn seekable_payload_rewinds() {
        let mut payload = SeekablePayload::new(Cursor::new(b"ab".to_vec()));
        assert_eq!(payload.next_byte().unwrap(), Some(b'a'));
        assert_eq!(payload.next_byte().unwrap(), Some(b'b'));
        assert_eq!(payload.next_byte().unwrap(), None);

        assert!(payload.rewind().unwrap());
        assert_eq!(payload.next_byte().unwrap(), Some(b'a'));
    }

    #[test]
    fn streaming_payload_reports_no_rewind() {
        let mut payload = StreamingPayload::new(&b"xy"[..]);
        assert_eq!(payload.next_byte().unwrap(), Some(b'x'));
        assert!(!payload.rewind().unwrap());
        assert_eq!(payload.next_byte().unwrap(), Some(b'y'));
        assert_eq!(payload.next_byte().unwrap(), None);
    }
}

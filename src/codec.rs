//! Binary layout of term records
//!
//! A record is a big-endian `u32` term ID followed by one fixed-width tuple
//! per posting:
//!
//! | shape   | posting layout                        | width |
//! |---------|---------------------------------------|-------|
//! | raw     | `doc_id: u32`, `tf: u32`              | 8     |
//! | refined | `doc_id: u32`, `tf: u32`, `w: f32`    | 12    |
//!
//! The file layout does not describe which shape is stored, the reader
//! chooses it through the posting type.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::base::{DocPosting, Posting, TermRecord, WeightedPosting};
use crate::error::{Error, Result};

pub const TERM_ID_WIDTH: usize = std::mem::size_of::<u32>();

/// A posting shape that can be written in a term record
pub trait PostingFormat: DocPosting + Send + 'static {
    /// Number of bytes for one posting
    const WIDTH: usize;

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()>;
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self>;
}

impl PostingFormat for Posting {
    const WIDTH: usize = 8;

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<BigEndian>(self.doc_id)?;
        writer.write_u32::<BigEndian>(self.frequency)
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        let doc_id = reader.read_u32::<BigEndian>()?;
        let frequency = reader.read_u32::<BigEndian>()?;
        Ok(Posting { doc_id, frequency })
    }
}

impl PostingFormat for WeightedPosting {
    const WIDTH: usize = 12;

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<BigEndian>(self.doc_id)?;
        writer.write_u32::<BigEndian>(self.frequency)?;
        writer.write_f32::<BigEndian>(self.weight)
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        let doc_id = reader.read_u32::<BigEndian>()?;
        let frequency = reader.read_u32::<BigEndian>()?;
        let weight = reader.read_f32::<BigEndian>()?;
        Ok(WeightedPosting {
            doc_id,
            frequency,
            weight,
        })
    }
}

/// Size in bytes of an encoded record
#[inline]
pub fn encoded_len<P: PostingFormat>(record: &TermRecord<P>) -> usize {
    TERM_ID_WIDTH + record.postings.len() * P::WIDTH
}

/// Writes a record, returning the number of bytes written
pub fn encode_into<P, W>(record: &TermRecord<P>, writer: &mut W) -> std::io::Result<u64>
where
    P: PostingFormat,
    W: Write + ?Sized,
{
    writer.write_u32::<BigEndian>(record.term_id)?;
    for posting in record.postings.iter() {
        posting.write_to(writer)?;
    }
    Ok(encoded_len(record) as u64)
}

pub fn encode<P: PostingFormat>(record: &TermRecord<P>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(encoded_len(record));
    encode_into(record, &mut bytes).expect("writing to a vector cannot fail");
    bytes
}

/// Decodes exactly one record spanning the whole slice
pub fn decode<P: PostingFormat>(bytes: &[u8]) -> Result<TermRecord<P>> {
    if bytes.len() < TERM_ID_WIDTH {
        return Err(Error::decode(format!(
            "record of {} bytes is shorter than a term ID",
            bytes.len()
        )));
    }

    let body = bytes.len() - TERM_ID_WIDTH;
    if body % P::WIDTH != 0 {
        return Err(Error::decode(format!(
            "{} bytes of postings is not a multiple of the posting width {}",
            body,
            P::WIDTH
        )));
    }

    let mut cursor = bytes;
    let term_id = cursor.read_u32::<BigEndian>()?;
    let count = body / P::WIDTH;
    let mut postings = Vec::with_capacity(count);
    for _ in 0..count {
        postings.push(P::read_from(&mut cursor)?);
    }

    Ok(TermRecord { term_id, postings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        let record = TermRecord::new(
            42,
            vec![Posting::new(1, 3), Posting::new(7, 1), Posting::new(9, 12)],
        );
        let bytes = encode(&record);
        assert_eq!(bytes.len(), 4 + 3 * 8);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 42]);

        let decoded: TermRecord<Posting> = decode(&bytes).expect("valid record");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_refined_round_trip_is_bit_exact() {
        let record = TermRecord::new(
            u32::MAX,
            vec![
                WeightedPosting::new(1, 2, 0.1),
                WeightedPosting::new(2, 1, -3.75e-12),
                WeightedPosting::new(5, 1, f32::MAX),
            ],
        );
        let decoded: TermRecord<WeightedPosting> = decode(&encode(&record)).expect("valid record");
        assert_eq!(decoded.term_id, record.term_id);
        for (a, b) in decoded.postings.iter().zip(record.postings.iter()) {
            assert_eq!(a.weight.to_bits(), b.weight.to_bits());
            assert_eq!(a.doc_id, b.doc_id);
            assert_eq!(a.frequency, b.frequency);
        }
    }

    #[test]
    fn test_empty_posting_list() {
        let record: TermRecord<Posting> = TermRecord::new(3, vec![]);
        let bytes = encode(&record);
        assert_eq!(bytes.len(), TERM_ID_WIDTH);
        assert_eq!(decode::<Posting>(&bytes).expect("valid record"), record);
    }

    #[test]
    fn test_short_record_is_an_error() {
        assert!(matches!(
            decode::<Posting>(&[0, 1]),
            Err(Error::Decode { .. })
        ));

        // A truncated posting must not be silently dropped
        let mut bytes = encode(&TermRecord::new(1, vec![Posting::new(1, 1)]));
        bytes.pop();
        assert!(matches!(decode::<Posting>(&bytes), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_shape_mismatch_is_detected() {
        // Two raw postings (16 bytes) are not a whole number of refined postings
        let bytes = encode(&TermRecord::new(
            1,
            vec![Posting::new(1, 1), Posting::new(2, 1)],
        ));
        assert!(decode::<WeightedPosting>(&bytes).is_err());
    }
}

//! Reader for FASTA and FASTQ read files using noodles.
//!
//! The format is detected from the content, not the extension, and gzip/bgzip
//! compressed input is decompressed transparently. Each record is split into clean
//! segments: maximal runs of upper-cased A, C, G, T bases (with quality at or above
//! a minimum, for FASTQ) that are at least one k-mer long.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::{fasta, fastq};
use thiserror::Error;
use tracing::debug;

use crate::core::kmer::{is_nucleotide, reverse_complement};
use crate::utils::validation::{
    check_read_limit, detect_sequence_format, is_gzip_content, phred_score, SequenceFormat,
};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid read file: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many reads: {0} exceeds maximum allowed (50000000)")]
    TooManyReads(usize),
}

/// A clean read segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// How records are turned into segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Segments shorter than this are dropped (normally k)
    pub min_length: usize,
    /// Minimum Phred score of a kept FASTQ base
    pub min_quality: u8,
    /// Reverse-complement every segment
    pub reverse_complement: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            min_length: 25,
            min_quality: 3,
            reverse_complement: false,
        }
    }
}

/// Split `seq` into maximal runs of A, C, G, T (case-insensitive, returned upper-case)
/// whose quality, when given, is at least `min_quality`. Runs shorter than
/// `min_length` are dropped.
#[must_use]
pub fn split_segments(
    seq: &[u8],
    quality: Option<&[u8]>,
    min_quality: u8,
    min_length: usize,
) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();

    for (i, &raw) in seq.iter().enumerate() {
        let base = raw.to_ascii_uppercase();
        let quality_ok = quality
            .and_then(|q| q.get(i))
            .map_or(true, |&q| phred_score(q) >= min_quality);

        if is_nucleotide(base) && quality_ok {
            current.push(base);
        } else if !current.is_empty() {
            let segment = std::mem::take(&mut current);
            if segment.len() >= min_length {
                segments.push(segment);
            }
        }
    }
    if !current.is_empty() && current.len() >= min_length {
        segments.push(current);
    }

    segments
}

/// Open a file, decompressing gzip content when present
fn open_decompressed(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let mut reader = BufReader::new(File::open(path)?);
    if is_gzip_content(reader.fill_buf()?) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Collects segments of successive records
struct SegmentCollector {
    options: ReadOptions,
    reads: Vec<Read>,
}

impl SegmentCollector {
    fn push_record(&mut self, name: &str, seq: &[u8], quality: Option<&[u8]>) -> Result<(), ParseError> {
        let segments = split_segments(seq, quality, self.options.min_quality, self.options.min_length);
        let split = segments.len() > 1;

        for (i, mut segment) in segments.into_iter().enumerate() {
            if check_read_limit(self.reads.len()).is_some() {
                return Err(ParseError::TooManyReads(self.reads.len()));
            }
            if self.options.reverse_complement {
                segment = reverse_complement(&segment);
            }
            let name = if split {
                format!("{name}/{}", i + 1)
            } else {
                name.to_string()
            };
            self.reads.push(Read {
                name,
                sequence: segment,
            });
        }
        Ok(())
    }
}

/// Read every record of a FASTA or FASTQ file (optionally gzip-compressed) and split
/// it into clean segments.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if a
/// record is malformed, `ParseError::InvalidFormat` for an empty file,
/// `ParseError::UnsupportedFormat` if the content is neither FASTA nor FASTQ, or
/// `ParseError::TooManyReads` if the limit is exceeded.
pub fn read_segments(path: &Path, options: ReadOptions) -> Result<Vec<Read>, ParseError> {
    let mut reader = open_decompressed(path)?;
    let head = reader.fill_buf()?;
    if head.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "{} is empty",
            path.display()
        )));
    }

    let mut collector = SegmentCollector {
        options,
        reads: Vec::new(),
    };

    match detect_sequence_format(head) {
        Some(SequenceFormat::Fasta) => {
            let mut fasta_reader = fasta::io::Reader::new(reader);
            for result in fasta_reader.records() {
                let record = result
                    .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;
                let name = String::from_utf8_lossy(record.name()).to_string();
                collector.push_record(&name, record.sequence().as_ref(), None)?;
            }
        }
        Some(SequenceFormat::Fastq) => {
            let mut fastq_reader = fastq::io::Reader::new(reader);
            for result in fastq_reader.records() {
                let record = result
                    .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTQ record: {e}")))?;
                let name = String::from_utf8_lossy(record.name().as_ref()).to_string();
                collector.push_record(&name, record.sequence(), Some(record.quality_scores()))?;
            }
        }
        None => {
            return Err(ParseError::UnsupportedFormat(format!(
                "{} is neither FASTA nor FASTQ",
                path.display()
            )));
        }
    }

    debug!(path = %path.display(), segments = collector.reads.len(), "Loaded read segments");
    Ok(collector.reads)
}

//! Centralized validation and helper functions.

use crate::core::kmer::is_nucleotide;

/// Maximum number of read segments loaded from a single file
pub const MAX_READS: usize = 50_000_000;

/// Offset of Sanger/Illumina 1.8+ quality characters
pub const PHRED_OFFSET: u8 = 33;

/// Sequence formats recognized by their first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

/// Whether every base of `seq` is upper-case A, C, G or T.
///
/// # Examples
///
/// ```
/// use bloom_dbg::utils::validation::is_valid_nucleotide_seq;
///
/// assert!(is_valid_nucleotide_seq(b"ACGTTGCA"));
/// assert!(!is_valid_nucleotide_seq(b"ACGNT"));
/// assert!(!is_valid_nucleotide_seq(b"acgt"));
/// ```
#[must_use]
pub fn is_valid_nucleotide_seq(seq: &[u8]) -> bool {
    seq.iter().all(|&b| is_nucleotide(b))
}

/// Check if adding another read would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new read.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_read_limit(count: usize) -> Option<String> {
    if count >= MAX_READS {
        Some(format!(
            "Too many reads: adding another would exceed maximum of {MAX_READS}"
        ))
    } else {
        None
    }
}

/// Phred score of a quality character, saturating at zero for characters below the
/// offset
#[inline]
#[must_use]
pub fn phred_score(quality: u8) -> u8 {
    quality.saturating_sub(PHRED_OFFSET)
}

/// Whether `content` starts with the gzip magic number
#[must_use]
pub fn is_gzip_content(content: &[u8]) -> bool {
    content.starts_with(&[0x1f, 0x8b])
}

/// Identify FASTA or FASTQ content from its first non-whitespace byte.
///
/// Gzip content must be decompressed first.
#[must_use]
pub fn detect_sequence_format(content: &[u8]) -> Option<SequenceFormat> {
    match content.iter().find(|b| !b.is_ascii_whitespace())? {
        b'>' => Some(SequenceFormat::Fasta),
        b'@' => Some(SequenceFormat::Fastq),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_nucleotide_seq() {
        assert!(is_valid_nucleotide_seq(b"ACGT"));
        assert!(is_valid_nucleotide_seq(b""));
        assert!(!is_valid_nucleotide_seq(b"ACGU"));
        assert!(!is_valid_nucleotide_seq(b"ACG-T"));
    }

    #[test]
    fn test_check_read_limit() {
        assert!(check_read_limit(0).is_none());
        assert!(check_read_limit(MAX_READS - 1).is_none());
        assert!(check_read_limit(MAX_READS).is_some());
    }

    #[test]
    fn test_phred_score() {
        assert_eq!(phred_score(b'!'), 0);
        assert_eq!(phred_score(b'5'), 20);
        assert_eq!(phred_score(b'I'), 40);
        assert_eq!(phred_score(b' '), 0);
    }

    #[test]
    fn test_detect_sequence_format() {
        assert_eq!(detect_sequence_format(b">r1\nACGT\n"), Some(SequenceFormat::Fasta));
        assert_eq!(detect_sequence_format(b"\n@r1\nACGT\n+\nIIII\n"), Some(SequenceFormat::Fastq));
        assert_eq!(detect_sequence_format(b"ACGT"), None);
        assert_eq!(detect_sequence_format(b""), None);
    }

    #[test]
    fn test_is_gzip_content() {
        assert!(is_gzip_content(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip_content(b">r1"));
    }
}

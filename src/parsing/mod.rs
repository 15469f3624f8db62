//! Input parsing for read files.
//!
//! - **FASTA** (`>` records, multi-line sequences)
//! - **FASTQ** (`@` records with Phred+33 qualities)
//!
//! Either may be gzip or bgzip compressed. The format is detected from the content.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloom_dbg::parsing::reads::{read_segments, ReadOptions};
//! use std::path::Path;
//!
//! let options = ReadOptions { min_length: 31, ..ReadOptions::default() };
//! let reads = read_segments(Path::new("reads.fq.gz"), options).unwrap();
//! println!("{} clean segments", reads.len());
//! ```

pub mod reads;

pub use reads::{read_segments, split_segments, ParseError, Read, ReadOptions};

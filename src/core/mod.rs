//! Core nucleotide types shared by every layer of the assembler.
//!
//! - [`Kmer`]: a fixed-length nucleotide string, the atomic unit of the graph
//! - [`KmerNode`]: a k-mer together with the coverage observed when it was looked up
//! - [`Direction`]: which way a walk through the graph extends
//! - [`codec`]: compact 2-bit packing of k-mers and low-complexity detection
//!
//! ## Alphabet
//!
//! Only upper-case `A`, `C`, `G` and `T` are graph members. Helpers that take raw
//! sequence skip (or reject) windows containing anything else:
//!
//! | Base | Rank | Complement |
//! |------|------|------------|
//! | A    | 0    | T          |
//! | C    | 1    | G          |
//! | G    | 2    | C          |
//! | T/U  | 3    | A          |

pub mod codec;
pub mod kmer;

pub use codec::{KmerCodec, PackedKmer};
pub use kmer::{Direction, Kmer, KmerNode, NUCLEOTIDES};

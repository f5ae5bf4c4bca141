//! Rateless encoder: an unbounded, pull-based stream of coded blocks.

use std::collections::BTreeSet;

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::EncoderConfig;
use crate::error::Result;
use crate::slicer::SymbolTable;
use crate::soliton::IdealSoliton;
use crate::{CodedBlock, CodingSession};

/// Fountain encoder over one framed input.
///
/// Each call to [`next_block`](Self::next_block) draws a degree from the
/// Ideal Soliton distribution, picks that many distinct symbols uniformly,
/// and XORs them. There is no stop condition; the caller decides how many
/// blocks to emit.
pub struct FountainEncoder<R = StdRng> {
    symbols: SymbolTable,
    session: CodingSession,
    degrees: IdealSoliton,
    rng: R,
    emitted: u64,
}

impl FountainEncoder<StdRng> {
    /// Encoder seeded from OS entropy.
    pub fn new(data: Vec<u8>, slice_size: usize) -> Result<Self> {
        Self::with_rng(data, slice_size, StdRng::from_entropy())
    }

    pub fn from_config(data: Vec<u8>, config: &EncoderConfig) -> Result<Self> {
        config.validate()?;
        Self::new(data, config.slice_size)
    }
}

impl<R: Rng> FountainEncoder<R> {
    pub fn with_rng(data: Vec<u8>, slice_size: usize, rng: R) -> Result<Self> {
        let symbols = SymbolTable::new(data, slice_size)?;
        let session = CodingSession::for_data(symbols.bytes(), slice_size)?;
        Ok(Self {
            degrees: IdealSoliton::new(symbols.count()),
            symbols,
            session,
            rng,
            emitted: 0,
        })
    }

    pub fn session(&self) -> CodingSession {
        self.session
    }

    pub fn slice_size(&self) -> usize {
        self.symbols.slice_size()
    }

    pub fn symbol_count(&self) -> u32 {
        self.symbols.count()
    }

    /// Blocks produced by `next_block` so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Next coded block of the fountain.
    pub fn next_block(&mut self) -> CodedBlock {
        let k = self.symbols.count();
        let degree = self.degrees.sample(&mut self.rng).min(k) as usize;

        // Rejection sampling; the set keeps them sorted for the wire.
        let mut chosen = BTreeSet::new();
        while chosen.len() < degree {
            chosen.insert(self.rng.gen_range(0..k));
        }
        let indices: Vec<u32> = chosen.into_iter().collect();

        self.emitted += 1;
        trace!(
            seq = self.emitted,
            degree,
            k,
            "emitting coded block"
        );

        CodedBlock {
            payload: self.symbols.combine(&indices),
            indices,
            session: self.session,
        }
    }

    /// Degree-1 block carrying symbol `index` verbatim (zero-padded).
    pub fn source_block(&self, index: u32) -> Option<CodedBlock> {
        if index >= self.symbols.count() {
            return None;
        }
        Some(CodedBlock {
            indices: vec![index],
            session: self.session,
            payload: self.symbols.combine(&[index]),
        })
    }
}

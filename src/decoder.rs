//! Peeling decoder for fountain-coded blocks.
//!
//! Blocks arrive in any order, possibly duplicated. Each block is reduced by
//! the symbols already known; a block left with one unknown index resolves
//! that symbol, and every resolution is pushed through the blocks still
//! waiting on it until nothing more simplifies. No Gaussian elimination is
//! attempted, so a transfer can stall until a more useful block arrives.
//!
//! ```text
//! Empty --ingest--> Collecting <--> Stalled
//!                        \             /
//!                         +-> Complete
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{FountainError, Result};
use crate::slicer::{self, xor_into};
use crate::{checksum, CodedBlock, CodingSession};

/// Largest symbol count a decoder accepts unless told otherwise.
///
/// `k` comes from an unauthenticated header and sizes the decoder's tables,
/// so it is capped before anything is allocated.
pub const DEFAULT_MAX_SYMBOLS: u32 = 1 << 16;

/// Observable decoder state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeState {
    /// No block accepted yet.
    Empty,
    /// Bound to a session, nothing parked.
    Collecting,
    /// Parked blocks exist but none can be reduced to a single symbol.
    Stalled,
    /// Every symbol known.
    Complete,
}

/// What one `ingest` call did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ingested {
    /// Block belongs to another session; dropped.
    Foreign,
    /// Every index already known; no new information.
    Redundant,
    /// Same unknown index set as a block already parked.
    Duplicate,
    /// Parked until more symbols are known.
    Pending,
    /// Resolved this many symbols, cascade included.
    Resolved { symbols: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub resolved: usize,
    pub total: usize,
    pub pending: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingBlock {
    indices: Vec<u32>,
    payload: Vec<u8>,
}

/// Peeling state for one bound session.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Peeling {
    session: CodingSession,
    slice_size: usize,
    known: Vec<Option<Vec<u8>>>,
    resolved: usize,
    // Slab of parked blocks; `free` holds vacated slots.
    pending: Vec<Option<PendingBlock>>,
    free: Vec<usize>,
    // Reduced index set -> slot. One entry per live parked block.
    by_set: HashMap<Vec<u32>, usize>,
    // Symbol -> slots that referenced it when parked. May hold stale slots.
    by_symbol: Vec<Vec<usize>>,
}

impl Peeling {
    fn new(session: CodingSession, slice_size: usize) -> Self {
        let k = session.k as usize;
        Self {
            session,
            slice_size,
            known: vec![None; k],
            resolved: 0,
            pending: Vec::new(),
            free: Vec::new(),
            by_set: HashMap::new(),
            by_symbol: vec![Vec::new(); k],
        }
    }

    fn is_complete(&self) -> bool {
        self.resolved == self.known.len()
    }

    fn absorb(&mut self, indices: &[u32], payload: &[u8]) -> Ingested {
        let mut payload = payload.to_vec();
        let mut unknown = Vec::with_capacity(indices.len());
        for &index in indices {
            match &self.known[index as usize] {
                Some(symbol) => xor_into(&mut payload, symbol),
                None => unknown.push(index),
            }
        }

        match unknown.len() {
            0 => Ingested::Redundant,
            1 => {
                let before = self.resolved;
                self.resolve(unknown[0], payload);
                Ingested::Resolved {
                    symbols: self.resolved - before,
                }
            }
            _ if self.by_set.contains_key(&unknown) => Ingested::Duplicate,
            _ => {
                self.park(unknown, payload);
                Ingested::Pending
            }
        }
    }

    fn park(&mut self, indices: Vec<u32>, payload: Vec<u8>) {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.pending.push(None);
                self.pending.len() - 1
            }
        };
        for &index in &indices {
            self.by_symbol[index as usize].push(slot);
        }
        self.by_set.insert(indices.clone(), slot);
        self.pending[slot] = Some(PendingBlock { indices, payload });
    }

    fn release(&mut self, slot: usize) -> Option<PendingBlock> {
        let block = self.pending[slot].take()?;
        self.free.push(slot);
        Some(block)
    }

    /// Set symbol `index` and drain the cascade it starts.
    fn resolve(&mut self, index: u32, payload: Vec<u8>) {
        let mut work = vec![(index, payload)];

        while let Some((index, symbol)) = work.pop() {
            let i = index as usize;
            if self.known[i].is_some() {
                continue;
            }

            for slot in std::mem::take(&mut self.by_symbol[i]) {
                let remaining = {
                    let Some(block) = self.pending[slot].as_mut() else {
                        continue;
                    };
                    let Ok(pos) = block.indices.binary_search(&index) else {
                        continue;
                    };
                    self.by_set.remove(&block.indices);
                    block.indices.remove(pos);
                    xor_into(&mut block.payload, &symbol);
                    block.indices.clone()
                };

                if remaining.len() == 1 {
                    if let Some(block) = self.release(slot) {
                        work.push((remaining[0], block.payload));
                    }
                } else if self.by_set.contains_key(&remaining) {
                    self.release(slot);
                } else {
                    self.by_set.insert(remaining, slot);
                }
            }

            self.known[i] = Some(symbol);
            self.resolved += 1;
        }

        if self.is_complete() {
            self.pending.clear();
            self.free.clear();
            self.by_set.clear();
        }
    }
}

/// Receiver-side decoder for a single transfer.
///
/// Binds to the session of the first valid block and silently ignores
/// blocks from any other session. `ingest` must not be called concurrently;
/// wrap the decoder in a lock when several threads feed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FountainDecoder {
    peel: Option<Peeling>,
    max_symbols: u32,
}

impl Default for FountainDecoder {
    fn default() -> Self {
        Self::with_max_symbols(DEFAULT_MAX_SYMBOLS)
    }
}

impl FountainDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder refusing to bind to sessions of more than `max_symbols`.
    pub fn with_max_symbols(max_symbols: u32) -> Self {
        Self {
            peel: None,
            max_symbols,
        }
    }

    /// Feed one block. Malformed blocks are rejected without touching state.
    pub fn ingest(&mut self, block: &CodedBlock) -> Result<Ingested> {
        block.validate()?;

        if self.peel.is_none() {
            check_symbol_cap(block.session.k, self.max_symbols)?;
            debug!(
                k = block.session.k,
                total_bytes = block.session.total_bytes,
                checksum = block.session.checksum,
                slice_size = block.payload.len(),
                "binding decoder to session"
            );
        }
        let peel = self
            .peel
            .get_or_insert_with(|| Peeling::new(block.session, block.payload.len()));

        if peel.session != block.session {
            trace!(
                k = block.session.k,
                checksum = block.session.checksum,
                "ignoring block from another session"
            );
            return Ok(Ingested::Foreign);
        }
        if block.payload.len() != peel.slice_size {
            return Err(FountainError::MalformedBlock(format!(
                "payload of {} bytes in a session of {}-byte slices",
                block.payload.len(),
                peel.slice_size
            )));
        }
        if peel.is_complete() {
            return Ok(Ingested::Redundant);
        }

        let outcome = peel.absorb(&block.indices, &block.payload);
        match outcome {
            Ingested::Resolved { symbols } => {
                trace!(
                    degree = block.degree(),
                    symbols,
                    resolved = peel.resolved,
                    "block resolved symbols"
                );
                if peel.is_complete() {
                    debug!(k = peel.session.k, "all symbols resolved");
                }
            }
            other => trace!(degree = block.degree(), outcome = ?other, "block absorbed"),
        }
        Ok(outcome)
    }

    pub fn session(&self) -> Option<CodingSession> {
        self.peel.as_ref().map(|p| p.session)
    }

    pub fn state(&self) -> DecodeState {
        match &self.peel {
            None => DecodeState::Empty,
            Some(p) if p.is_complete() => DecodeState::Complete,
            Some(p) if !p.by_set.is_empty() => DecodeState::Stalled,
            Some(_) => DecodeState::Collecting,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == DecodeState::Complete
    }

    pub fn progress(&self) -> Progress {
        match &self.peel {
            None => Progress {
                resolved: 0,
                total: 0,
                pending: 0,
            },
            Some(p) => Progress {
                resolved: p.resolved,
                total: p.known.len(),
                pending: p.by_set.len(),
            },
        }
    }

    /// Recovered symbol `index`, padded to the slice size.
    pub fn symbol(&self, index: u32) -> Option<&[u8]> {
        self.peel
            .as_ref()?
            .known
            .get(index as usize)?
            .as_deref()
    }

    /// The framed input, once complete and checksum-verified.
    pub fn reconstruct(&self) -> Result<Vec<u8>> {
        let progress = self.progress();
        let peel = match &self.peel {
            Some(p) if p.is_complete() => p,
            _ => {
                return Err(FountainError::Incomplete {
                    resolved: progress.resolved,
                    total: progress.total,
                })
            }
        };

        let total_bytes = peel.session.total_bytes as usize;
        let mut out = Vec::with_capacity(total_bytes);
        for (i, symbol) in peel.known.iter().enumerate() {
            let symbol = symbol.as_deref().ok_or(FountainError::Incomplete {
                resolved: progress.resolved,
                total: progress.total,
            })?;
            let len = slicer::symbol_len(total_bytes, peel.slice_size, i);
            out.extend_from_slice(&symbol[..len]);
        }

        let actual = checksum::session_checksum(&out, peel.session.k);
        if actual != peel.session.checksum {
            warn!(
                expected = peel.session.checksum,
                actual,
                "reconstructed transfer failed checksum"
            );
            return Err(FountainError::ChecksumFailure {
                expected: peel.session.checksum,
                actual,
            });
        }
        Ok(out)
    }

    /// Serializable copy of the decoder's progress.
    pub fn snapshot(&self) -> Option<DecoderSnapshot> {
        let peel = self.peel.as_ref()?;
        let mut pending: Vec<PendingEntry> = peel
            .by_set
            .values()
            .filter_map(|&slot| peel.pending[slot].as_ref())
            .map(|b| PendingEntry {
                indices: b.indices.clone(),
                payload: b.payload.clone(),
            })
            .collect();
        pending.sort_by(|a, b| a.indices.cmp(&b.indices));

        Some(DecoderSnapshot {
            session: peel.session,
            slice_size: peel.slice_size,
            known: peel.known.clone(),
            pending,
        })
    }

    /// Rebuild a decoder from a snapshot, re-peeling its parked blocks.
    pub fn restore(snapshot: DecoderSnapshot) -> Result<Self> {
        let DecoderSnapshot {
            session,
            slice_size,
            known,
            pending,
        } = snapshot;

        check_symbol_cap(session.k, DEFAULT_MAX_SYMBOLS)?;
        let k = session.k as usize;
        if k == 0 || slicer::symbol_count(session.total_bytes as usize, slice_size) != k {
            return Err(FountainError::MalformedBlock(format!(
                "snapshot geometry: {} bytes in {}-byte slices vs {} symbols",
                session.total_bytes, slice_size, k
            )));
        }
        if known.len() != k {
            return Err(FountainError::MalformedBlock(format!(
                "snapshot holds {} symbol slots for {} symbols",
                known.len(),
                k
            )));
        }

        let mut peel = Peeling::new(session, slice_size);
        for (index, symbol) in known.into_iter().enumerate() {
            if let Some(symbol) = symbol {
                if symbol.len() != slice_size {
                    return Err(FountainError::MalformedBlock(format!(
                        "snapshot symbol {index} is {} bytes",
                        symbol.len()
                    )));
                }
                peel.known[index] = Some(symbol);
                peel.resolved += 1;
            }
        }

        for entry in pending {
            let block = CodedBlock {
                indices: entry.indices,
                session,
                payload: entry.payload,
            };
            block.validate()?;
            if block.payload.len() != slice_size {
                return Err(FountainError::MalformedBlock(
                    "snapshot pending block has the wrong payload size".into(),
                ));
            }
            if peel.is_complete() {
                break;
            }
            peel.absorb(&block.indices, &block.payload);
        }

        Ok(Self {
            peel: Some(peel),
            max_symbols: DEFAULT_MAX_SYMBOLS,
        })
    }
}

pub(crate) fn check_symbol_cap(k: u32, max_symbols: u32) -> Result<()> {
    if k > max_symbols {
        return Err(FountainError::MalformedBlock(format!(
            "session of {k} symbols exceeds the receiver limit of {max_symbols}"
        )));
    }
    Ok(())
}

/// Persistable decoder progress; see [`FountainDecoder::snapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderSnapshot {
    pub session: CodingSession,
    pub slice_size: usize,
    pub known: Vec<Option<Vec<u8>>>,
    pub pending: Vec<PendingEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub indices: Vec<u32>,
    pub payload: Vec<u8>,
}

//! Demultiplexes blocks from several concurrent transfers sharing one
//! channel into per-session decoders.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::decoder::{
    check_symbol_cap, FountainDecoder, Ingested, Progress, DEFAULT_MAX_SYMBOLS,
};
use crate::error::Result;
use crate::{CodedBlock, CodingSession};

pub const DEFAULT_MAX_SESSIONS: usize = 8;

/// Drained sessions remembered so their late frames are not decoded again.
pub const FINISHED_MEMORY: usize = 64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Routed {
    pub session: CodingSession,
    pub outcome: Ingested,
    pub complete: bool,
}

#[derive(Debug)]
pub struct SessionRouter {
    decoders: HashMap<CodingSession, FountainDecoder>,
    // Sessions already handed out by `take_complete`, oldest first.
    finished: HashSet<CodingSession>,
    finished_order: VecDeque<CodingSession>,
    max_sessions: usize,
    max_symbols: u32,
}

impl Default for SessionRouter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRouter {
    /// Router tracking at most `max_sessions` transfers, complete or not.
    /// To make room it evicts the incomplete session with the least
    /// progress, or an undrained complete one if nothing else is left.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            decoders: HashMap::new(),
            finished: HashSet::new(),
            finished_order: VecDeque::new(),
            max_sessions: max_sessions.max(1),
            max_symbols: DEFAULT_MAX_SYMBOLS,
        }
    }

    /// Refuse sessions of more than `max_symbols` source symbols.
    pub fn with_max_symbols(mut self, max_symbols: u32) -> Self {
        self.max_symbols = max_symbols;
        self
    }

    pub fn ingest(&mut self, block: &CodedBlock) -> Result<Routed> {
        block.validate()?;
        let session = block.session;

        if self.finished.contains(&session) {
            return Ok(Routed {
                session,
                outcome: Ingested::Redundant,
                complete: true,
            });
        }

        if !self.decoders.contains_key(&session) {
            check_symbol_cap(session.k, self.max_symbols)?;
            while self.decoders.len() >= self.max_sessions {
                self.evict_slowest();
            }
            debug!(k = session.k, checksum = session.checksum, "tracking new session");
        }

        let max_symbols = self.max_symbols;
        let decoder = self
            .decoders
            .entry(session)
            .or_insert_with(|| FountainDecoder::with_max_symbols(max_symbols));
        let outcome = decoder.ingest(block)?;
        Ok(Routed {
            session,
            outcome,
            complete: decoder.is_complete(),
        })
    }

    fn evict_slowest(&mut self) {
        let slowest = self
            .decoders
            .iter()
            .min_by_key(|(_, d)| (d.is_complete(), d.progress().resolved))
            .map(|(s, _)| *s);
        if let Some(session) = slowest {
            info!(k = session.k, checksum = session.checksum, "evicting stale session");
            self.decoders.remove(&session);
        }
    }

    fn remember_finished(&mut self, session: CodingSession) {
        if self.finished.insert(session) {
            self.finished_order.push_back(session);
        }
        while self.finished_order.len() > FINISHED_MEMORY {
            if let Some(oldest) = self.finished_order.pop_front() {
                self.finished.remove(&oldest);
            }
        }
    }

    pub fn progress(&self, session: &CodingSession) -> Option<Progress> {
        self.decoders.get(session).map(FountainDecoder::progress)
    }

    /// Number of sessions still being decoded.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Drain every complete session as its checksum-verified framed bytes.
    /// Later blocks of a drained session are reported redundant.
    pub fn take_complete(&mut self) -> Vec<(CodingSession, Result<Vec<u8>>)> {
        let done: Vec<CodingSession> = self
            .decoders
            .iter()
            .filter(|(_, d)| d.is_complete())
            .map(|(s, _)| *s)
            .collect();

        done.into_iter()
            .filter_map(|session| {
                let decoder = self.decoders.remove(&session)?;
                self.remember_finished(session);
                Some((session, decoder.reconstruct()))
            })
            .collect()
    }
}

use std::collections::HashSet;
use std::io;

use crate::disk::error::DiskError;
use crate::disk::fat::{Fat, FAT_SECTOR_MASK, FAT_TERMINAL};
use crate::disk::image::SIZE_TRACK_X;

/// Sector size used by the terminal FAT value.
const SECTOR_SIZE: usize = 256;

/// The interpretation of one FAT value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainLink {
    /// The chain continues at this track.
    Next(u8),
    /// This is the last track of the chain, with this many sectors used
    /// (0..=63).
    Tail(u8),
}

impl ChainLink {
    #[inline]
    pub fn new(value: u8) -> ChainLink {
        if value >= FAT_TERMINAL {
            ChainLink::Tail(value - FAT_TERMINAL)
        } else {
            ChainLink::Next(value)
        }
    }

    #[inline]
    pub fn to_byte(&self) -> u8 {
        match *self {
            ChainLink::Next(track) => track,
            ChainLink::Tail(sectors) => FAT_TERMINAL | (sectors & FAT_SECTOR_MASK),
        }
    }
}

/// Iterate the track numbers of a chain starting at the value found in a
/// directory entry.  A revisited track yields a `ChainLoop` error and ends
/// the iteration, so a walk never takes more steps than there are distinct
/// track numbers.
pub struct ChainIterator<'a> {
    fat: &'a Fat,
    next: Option<ChainLink>,
    visited: HashSet<u8>,
    tail: Option<u8>,
}

impl<'a> ChainIterator<'a> {
    pub fn new(fat: &'a Fat, start: u8) -> ChainIterator<'a> {
        ChainIterator {
            fat,
            next: Some(ChainLink::new(start)),
            visited: HashSet::new(),
            tail: None,
        }
    }

    /// The sectors used in the last track, once the chain has been walked to
    /// its end.  `None` while walking, or if the walk stopped at a loop.
    pub fn tail(&self) -> Option<u8> {
        self.tail
    }
}

impl<'a> Iterator for ChainIterator<'a> {
    type Item = io::Result<u8>;

    fn next(&mut self) -> Option<io::Result<u8>> {
        let track = match self.next.take()? {
            ChainLink::Next(track) => track,
            ChainLink::Tail(sectors) => {
                self.tail = Some(sectors);
                return None;
            }
        };

        // Loop detection.
        if !self.visited.insert(track) {
            return Some(Err(DiskError::ChainLoop.into()));
        }

        self.next = Some(ChainLink::new(self.fat[track]));
        Some(Ok(track))
    }
}

/// A fully resolved chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    /// Tracks in file order, up to (not including) any repeated track.
    pub tracks: Vec<u8>,
    /// Sectors used in the last track; `None` if the chain loops.
    pub tail: Option<u8>,
}

impl Chain {
    /// Walk the FAT from `start` to the end of the chain.
    pub fn walk(fat: &Fat, start: u8) -> Chain {
        let mut iter = ChainIterator::new(fat, start);
        let mut tracks = vec![];
        while let Some(Ok(track)) = iter.next() {
            tracks.push(track);
        }
        Chain {
            tracks,
            tail: iter.tail(),
        }
    }

    pub fn is_circular(&self) -> bool {
        self.tail.is_none()
    }

    /// The number of bytes stored in the chain: every track but the last is
    /// full, and the last holds `tail` sectors.  `None` for a looping chain.
    pub fn size(&self) -> Option<usize> {
        let sectors = self.tail? as usize;
        if self.tracks.is_empty() {
            return Some(0);
        }
        Some(SIZE_TRACK_X * (self.tracks.len() - 1) + SECTOR_SIZE * sectors)
    }
}

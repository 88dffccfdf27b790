//! The directory track: directory entries, disk attributes, and the three
//! redundant copies of the File Allocation Table (FAT).

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::disk::image::SIZE_TRACK_X;
use crate::disk::validation::Warning;

/// All filesystem metadata lives on this track.
pub const DIRECTORY_TRACK: usize = 20;
pub const DIRECTORY_SIZE: usize = 13 * 256;
pub const ATTRIBUTES_OFFSET: usize = 13 * 256;
pub const ATTRIBUTES_SIZE: usize = 256;
pub const FAT_OFFSET: usize = 14 * 256;
pub const FAT_SIZE: usize = 256;
pub const FAT_COPIES: usize = 3;

/// FAT value marking a track as reserved by the system.
pub const FAT_RESERVED: u8 = 254;
/// Tracks that are never part of a file: the boot tracks and the directory.
pub const RESERVED_TRACKS: [usize; 4] = [0, 1, 2, DIRECTORY_TRACK];
/// FAT values at or above this mark the last track of a chain.  The low bits
/// count the 256-byte sectors used in that track.
pub const FAT_TERMINAL: u8 = 0xC0;
/// Bits of a terminal FAT value that hold the sector count.
pub const FAT_SECTOR_MASK: u8 = 0x3F;
/// Sectors per data track, which is the terminal count for a full track.
pub const SECTORS_PER_TRACK: u8 = 17;

const PROTECTED_FLAG: u8 = 0x10;
const READ_ONLY_FLAG: u8 = 0x40;

/// One copy of the File Allocation Table.
#[derive(Clone, PartialEq, Eq)]
pub struct Fat([u8; FAT_SIZE]);

impl Fat {
    pub fn from_bytes(bytes: &[u8]) -> Fat {
        assert_eq!(bytes.len(), FAT_SIZE);
        let mut fat = [0u8; FAT_SIZE];
        fat.copy_from_slice(bytes);
        Fat(fat)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// A formatted FAT marks the boot and directory tracks as reserved.
    pub fn has_sentinels(&self) -> bool {
        RESERVED_TRACKS
            .iter()
            .all(|&track| self.0[track] == FAT_RESERVED)
    }

    /// Link the tracks into a chain, in order.  The last track is marked as
    /// holding `last_sectors` used sectors; only the low six bits fit.
    pub fn link(&mut self, tracks: &[u8], last_sectors: u8) {
        for pair in tracks.windows(2) {
            self.0[pair[0] as usize] = pair[1];
        }
        if let Some(&last) = tracks.last() {
            self.0[last as usize] = FAT_TERMINAL | (last_sectors & FAT_SECTOR_MASK);
        }
    }
}

impl Index<u8> for Fat {
    type Output = u8;
    fn index(&self, i: u8) -> &u8 {
        &self.0[i as usize]
    }
}

impl IndexMut<u8> for Fat {
    fn index_mut(&mut self, i: u8) -> &mut u8 {
        &mut self.0[i as usize]
    }
}

impl fmt::Debug for Fat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, row) in self.0.chunks(16).enumerate() {
            write!(f, "{:02x}:", i * 16)?;
            for value in row {
                write!(f, " {:02x}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Write protection flags from the first byte of the attribute block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskAttributes {
    None,
    Protected,
    ReadOnly,
    ProtectedReadOnly,
    Unknown(u8),
}

impl DiskAttributes {
    pub fn from_byte(byte: u8) -> DiskAttributes {
        match byte {
            0x00 => DiskAttributes::None,
            PROTECTED_FLAG => DiskAttributes::Protected,
            READ_ONLY_FLAG => DiskAttributes::ReadOnly,
            b if b == PROTECTED_FLAG | READ_ONLY_FLAG => DiskAttributes::ProtectedReadOnly,
            b => DiskAttributes::Unknown(b),
        }
    }
}

impl fmt::Display for DiskAttributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiskAttributes::None => f.write_str("None"),
            DiskAttributes::Protected => f.write_str("P"),
            DiskAttributes::ReadOnly => f.write_str("R"),
            DiskAttributes::ProtectedReadOnly => f.write_str("PR"),
            DiskAttributes::Unknown(b) => write!(f, "Unknown ({})", b),
        }
    }
}

/// A snapshot of everything stored on the directory track.  Reading takes
/// FAT copy 0; writing stores the one FAT into all three slots.
#[derive(Clone)]
pub struct DirectoryTrack {
    pub directory: Vec<u8>,
    pub attributes: Vec<u8>,
    pub fat: Fat,
    copies_match: bool,
}

impl DirectoryTrack {
    /// Split the directory track into its regions.  Inconsistent FAT copies
    /// and missing sentinels never fail the parse; see `warnings()`.
    pub fn parse(track: &[u8]) -> DirectoryTrack {
        assert_eq!(track.len(), SIZE_TRACK_X);
        let copies = Self::fat_copies(track);
        let copies_match = copies.iter().all(|copy| *copy == copies[0]);
        DirectoryTrack {
            directory: track[..DIRECTORY_SIZE].to_vec(),
            attributes: track[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + ATTRIBUTES_SIZE].to_vec(),
            fat: copies[0].clone(),
            copies_match,
        }
    }

    /// Return all three FAT copies, in on-disk order.
    pub fn fat_copies(track: &[u8]) -> Vec<Fat> {
        (0..FAT_COPIES)
            .map(|copy| {
                let offset = FAT_OFFSET + copy * FAT_SIZE;
                Fat::from_bytes(&track[offset..offset + FAT_SIZE])
            })
            .collect()
    }

    /// Reassemble the directory track.
    pub fn to_track(&self) -> Vec<u8> {
        let mut track = Vec::with_capacity(SIZE_TRACK_X);
        track.extend_from_slice(&self.directory);
        track.extend_from_slice(&self.attributes);
        for _ in 0..FAT_COPIES {
            track.extend_from_slice(self.fat.as_bytes());
        }
        assert_eq!(track.len(), SIZE_TRACK_X);
        track
    }

    /// Structural problems found when the snapshot was taken.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = vec![];
        if !self.copies_match {
            warnings.push(Warning::FatMismatch);
        }
        if !self.fat.has_sentinels() {
            warnings.push(Warning::FatSentinelViolation);
        }
        warnings
    }

    pub fn disk_attributes(&self) -> DiskAttributes {
        DiskAttributes::from_byte(self.attributes[0])
    }

    /// The command run when the disk boots, NUL-terminated after the
    /// attribute byte.
    pub fn ipl_command(&self) -> String {
        self.attributes[1..]
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| *b as char)
            .collect()
    }
}

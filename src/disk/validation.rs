use std::error;
use std::fmt;

use crate::disk::directory::FileEntry;
use crate::disk::fat::{DirectoryTrack, RESERVED_TRACKS};
use crate::disk::Disk;

/// A warning represents a recoverable inconsistency in the disk image.  None
/// of these stop the image from being listed or its other files from being
/// read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// The three FAT copies differ; the first one is used.
    FatMismatch,
    /// The FAT doesn't mark the boot and directory tracks as reserved.
    FatSentinelViolation,
    /// The file's chain revisits a track.
    CircularChain(String),
    /// The file's chain references a track that doesn't exist.
    TrackOutOfRange(String, u8),
    /// More than one existing file uses the track.
    TrackSharedByFiles(usize),
    /// The track holds data but no FAT chain references it.
    UnreferencedTrack(usize),
}

impl error::Error for Warning {}

impl fmt::Display for Warning {
    /// Provide human-readable descriptions of the warnings.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Warning::*;
        match *self {
            FatMismatch => f.write_str("FAT copies mismatch"),
            FatSentinelViolation => f.write_str("FAT not formatted properly"),
            CircularChain(ref filename) => {
                write!(f, "File {} has a circular FAT chain", filename)
            }
            TrackOutOfRange(ref filename, track) => write!(
                f,
                "File {} is stored on track {} which doesn't exist",
                filename, track
            ),
            TrackSharedByFiles(track) => {
                write!(f, "Multiple existing files use track {}", track)
            }
            UnreferencedTrack(track) => write!(
                f,
                "Track {} contains data but is not referenced in FAT",
                track
            ),
        }
    }
}

/// A rough classification of a track's contents, based on how many distinct
/// byte values it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackContents {
    /// A single repeated byte value.
    Empty,
    /// At most four distinct byte values.
    ProbablyEmpty,
    Data,
}

impl TrackContents {
    pub fn of(track: &[u8]) -> TrackContents {
        let mut seen = [false; 256];
        for b in track {
            seen[*b as usize] = true;
        }
        match seen.iter().filter(|s| **s).count() {
            0 | 1 => TrackContents::Empty,
            2..=4 => TrackContents::ProbablyEmpty,
            _ => TrackContents::Data,
        }
    }

    /// The character used for this track in the usage map.
    pub fn symbol(&self) -> char {
        match self {
            TrackContents::Empty => '.',
            TrackContents::ProbablyEmpty => '?',
            TrackContents::Data => '#',
        }
    }
}

/// What the boot track holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootTrack {
    DiskBasic,
    Unknown,
    Empty,
}

impl BootTrack {
    const DISK_BASIC_SIGNATURE: &'static [u8] = b"Disk version";

    pub fn classify(track: &[u8]) -> BootTrack {
        if track
            .windows(Self::DISK_BASIC_SIGNATURE.len())
            .any(|w| w == Self::DISK_BASIC_SIGNATURE)
        {
            BootTrack::DiskBasic
        } else if TrackContents::of(track) != TrackContents::Empty {
            BootTrack::Unknown
        } else {
            BootTrack::Empty
        }
    }
}

impl fmt::Display for BootTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            BootTrack::DiskBasic => "Disk Basic",
            BootTrack::Unknown => "Unknown data",
            BootTrack::Empty => "Empty",
        })
    }
}

/// How likely it is that a deleted file's contents can still be recovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStatus {
    MayExist,
    MayBeOverwritten,
    Overwritten,
    Empty,
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RecoveryStatus::MayExist => "Data may exist",
            RecoveryStatus::MayBeOverwritten => "Data may be overwritten",
            RecoveryStatus::Overwritten => "Data is overwritten",
            RecoveryStatus::Empty => "Data is empty",
        })
    }
}

/// Per-track reference counts gathered from every directory entry.
pub struct TrackUsage {
    existing: Vec<usize>,
    deleted: Vec<usize>,
    referenced: Vec<bool>,
}

impl TrackUsage {
    pub fn new(entries: &[FileEntry], track_count: usize) -> TrackUsage {
        let mut usage = TrackUsage {
            existing: vec![0; track_count],
            deleted: vec![0; track_count],
            referenced: vec![false; track_count],
        };
        for track in RESERVED_TRACKS.iter() {
            usage.referenced[*track] = true;
        }
        for entry in entries {
            for &track in entry.tracks.iter() {
                let track = track as usize;
                if track >= track_count {
                    continue;
                }
                usage.referenced[track] = true;
                if entry.deleted {
                    usage.deleted[track] += 1;
                } else {
                    usage.existing[track] += 1;
                }
            }
        }
        usage
    }

    /// Judge whether a deleted file's tracks have been reused since.
    pub fn recovery_status(&self, disk: &Disk, entry: &FileEntry) -> RecoveryStatus {
        let mut status = RecoveryStatus::MayExist;
        for &track in entry.tracks.iter() {
            let contents = disk.track_contents(track as usize);
            if contents.is_none() || contents == Some(TrackContents::Empty) {
                return RecoveryStatus::Empty;
            }
            let track = track as usize;
            if self.existing[track] > 0 {
                return RecoveryStatus::Overwritten;
            }
            if self.deleted[track] > 1 {
                status = RecoveryStatus::MayBeOverwritten;
            }
        }
        status
    }
}

/// Check the consistency of the provided disk.  This is a read-only
/// operation; a list of warnings is returned.
pub fn validate(disk: &Disk) -> Vec<Warning> {
    let directory = DirectoryTrack::parse(disk.directory_track_bytes());
    let mut warnings = directory.warnings();
    let entries = disk.entries_from(&directory);
    let track_count = disk.track_count();

    for entry in entries.iter() {
        if entry.is_corrupt() {
            warnings.push(Warning::CircularChain(entry.filename.clone()));
        }
        for &track in entry.tracks.iter() {
            if track as usize >= track_count {
                warnings.push(Warning::TrackOutOfRange(entry.filename.clone(), track));
            }
        }
    }

    let usage = TrackUsage::new(&entries, track_count);
    for track in 0..track_count {
        if usage.existing[track] >= 2 {
            warnings.push(Warning::TrackSharedByFiles(track));
        }
    }
    for track in 0..track_count {
        if !usage.referenced[track] && disk.track_contents(track) != Some(TrackContents::Empty) {
            warnings.push(Warning::UnreferencedTrack(track));
        }
    }
    warnings
}

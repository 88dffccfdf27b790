//! SVI disk BASIC directories

use std::fmt;
use std::io;
use std::path::{self, Component, Path};

use crate::disk::chain::Chain;
use crate::disk::error::DiskError;
use crate::disk::fat::{Fat, DIRECTORY_SIZE};
use crate::swechar;

pub const ENTRY_SIZE: usize = 16;
pub const DIRECTORY_ENTRIES: usize = DIRECTORY_SIZE / ENTRY_SIZE;
pub const FILENAME_LENGTH: usize = 9;
/// The name part of a filename; the remaining three bytes are the extension.
pub const BASENAME_LENGTH: usize = 6;
const ENTRY_FILE_TYPE_OFFSET: usize = 9;
const ENTRY_FIRST_TRACK_OFFSET: usize = 10;
const ENTRY_RESERVED_OFFSET: usize = 11;
const RESERVED_SIZE: usize = 5;

/// First byte of the slot where the next entry will be created.  Slots past
/// it may still hold old entries.
pub const END_OF_DIRECTORY: u8 = 0xFF;
/// First filename byte of a deleted entry.
const DELETED_MARKER: u8 = 0x00;
const RESERVED_FILL: u8 = 0xFF;

const FILE_ATTRIB_PROTECTED_MASK: u8 = 0x10;
const FILE_ATTRIB_READ_ONLY_MASK: u8 = 0x40;
const FILE_FORMAT_BASIC_MASK: u8 = 0xA1;
const FILE_FORMAT_BASIC: u8 = 0x80;

/// The type byte of a directory entry: two protection flags plus the bits
/// that describe the file's content format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileAttributes {
    /// Bit 4, shown as "P" in listings.
    pub protected: bool,
    /// Bit 6, shown as "R" in listings.
    pub read_only: bool,
    /// The remaining bits.
    pub format: u8,
}

impl FileAttributes {
    pub fn from_byte(byte: u8) -> FileAttributes {
        FileAttributes {
            protected: byte & FILE_ATTRIB_PROTECTED_MASK != 0,
            read_only: byte & FILE_ATTRIB_READ_ONLY_MASK != 0,
            format: byte & !(FILE_ATTRIB_PROTECTED_MASK | FILE_ATTRIB_READ_ONLY_MASK),
        }
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = self.format;
        if self.protected {
            byte |= FILE_ATTRIB_PROTECTED_MASK;
        }
        if self.read_only {
            byte |= FILE_ATTRIB_READ_ONLY_MASK;
        }
        byte
    }

    /// The character shown between name and extension.
    pub fn delimiter(&self) -> char {
        match self.format {
            0x00 => ' ',
            0x01 => '*',
            0x80 => '.',
            0xA0 => '#',
            _ => '?',
        }
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.protected { 'P' } else { ' ' },
            if self.read_only { 'R' } else { ' ' }
        )
    }
}

/// A file as described by one directory slot together with its resolved
/// FAT chain.  Entries are rebuilt on every directory scan.
#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    /// The 9-character name as stored, with a deleted entry's first
    /// character replaced by `?`.
    pub raw_name: String,
    /// The name with surrounding whitespace removed.
    pub filename: String,
    /// The full type byte.
    pub file_type: u8,
    pub deleted: bool,
    /// Tracks in file order.
    pub tracks: Vec<u8>,
    /// Size in bytes, or `None` if the chain loops.
    pub size: Option<usize>,
    /// Slot number in the directory, 0..208.
    pub index: usize,
}

impl FileEntry {
    /// Parse a directory slot and walk its chain.  `end_reached` marks slots
    /// found after the end-of-directory marker.
    pub fn parse(bytes: &[u8], index: usize, fat: &Fat, end_reached: bool) -> FileEntry {
        assert_eq!(bytes.len(), ENTRY_SIZE);
        let name_bytes = &bytes[..FILENAME_LENGTH];
        let deleted = name_bytes[0] == DELETED_MARKER;
        let raw_name: String = if deleted {
            std::iter::once('?')
                .chain(name_bytes[1..].iter().map(|b| *b as char))
                .collect()
        } else {
            name_bytes.iter().map(|b| *b as char).collect()
        };

        let chain = Chain::walk(fat, bytes[ENTRY_FIRST_TRACK_OFFSET]);

        FileEntry {
            filename: raw_name.trim().to_string(),
            raw_name,
            file_type: bytes[ENTRY_FILE_TYPE_OFFSET],
            deleted: deleted || end_reached,
            size: chain.size(),
            tracks: chain.tracks,
            index,
        }
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::from_byte(self.file_type)
    }

    /// Return true if the file holds a tokenized BASIC program.
    pub fn is_basic_file(&self) -> bool {
        self.file_type & FILE_FORMAT_BASIC_MASK == FILE_FORMAT_BASIC
    }

    pub fn is_corrupt(&self) -> bool {
        self.size.is_none()
    }

    /// The name the way the SVI shows it: name, a delimiter describing the
    /// type, and extension.
    pub fn display_name(&self) -> String {
        let chars: Vec<char> = self.raw_name.chars().collect();
        let split = BASENAME_LENGTH.min(chars.len());
        let mut name: String = chars[..split].iter().collect();
        name.push(self.attributes().delimiter());
        name.extend(chars[split..].iter());
        name
    }

    /// The size as printed in listings, where -1 marks a corrupt chain.
    pub fn listed_size(&self) -> i64 {
        self.size.map(|s| s as i64).unwrap_or(-1)
    }

    /// Format the track list as "[5, 4, 9]".
    pub fn format_tracks(&self) -> String {
        let tracks = self
            .tracks
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{}]", tracks)
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let filename = if f.alternate() {
            swechar::to_swechars(&self.filename)
        } else {
            self.filename.clone()
        };
        write!(
            f,
            "{:<11} {} {:>5} bytes   Tracks: {}",
            filename,
            self.attributes(),
            self.listed_size(),
            self.format_tracks()
        )
    }
}

/// This iterator walks all 208 directory slots and resolves each entry
/// (deleted ones included) against the FAT.  End-of-directory slots are
/// skipped, and everything after the first one counts as deleted.
pub struct DirectoryIterator<'a> {
    directory: &'a [u8],
    fat: &'a Fat,
    index: usize,
    end_reached: bool,
}

impl<'a> DirectoryIterator<'a> {
    pub fn new(directory: &'a [u8], fat: &'a Fat) -> DirectoryIterator<'a> {
        DirectoryIterator {
            directory,
            fat,
            index: 0,
            end_reached: false,
        }
    }
}

impl<'a> Iterator for DirectoryIterator<'a> {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        while self.index < DIRECTORY_ENTRIES {
            let index = self.index;
            self.index += 1;
            let offset = index * ENTRY_SIZE;
            let bytes = &self.directory[offset..offset + ENTRY_SIZE];
            if bytes[0] == END_OF_DIRECTORY {
                self.end_reached = true;
                continue;
            }
            return Some(FileEntry::parse(bytes, index, self.fat, self.end_reached));
        }
        None
    }
}

/// Return the slot where a new entry will go: the first one starting with
/// the end-of-directory marker.
pub fn next_free_slot(directory: &[u8]) -> io::Result<usize> {
    (0..DIRECTORY_ENTRIES)
        .find(|index| directory[index * ENTRY_SIZE] == END_OF_DIRECTORY)
        .ok_or_else(|| DiskError::DirectoryFull.into())
}

/// Write a fresh entry into `slot` and move the end-of-directory marker to
/// the following slot.  The filename is padded with spaces or cut to nine
/// bytes.
pub fn write_entry(directory: &mut [u8], slot: usize, filename: &[u8], file_type: u8, first_track: u8) {
    let offset = slot * ENTRY_SIZE;
    let entry = &mut directory[offset..offset + ENTRY_SIZE];
    for (i, b) in entry[..FILENAME_LENGTH].iter_mut().enumerate() {
        *b = filename.get(i).cloned().unwrap_or(b' ');
    }
    entry[ENTRY_FILE_TYPE_OFFSET] = file_type;
    entry[ENTRY_FIRST_TRACK_OFFSET] = first_track;
    for b in entry[ENTRY_RESERVED_OFFSET..ENTRY_RESERVED_OFFSET + RESERVED_SIZE].iter_mut() {
        *b = RESERVED_FILL;
    }
    if slot + 1 < DIRECTORY_ENTRIES {
        directory[offset + ENTRY_SIZE] = END_OF_DIRECTORY;
    }
}

/// Encode a filename for the directory.  Characters outside Latin-1 cannot
/// be stored and become `?`.
pub fn encode_filename(filename: &str) -> Vec<u8> {
    filename
        .chars()
        .map(|c| if (c as u32) < 0x100 { c as u32 as u8 } else { b'?' })
        .collect()
}

/// Check that a name read from a disk image can be used as a file name in a
/// host directory.  Names that hold a path separator or NUL, or that would
/// refer to anything but a plain entry of that directory (such as `..`),
/// give `None`.
pub fn host_filename(name: &str) -> Option<&str> {
    if name.contains('\0') || name.chars().any(path::is_separator) {
        return None;
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(name),
        _ => None,
    }
}

/// Turn a user-supplied name into the form stored in the directory.
/// "NAME.EXT" becomes "NAME  EXT" (name padded to six characters, no dot);
/// an undotted name is only trimmed.  With `swechars`, national characters
/// are first mapped back to the bytes that represent them.
pub fn normalize_filename(filename: &str, swechars: bool) -> String {
    let filename = if swechars {
        swechar::from_swechars(filename)
    } else {
        filename.to_string()
    };
    let mut parts = filename.split('.');
    let name = parts.next().unwrap_or("");
    match parts.next() {
        None => name.trim().to_string(),
        Some(extension) => format!("{:<6}{}", name, extension).trim().to_string(),
    }
}

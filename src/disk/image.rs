use std::fs::File;
use std::io::{self, Write};
use std::ops::Deref;
use std::path::Path;

use memmap::{Mmap, MmapOptions};
use tempfile::NamedTempFile;

use crate::disk::error::DiskError;

/// Size of the boot track (track 0): 18 sectors of 128 bytes.
pub const SIZE_TRACK_0: usize = 18 * 128;
/// Size of every other track: 17 sectors of 256 bytes.
pub const SIZE_TRACK_X: usize = 17 * 256;
/// Tracks per side.
pub const TRACKS_PER_SIDE: usize = 40;
/// Total size of a single-sided image.
pub const SIZE_SS: usize = SIZE_TRACK_0 + 39 * SIZE_TRACK_X;
/// Total size of a double-sided image.
pub const SIZE_DS: usize = SIZE_TRACK_0 + 79 * SIZE_TRACK_X;
/// Never read more than this many bytes from an image file.
pub const MAX_IMAGE_SIZE: usize = 1_000_000;

/// Sidedness of a disk image, which fixes its track count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sides {
    Single,
    Double,
}

impl Sides {
    /// Determine the layout from the raw image size.
    pub fn from_size(size: usize) -> Option<Sides> {
        match size {
            SIZE_SS => Some(Sides::Single),
            SIZE_DS => Some(Sides::Double),
            _ => None,
        }
    }

    #[inline]
    pub fn tracks(&self) -> usize {
        match self {
            Sides::Single => TRACKS_PER_SIDE,
            Sides::Double => TRACKS_PER_SIDE * 2,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        match self {
            Sides::Single => SIZE_SS,
            Sides::Double => SIZE_DS,
        }
    }
}

/// Provide backing storage (file or memory) for raw disk image bytes.
pub enum Image {
    ReadOnlyMap(Mmap),
    Memory(Box<[u8]>),
}

impl Image {
    /// Map an image file read-only.  At most `MAX_IMAGE_SIZE` bytes are
    /// mapped; anything beyond that can never be a valid image anyway.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> io::Result<Image> {
        let file = File::open(path)?;
        let length = file.metadata()?.len().min(MAX_IMAGE_SIZE as u64) as usize;
        if length == 0 {
            // Zero-length files cannot be mapped.
            return Ok(Image::Memory(Vec::new().into_boxed_slice()));
        }
        let mmap = unsafe { MmapOptions::new().len(length).map(&file)? };
        Ok(Image::ReadOnlyMap(mmap))
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Image::ReadOnlyMap(mmap) => mmap.deref(),
            Image::Memory(array) => array,
        }
    }
}

/// Split raw image bytes into logical tracks.  Double-sided images store the
/// two sides interleaved track by track, and the logical numbering follows
/// the SVI disk BASIC: side-two slots become tracks 1..39, and side-one
/// slots become tracks 40..79.
pub fn split_tracks(data: &[u8]) -> io::Result<(Sides, Vec<Vec<u8>>)> {
    let sides = match Sides::from_size(data.len()) {
        Some(sides) => sides,
        None => return Err(DiskError::InvalidImageSize(data.len()).into()),
    };

    let slot = |index: usize| {
        let start = SIZE_TRACK_0 + index * SIZE_TRACK_X;
        data[start..start + SIZE_TRACK_X].to_vec()
    };

    let mut tracks = Vec::with_capacity(sides.tracks());
    tracks.push(data[..SIZE_TRACK_0].to_vec());
    match sides {
        Sides::Single => {
            for track in 0..TRACKS_PER_SIDE - 1 {
                tracks.push(slot(track));
            }
        }
        Sides::Double => {
            for track in 0..TRACKS_PER_SIDE - 1 {
                tracks.push(slot(track * 2 + 1));
            }
            for track in 0..TRACKS_PER_SIDE {
                tracks.push(slot(track * 2));
            }
        }
    }
    Ok((sides, tracks))
}

/// Serialize logical tracks back into raw image bytes.  This is the exact
/// inverse of `split_tracks()`.
pub fn join_tracks(tracks: &[Vec<u8>]) -> Vec<u8> {
    let double_sided = tracks.len() == TRACKS_PER_SIDE * 2;
    let sides = if double_sided { Sides::Double } else { Sides::Single };
    let mut data = Vec::with_capacity(sides.size());
    data.extend_from_slice(&tracks[0]);
    if double_sided {
        data.extend_from_slice(&tracks[TRACKS_PER_SIDE]);
    }
    for track in 1..TRACKS_PER_SIDE {
        data.extend_from_slice(&tracks[track]);
        if double_sided {
            data.extend_from_slice(&tracks[TRACKS_PER_SIDE + track]);
        }
    }
    data
}

/// Write a whole image file.  The bytes go to a temporary file next to the
/// destination which then replaces it, so a failure leaves any existing
/// file untouched.
pub fn write_atomically<P: AsRef<Path>>(path: P, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

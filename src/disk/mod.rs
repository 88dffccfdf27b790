//! Structs and functions relating to SVI-318/328 disk images.

mod chain;
mod error;
mod fat;
mod image;

pub mod directory;
pub mod file;
pub mod validation;

use std::fmt;
use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::disk::directory::{normalize_filename, DirectoryIterator, FileEntry};
use crate::disk::file::File;
use crate::disk::image::{join_tracks, split_tracks, write_atomically, Image};
use crate::disk::validation::{BootTrack, RecoveryStatus, TrackContents, TrackUsage};

pub use self::chain::{Chain, ChainIterator, ChainLink};
pub use self::error::DiskError;
pub use self::fat::{
    DirectoryTrack, DiskAttributes, Fat, DIRECTORY_TRACK, FAT_RESERVED, FAT_TERMINAL,
    RESERVED_TRACKS, SECTORS_PER_TRACK,
};
pub use self::image::{
    Sides, MAX_IMAGE_SIZE, SIZE_DS, SIZE_SS, SIZE_TRACK_0, SIZE_TRACK_X, TRACKS_PER_SIDE,
};
pub use self::validation::Warning;

/// A disk image held in memory as one owned buffer per logical track.
///
/// Track 0 is the 2304-byte boot track and every other track is 4352 bytes.
/// The filesystem (directory, attributes, and FAT) lives on track 20 and is
/// re-read on every query, so entries never go stale after a write.
#[derive(Clone)]
pub struct Disk {
    tracks: Vec<Vec<u8>>,
    sides: Sides,
}

impl Disk {
    /// Open a disk image file.  The image is read completely and the file is
    /// not held open afterwards.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Disk> {
        let path = path.as_ref();
        let image = Image::open_read_only(path)?;
        debug!("Read {} bytes from {}", image.len(), path.display());
        Disk::from_bytes(image.bytes())
    }

    /// Parse a raw disk image.  Only the size decides between single- and
    /// double-sided layouts.
    pub fn from_bytes(data: &[u8]) -> io::Result<Disk> {
        let (sides, tracks) = split_tracks(data)?;
        debug!("{:?}-sided image with {} tracks", sides, tracks.len());
        let disk = Disk { tracks, sides };

        // Structural problems never stop a listing, so they are only reported.
        let directory = disk.directory_track();
        for warning in directory.warnings() {
            warn!("{}", warning);
        }
        for entry in disk.entries_from(&directory) {
            if entry.is_corrupt() {
                warn!("{}", Warning::CircularChain(entry.filename.clone()));
            }
        }
        Ok(disk)
    }

    /// Serialize the image back into its on-disk byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        join_tracks(&self.tracks)
    }

    /// Write the image to the provided path.  An existing file is replaced
    /// only once the new image has been written completely.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        write_atomically(path, &self.to_bytes())
    }

    #[inline]
    pub fn sides(&self) -> Sides {
        self.sides
    }

    #[inline]
    pub fn is_double_sided(&self) -> bool {
        self.sides == Sides::Double
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Return the contents of a logical track, if it exists.
    pub fn track(&self, track: usize) -> Option<&[u8]> {
        self.tracks.get(track).map(|t| &t[..])
    }

    pub fn track_contents(&self, track: usize) -> Option<TrackContents> {
        self.track(track).map(TrackContents::of)
    }

    pub fn boot_track(&self) -> BootTrack {
        BootTrack::classify(&self.tracks[0])
    }

    /// Return true if any track of the second side holds something other
    /// than a single repeated byte.
    pub fn side_two_has_data(&self) -> bool {
        (TRACKS_PER_SIDE..self.track_count())
            .any(|track| self.track_contents(track) != Some(TrackContents::Empty))
    }

    /// Return true if all three FAT copies carry the reserved-track
    /// sentinels.
    pub fn has_fat(&self) -> bool {
        DirectoryTrack::fat_copies(self.directory_track_bytes())
            .iter()
            .all(|fat| fat.has_sentinels())
    }

    /// Take a snapshot of the directory, attribute block, and FAT.
    pub fn directory_track(&self) -> DirectoryTrack {
        DirectoryTrack::parse(self.directory_track_bytes())
    }

    pub(crate) fn directory_track_bytes(&self) -> &[u8] {
        &self.tracks[DIRECTORY_TRACK]
    }

    /// Replace track 20 with one rebuilt from the provided snapshot.  The
    /// FAT is stored into all three copies.
    pub fn write_directory_track(&mut self, directory: &DirectoryTrack) {
        self.tracks[DIRECTORY_TRACK] = directory.to_track();
    }

    pub fn attributes(&self) -> DiskAttributes {
        self.directory_track().disk_attributes()
    }

    /// The command run automatically when the disk boots.
    pub fn ipl_command(&self) -> String {
        self.directory_track().ipl_command()
    }

    /// Return every directory entry, deleted ones included.
    pub fn entries(&self) -> Vec<FileEntry> {
        self.entries_from(&self.directory_track())
    }

    pub(crate) fn entries_from(&self, directory: &DirectoryTrack) -> Vec<FileEntry> {
        DirectoryIterator::new(&directory.directory, &directory.fat).collect()
    }

    /// Return the entries of files that have not been deleted.
    pub fn files(&self) -> Vec<FileEntry> {
        self.entries().into_iter().filter(|e| !e.deleted).collect()
    }

    pub fn deleted_files(&self) -> Vec<FileEntry> {
        self.entries().into_iter().filter(|e| e.deleted).collect()
    }

    /// Locate a live file by name.  The name may be given either in its
    /// stored form or dotted ("NAME.EXT").
    pub fn find_file(&self, filename: &str, swechars: bool) -> io::Result<FileEntry> {
        let filename = normalize_filename(filename, swechars);
        self.files()
            .into_iter()
            .find(|entry| entry.filename == filename)
            .ok_or_else(|| DiskError::NotFound.into())
    }

    /// Open a file based on its filename.
    pub fn open_file(&self, filename: &str, swechars: bool) -> io::Result<File<'_>> {
        File::open(self, filename, swechars)
    }

    /// Open a file based on its directory entry.
    pub fn open_file_from_entry(&self, entry: &FileEntry) -> File<'_> {
        File::open_from_entry(self, entry)
    }

    /// Concatenate the listed tracks, in the order given.
    pub fn read_tracks(&self, tracks: &[usize]) -> io::Result<Vec<u8>> {
        let mut data = vec![];
        for &track in tracks {
            match self.track(track) {
                Some(bytes) => data.extend_from_slice(bytes),
                None => return Err(DiskError::InvalidLocation(track).into()),
            }
        }
        Ok(data)
    }

    /// Create a directory entry for data that is already present on the
    /// listed tracks, and link them in the FAT.  This is how a deleted file
    /// whose tracks were not overwritten is brought back.
    pub fn create_file_from_tracks(
        &mut self,
        filename: &str,
        file_type: u8,
        tracks: &[u8],
    ) -> io::Result<FileEntry> {
        file::create_file_from_tracks(self, filename, file_type, tracks)
    }

    /// Check the consistency of the disk image.  This is a read-only
    /// operation and does not attempt any repairs.
    #[inline]
    pub fn validate(&self) -> Vec<Warning> {
        self::validation::validate(self)
    }

    /// Count how existing and deleted files use each track.
    pub fn track_usage(&self) -> TrackUsage {
        TrackUsage::new(&self.entries(), self.track_count())
    }

    /// Judge whether a deleted file can still be recovered.
    pub fn recovery_status(&self, entry: &FileEntry) -> RecoveryStatus {
        self.track_usage().recovery_status(self, entry)
    }

    /// One character per track: `.` empty, `?` probably empty, `#` data.
    pub fn track_map(&self) -> String {
        self.tracks
            .iter()
            .map(|track| TrackContents::of(track).symbol())
            .collect()
    }
}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{:?}-sided, {} tracks", self.sides, self.track_count())?;
        write!(f, "{:?}", self.directory_track().fat)
    }
}

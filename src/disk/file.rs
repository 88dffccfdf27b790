//! SVI disk BASIC files

use std::collections::HashSet;
use std::io::{self, Cursor, Read};

use log::{info, warn};

use crate::basic::{BasicError, Detokenizer, Program};
use crate::disk::directory::{encode_filename, next_free_slot, write_entry, FileEntry};
use crate::disk::fat::{RESERVED_TRACKS, SECTORS_PER_TRACK};
use crate::disk::validation::Warning;
use crate::disk::{Disk, DiskError};

/// A file that has been opened from a disk image.  The file borrows the
/// image; its contents are materialized from the tracks on each read.
pub struct File<'a> {
    disk: &'a Disk,
    entry: FileEntry,
}

impl<'a> File<'a> {
    pub(super) fn open(disk: &'a Disk, filename: &str, swechars: bool) -> io::Result<File<'a>> {
        let entry = disk.find_file(filename, swechars)?;
        Ok(Self::open_from_entry(disk, &entry))
    }

    pub(super) fn open_from_entry(disk: &'a Disk, entry: &FileEntry) -> File<'a> {
        File {
            disk,
            entry: entry.clone(),
        }
    }

    /// Return a reference to the directory entry from which this file was
    /// opened.
    pub fn entry(&self) -> &FileEntry {
        &self.entry
    }

    /// Read the entire file into memory.
    ///
    /// The chain's tracks are concatenated in order.  A track that does not
    /// exist on this image ends the read early, so a damaged directory never
    /// keeps other files from being read.  The result is cut to the size
    /// recorded in the FAT; a file with a looping chain has no recorded size
    /// and yields every track up to the repeat.
    ///
    /// Any problem that cut the read short is returned with the data.
    pub fn read_with_warnings(&self) -> (Vec<u8>, Vec<Warning>) {
        let mut data = vec![];
        let mut warnings = vec![];
        for &track in self.entry.tracks.iter() {
            match self.disk.track(track as usize) {
                Some(bytes) => data.extend_from_slice(bytes),
                None => {
                    warnings.push(Warning::TrackOutOfRange(
                        self.entry.filename.clone(),
                        track,
                    ));
                    break;
                }
            }
        }
        if let Some(size) = self.entry.size {
            data.truncate(size);
        }
        (data, warnings)
    }

    /// Read the entire file into memory, logging anything that cut the read
    /// short.
    pub fn read(&self) -> Vec<u8> {
        let (data, warnings) = self.read_with_warnings();
        for warning in warnings {
            warn!("{}", warning);
        }
        data
    }

    /// Return a reader for the contents of this file.
    pub fn reader(&self) -> Box<dyn Read> {
        Box::new(Cursor::new(self.read()))
    }

    /// Decode the file as a tokenized BASIC program.
    pub fn program(&self, swechars: bool) -> Result<Program, BasicError> {
        info!("Detokenizing {}", self.entry.filename);
        Detokenizer::new().swechars(swechars).detokenize(&self.read())
    }
}

/// Add a directory entry for data already present on `tracks` and link the
/// tracks in the FAT, in the order given.  The last track is marked as fully
/// used.
pub(super) fn create_file_from_tracks(
    disk: &mut Disk,
    filename: &str,
    file_type: u8,
    tracks: &[u8],
) -> io::Result<FileEntry> {
    let first_track = match tracks.first() {
        Some(&track) => track,
        None => return Err(DiskError::EmptyChain.into()),
    };

    // A chain may only use data tracks, and each of them once.
    let mut visited = HashSet::new();
    for &track in tracks {
        let index = track as usize;
        if index >= disk.track_count() || RESERVED_TRACKS.contains(&index) {
            return Err(DiskError::InvalidLocation(index).into());
        }
        if !visited.insert(track) {
            return Err(DiskError::ChainLoop.into());
        }
    }

    let mut directory = disk.directory_track();
    let slot = next_free_slot(&directory.directory)?;
    write_entry(
        &mut directory.directory,
        slot,
        &encode_filename(filename),
        file_type,
        first_track,
    );
    directory.fat.link(tracks, SECTORS_PER_TRACK);
    disk.write_directory_track(&directory);
    info!(
        "Created {} in directory slot {} on tracks {:?}",
        filename, slot, tracks
    );

    disk.entries()
        .into_iter()
        .find(|entry| entry.index == slot)
        .ok_or_else(|| DiskError::NotFound.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::fat::{DIRECTORY_TRACK, FAT_OFFSET, FAT_RESERVED, FAT_SIZE};
    use crate::disk::image::{join_tracks, Sides, SIZE_TRACK_0, SIZE_TRACK_X};

    fn formatted_disk() -> Disk {
        let mut tracks = vec![vec![0u8; SIZE_TRACK_0]];
        for track in 1..Sides::Single.tracks() {
            tracks.push(vec![track as u8; SIZE_TRACK_X]);
        }
        let mut directory = vec![0xFFu8; SIZE_TRACK_X];
        for copy in 0..3 {
            for &track in RESERVED_TRACKS.iter() {
                directory[FAT_OFFSET + copy * FAT_SIZE + track] = FAT_RESERVED;
            }
        }
        tracks[DIRECTORY_TRACK] = directory;
        Disk::from_bytes(&join_tracks(&tracks)).unwrap()
    }

    #[test]
    fn test_create_links_all_fat_copies() {
        let mut disk = formatted_disk();
        disk.create_file_from_tracks("GAME  BAS", 0x80, &[9, 3, 30])
            .unwrap();
        let track = disk.track(DIRECTORY_TRACK).unwrap();
        for copy in 0..3 {
            let fat = &track[FAT_OFFSET + copy * FAT_SIZE..FAT_OFFSET + (copy + 1) * FAT_SIZE];
            assert_eq!(fat[9], 3);
            assert_eq!(fat[3], 30);
            assert_eq!(fat[30], 0xC0 + 17);
            assert_eq!(fat[20], FAT_RESERVED);
        }
        let entry = disk.find_file("GAME.BAS", false).unwrap();
        assert_eq!(entry.index, 0);
        assert_eq!(entry.tracks, vec![9, 3, 30]);
    }

    #[test]
    fn test_read_concatenates_in_chain_order() {
        let mut disk = formatted_disk();
        disk.create_file_from_tracks("DATA", 0x00, &[7, 6]).unwrap();
        let file = disk.open_file("DATA", false).unwrap();
        let data = file.read();
        assert_eq!(data.len(), 2 * SIZE_TRACK_X);
        assert!(data[..SIZE_TRACK_X].iter().all(|b| *b == 7));
        assert!(data[SIZE_TRACK_X..].iter().all(|b| *b == 6));

        let mut contents = vec![];
        file.reader().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, data);
    }

    #[test]
    fn test_read_truncates_at_missing_track() {
        let disk = formatted_disk();
        let entry = FileEntry {
            raw_name: "BROKEN   ".to_string(),
            filename: "BROKEN".to_string(),
            file_type: 0x80,
            deleted: false,
            tracks: vec![5, 60, 6],
            size: Some(3 * SIZE_TRACK_X),
            index: 0,
        };
        let (data, warnings) = disk.open_file_from_entry(&entry).read_with_warnings();
        assert_eq!(data.len(), SIZE_TRACK_X);
        assert!(data.iter().all(|b| *b == 5));
        assert_eq!(
            warnings,
            vec![Warning::TrackOutOfRange("BROKEN".to_string(), 60)]
        );
        assert_eq!(disk.open_file_from_entry(&entry).read(), data);
    }

    #[test]
    fn test_read_truncates_to_size() {
        let disk = formatted_disk();
        let entry = FileEntry {
            raw_name: "SHORT    ".to_string(),
            filename: "SHORT".to_string(),
            file_type: 0x80,
            deleted: false,
            tracks: vec![5, 6],
            size: Some(SIZE_TRACK_X + 512),
            index: 0,
        };
        let (data, warnings) = disk.open_file_from_entry(&entry).read_with_warnings();
        assert!(warnings.is_empty());
        assert_eq!(data.len(), SIZE_TRACK_X + 512);
        assert_eq!(data[SIZE_TRACK_X], 6);
    }

    #[test]
    fn test_create_rejects_bad_chains() {
        let mut disk = formatted_disk();
        let kind = |r: io::Result<FileEntry>| DiskError::from_io_error(&r.unwrap_err());
        assert_eq!(
            kind(disk.create_file_from_tracks("X", 0x80, &[])),
            Some(DiskError::EmptyChain)
        );
        assert_eq!(
            kind(disk.create_file_from_tracks("X", 0x80, &[5, 20])),
            Some(DiskError::InvalidLocation(20))
        );
        assert_eq!(
            kind(disk.create_file_from_tracks("X", 0x80, &[5, 45])),
            Some(DiskError::InvalidLocation(45))
        );
        assert_eq!(
            kind(disk.create_file_from_tracks("X", 0x80, &[5, 6, 5])),
            Some(DiskError::ChainLoop)
        );
        assert!(disk.entries().is_empty());
    }
}

//! Raw disk image fixtures.  These build images byte by byte, without going
//! through the library, so that the parser is checked against the layout
//! rather than against itself.

#![allow(dead_code)]

pub const SIZE_TRACK_0: usize = 18 * 128;
pub const SIZE_TRACK_X: usize = 17 * 256;
pub const DIRECTORY_TRACK: usize = 20;
pub const ATTRIBUTES_OFFSET: usize = 13 * 256;
pub const FAT_OFFSET: usize = 14 * 256;
pub const FILLER: u8 = 0xE5;

/// A disk image under construction, as logical tracks.
pub struct Fixture {
    pub tracks: Vec<Vec<u8>>,
}

impl Fixture {
    /// A formatted, empty disk with 40 or 80 tracks.
    pub fn new(track_count: usize) -> Fixture {
        let mut tracks = vec![vec![FILLER; SIZE_TRACK_0]];
        for _ in 1..track_count {
            tracks.push(vec![FILLER; SIZE_TRACK_X]);
        }
        let mut directory = vec![0xFFu8; SIZE_TRACK_X];
        for b in directory[ATTRIBUTES_OFFSET..FAT_OFFSET].iter_mut() {
            *b = 0;
        }
        tracks[DIRECTORY_TRACK] = directory;
        let mut fixture = Fixture { tracks };
        for &track in [0u8, 1, 2, 20].iter() {
            fixture.set_fat(track, 254);
        }
        fixture
    }

    /// Set a FAT value in all three copies.
    pub fn set_fat(&mut self, track: u8, value: u8) {
        for copy in 0..3 {
            self.tracks[DIRECTORY_TRACK][FAT_OFFSET + copy * 256 + track as usize] = value;
        }
    }

    /// Link a chain ending with `sectors` used in the last track.
    pub fn link(&mut self, tracks: &[u8], sectors: u8) {
        for pair in tracks.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        self.set_fat(tracks[tracks.len() - 1], 0xC0 + sectors);
    }

    /// Write a 16-byte directory entry.  `name` is padded with spaces.
    pub fn add_entry(&mut self, slot: usize, name: &[u8], file_type: u8, first_track: u8) {
        let entry = &mut self.tracks[DIRECTORY_TRACK][slot * 16..slot * 16 + 16];
        for (i, b) in entry[..9].iter_mut().enumerate() {
            *b = name.get(i).cloned().unwrap_or(b' ');
        }
        entry[9] = file_type;
        entry[10] = first_track;
        for b in entry[11..].iter_mut() {
            *b = 0xFF;
        }
    }

    pub fn set_slot_byte(&mut self, slot: usize, byte: u8) {
        self.tracks[DIRECTORY_TRACK][slot * 16] = byte;
    }

    /// Fill a track with bytes derived from `seed`.
    pub fn fill_track(&mut self, track: usize, seed: u8) {
        let len = self.tracks[track].len();
        self.tracks[track] = pattern(len, seed);
    }

    /// Place data at the start of a track.
    pub fn write_track(&mut self, track: usize, data: &[u8]) {
        self.tracks[track][..data.len()].copy_from_slice(data);
    }

    /// Lay the tracks out the way they are stored in the image file.  On
    /// double-sided disks the physical slots after track 0 alternate
    /// between side one (even slots) and side two (odd slots).
    pub fn to_image(&self) -> Vec<u8> {
        let mut image = self.tracks[0].clone();
        if self.tracks.len() == 40 {
            for track in 1..40 {
                image.extend_from_slice(&self.tracks[track]);
            }
        } else {
            for slot in 0..79 {
                let track = if slot % 2 == 0 { 40 + slot / 2 } else { 1 + slot / 2 };
                image.extend_from_slice(&self.tracks[track]);
            }
        }
        image
    }
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

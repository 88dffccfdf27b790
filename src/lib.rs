//! This is a Rust library for working with the disk images of the
//! Spectravideo SVI-318 and SVI-328 home computers, and with the tokenized
//! BASIC programs stored on them.
//!
//! Features:
//!
//! * Read single-sided (40 track) and double-sided (80 track) disk images,
//! and save them back byte for byte.
//! * Iterate directory entries, including deleted files.
//! * Read files by following their FAT chains.
//! * Restore a deleted file by linking its tracks into a new directory entry.
//! * Validate the consistency of the directory track and the FAT, and judge
//! whether deleted files can still be recovered.
//! * Detokenize SVI disk BASIC programs into text.
//! * Render the Swedish national characters found on Swedish machines.
//! * A sample `svidisk` program for listing, viewing, extracting, and
//! restoring files.
//!
//! Current shortcomings:
//!
//! * Disk images cannot be formatted, and files cannot be written from
//! scratch.
//! * BASIC text cannot be tokenized.
//!
//! # Example
//!
//! The following example opens a disk image and prints every BASIC program
//! on it:
//!
//! ```
//! use std::io;
//! use svi::disk::Disk;
//! # fn print_programs(disk_image_filename: &str) -> io::Result<()> {
//!
//! let disk = Disk::open(disk_image_filename)?;
//! for entry in disk.files().iter().filter(|e| e.is_basic_file()) {
//!     let program = disk.open_file_from_entry(entry).program(false)?;
//!     println!("{}:\n{}", entry.filename, program);
//! }
//! # Ok(())
//! # }
//! ```

pub mod basic;
pub mod disk;
pub mod swechar;

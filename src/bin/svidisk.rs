use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::{error, info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use svi::basic::Detokenizer;
use svi::disk::directory::{host_filename, FileEntry};
use svi::disk::validation::{TrackUsage, Warning};
use svi::disk::Disk;

// Possible exit codes
static _EXIT_SUCCESS: i32 = 0;
static EXIT_FAILURE: i32 = 1;

fn main() {
    // Parse command-line arguments
    let image_arg = || {
        Arg::with_name("image")
            .long("image")
            .takes_value(true)
            .required(true)
            .help("The disk image file")
    };
    let swechars_arg = || {
        Arg::with_name("swechars")
            .long("swechars")
            .help("Show Swedish characters")
    };
    let app = App::new("SVI Disk Image Utility")
        .version("0.1.0")
        .about("List, view, extract, and restore files on SVI-318/328 disk images.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .global(true)
                .help("Log more detail"),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Show track usage, disk attributes, and the directory")
                .arg(image_arg())
                .arg(swechars_arg()),
        )
        .subcommand(
            SubCommand::with_name("view")
                .about("Show a BASIC program as text")
                .arg(image_arg())
                .arg(
                    Arg::with_name("file")
                        .long("file")
                        .takes_value(true)
                        .help("The name of the file on the disk image"),
                )
                .arg(
                    Arg::with_name("tracks")
                        .long("tracks")
                        .takes_value(true)
                        .validator(tracks_validator)
                        .conflicts_with("file")
                        .help("Comma-separated tracks to read instead of a file"),
                )
                .arg(swechars_arg()),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Write every BASIC program on the disk as a text file")
                .arg(image_arg())
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .takes_value(true)
                        .required(true)
                        .help("Directory for the text files"),
                )
                .arg(swechars_arg()),
        )
        .subcommand(
            SubCommand::with_name("restore")
                .about("Link tracks into a new file and save a copy of the image")
                .arg(image_arg())
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .takes_value(true)
                        .required(true)
                        .help("Where to save the modified image"),
                )
                .arg(
                    Arg::with_name("name")
                        .long("name")
                        .takes_value(true)
                        .required(true)
                        .help("Name of the new file"),
                )
                .arg(
                    Arg::with_name("type")
                        .long("type")
                        .takes_value(true)
                        .default_value("128")
                        .validator(type_validator)
                        .help("Directory type byte of the new file"),
                )
                .arg(
                    Arg::with_name("tracks")
                        .long("tracks")
                        .takes_value(true)
                        .required(true)
                        .validator(tracks_validator)
                        .help("Comma-separated tracks, in file order"),
                ),
        );

    let mut app_clone = app.clone();
    let matches = app.get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match matches.subcommand() {
        ("list", Some(m)) => cmd_list(image(m), m.is_present("swechars")),
        ("view", Some(m)) => match (m.value_of("file"), m.value_of("tracks")) {
            (Some(file), _) => cmd_view_file(image(m), file, m.is_present("swechars")),
            (None, Some(tracks)) => cmd_view_tracks(
                image(m),
                &tracks_parser(tracks).unwrap(),
                m.is_present("swechars"),
            ),
            (None, None) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "either --file or --tracks is required",
            )),
        },
        ("extract", Some(m)) => cmd_extract(
            image(m),
            m.value_of("output").unwrap(),
            m.is_present("swechars"),
        ),
        ("restore", Some(m)) => cmd_restore(
            image(m),
            m.value_of("output").unwrap(),
            m.value_of("name").unwrap(),
            type_parser(m.value_of("type").unwrap()).unwrap(),
            &tracks_parser(m.value_of("tracks").unwrap()).unwrap(),
        ),
        _ => {
            app_clone.print_help().unwrap();
            println!();
            process::exit(EXIT_FAILURE);
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_FAILURE);
    }
}

fn image<'a>(m: &'a ArgMatches) -> &'a str {
    m.value_of("image").unwrap()
}

fn tracks_parser(v: &str) -> Result<Vec<u8>, ()> {
    v.split(',')
        .map(|t| t.trim().parse::<u8>().map_err(|_| ()))
        .collect()
}

/// Require a comma-separated list of track numbers.
fn tracks_validator(v: String) -> Result<(), String> {
    match tracks_parser(&v) {
        Ok(_) => Ok(()),
        Err(_) => Err("Expected comma-separated track numbers, e.g. \"5,4\".".to_string()),
    }
}

fn type_parser(v: &str) -> Result<u8, ()> {
    let v = v.trim();
    match v.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => v.parse::<u8>(),
    }
    .map_err(|_| ())
}

/// Require a type byte, either decimal or hex with a "0x" prefix.
fn type_validator(v: String) -> Result<(), String> {
    match type_parser(&v) {
        Ok(_) => Ok(()),
        Err(_) => Err("Expected a value from 0-255.".to_string()),
    }
}

fn display_name(entry: &FileEntry, swechars: bool) -> String {
    if swechars {
        svi::swechar::to_swechars(&entry.filename)
    } else {
        entry.filename.clone()
    }
}

fn cmd_list(diskimage: &str, swechars: bool) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;

    println!("Track usage: {}", disk.track_map());
    if disk.side_two_has_data() {
        println!("Side 2 has data!");
    }
    println!();
    println!("Boot track: {}", disk.boot_track());
    println!();
    println!("Disk attributes: {}", disk.attributes());
    println!("IPL: {}", disk.ipl_command());
    println!();

    let entries = disk.entries();
    let usage = TrackUsage::new(&entries, disk.track_count());
    // Directory track problems were already logged when the image was opened.
    let warnings = disk.validate();
    for warning in warnings.iter() {
        match warning {
            Warning::TrackOutOfRange(..) | Warning::TrackSharedByFiles(_) => warn!("{}", warning),
            _ => {}
        }
    }

    println!("FILES");
    println!("-----");
    for entry in entries.iter().filter(|e| !e.deleted) {
        if swechars {
            println!("{:#}", entry);
        } else {
            println!("{}", entry);
        }
    }
    println!();

    if entries.iter().any(|e| e.deleted) {
        println!("DELETED FILES");
        println!("-------------");
        for entry in entries.iter().filter(|e| e.deleted) {
            println!(
                "{:<11} {} {:>5} bytes   Tracks: {:<15} Status: {}",
                display_name(entry, swechars),
                entry.attributes(),
                entry.listed_size(),
                entry.format_tracks(),
                usage.recovery_status(&disk, entry)
            );
        }
        println!();
    }

    for warning in warnings.iter() {
        if let Warning::UnreferencedTrack(track) = warning {
            println!("Track {} contains data but is not referenced in FAT!", track);
        }
    }
    Ok(())
}

fn print_program(data: &[u8], swechars: bool) -> io::Result<()> {
    let program = Detokenizer::new().swechars(swechars).detokenize(data)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", program)?;
    Ok(())
}

fn cmd_view_file(diskimage: &str, filename: &str, swechars: bool) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let file = disk.open_file(filename, swechars).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to load {} from disk image: {}", filename, e),
        )
    })?;
    print_program(&file.read(), swechars)
}

fn cmd_view_tracks(diskimage: &str, tracks: &[u8], swechars: bool) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let tracks = tracks.iter().map(|t| *t as usize).collect::<Vec<_>>();
    print_program(&disk.read_tracks(&tracks)?, swechars)
}

fn cmd_extract(diskimage: &str, output: &str, swechars: bool) -> io::Result<()> {
    let disk = Disk::open(diskimage)?;
    let output = Path::new(output);
    fs::create_dir_all(output)?;

    let mut failures = 0;
    for entry in disk.files().iter().filter(|e| e.is_basic_file()) {
        let name = display_name(entry, swechars);
        let filename = match host_filename(&name) {
            Some(filename) => filename,
            None => {
                error!("Skipping {}: not usable as a file name", entry.filename);
                failures += 1;
                continue;
            }
        };
        let program = match disk.open_file_from_entry(entry).program(swechars) {
            Ok(program) => program,
            Err(e) => {
                error!("Skipping {}: {}", entry.filename, e);
                failures += 1;
                continue;
            }
        };
        let path = output.join(filename);
        info!("Writing {}", path.display());
        if let Err(e) = fs::write(&path, program.to_string()) {
            error!("Skipping {}: {}", entry.filename, e);
            failures += 1;
        }
    }

    if failures == 0 {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} files could not be extracted.", failures),
        ))
    }
}

fn cmd_restore(
    diskimage: &str,
    output: &str,
    filename: &str,
    file_type: u8,
    tracks: &[u8],
) -> io::Result<()> {
    let mut disk = Disk::open(diskimage)?;
    let entry = disk.create_file_from_tracks(filename, file_type, tracks)?;
    disk.save(output)?;
    println!("{}", entry);
    Ok(())
}

//! Tokenized SVI disk BASIC programs.
//!
//! A saved program is a linked list of lines as it sat in memory at
//! `0x8001`.  Each line starts with the address of the next line and the
//! line number, both little-endian, followed by the tokenized text and a
//! zero byte.  A zero next-line address ends the program.

mod error;
mod float;
mod tokens;

use std::fmt;

use log::warn;

use crate::swechar;

pub use self::error::BasicError;
pub use self::float::{decode_float, format_general, PRECISION};
pub use self::tokens::{keyword, KEYWORDS};

use self::tokens::{APOSTROPHE_REM, ESCAPE};

/// Address the program is loaded at.
pub const LOAD_ADDRESS: usize = 0x8001;

const END_OF_LINE: u8 = 0x00;
const TOKEN_HEX: u8 = 12;
const TOKEN_WORD: u8 = 14;
const TOKEN_WORD_ALT: u8 = 28;
const TOKEN_BYTE: u8 = 15;
const TOKEN_DIGIT_0: u8 = 17;
const TOKEN_DIGIT_9: u8 = 26;
const TOKEN_SINGLE: u8 = 29;
const TOKEN_DOUBLE: u8 = 31;

const SINGLE_SIZE: usize = 4;
const DOUBLE_SIZE: usize = 8;

pub const UNEXPECTED_EOF: &str = "*** UNEXPECTED EOF";
pub const UNEXPECTED_EOL: &str = "*** UNEXPECTED EOL";
pub const BUFFER_ENDED_PREMATURELY: &str = " *** BUFFER ENDED PREMATURELY";
pub const BUFFER_NOT_EMPTY: &str = " *** GOT EOL BUT BUFFER NOT EMPTY";

/// One decoded program line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// `None` if the line was too short to hold a line number.
    pub number: Option<u16>,
    /// The line as listed, including its number.
    pub text: String,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// How the walk over the line list ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// A zero next-line address.
    Normal,
    /// The data ran out before a next-line address.
    Abrupt,
    /// A next-line address that doesn't point past the current line.
    MalformedPointer,
}

/// A detokenized program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    pub lines: Vec<Line>,
    pub termination: Termination,
}

impl Program {
    /// The listing, one string per line.  A malformed line pointer is shown
    /// as a final marker line.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.lines.iter().map(|l| l.text.clone()).collect();
        if self.termination == Termination::MalformedPointer {
            lines.push(UNEXPECTED_EOF.to_string());
        }
        lines
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[inline]
fn read_word(bytes: &[u8], pos: usize) -> u16 {
    bytes[pos] as u16 | (bytes[pos + 1] as u16) << 8
}

/// Turns tokenized programs back into text.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detokenizer {
    swechars: bool,
}

impl Detokenizer {
    pub fn new() -> Detokenizer {
        Detokenizer::default()
    }

    /// Render literal characters as Swedish glyphs.  Keywords are never
    /// transliterated.
    pub fn swechars(mut self, swechars: bool) -> Detokenizer {
        self.swechars = swechars;
        self
    }

    pub fn detokenize(&self, bytes: &[u8]) -> Result<Program, BasicError> {
        let mut lines = vec![];
        let mut pos = 0;
        let termination = loop {
            if pos + 2 > bytes.len() {
                warn!("Program ended abruptly");
                break Termination::Abrupt;
            }
            let next = read_word(bytes, pos) as usize;
            if next == 0 {
                break Termination::Normal;
            }
            let next = match next.checked_sub(LOAD_ADDRESS) {
                Some(next) if next >= pos + 4 => next,
                _ => {
                    warn!("Invalid line pointer, aborting detokenizing");
                    break Termination::MalformedPointer;
                }
            };
            let end = next.min(bytes.len());
            lines.push(self.detokenize_line(&bytes[pos + 2..end])?);
            pos = next;
        };
        Ok(Program { lines, termination })
    }

    /// Decode one line record: the line number followed by the token stream
    /// and its terminating zero.
    fn detokenize_line(&self, bytes: &[u8]) -> Result<Line, BasicError> {
        if bytes.len() < 2 {
            warn!("Line less than two bytes, skipping");
            return Ok(Line {
                number: None,
                text: UNEXPECTED_EOL.to_string(),
            });
        }
        let line_number = read_word(bytes, 0);
        let mut text = format!("{} ", line_number);
        let mut pos = 2;

        // Take the operand of the current token.  If the line ends first, the
        // line is returned as is with the premature end marker.
        macro_rules! operand {
            ($size:expr) => {{
                if pos + $size > bytes.len() {
                    warn!(
                        "Buffer ended inside a token operand on line number {}",
                        line_number
                    );
                    text.push_str(BUFFER_ENDED_PREMATURELY);
                    return Ok(Line {
                        number: Some(line_number),
                        text,
                    });
                }
                let operand = &bytes[pos..pos + $size];
                pos += $size;
                operand
            }};
        }

        while pos < bytes.len() && bytes[pos] != END_OF_LINE {
            let token = bytes[pos];
            pos += 1;
            match token {
                32..=126 => {
                    if self.swechars {
                        text.push(swechar::byte_to_glyph(token));
                    } else {
                        text.push(token as char);
                    }
                }
                TOKEN_HEX => {
                    let operand = operand!(2);
                    text.push_str(&format!("&H{:X}", read_word(operand, 0)));
                }
                TOKEN_WORD | TOKEN_WORD_ALT => {
                    let operand = operand!(2);
                    text.push_str(&read_word(operand, 0).to_string());
                }
                TOKEN_BYTE => {
                    let operand = operand!(1);
                    text.push_str(&operand[0].to_string());
                }
                TOKEN_DIGIT_0..=TOKEN_DIGIT_9 => {
                    text.push_str(&(token - TOKEN_DIGIT_0).to_string());
                }
                TOKEN_SINGLE => {
                    let operand = operand!(SINGLE_SIZE);
                    text.push_str(&format_general(decode_float(operand), PRECISION));
                    text.push('!');
                }
                TOKEN_DOUBLE => {
                    let operand = operand!(DOUBLE_SIZE);
                    text.push_str(&format_general(decode_float(operand), PRECISION));
                    text.push('#');
                }
                0..=31 => return Err(BasicError::UnknownToken { token, line_number }),
                _ => {
                    let token = if token == ESCAPE {
                        operand!(1)[0] & 0x7F
                    } else {
                        token
                    };
                    if token == APOSTROPHE_REM {
                        // Stored as ":REM" followed by this token.
                        for _ in 0..4 {
                            text.pop();
                        }
                        text.push('\'');
                    } else {
                        match keyword(token) {
                            Some(keyword) => text.push_str(keyword),
                            None => return Err(BasicError::UnknownToken { token, line_number }),
                        }
                    }
                }
            }
        }

        if pos >= bytes.len() {
            warn!("Buffer ended before EOL token on line number {}", line_number);
            text.push_str(BUFFER_ENDED_PREMATURELY);
        } else if pos + 1 != bytes.len() {
            warn!(
                "Got EOL token on line number {} but not end of buffer",
                line_number
            );
            text.push_str(BUFFER_NOT_EMPTY);
        }
        Ok(Line {
            number: Some(line_number),
            text,
        })
    }
}

/// Detokenize a program with the default settings.
pub fn detokenize(bytes: &[u8]) -> Result<Program, BasicError> {
    Detokenizer::new().detokenize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Link line records the way BASIC stores them in memory.  The token
    /// streams are given as hex and include their EOL byte, if any.
    fn program(lines: &[(u16, &str)]) -> Vec<u8> {
        let mut data = vec![];
        for (number, tokens) in lines {
            let tokens = hex::decode(tokens).expect("hex error");
            let next = LOAD_ADDRESS + data.len() + 4 + tokens.len();
            data.extend_from_slice(&(next as u16).to_le_bytes());
            data.extend_from_slice(&number.to_le_bytes());
            data.extend(tokens);
        }
        data.extend_from_slice(&[0, 0]);
        data
    }

    fn test_detokenizer(lines: &[(u16, &str)], expected: &[&str]) {
        let actual = detokenize(&program(lines)).expect("detokenization error");
        assert_eq!(actual.termination, Termination::Normal);
        assert_eq!(actual.to_lines(), expected);
    }

    #[test]
    fn single_line() {
        let tokens = hex::decode("0B800A009122484922000000").expect("hex error");
        let program = detokenize(&tokens).expect("detokenization error");
        assert_eq!(program.lines.len(), 1);
        assert_eq!(program.lines[0].number, Some(10));
        assert_eq!(program.to_string(), "10 PRINT\"HI\"\n");
    }

    #[test]
    fn multi_line() {
        test_detokenizer(
            &[(10, "912248492200"), (20, "41F10F0FF31200")],
            &["10 PRINT\"HI\"", "20 A=15+1"],
        );
    }

    #[test]
    fn integer_literals() {
        test_detokenizer(
            &[
                (30, "98200CFFFF2C1100"),
                (40, "41F10E3930F1420F0700"),
                (50, "41F11C39303B1A00"),
            ],
            &["30 POKE &HFFFF,0", "40 A=12345=B7", "50 A=12345;9"],
        );
    }

    #[test]
    fn float_literals() {
        test_detokenizer(
            &[(60, "41F11D4210000000"), (70, "41F11F413140000000000000")],
            &["60 A=10!", "70 A=3.14#"],
        );
    }

    #[test]
    fn escaped_functions() {
        test_detokenizer(&[(80, "41F1FF8528422900")], &["80 A=INT(B)"]);
    }

    #[test]
    fn apostrophe_comment() {
        test_detokenizer(&[(90, "913A8FE648454C4C4F00")], &["90 PRINT'HELLO"]);
    }

    #[test]
    fn swedish_literals() {
        let data = program(&[(100, "91227B7D7C2200")]);
        let program = Detokenizer::new()
            .swechars(true)
            .detokenize(&data)
            .expect("detokenization error");
        assert_eq!(program.to_lines(), &["100 PRINT\"äåö\""]);
    }

    #[test]
    fn missing_eol() {
        test_detokenizer(&[(10, "41")], &["10 A *** BUFFER ENDED PREMATURELY"]);
    }

    #[test]
    fn bytes_after_eol() {
        test_detokenizer(&[(10, "410042")], &["10 A *** GOT EOL BUT BUFFER NOT EMPTY"]);
    }

    #[test]
    fn truncated_operand() {
        test_detokenizer(&[(10, "0CFF")], &["10  *** BUFFER ENDED PREMATURELY"]);
    }

    #[test]
    fn unknown_tokens() {
        let e = detokenize(&program(&[(10, "410100")])).unwrap_err();
        assert_eq!(e, BasicError::UnknownToken { token: 1, line_number: 10 });
        assert_eq!(e.to_string(), "unknown token 1 on line number 10");

        let e = detokenize(&program(&[(10, "00"), (20, "7F00")])).unwrap_err();
        assert_eq!(e, BasicError::UnknownToken { token: 0x7F, line_number: 20 });

        let e = detokenize(&program(&[(30, "FFB000")])).unwrap_err();
        assert_eq!(e, BasicError::UnknownToken { token: 0x30, line_number: 30 });
    }

    #[test]
    fn malformed_pointer() {
        let mut data = program(&[(10, "4100"), (20, "4200")]);
        // Point the second line back at the first.
        data[6] = 0x01;
        data[7] = 0x80;
        let program = detokenize(&data).expect("detokenization error");
        assert_eq!(program.termination, Termination::MalformedPointer);
        assert_eq!(program.to_lines(), &["10 A", UNEXPECTED_EOF]);
    }

    #[test]
    fn abrupt_end() {
        let mut data = program(&[(10, "4100")]);
        data.truncate(data.len() - 2);
        let program = detokenize(&data).expect("detokenization error");
        assert_eq!(program.termination, Termination::Abrupt);
        assert_eq!(program.to_lines(), &["10 A"]);

        // A line record cut short before its line number.
        let program = detokenize(&[0x05, 0x80, 0x0A]).expect("detokenization error");
        assert_eq!(program.to_lines(), &[UNEXPECTED_EOL]);
        assert_eq!(program.termination, Termination::Abrupt);
    }

    #[test]
    fn empty_program() {
        let program = detokenize(&[0, 0]).expect("detokenization error");
        assert!(program.lines.is_empty());
        assert_eq!(program.termination, Termination::Normal);
    }
}

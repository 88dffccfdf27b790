//! The keyword table of SVI disk BASIC.

/// Keyword text by token value.  Values 1..48 are only reached through the
/// 0xFF escape; an empty entry is not a valid token.
pub static KEYWORDS: [&str; 256] = [
    "", "LEFT$", "RIGHT$", "MID$", "SGN", "INT", "ABS", "SQR",
    "RND", "SIN", "LOG", "EXP", "COS", "TAN", "ATN", "FRE",
    "INP", "POSE", "LEN", "STR$", "VAL", "ASC", "CHR$", "PEEK",
    "VPEEK", "SPACE$", "OCT$", "HEX$", "LPOS", "BIN$", "CINT", "CSNG",
    "CDBL", "FIX", "STICK", "STRIG", "PDL", "PAD", "DSKF", "FPOS",
    "CVI", "CVS", "CVD", "EOF", "LOC", "LOF", "MKI$", "MKS$",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "", "", "", "", "", "", "", "",
    "MKD$", "END", "FOR", "NEXT", "DATA", "INPUT", "DIM", "READ",
    "LET", "GOTO", "RUN", "IF", "RESTORE", "GOSUB", "RETURN", "REM",
    "STOP", "PRINT", "CLEAR", "LIST", "NEW", "ON", "WAIT", "DEF",
    "POKE", "CONT", "CSAVE", "CLOAD", "OUT", "LPRINT", "LLIST", "CLS",
    "WIDTH", "ELSE", "TRON", "TROFF", "SWAP", "ERASE", "ERROR", "RESUME",
    "DELETE", "AUTO", "RENUM", "DEFSTR", "DEFINT", "DEGSNG", "DEFDBL", "LINE",
    "OPEN", "FIELD", "GET", "PUT", "CLOSE", "LOAD", "MERGE", "FILES",
    "LSET", "RSET", "SAVE", "LFILES", "CIRCLE", "COLOR", "DRAW", "PAINT",
    "BEEP", "PLAY", "SET", "PRESET", "SOUND", "SCREEN", "VPOKE", "KEY",
    "CLICK", "SWITCH", "MAX", "MON", "MOTO", "BLOAD", "BSAVE", "MDM",
    "DIAL", "DKSO$", "SET", "NAME", "KILL", "IPL", "COPY", "CMD",
    "LOCATE", "TO", "THEN", "TAB(", "STEP", "USR", "FN", "SPC(",
    "NOT", "ERL", "ERR", "STRING$", "USING", "INSTR", "", "VARPTR",
    "CSRLIN", "ATTR$", "DSKI$", "OFF", "INKEY$", "POINT", "SPRITE", "TIME",
    ">", "=", "<", "+", "-", "*", "/", "^",
    "AND", "OR", "XOR", "EQV", "IMP", "MOD", "\\", "",
];

/// Token that stands for `:REM'`.
pub const APOSTROPHE_REM: u8 = 0xE6;
/// Prefix for the function keywords.
pub const ESCAPE: u8 = 0xFF;

/// Look up the keyword for a token, if it has one.
pub fn keyword(token: u8) -> Option<&'static str> {
    match KEYWORDS[token as usize] {
        "" => None,
        keyword => Some(keyword),
    }
}

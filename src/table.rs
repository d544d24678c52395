//! Character ↔ dot/dash representation tables and procedural signals.
//! Pure static data, reached through
//! `representation_of`/`char_of`/`list_characters`.

use phf::phf_map;

/// Character → Morse representation (`.`/`-` string, up to 7 characters).
pub static REPRESENTATIONS: phf::Map<char, &'static str> = phf_map! {
    'A' => ".-",    'B' => "-...",  'C' => "-.-.",  'D' => "-..",
    'E' => ".",     'F' => "..-.",  'G' => "--.",   'H' => "....",
    'I' => "..",    'J' => ".---",  'K' => "-.-",   'L' => ".-..",
    'M' => "--",    'N' => "-.",    'O' => "---",   'P' => ".--.",
    'Q' => "--.-",  'R' => ".-.",   'S' => "...",   'T' => "-",
    'U' => "..-",   'V' => "...-",  'W' => ".--",   'X' => "-..-",
    'Y' => "-.--",  'Z' => "--..",
    '0' => "-----", '1' => ".----", '2' => "..---", '3' => "...--",
    '4' => "....-", '5' => ".....", '6' => "-....", '7' => "--...",
    '8' => "---..", '9' => "----.",
    '.' => ".-.-.-", ',' => "--..--", '?' => "..--..", '/' => "-..-.",
    '&' => ".-...", '(' => "-.--.",  ')' => "-.--.-", '+' => ".-.-.",
    '=' => "-...-", '@' => ".--.-.", ':' => "---...", '\'' => ".----.",
    '"' => ".-..-.", '!' => "-.-.--", '-' => "-....-",
    ';' => "-.-.-.", '_' => "..--.-", '$' => "...-..-",
};

/// All characters in [`REPRESENTATIONS`], in the order declared above.
pub fn list_characters() -> &'static str {
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,?/&()+=@:'\"!-;_$"
}

/// Character → representation lookup. `None` for unsupported characters.
pub fn representation_of(c: char) -> Option<&'static str> {
    REPRESENTATIONS.get(&c.to_ascii_uppercase()).copied()
}

/// Representation → character lookup, the inverse of [`representation_of`].
pub fn char_of(repr: &str) -> Option<char> {
    REPRESENTATIONS
        .entries()
        .find(|(_, v)| **v == repr)
        .map(|(k, _)| *k)
}

/// One procedural (prosign) signal: a multi-character expansion sent as one
/// unbroken string of elements, with a hint about whether receivers
/// conventionally render it expanded (`<AR>`) or compressed.
#[derive(Debug, Clone, Copy)]
pub struct ProceduralSignal {
    pub name: &'static str,
    pub representation: &'static str,
    pub usually_expanded: bool,
}

/// Common Morse procedural signals (prosigns), supplementing the character
/// table; these are multi-character expansions sent as one unbroken
/// string of elements rather than single table entries.
pub static PROCEDURAL_SIGNALS: &[ProceduralSignal] = &[
    ProceduralSignal { name: "AR", representation: ".-.-.", usually_expanded: true },
    ProceduralSignal { name: "AS", representation: ".-...", usually_expanded: true },
    ProceduralSignal { name: "BT", representation: "-...-", usually_expanded: false },
    ProceduralSignal { name: "KN", representation: "-.--.", usually_expanded: true },
    ProceduralSignal { name: "SK", representation: "...-.-", usually_expanded: true },
    ProceduralSignal { name: "SN", representation: "...-.", usually_expanded: false },
    ProceduralSignal { name: "SOS", representation: "...---...", usually_expanded: false },
    ProceduralSignal { name: "HH", representation: "........", usually_expanded: false },
];

/// Look up a procedural signal by name (case-insensitive).
pub fn procedural_signal(name: &str) -> Option<&'static ProceduralSignal> {
    PROCEDURAL_SIGNALS
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

use encoding_rs::WINDOWS_1252;

// --- Repair trait ---

/// Repairs text or hands it back untouched. Implementations never fail.
pub trait TextRepair {
    fn repair(&self, text: &str) -> String;
    fn name(&self) -> &str;
}

/// Undoes one or two rounds of UTF-8 bytes decoded as a single-byte charset
/// ("MÃ¼nster" -> "Münster", "â€ž" -> "„").
#[derive(Debug, Clone, Copy, Default)]
pub struct MojibakeRepair;

/// Leaves text exactly as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl TextRepair for MojibakeRepair {
    fn repair(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let text = reinterpret(text, latin1_bytes).unwrap_or_else(|| text.to_string());
        reinterpret(&text, cp1252_bytes).unwrap_or(text)
    }

    fn name(&self) -> &str {
        "mojibake"
    }
}

impl TextRepair for PassThrough {
    fn repair(&self, text: &str) -> String {
        text.to_string()
    }

    fn name(&self) -> &str {
        "pass-through"
    }
}

pub fn for_flag(no_repair: bool) -> Box<dyn TextRepair> {
    if no_repair {
        Box::new(PassThrough)
    } else {
        Box::new(MojibakeRepair)
    }
}

/// Maps `text` back to bytes and reads them as UTF-8. `None` when either
/// step fails, so a pass is applied whole or not at all.
fn reinterpret(text: &str, encode: fn(&str) -> Option<Vec<u8>>) -> Option<String> {
    let bytes = encode(text)?;
    String::from_utf8(bytes).ok()
}

fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

// Code points windows-1252 leaves undefined. encoding_rs maps them to their
// own byte values, a strict codec rejects them.
const CP1252_UNDEFINED: [char; 5] = ['\u{81}', '\u{8d}', '\u{8f}', '\u{90}', '\u{9d}'];

fn cp1252_bytes(text: &str) -> Option<Vec<u8>> {
    if text.contains(CP1252_UNDEFINED) {
        return None;
    }
    let (bytes, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return None;
    }
    Some(bytes.into_owned())
}

//! Key translation tables.
//!
//! Viewers describe keys the way the browser reports them: a physical
//! `KeyboardEvent.code` (`"KeyA"`, `"ShiftLeft"`) and a logical
//! `KeyboardEvent.key` (`"a"`, `"Shift"`, `"!"`). Both resolve to a
//! [`HidKeyCode`], and each injector turns the HID usage into its native code.
//!
//! All mappings live in one table, [`KEY_TABLE`], with one row per key. Lookup
//! is a linear scan over about a hundred rows, which is cheaper than the
//! syscall that follows it.

pub mod hid;

pub use hid::HidKeyCode;

/// One key and every name it is known by.
#[derive(Debug, Clone, Copy)]
pub struct KeyRow {
    pub hid: HidKeyCode,
    /// Browser `KeyboardEvent.code`.
    pub dom_code: &'static str,
    /// Windows virtual-key code.
    pub vk: u16,
    /// X11 KeySym (unshifted).
    pub keysym: u32,
}

const fn row(hid: HidKeyCode, dom_code: &'static str, vk: u16, keysym: u32) -> KeyRow {
    KeyRow {
        hid,
        dom_code,
        vk,
        keysym,
    }
}

/// Every key the relay can inject.
pub const KEY_TABLE: &[KeyRow] = {
    use HidKeyCode::*;
    &[
        row(KeyA, "KeyA", 0x41, 0x0061),
        row(KeyB, "KeyB", 0x42, 0x0062),
        row(KeyC, "KeyC", 0x43, 0x0063),
        row(KeyD, "KeyD", 0x44, 0x0064),
        row(KeyE, "KeyE", 0x45, 0x0065),
        row(KeyF, "KeyF", 0x46, 0x0066),
        row(KeyG, "KeyG", 0x47, 0x0067),
        row(KeyH, "KeyH", 0x48, 0x0068),
        row(KeyI, "KeyI", 0x49, 0x0069),
        row(KeyJ, "KeyJ", 0x4A, 0x006A),
        row(KeyK, "KeyK", 0x4B, 0x006B),
        row(KeyL, "KeyL", 0x4C, 0x006C),
        row(KeyM, "KeyM", 0x4D, 0x006D),
        row(KeyN, "KeyN", 0x4E, 0x006E),
        row(KeyO, "KeyO", 0x4F, 0x006F),
        row(KeyP, "KeyP", 0x50, 0x0070),
        row(KeyQ, "KeyQ", 0x51, 0x0071),
        row(KeyR, "KeyR", 0x52, 0x0072),
        row(KeyS, "KeyS", 0x53, 0x0073),
        row(KeyT, "KeyT", 0x54, 0x0074),
        row(KeyU, "KeyU", 0x55, 0x0075),
        row(KeyV, "KeyV", 0x56, 0x0076),
        row(KeyW, "KeyW", 0x57, 0x0077),
        row(KeyX, "KeyX", 0x58, 0x0078),
        row(KeyY, "KeyY", 0x59, 0x0079),
        row(KeyZ, "KeyZ", 0x5A, 0x007A),
        row(Digit1, "Digit1", 0x31, 0x0031),
        row(Digit2, "Digit2", 0x32, 0x0032),
        row(Digit3, "Digit3", 0x33, 0x0033),
        row(Digit4, "Digit4", 0x34, 0x0034),
        row(Digit5, "Digit5", 0x35, 0x0035),
        row(Digit6, "Digit6", 0x36, 0x0036),
        row(Digit7, "Digit7", 0x37, 0x0037),
        row(Digit8, "Digit8", 0x38, 0x0038),
        row(Digit9, "Digit9", 0x39, 0x0039),
        row(Digit0, "Digit0", 0x30, 0x0030),
        row(Enter, "Enter", 0x0D, 0xFF0D),
        row(Escape, "Escape", 0x1B, 0xFF1B),
        row(Backspace, "Backspace", 0x08, 0xFF08),
        row(Tab, "Tab", 0x09, 0xFF09),
        row(Space, "Space", 0x20, 0x0020),
        row(Minus, "Minus", 0xBD, 0x002D),
        row(Equal, "Equal", 0xBB, 0x003D),
        row(BracketLeft, "BracketLeft", 0xDB, 0x005B),
        row(BracketRight, "BracketRight", 0xDD, 0x005D),
        row(Backslash, "Backslash", 0xDC, 0x005C),
        row(Semicolon, "Semicolon", 0xBA, 0x003B),
        row(Quote, "Quote", 0xDE, 0x0027),
        row(Backquote, "Backquote", 0xC0, 0x0060),
        row(Comma, "Comma", 0xBC, 0x002C),
        row(Period, "Period", 0xBE, 0x002E),
        row(Slash, "Slash", 0xBF, 0x002F),
        row(CapsLock, "CapsLock", 0x14, 0xFFE5),
        row(F1, "F1", 0x70, 0xFFBE),
        row(F2, "F2", 0x71, 0xFFBF),
        row(F3, "F3", 0x72, 0xFFC0),
        row(F4, "F4", 0x73, 0xFFC1),
        row(F5, "F5", 0x74, 0xFFC2),
        row(F6, "F6", 0x75, 0xFFC3),
        row(F7, "F7", 0x76, 0xFFC4),
        row(F8, "F8", 0x77, 0xFFC5),
        row(F9, "F9", 0x78, 0xFFC6),
        row(F10, "F10", 0x79, 0xFFC7),
        row(F11, "F11", 0x7A, 0xFFC8),
        row(F12, "F12", 0x7B, 0xFFC9),
        row(PrintScreen, "PrintScreen", 0x2C, 0xFF61),
        row(ScrollLock, "ScrollLock", 0x91, 0xFF14),
        row(Pause, "Pause", 0x13, 0xFF13),
        row(Insert, "Insert", 0x2D, 0xFF63),
        row(Home, "Home", 0x24, 0xFF50),
        row(PageUp, "PageUp", 0x21, 0xFF55),
        row(Delete, "Delete", 0x2E, 0xFFFF),
        row(End, "End", 0x23, 0xFF57),
        row(PageDown, "PageDown", 0x22, 0xFF56),
        row(ArrowRight, "ArrowRight", 0x27, 0xFF53),
        row(ArrowLeft, "ArrowLeft", 0x25, 0xFF51),
        row(ArrowDown, "ArrowDown", 0x28, 0xFF54),
        row(ArrowUp, "ArrowUp", 0x26, 0xFF52),
        row(NumLock, "NumLock", 0x90, 0xFF7F),
        row(NumpadDivide, "NumpadDivide", 0x6F, 0xFFAF),
        row(NumpadMultiply, "NumpadMultiply", 0x6A, 0xFFAA),
        row(NumpadSubtract, "NumpadSubtract", 0x6D, 0xFFAD),
        row(NumpadAdd, "NumpadAdd", 0x6B, 0xFFAB),
        row(NumpadEnter, "NumpadEnter", 0x0D, 0xFF8D),
        row(Numpad1, "Numpad1", 0x61, 0xFFB1),
        row(Numpad2, "Numpad2", 0x62, 0xFFB2),
        row(Numpad3, "Numpad3", 0x63, 0xFFB3),
        row(Numpad4, "Numpad4", 0x64, 0xFFB4),
        row(Numpad5, "Numpad5", 0x65, 0xFFB5),
        row(Numpad6, "Numpad6", 0x66, 0xFFB6),
        row(Numpad7, "Numpad7", 0x67, 0xFFB7),
        row(Numpad8, "Numpad8", 0x68, 0xFFB8),
        row(Numpad9, "Numpad9", 0x69, 0xFFB9),
        row(Numpad0, "Numpad0", 0x60, 0xFFB0),
        row(NumpadDecimal, "NumpadDecimal", 0x6E, 0xFFAE),
        row(ContextMenu, "ContextMenu", 0x5D, 0xFF67),
        row(ControlLeft, "ControlLeft", 0xA2, 0xFFE3),
        row(ShiftLeft, "ShiftLeft", 0xA0, 0xFFE1),
        row(AltLeft, "AltLeft", 0xA4, 0xFFE9),
        row(MetaLeft, "MetaLeft", 0x5B, 0xFFEB),
        row(ControlRight, "ControlRight", 0xA3, 0xFFE4),
        row(ShiftRight, "ShiftRight", 0xA1, 0xFFE2),
        row(AltRight, "AltRight", 0xA5, 0xFFEA),
        row(MetaRight, "MetaRight", 0x5C, 0xFFEC),
    ]
};

fn find(hid: HidKeyCode) -> Option<&'static KeyRow> {
    KEY_TABLE.iter().find(|r| r.hid == hid)
}

/// Resolves a browser key event to a HID usage.
///
/// `code` (physical position) is tried first; when it is empty or unknown,
/// `key` (logical value) is used. Returns `None` when neither is recognised.
pub fn resolve_dom_key(key: &str, code: &str) -> Option<HidKeyCode> {
    hid_from_dom_code(code).or_else(|| hid_from_dom_key(key))
}

/// Maps a `KeyboardEvent.code` value to a HID usage.
pub fn hid_from_dom_code(code: &str) -> Option<HidKeyCode> {
    if code.is_empty() {
        return None;
    }
    KEY_TABLE.iter().find(|r| r.dom_code == code).map(|r| r.hid)
}

/// Maps a `KeyboardEvent.key` value to a HID usage.
///
/// Single printable characters resolve to the US-layout key that produces
/// them. Named keys resolve to their left-hand variant where a side exists.
pub fn hid_from_dom_key(key: &str) -> Option<HidKeyCode> {
    let mut chars = key.chars();
    if let Some(c) = chars.next() {
        if chars.next().is_none() {
            return hid_for_char(c).map(|(hid, _)| hid);
        }
    }
    let hid = match key {
        "Control" => HidKeyCode::ControlLeft,
        "Shift" => HidKeyCode::ShiftLeft,
        "Alt" => HidKeyCode::AltLeft,
        "AltGraph" => HidKeyCode::AltRight,
        "Meta" | "OS" | "Super" => HidKeyCode::MetaLeft,
        "Esc" => HidKeyCode::Escape,
        "Del" => HidKeyCode::Delete,
        "Spacebar" => HidKeyCode::Space,
        "Up" => HidKeyCode::ArrowUp,
        "Down" => HidKeyCode::ArrowDown,
        "Left" => HidKeyCode::ArrowLeft,
        "Right" => HidKeyCode::ArrowRight,
        "Apps" => HidKeyCode::ContextMenu,
        // Named keys whose `key` value equals their `code` value.
        other => return hid_from_dom_code(other).filter(|h| !is_positional(*h)),
    };
    Some(hid)
}

/// Keys whose `code` name differs from anything the browser reports as `key`.
fn is_positional(hid: HidKeyCode) -> bool {
    let code = hid.as_u16();
    (0x04..=0x27).contains(&code) || (0x2C..=0x38).contains(&code) || hid.is_modifier()
}

/// Returns the US-layout key that types `c`, and whether Shift is required.
pub fn hid_for_char(c: char) -> Option<(HidKeyCode, bool)> {
    use HidKeyCode::*;
    if c.is_ascii_alphabetic() {
        let idx = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        return Some((KEY_TABLE[idx].hid, c.is_ascii_uppercase()));
    }
    let mapped = match c {
        '1' => (Digit1, false),
        '2' => (Digit2, false),
        '3' => (Digit3, false),
        '4' => (Digit4, false),
        '5' => (Digit5, false),
        '6' => (Digit6, false),
        '7' => (Digit7, false),
        '8' => (Digit8, false),
        '9' => (Digit9, false),
        '0' => (Digit0, false),
        '!' => (Digit1, true),
        '@' => (Digit2, true),
        '#' => (Digit3, true),
        '$' => (Digit4, true),
        '%' => (Digit5, true),
        '^' => (Digit6, true),
        '&' => (Digit7, true),
        '*' => (Digit8, true),
        '(' => (Digit9, true),
        ')' => (Digit0, true),
        ' ' => (Space, false),
        '\n' => (Enter, false),
        '\t' => (Tab, false),
        '-' => (Minus, false),
        '_' => (Minus, true),
        '=' => (Equal, false),
        '+' => (Equal, true),
        '[' => (BracketLeft, false),
        '{' => (BracketLeft, true),
        ']' => (BracketRight, false),
        '}' => (BracketRight, true),
        '\\' => (Backslash, false),
        '|' => (Backslash, true),
        ';' => (Semicolon, false),
        ':' => (Semicolon, true),
        '\'' => (Quote, false),
        '"' => (Quote, true),
        '`' => (Backquote, false),
        '~' => (Backquote, true),
        ',' => (Comma, false),
        '<' => (Comma, true),
        '.' => (Period, false),
        '>' => (Period, true),
        '/' => (Slash, false),
        '?' => (Slash, true),
        _ => return None,
    };
    Some(mapped)
}

/// Translates a HID usage to a Windows virtual-key code.
pub fn hid_to_windows_vk(hid: HidKeyCode) -> u16 {
    // Every variant has a row; the fallback is unreachable but keeps this total.
    find(hid).map(|r| r.vk).unwrap_or(0)
}

/// Returns `true` for keys that Windows expects with `KEYEVENTF_EXTENDEDKEY`.
pub fn is_windows_extended(hid: HidKeyCode) -> bool {
    use HidKeyCode::*;
    matches!(
        hid,
        Insert
            | Delete
            | Home
            | End
            | PageUp
            | PageDown
            | ArrowUp
            | ArrowDown
            | ArrowLeft
            | ArrowRight
            | NumpadEnter
            | NumpadDivide
            | ControlRight
            | AltRight
            | MetaLeft
            | MetaRight
            | ContextMenu
            | PrintScreen
    )
}

/// Translates a HID usage to an X11 KeySym.
pub fn hid_to_x11_keysym(hid: HidKeyCode) -> u32 {
    find(hid).map(|r| r.keysym).unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

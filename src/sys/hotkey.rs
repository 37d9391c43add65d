use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Modifier state with core-protocol bit positions.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const LOCK: Modifiers = Modifiers(1 << 1);
    pub const CONTROL: Modifiers = Modifiers(1 << 2);
    /// Mod1.
    pub const ALT: Modifiers = Modifiers(1 << 3);
    /// Mod2 on most keymaps.
    pub const NUM_LOCK: Modifiers = Modifiers(1 << 4);
    pub const MOD3: Modifiers = Modifiers(1 << 5);
    /// Mod4.
    pub const SUPER: Modifiers = Modifiers(1 << 6);
    pub const MOD5: Modifiers = Modifiers(1 << 7);

    pub const fn empty() -> Self { Modifiers(0) }

    pub const fn from_bits(bits: u8) -> Self { Modifiers(bits) }

    pub const fn bits(&self) -> u8 { self.0 }

    pub fn contains(&self, other: Modifiers) -> bool { (self.0 & other.0) == other.0 }

    pub fn intersects(&self, other: Modifiers) -> bool { (self.0 & other.0) != 0 }

    pub fn insert(&mut self, other: Modifiers) { self.0 |= other.0; }

    pub fn remove(&mut self, other: Modifiers) { self.0 &= !other.0; }

    pub fn union(self, other: Modifiers) -> Modifiers { Modifiers(self.0 | other.0) }

    /// Drops Lock and NumLock, which never take part in binding matches.
    pub fn clean(self) -> Modifiers {
        let mut mods = self;
        mods.remove(Modifiers::LOCK);
        mods.remove(Modifiers::NUM_LOCK);
        mods
    }

    pub fn insert_from_token(&mut self, token: &str) -> bool {
        match token.to_lowercase().as_str() {
            "shift" => {
                self.insert(Modifiers::SHIFT);
                true
            }
            "ctrl" | "control" => {
                self.insert(Modifiers::CONTROL);
                true
            }
            "alt" | "mod1" | "meta" => {
                self.insert(Modifiers::ALT);
                true
            }
            "super" | "mod4" | "win" | "logo" => {
                self.insert(Modifiers::SUPER);
                true
            }
            "mod3" => {
                self.insert(Modifiers::MOD3);
                true
            }
            "mod5" | "altgr" => {
                self.insert(Modifiers::MOD5);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Modifiers::SUPER, "Super"),
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::MOD3, "Mod3"),
            (Modifiers::MOD5, "Mod5"),
        ];
        let parts: Vec<&str> =
            names.iter().filter(|(m, _)| self.contains(*m)).map(|(_, n)| *n).collect();
        write!(f, "{}", parts.join(" + "))
    }
}

/// Keys by keysym name. Parsing is case-insensitive.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::VariantNames
)]
#[strum(ascii_case_insensitive)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    #[strum(to_string = "0")]
    Digit0,
    #[strum(to_string = "1")]
    Digit1,
    #[strum(to_string = "2")]
    Digit2,
    #[strum(to_string = "3")]
    Digit3,
    #[strum(to_string = "4")]
    Digit4,
    #[strum(to_string = "5")]
    Digit5,
    #[strum(to_string = "6")]
    Digit6,
    #[strum(to_string = "7")]
    Digit7,
    #[strum(to_string = "8")]
    Digit8,
    #[strum(to_string = "9")]
    Digit9,
    #[strum(to_string = "Return", serialize = "Enter")]
    Return,
    Tab,
    #[strum(to_string = "space")]
    Space,
    #[strum(to_string = "Escape", serialize = "Esc")]
    Escape,
    BackSpace,
    Delete,
    Insert,
    Home,
    End,
    #[strum(to_string = "Prior", serialize = "PageUp")]
    PageUp,
    #[strum(to_string = "Next", serialize = "PageDown")]
    PageDown,
    Left,
    Right,
    Up,
    Down,
    #[strum(to_string = "minus", serialize = "-")]
    Minus,
    #[strum(to_string = "equal", serialize = "=")]
    Equal,
    #[strum(to_string = "comma", serialize = ",")]
    Comma,
    #[strum(to_string = "period", serialize = ".")]
    Period,
    #[strum(to_string = "slash", serialize = "/")]
    Slash,
    #[strum(to_string = "backslash", serialize = "\\")]
    Backslash,
    #[strum(to_string = "semicolon", serialize = ";")]
    Semicolon,
    #[strum(to_string = "apostrophe", serialize = "'")]
    Apostrophe,
    #[strum(to_string = "grave", serialize = "`")]
    Grave,
    #[strum(to_string = "bracketleft", serialize = "[")]
    BracketLeft,
    #[strum(to_string = "bracketright", serialize = "]")]
    BracketRight,
    Print,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    #[strum(to_string = "XF86AudioRaiseVolume")]
    AudioRaiseVolume,
    #[strum(to_string = "XF86AudioLowerVolume")]
    AudioLowerVolume,
    #[strum(to_string = "XF86AudioMute")]
    AudioMute,
    #[strum(to_string = "XF86MonBrightnessUp")]
    BrightnessUp,
    #[strum(to_string = "XF86MonBrightnessDown")]
    BrightnessDown,
}

impl KeyCode {
    /// The number row key for a 0-based tag index: tag 0 is `1`, tag 8 is `9`.
    pub fn for_tag(index: usize) -> Option<KeyCode> {
        use KeyCode::*;
        [Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9].get(index).copied()
    }
}

impl Serialize for KeyCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<KeyCode, D::Error> {
        let s = String::deserialize(deserializer)?;
        KeyCode::from_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("Unrecognized key token: {s}")))
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self { Self { modifiers, key_code } }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers == Modifiers::empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

fn parse_mods_and_optional_key(s: &str) -> Result<(Modifiers, Option<KeyCode>), anyhow::Error> {
    let parts: Vec<&str> = s.split('+').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();

    let mut mods = Modifiers::empty();
    let mut key_opt: Option<KeyCode> = None;

    for part in parts {
        if mods.insert_from_token(part) {
            continue;
        }
        let code = KeyCode::from_str(part).map_err(|_| anyhow!("Unrecognized key token: {}", part))?;
        if key_opt.replace(code).is_some() {
            return Err(anyhow!("More than one key in hotkey: {}", s));
        }
    }

    Ok((mods, key_opt))
}

/// Parses a combination of modifiers and a single key in the form
/// `"Alt + Shift + Return"`.
pub fn parse_modifiers(s: &str) -> Result<Modifiers, anyhow::Error> {
    let (mods, key) = parse_mods_and_optional_key(s)?;
    match key {
        None => Ok(mods),
        Some(k) => Err(anyhow!("Expected only modifiers, found key {k} in: {s}")),
    }
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mods, key_opt) = parse_mods_and_optional_key(s)?;
        let key_code = key_opt.ok_or_else(|| anyhow!("No key specified in hotkey: {}", s))?;
        Ok(Hotkey::new(mods, key_code))
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Hotkey, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum HotkeyRepr {
            Str(String),
            Map {
                modifiers: Modifiers,
                key_code: KeyCode,
            },
        }

        let repr = HotkeyRepr::deserialize(deserializer)?;
        match repr {
            HotkeyRepr::Str(s) => Hotkey::from_str(&s).map_err(serde::de::Error::custom),
            HotkeyRepr::Map { modifiers, key_code } => Ok(Hotkey::new(modifiers, key_code)),
        }
    }
}

/// Pointer buttons by core-protocol number.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum Button {
    Left = 1,
    Middle = 2,
    Right = 3,
    ScrollUp = 4,
    ScrollDown = 5,
}

impl FromStr for Button {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" | "button1" | "1" => Ok(Button::Left),
            "middle" | "button2" | "2" => Ok(Button::Middle),
            "right" | "button3" | "3" => Ok(Button::Right),
            "scroll_up" | "scrollup" | "button4" | "4" => Ok(Button::ScrollUp),
            "scroll_down" | "scrolldown" | "button5" | "5" => Ok(Button::ScrollDown),
            other => Err(anyhow!("Unrecognized button: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Button {
    fn deserialize<D>(deserializer: D) -> Result<Button, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ButtonRepr {
            Number(u8),
            Name(String),
        }

        match ButtonRepr::deserialize(deserializer)? {
            ButtonRepr::Number(n) => Button::try_from(n).map_err(serde::de::Error::custom),
            ButtonRepr::Name(s) => Button::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Where a pointer button was pressed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClickRegion {
    TagBar,
    LayoutSymbol,
    StatusText,
    WindowTitle,
    ClientWindow,
    Root,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifier_combinations() {
        let hotkey: Hotkey = "Alt + Shift + Return".parse().unwrap();
        assert_eq!(hotkey.key_code, KeyCode::Return);
        assert_eq!(hotkey.modifiers, Modifiers::ALT.union(Modifiers::SHIFT));
        assert_eq!(hotkey.modifiers.bits(), 0b1001);
    }

    #[test]
    fn keys_are_case_insensitive_with_aliases() {
        assert_eq!("p".parse::<KeyCode>().unwrap(), KeyCode::P);
        assert_eq!("enter".parse::<KeyCode>().unwrap(), KeyCode::Return);
        assert_eq!("SPACE".parse::<KeyCode>().unwrap(), KeyCode::Space);
        assert_eq!("1".parse::<KeyCode>().unwrap(), KeyCode::Digit1);
        assert!("Hyper".parse::<KeyCode>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let hotkey = Hotkey::new(Modifiers::ALT.union(Modifiers::CONTROL), KeyCode::Digit3);
        assert_eq!(hotkey.to_string(), "Ctrl + Alt + 3");
        assert_eq!(hotkey.to_string().parse::<Hotkey>().unwrap(), hotkey);
    }

    #[test]
    fn rejects_missing_or_duplicate_keys() {
        assert!("Alt + Shift".parse::<Hotkey>().is_err());
        assert!("Alt + j + k".parse::<Hotkey>().is_err());
        assert_eq!(parse_modifiers("Alt").unwrap(), Modifiers::ALT);
        assert_eq!(parse_modifiers("").unwrap(), Modifiers::empty());
        assert!(parse_modifiers("Alt + x").is_err());
    }

    #[test]
    fn clean_strips_lock_and_num_lock() {
        let raw = Modifiers::from_bits(Modifiers::ALT.bits() | Modifiers::LOCK.bits() | 0b1_0000);
        assert_eq!(raw.clean(), Modifiers::ALT);
    }

    #[test]
    fn buttons_from_numbers_and_names() {
        assert_eq!(Button::try_from(3u8).unwrap(), Button::Right);
        assert!(Button::try_from(9u8).is_err());
        assert_eq!("middle".parse::<Button>().unwrap(), Button::Middle);
        let parsed: Button = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Button::Left);
        let parsed: Button = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(parsed, Button::Right);
    }

    #[test]
    fn tag_keys_follow_the_number_row() {
        assert_eq!(KeyCode::for_tag(0), Some(KeyCode::Digit1));
        assert_eq!(KeyCode::for_tag(8), Some(KeyCode::Digit9));
        assert_eq!(KeyCode::for_tag(9), None);
    }
}

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use strum::VariantNames;

use crate::actor::reactor::Command;
use crate::actor::reactor::bindings::{ButtonBinding, KeyBinding};
use crate::layout_engine::{GapValues, LayoutKind};
use crate::model::{MAX_TAGS, MonitorSettings, Rule, TagMask, TagSet};
use crate::sys::bridge::{Appearance, ColorScheme};
use crate::sys::hotkey::{Button, ClickRegion, Hotkey, KeyCode, Modifiers, parse_modifiers};
use crate::sys::process::ExecCmd;
use crate::sys::signal::block_signal_number;

pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
        .unwrap_or_default()
        .join("tagwm")
        .join("config.toml")
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    colors: Colors,
    #[serde(default)]
    layout: LayoutSettings,
    #[serde(default)]
    gaps: GapSettings,
    #[serde(default)]
    tags: TagSettings,
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    keys: Vec<KeyEntry>,
    #[serde(default)]
    tag_keys: TagKeys,
    #[serde(default)]
    buttons: Vec<ButtonEntry>,
    #[serde(default)]
    blocks: BlockSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct KeyEntry {
    key: String,
    command: Command,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct ButtonEntry {
    click: ClickRegion,
    #[serde(default)]
    modifiers: String,
    button: Button,
    command: Command,
}

/// Modifier sets for the per-tag bindings on the number row, as dwm's
/// `TAGKEYS` macro generates them. An absent entry generates nothing.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TagKeys {
    pub view: Option<String>,
    pub toggle_view: Option<String>,
    pub tag: Option<String>,
    pub toggle_tag: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub settings: Settings,
    pub colors: Colors,
    pub layout: LayoutSettings,
    pub gaps: GapSettings,
    pub tags: TagSettings,
    pub rules: Vec<Rule>,
    pub keys: Vec<KeyBinding>,
    pub buttons: Vec<ButtonBinding>,
    pub blocks: BlockSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_border_width")]
    pub border_width: i32,
    #[serde(default = "default_snap")]
    pub snap: i32,
    #[serde(default = "yes")]
    pub show_bar: bool,
    #[serde(default = "yes")]
    pub top_bar: bool,
    #[serde(default = "default_bar_height")]
    pub bar_height: i32,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default = "yes")]
    pub focus_follows_mouse: bool,
    #[serde(default = "no")]
    pub swallow_floating: bool,
    #[serde(default)]
    pub autostart: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            border_width: default_border_width(),
            snap: default_snap(),
            show_bar: true,
            top_bar: true,
            bar_height: default_bar_height(),
            fonts: Vec::new(),
            focus_follows_mouse: true,
            swallow_floating: false,
            autostart: Vec::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.border_width < 0 {
            issues.push(format!("border_width must be non-negative, got {}", self.border_width));
        }
        if self.snap < 0 {
            issues.push(format!("snap must be non-negative, got {}", self.snap));
        }
        if self.bar_height < 0 {
            issues.push(format!("bar_height must be non-negative, got {}", self.bar_height));
        }
        for (i, cmd) in self.autostart.iter().enumerate() {
            if cmd.trim().is_empty() {
                issues.push(format!("autostart command {i} is empty"));
            }
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Colors {
    #[serde(default)]
    pub normal: ColorScheme,
    #[serde(default)]
    pub selected: ColorScheme,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default = "default_master_fraction")]
    pub master_fraction: f64,
    #[serde(default = "default_master_fraction_min")]
    pub master_fraction_min: f64,
    #[serde(default = "default_master_fraction_max")]
    pub master_fraction_max: f64,
    #[serde(default = "default_master_count")]
    pub master_count: usize,
    #[serde(default = "default_layouts")]
    pub default_layouts: [LayoutKind; 2],
    #[serde(default)]
    pub resize_hints: bool,
    #[serde(default = "yes")]
    pub lock_fullscreen: bool,
    #[serde(default)]
    pub symbols: LayoutSymbols,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            master_fraction: default_master_fraction(),
            master_fraction_min: default_master_fraction_min(),
            master_fraction_max: default_master_fraction_max(),
            master_count: default_master_count(),
            default_layouts: default_layouts(),
            resize_hints: false,
            lock_fullscreen: true,
            symbols: LayoutSymbols::default(),
        }
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, value) in [
            ("master_fraction", self.master_fraction),
            ("master_fraction_min", self.master_fraction_min),
            ("master_fraction_max", self.master_fraction_max),
        ] {
            if !(value > 0.0 && value < 1.0) {
                issues.push(format!("{name} must be between 0 and 1, got {value}"));
            }
        }
        if self.master_fraction_min > self.master_fraction_max {
            issues.push(format!(
                "master_fraction_min ({}) is greater than master_fraction_max ({})",
                self.master_fraction_min, self.master_fraction_max
            ));
        } else if self.master_fraction < self.master_fraction_min
            || self.master_fraction > self.master_fraction_max
        {
            issues.push(format!(
                "master_fraction {} is outside [{}, {}] and will be clamped",
                self.master_fraction, self.master_fraction_min, self.master_fraction_max
            ));
        }
        issues
    }
}

/// Bar symbols per layout; absent entries use the built-in symbol.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutSymbols {
    pub monocle: Option<String>,
    pub tile: Option<String>,
    pub spiral: Option<String>,
    pub dwindle: Option<String>,
    pub floating: Option<String>,
}

impl LayoutSymbols {
    pub fn symbol(&self, kind: LayoutKind) -> &str {
        let configured = match kind {
            LayoutKind::Monocle => &self.monocle,
            LayoutKind::Tile => &self.tile,
            LayoutKind::Spiral => &self.spiral,
            LayoutKind::Dwindle => &self.dwindle,
            LayoutKind::Floating => &self.floating,
        };
        configured.as_deref().unwrap_or_else(|| kind.default_symbol())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    #[serde(default)]
    pub inner_horizontal: i32,
    #[serde(default)]
    pub inner_vertical: i32,
    #[serde(default)]
    pub outer_horizontal: i32,
    #[serde(default)]
    pub outer_vertical: i32,
    #[serde(default)]
    pub smart: bool,
}

impl GapSettings {
    pub fn values(&self) -> GapValues {
        GapValues {
            inner_horizontal: self.inner_horizontal,
            inner_vertical: self.inner_vertical,
            outer_horizontal: self.outer_horizontal,
            outer_vertical: self.outer_vertical,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for (name, value) in [
            ("inner_horizontal", self.inner_horizontal),
            ("inner_vertical", self.inner_vertical),
            ("outer_horizontal", self.outer_horizontal),
            ("outer_vertical", self.outer_vertical),
        ] {
            if value < 0 {
                issues.push(format!("gaps.{name} must be non-negative, got {value}"));
            }
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TagSettings {
    #[serde(default = "default_tag_names")]
    pub names: Vec<String>,
}

impl Default for TagSettings {
    fn default() -> Self { TagSettings { names: default_tag_names() } }
}

impl TagSettings {
    pub fn tag_set(&self) -> TagSet { TagSet::new(self.names.clone()) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.names.is_empty() {
            issues.push("At least one tag must be configured".to_string());
        }
        if self.names.len() > MAX_TAGS {
            issues.push(format!(
                "{} tags configured, only the first {MAX_TAGS} are used",
                self.names.len()
            ));
        }
        for (i, name) in self.names.iter().enumerate() {
            if self.names[..i].contains(name) {
                issues.push(format!("Tag name '{name}' is used more than once"));
            }
        }
        issues
    }
}

/// Where the block scheduler publishes the joined status line.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum SinkSettings {
    /// One line per update on stdout.
    #[default]
    Stdout,
    /// Runs the command with `{}` replaced by the status line.
    Command(ExecCmd),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct BlockConfig {
    pub command: String,
    /// Seconds between refreshes; 0 refreshes only at startup and on signal.
    #[serde(default)]
    pub interval: u64,
    /// Refresh on `SIGRTMIN + signal`; 0 means no signal.
    #[serde(default)]
    pub signal: u8,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct BlockSettings {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_max_output_len")]
    pub max_output_len: usize,
    #[serde(default)]
    pub sink: SinkSettings,
    #[serde(default)]
    pub entries: Vec<BlockConfig>,
}

impl Default for BlockSettings {
    fn default() -> Self {
        BlockSettings {
            delimiter: default_delimiter(),
            max_output_len: default_max_output_len(),
            sink: SinkSettings::default(),
            entries: Vec::new(),
        }
    }
}

impl BlockSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.max_output_len == 0 {
            issues.push("blocks.max_output_len must be positive".to_string());
        }
        for (i, block) in self.entries.iter().enumerate() {
            if block.command.trim().is_empty() {
                issues.push(format!("Block {i} has an empty command"));
            }
            if block.signal != 0 && block_signal_number(block.signal).is_err() {
                issues.push(format!(
                    "Block {i} uses signal {} outside the real-time signal range",
                    block.signal
                ));
            }
            if block.interval == 0 && block.signal == 0 {
                issues.push(format!(
                    "Block {i} ('{}') has neither an interval nor a signal and only runs once",
                    block.command
                ));
            }
        }
        if let SinkSettings::Command(cmd) = &self.sink
            && cmd.as_array().is_empty()
        {
            issues.push("blocks.sink command is empty".to_string());
        }
        issues
    }
}

fn yes() -> bool { true }
fn no() -> bool { false }

fn default_border_width() -> i32 { 2 }
fn default_snap() -> i32 { 16 }
fn default_bar_height() -> i32 { 20 }
fn default_master_fraction() -> f64 { 0.55 }
fn default_master_fraction_min() -> f64 { 0.05 }
fn default_master_fraction_max() -> f64 { 0.95 }
fn default_master_count() -> usize { 1 }
fn default_layouts() -> [LayoutKind; 2] { [LayoutKind::Monocle, LayoutKind::Tile] }
fn default_tag_names() -> Vec<String> { (1..=9).map(|i| i.to_string()).collect() }
fn default_delimiter() -> String { "  ".to_string() }
fn default_max_output_len() -> usize { 50 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// Reads the file at `path` when present, the built-in defaults otherwise.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Self::default()) }
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../tagwm.default.toml"))
            .expect("built-in configuration must parse")
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.settings.validate());
        issues.extend(self.layout.validate());
        issues.extend(self.gaps.validate());
        issues.extend(self.tags.validate());
        let tags = self.tags.tag_set();
        for (i, rule) in self.rules.iter().enumerate() {
            issues.extend(rule.validate(i, &tags));
        }
        issues.extend(self.blocks.validate());
        issues
    }

    pub fn tag_set(&self) -> TagSet { self.tags.tag_set() }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            layouts: self.layout.default_layouts,
            initial_tags: TagMask::single(0),
            master_fraction: self.layout.master_fraction,
            fraction_min: self.layout.master_fraction_min,
            fraction_max: self.layout.master_fraction_max,
            master_count: self.layout.master_count,
            gaps: self.gaps.values(),
            smart_gaps: self.gaps.smart,
            show_bar: self.settings.show_bar,
            top_bar: self.settings.top_bar,
            bar_height: self.settings.bar_height,
        }
    }

    pub fn appearance(&self) -> Appearance {
        Appearance {
            fonts: self.settings.fonts.clone(),
            normal: self.colors.normal.clone(),
            selected: self.colors.selected.clone(),
        }
    }

    /// The `TAGKEYS` expansion: for each tag on the number row, one binding
    /// per configured action, in view / toggle_view / tag / toggle_tag order.
    fn expand_tag_keys(tag_keys: &TagKeys, tag_count: usize) -> anyhow::Result<Vec<KeyBinding>> {
        let actions: [(&Option<String>, fn(usize) -> Command); 4] = [
            (&tag_keys.view, Command::view_index),
            (&tag_keys.toggle_view, Command::toggle_view_index),
            (&tag_keys.tag, Command::tag_index),
            (&tag_keys.toggle_tag, Command::toggle_tag_index),
        ];
        let mut parsed = Vec::new();
        for (mods, make) in actions {
            if let Some(mods) = mods {
                let Ok(modifiers) = parse_modifiers(mods) else {
                    bail!("Could not parse tag_keys modifiers: {mods}");
                };
                parsed.push((modifiers, make));
            }
        }
        let mut keys = Vec::new();
        for tag in 0..tag_count {
            let Some(key_code) = KeyCode::for_tag(tag) else { break };
            for (modifiers, make) in &parsed {
                keys.push(KeyBinding {
                    hotkey: Hotkey::new(*modifiers, key_code),
                    command: make(tag),
                });
            }
        }
        Ok(keys)
    }

    fn levenshtein(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut prev: Vec<usize> = (0..=b.len()).collect();
        for (i, ca) in a.iter().enumerate() {
            let mut cur = vec![i + 1; b.len() + 1];
            for (j, cb) in b.iter().enumerate() {
                let cost = usize::from(ca != cb);
                cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
            }
            prev = cur;
        }
        prev[b.len()]
    }

    // Pulls the token out of serde's "unknown variant `...`" message.
    fn extract_unknown_variant(err: &str) -> Option<&str> {
        let needle = "unknown variant `";
        let start = err.find(needle)? + needle.len();
        let rest = &err[start..];
        rest.find('`').map(|end| &rest[..end])
    }

    /// The closest command name, if it is close enough to be a likely typo.
    fn suggest_similar_command(unknown: &str) -> Option<&'static str> {
        let unknown = unknown.to_lowercase();
        let (best, dist) = Command::VARIANTS
            .iter()
            .map(|cand| (*cand, Self::levenshtein(&unknown, cand)))
            .min_by_key(|(_, dist)| *dist)?;
        let threshold = std::cmp::max(3usize, best.len() / 2);
        (dist <= threshold).then_some(best)
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c = match toml::from_str::<ConfigFile>(buf) {
            Ok(c) => c,
            Err(e) => {
                let msg = e.to_string();
                if let Some(unknown) = Self::extract_unknown_variant(&msg)
                    && let Some(suggestion) = Self::suggest_similar_command(unknown)
                {
                    bail!("{msg}\nDid you mean `{suggestion}`?");
                }
                bail!("{msg}");
            }
        };

        let mut keys = Vec::new();
        for entry in c.keys {
            let Ok(hotkey) = Hotkey::from_str(&entry.key) else {
                bail!("Could not parse hotkey: {}", entry.key);
            };
            keys.push(KeyBinding { hotkey, command: entry.command });
        }
        keys.extend(Self::expand_tag_keys(&c.tag_keys, c.tags.tag_set().len())?);

        let mut buttons = Vec::new();
        for entry in c.buttons {
            let modifiers = if entry.modifiers.trim().is_empty() {
                Modifiers::empty()
            } else {
                let Ok(modifiers) = parse_modifiers(&entry.modifiers) else {
                    bail!("Could not parse button modifiers: {}", entry.modifiers);
                };
                modifiers
            };
            buttons.push(ButtonBinding {
                region: entry.click,
                modifiers,
                button: entry.button,
                command: entry.command,
            });
        }

        Ok(Config {
            settings: c.settings,
            colors: c.colors,
            layout: c.layout,
            gaps: c.gaps,
            tags: c.tags,
            rules: c.rules,
            keys,
            buttons,
            blocks: c.blocks,
        })
    }
}

//! Ordered key and button tables.
//!
//! Lookups are linear scans: the tables are small and every matching entry
//! runs, in table order.

use serde::{Deserialize, Serialize};

use super::Command;
use crate::sys::hotkey::{Button, ClickRegion, Hotkey, KeyCode, Modifiers};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub hotkey: Hotkey,
    pub command: Command,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ButtonBinding {
    pub region: ClickRegion,
    pub modifiers: Modifiers,
    pub button: Button,
    pub command: Command,
}

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    keys: Vec<KeyBinding>,
    buttons: Vec<ButtonBinding>,
}

impl Bindings {
    pub fn new(keys: Vec<KeyBinding>, buttons: Vec<ButtonBinding>) -> Self {
        let keys = keys
            .into_iter()
            .map(|b| KeyBinding {
                hotkey: Hotkey::new(b.hotkey.modifiers.clean(), b.hotkey.key_code),
                command: b.command,
            })
            .collect();
        let buttons = buttons
            .into_iter()
            .map(|b| ButtonBinding { modifiers: b.modifiers.clean(), ..b })
            .collect();
        Self { keys, buttons }
    }

    pub fn keys(&self) -> &[KeyBinding] { &self.keys }

    pub fn buttons(&self) -> &[ButtonBinding] { &self.buttons }

    /// Commands bound to the key, ignoring Lock and NumLock.
    pub fn key_commands(&self, modifiers: Modifiers, key: KeyCode) -> Vec<Command> {
        let modifiers = modifiers.clean();
        self.keys
            .iter()
            .filter(|b| b.hotkey.key_code == key && b.hotkey.modifiers == modifiers)
            .map(|b| b.command.clone())
            .collect()
    }

    /// Commands bound to the click. On the tag bar, `clicked` tag arguments
    /// become the tag under the pointer.
    pub fn button_commands(
        &self,
        region: ClickRegion,
        modifiers: Modifiers,
        button: Button,
        tag: Option<usize>,
    ) -> Vec<Command> {
        let modifiers = modifiers.clean();
        self.buttons
            .iter()
            .filter(|b| b.region == region && b.button == button && b.modifiers == modifiers)
            .map(|b| match (region, tag) {
                (ClickRegion::TagBar, Some(tag)) => b.command.with_clicked_tag(tag),
                _ => b.command.clone(),
            })
            .collect()
    }
}

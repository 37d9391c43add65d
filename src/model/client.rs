use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::model::monitor::MonitorId;
use crate::model::tags::TagMask;
use crate::sys::geometry::Rect;

slotmap::new_key_type! {
    pub struct ClientId;
}

/// Opaque window handle assigned by the display server.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[serde(transparent)]
    pub struct ClientFlags: u16 {
        const FLOATING = 1 << 0;
        const FIXED = 1 << 1;
        const FULLSCREEN = 1 << 2;
        const URGENT = 1 << 3;
        const NEVER_FOCUS = 1 << 4;
        const TERMINAL = 1 << 5;
        const NO_SWALLOW = 1 << 6;
        /// Hidden behind a swallowing child.
        const HIDDEN = 1 << 7;
        const MAPPED = 1 << 8;
    }
}

/// WM_NORMAL_HINTS subset. Zero means unset.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SizeHints {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl SizeHints {
    pub fn is_fixed(&self) -> bool {
        self.max_width > 0
            && self.max_height > 0
            && self.max_width == self.min_width
            && self.max_height == self.min_height
    }

    pub fn constrain(&self, width: i32, height: i32) -> (i32, i32) {
        let mut width = width.max(self.min_width).max(1);
        let mut height = height.max(self.min_height).max(1);
        if self.max_width > 0 {
            width = width.min(self.max_width);
        }
        if self.max_height > 0 {
            height = height.min(self.max_height);
        }
        (width, height)
    }
}

/// What the display server reports about a newly created window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct WindowInfo {
    pub window: WindowHandle,
    pub pid: Option<u32>,
    pub class: String,
    pub instance: String,
    pub title: String,
    pub geometry: Rect,
    pub hints: SizeHints,
    /// Transient-for or dialog windows float regardless of rules.
    pub transient: bool,
    pub fullscreen: bool,
    pub never_focus: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub window: WindowHandle,
    pub pid: Option<u32>,
    pub class: String,
    pub instance: String,
    pub title: String,
    /// Outer origin, inner size (border excluded).
    pub geometry: Rect,
    pub saved_geometry: Rect,
    pub border_width: i32,
    pub saved_border_width: i32,
    pub tags: TagMask,
    pub flags: ClientFlags,
    pub hints: SizeHints,
    pub monitor: MonitorId,
}

impl Client {
    pub fn new(info: WindowInfo, monitor: MonitorId, tags: TagMask, border_width: i32) -> Self {
        let mut flags = ClientFlags::empty();
        flags.set(ClientFlags::FIXED, info.hints.is_fixed());
        flags.set(ClientFlags::FLOATING, info.transient || info.hints.is_fixed());
        flags.set(ClientFlags::NEVER_FOCUS, info.never_focus);
        Client {
            window: info.window,
            pid: info.pid,
            class: info.class,
            instance: info.instance,
            title: info.title,
            geometry: info.geometry,
            saved_geometry: info.geometry,
            border_width,
            saved_border_width: border_width,
            tags,
            flags,
            hints: info.hints,
            monitor,
        }
    }

    pub fn is_floating(&self) -> bool { self.flags.contains(ClientFlags::FLOATING) }

    pub fn is_fullscreen(&self) -> bool { self.flags.contains(ClientFlags::FULLSCREEN) }

    pub fn is_hidden(&self) -> bool { self.flags.contains(ClientFlags::HIDDEN) }

    pub fn is_urgent(&self) -> bool { self.flags.contains(ClientFlags::URGENT) }

    pub fn is_terminal(&self) -> bool { self.flags.contains(ClientFlags::TERMINAL) }

    pub fn is_visible_on(&self, mask: TagMask) -> bool { !self.is_hidden() && self.tags.intersects(mask) }

    /// Visible, tiled and not fullscreen.
    pub fn is_arrangeable_on(&self, mask: TagMask) -> bool {
        self.is_visible_on(mask) && !self.is_floating() && !self.is_fullscreen()
    }

    /// The rectangle including the border on every side.
    pub fn outer_rect(&self) -> Rect {
        Rect::new(
            self.geometry.x,
            self.geometry.y,
            self.geometry.width + 2 * self.border_width,
            self.geometry.height + 2 * self.border_width,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> WindowInfo {
        WindowInfo {
            window: WindowHandle(7),
            class: "St".into(),
            geometry: Rect::new(10, 20, 300, 200),
            ..Default::default()
        }
    }

    #[test]
    fn outer_rect_adds_border() {
        let client = Client::new(info(), MonitorId(0), TagMask::single(0), 2);
        assert_eq!(client.outer_rect(), Rect::new(10, 20, 304, 204));
    }

    #[test]
    fn fixed_size_windows_float() {
        let mut info = info();
        info.hints = SizeHints {
            min_width: 200,
            min_height: 100,
            max_width: 200,
            max_height: 100,
        };
        let client = Client::new(info, MonitorId(0), TagMask::single(0), 2);
        assert!(client.flags.contains(ClientFlags::FIXED));
        assert!(client.is_floating());
    }

    #[test]
    fn hidden_clients_are_not_visible() {
        let mut client = Client::new(info(), MonitorId(0), TagMask::single(1), 2);
        assert!(client.is_visible_on(TagMask::from_bits(0b10)));
        assert!(!client.is_visible_on(TagMask::single(0)));
        client.flags.insert(ClientFlags::HIDDEN);
        assert!(!client.is_visible_on(TagMask::from_bits(0b10)));
    }

    #[test]
    fn floating_and_fullscreen_are_not_arrangeable() {
        let mut client = Client::new(info(), MonitorId(0), TagMask::single(0), 2);
        assert!(client.is_arrangeable_on(TagMask::single(0)));
        client.flags.insert(ClientFlags::FULLSCREEN);
        assert!(!client.is_arrangeable_on(TagMask::single(0)));
        client.flags.remove(ClientFlags::FULLSCREEN);
        client.flags.insert(ClientFlags::FLOATING);
        assert!(!client.is_arrangeable_on(TagMask::single(0)));
    }

    #[test]
    fn size_hints_constrain() {
        let hints = SizeHints {
            min_width: 100,
            min_height: 50,
            max_width: 400,
            max_height: 0,
        };
        assert_eq!(hints.constrain(20, 20), (100, 50));
        assert_eq!(hints.constrain(900, 900), (400, 900));
    }
}

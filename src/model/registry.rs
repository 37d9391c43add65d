use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::model::client::{Client, ClientFlags, ClientId, WindowHandle};
use crate::model::monitor::MonitorId;
use crate::model::swallow::{SwallowLink, SwallowLinks};
use crate::model::tags::TagMask;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Window {0:?} is already managed")]
    DuplicateWindow(WindowHandle),
    #[error("Client tag mask must not be empty")]
    EmptyTagMask,
    #[error("Unknown monitor: {0:?}")]
    UnknownMonitor(MonitorId),
    #[error("Client not found: {0:?}")]
    ClientNotFound(ClientId),
    #[error("Client {0:?} is already part of a swallow")]
    AlreadySwallowing(ClientId),
}

/// Per-monitor orderings. Both hold exactly the monitor's non-hidden clients.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stacks {
    /// Arrangement order; index 0 is the master.
    pub tiling: Vec<ClientId>,
    /// Most recently focused first.
    pub focus: Vec<ClientId>,
}

impl Stacks {
    fn detach(&mut self, id: ClientId) -> (Option<usize>, Option<usize>) {
        let tiling = self.tiling.iter().position(|c| *c == id);
        let focus = self.focus.iter().position(|c| *c == id);
        if let Some(i) = tiling {
            self.tiling.remove(i);
        }
        if let Some(i) = focus {
            self.focus.remove(i);
        }
        (tiling, focus)
    }

    fn replace(&mut self, old: ClientId, new: ClientId) {
        for slot in self.tiling.iter_mut().chain(self.focus.iter_mut()) {
            if *slot == old {
                *slot = new;
            }
        }
    }
}

/// Owns every managed client and its position in the per-monitor stacks.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: SlotMap<ClientId, Client>,
    by_window: HashMap<WindowHandle, ClientId>,
    stacks: Vec<Stacks>,
    swallow: SwallowLinks,
}

impl ClientRegistry {
    pub fn new(monitor_count: usize) -> Self {
        let mut registry = Self::default();
        registry.set_monitor_count(monitor_count);
        registry
    }

    /// Clients of monitors that disappear are appended to the last remaining one.
    pub fn set_monitor_count(&mut self, count: usize) {
        let count = count.max(1);
        if count >= self.stacks.len() {
            self.stacks.resize_with(count, Stacks::default);
            return;
        }
        let orphans: Vec<Stacks> = self.stacks.drain(count..).collect();
        let target = MonitorId(count - 1);
        for orphan in orphans {
            for id in &orphan.tiling {
                if let Some(client) = self.clients.get_mut(*id) {
                    client.monitor = target;
                }
                // hidden terminals sit in no stack and follow their child
                if let Some(terminal) = self.swallow.terminal_of(*id)
                    && let Some(client) = self.clients.get_mut(terminal)
                {
                    client.monitor = target;
                }
            }
            let stacks = &mut self.stacks[target.0];
            stacks.tiling.extend(orphan.tiling);
            stacks.focus.extend(orphan.focus);
        }
    }

    pub fn monitor_count(&self) -> usize { self.stacks.len() }

    pub fn get(&self, id: ClientId) -> Option<&Client> { self.clients.get(id) }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> { self.clients.get_mut(id) }

    pub fn lookup(&self, window: WindowHandle) -> Option<ClientId> {
        self.by_window.get(&window).copied()
    }

    pub fn len(&self) -> usize { self.clients.len() }

    pub fn is_empty(&self) -> bool { self.clients.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> { self.clients.iter() }

    pub fn swallow_links(&self) -> &SwallowLinks { &self.swallow }

    fn stacks(&self, monitor: MonitorId) -> Option<&Stacks> { self.stacks.get(monitor.0) }

    /// Inserts at the head of both stacks of the client's monitor.
    pub fn register(&mut self, client: Client) -> Result<ClientId, RegistryError> {
        if self.by_window.contains_key(&client.window) {
            return Err(RegistryError::DuplicateWindow(client.window));
        }
        if client.tags.is_empty() {
            return Err(RegistryError::EmptyTagMask);
        }
        let monitor = client.monitor;
        if monitor.0 >= self.stacks.len() {
            return Err(RegistryError::UnknownMonitor(monitor));
        }
        let window = client.window;
        let id = self.clients.insert(client);
        self.by_window.insert(window, id);
        let stacks = &mut self.stacks[monitor.0];
        stacks.tiling.insert(0, id);
        stacks.focus.insert(0, id);
        trace!(?id, ?window, ?monitor, "Registered client");
        Ok(id)
    }

    /// Removes the client and resolves any swallow it takes part in.
    ///
    /// When a swallowing child goes away, its hidden terminal takes back the
    /// child's stack positions, tags and monitor; the caller remaps it. When a
    /// hidden terminal goes away first, the link is simply dropped.
    pub fn unregister(&mut self, id: ClientId) -> Option<(Client, Option<SwallowLink>)> {
        let monitor = self.clients.get(id)?.monitor;
        let link = self.swallow.remove(id);
        match link {
            Some(link) if link.child == id => {
                let tags = self.clients[id].tags;
                if let Some(stacks) = self.stacks.get_mut(monitor.0) {
                    stacks.replace(id, link.terminal);
                }
                if let Some(terminal) = self.clients.get_mut(link.terminal) {
                    terminal.flags.remove(ClientFlags::HIDDEN);
                    terminal.monitor = monitor;
                    terminal.tags = tags;
                }
                debug!(terminal = ?link.terminal, child = ?id, "Restored swallowed terminal");
            }
            _ => {
                if let Some(stacks) = self.stacks.get_mut(monitor.0) {
                    stacks.detach(id);
                }
            }
        }
        let client = self.clients.remove(id)?;
        self.by_window.remove(&client.window);
        Some((client, link))
    }

    /// Rejects the empty mask and keeps the prior one.
    pub fn set_tags(&mut self, id: ClientId, mask: TagMask) -> bool {
        if mask.is_empty() {
            debug!(?id, "Refusing to clear every tag of a client");
            return false;
        }
        match self.clients.get_mut(id) {
            Some(client) if client.tags != mask => {
                client.tags = mask;
                true
            }
            _ => false,
        }
    }

    pub fn toggle_tags(&mut self, id: ClientId, mask: TagMask) -> bool {
        let Some(current) = self.clients.get(id).map(|c| c.tags) else {
            return false;
        };
        self.set_tags(id, current ^ mask)
    }

    /// Fixed-size clients always stay floating. Refused while fullscreen.
    pub fn toggle_floating(&mut self, id: ClientId) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.is_fullscreen() {
            return false;
        }
        let floating = !client.is_floating() || client.flags.contains(ClientFlags::FIXED);
        let changed = floating != client.is_floating();
        client.flags.set(ClientFlags::FLOATING, floating);
        changed
    }

    /// Saves geometry and border on entry, restores them on exit.
    pub fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) -> bool {
        let Some(client) = self.clients.get_mut(id) else {
            return false;
        };
        if client.is_fullscreen() == fullscreen {
            return false;
        }
        if fullscreen {
            client.saved_geometry = client.geometry;
            client.saved_border_width = client.border_width;
            client.border_width = 0;
        } else {
            client.geometry = client.saved_geometry;
            client.border_width = client.saved_border_width;
        }
        client.flags.set(ClientFlags::FULLSCREEN, fullscreen);
        true
    }

    /// Moves the client to the front of the tiling order. Focus order is untouched.
    pub fn raise_to_master(&mut self, id: ClientId) {
        let Some(monitor) = self.clients.get(id).map(|c| c.monitor) else {
            return;
        };
        if let Some(stacks) = self.stacks.get_mut(monitor.0)
            && let Some(pos) = stacks.tiling.iter().position(|c| *c == id)
        {
            let id = stacks.tiling.remove(pos);
            stacks.tiling.insert(0, id);
        }
    }

    pub fn focus_push(&mut self, id: ClientId) {
        let Some(monitor) = self.clients.get(id).map(|c| c.monitor) else {
            return;
        };
        if let Some(stacks) = self.stacks.get_mut(monitor.0)
            && let Some(pos) = stacks.focus.iter().position(|c| *c == id)
        {
            let id = stacks.focus.remove(pos);
            stacks.focus.insert(0, id);
        }
    }

    /// The client `direction` steps away from `current` among the visible
    /// clients in focus order, wrapping around. `None` when at most one client
    /// is visible.
    pub fn focus_step(
        &self,
        monitor: MonitorId,
        mask: TagMask,
        current: Option<ClientId>,
        direction: i32,
    ) -> Option<ClientId> {
        let visible: Vec<ClientId> = self
            .stacks(monitor)?
            .focus
            .iter()
            .copied()
            .filter(|id| self.clients.get(*id).is_some_and(|c| c.is_visible_on(mask)))
            .collect();
        if visible.len() <= 1 {
            return None;
        }
        let Some(pos) = current.and_then(|cur| visible.iter().position(|id| *id == cur)) else {
            return visible.first().copied();
        };
        let len = visible.len() as i64;
        let next = (pos as i64 + i64::from(direction)).rem_euclid(len) as usize;
        Some(visible[next])
    }

    pub fn tiling_order(&self, monitor: MonitorId) -> &[ClientId] {
        self.stacks(monitor).map(|s| s.tiling.as_slice()).unwrap_or_default()
    }

    pub fn focus_order(&self, monitor: MonitorId) -> &[ClientId] {
        self.stacks(monitor).map(|s| s.focus.as_slice()).unwrap_or_default()
    }

    /// Clients visible under `mask`, in tiling order.
    pub fn visible(&self, monitor: MonitorId, mask: TagMask) -> impl Iterator<Item = ClientId> + '_ {
        self.tiling_order(monitor)
            .iter()
            .copied()
            .filter(move |id| self.clients.get(*id).is_some_and(|c| c.is_visible_on(mask)))
    }

    /// Visible, tiled, non-fullscreen clients in tiling order.
    pub fn arrangeable(&self, monitor: MonitorId, mask: TagMask) -> Vec<ClientId> {
        self.tiling_order(monitor)
            .iter()
            .copied()
            .filter(|id| self.clients.get(*id).is_some_and(|c| c.is_arrangeable_on(mask)))
            .collect()
    }

    pub fn first_visible_in_focus_order(&self, monitor: MonitorId, mask: TagMask) -> Option<ClientId> {
        self.focus_order(monitor)
            .iter()
            .copied()
            .find(|id| self.clients.get(*id).is_some_and(|c| c.is_visible_on(mask)))
    }

    /// Moves the client to the head of `target`'s stacks with the given tags.
    pub fn send_to_monitor(
        &mut self,
        id: ClientId,
        target: MonitorId,
        tags: TagMask,
    ) -> Result<(), RegistryError> {
        if target.0 >= self.stacks.len() {
            return Err(RegistryError::UnknownMonitor(target));
        }
        if tags.is_empty() {
            return Err(RegistryError::EmptyTagMask);
        }
        let client = self.clients.get_mut(id).ok_or(RegistryError::ClientNotFound(id))?;
        let source = client.monitor;
        client.monitor = target;
        client.tags = tags;
        if let Some(stacks) = self.stacks.get_mut(source.0) {
            stacks.detach(id);
        }
        let stacks = &mut self.stacks[target.0];
        stacks.tiling.insert(0, id);
        stacks.focus.insert(0, id);
        Ok(())
    }

    /// Hides `terminal` behind `child`: the child takes the terminal's stack
    /// positions, geometry, tags and monitor. The caller unmaps the terminal.
    pub fn swap_in(&mut self, terminal: ClientId, child: ClientId) -> Result<(), RegistryError> {
        let term = self.clients.get(terminal).ok_or(RegistryError::ClientNotFound(terminal))?;
        let (geometry, tags, monitor) = (term.geometry, term.tags, term.monitor);
        let child_monitor =
            self.clients.get(child).ok_or(RegistryError::ClientNotFound(child))?.monitor;
        if !self.swallow.insert(SwallowLink { terminal, child }) {
            return Err(RegistryError::AlreadySwallowing(terminal));
        }
        if let Some(stacks) = self.stacks.get_mut(child_monitor.0) {
            stacks.detach(child);
        }
        if let Some(stacks) = self.stacks.get_mut(monitor.0) {
            stacks.replace(terminal, child);
        }
        if let Some(c) = self.clients.get_mut(child) {
            c.geometry = geometry;
            c.tags = tags;
            c.monitor = monitor;
        }
        if let Some(t) = self.clients.get_mut(terminal) {
            t.flags.insert(ClientFlags::HIDDEN);
        }
        debug!(?terminal, ?child, "Terminal swallowed child");
        Ok(())
    }
}

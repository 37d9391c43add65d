//! Terminal swallowing.
//!
//! A terminal that launches a graphical child is hidden while the child lives,
//! and the child takes over the terminal's place in both stacks. The pairing
//! is an ID relation kept by the registry; the registry performs the stack
//! surgery in [`ClientRegistry::swap_in`] and on unregister.

use crate::common::collections::HashMap;
use crate::model::client::ClientId;
use crate::model::registry::ClientRegistry;
use crate::sys::process::ProcessTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwallowLink {
    pub terminal: ClientId,
    pub child: ClientId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwallowPolicy {
    pub swallow_floating: bool,
}

/// Both directions of every active swallow. A client appears in at most one
/// link.
#[derive(Debug, Default, Clone)]
pub struct SwallowLinks {
    by_terminal: HashMap<ClientId, ClientId>,
    by_child: HashMap<ClientId, ClientId>,
}

impl SwallowLinks {
    pub fn insert(&mut self, link: SwallowLink) -> bool {
        if self.involves(link.terminal) || self.involves(link.child) {
            return false;
        }
        self.by_terminal.insert(link.terminal, link.child);
        self.by_child.insert(link.child, link.terminal);
        true
    }

    pub fn terminal_of(&self, child: ClientId) -> Option<ClientId> {
        self.by_child.get(&child).copied()
    }

    pub fn involves(&self, id: ClientId) -> bool {
        self.by_terminal.contains_key(&id) || self.by_child.contains_key(&id)
    }

    /// Removes the link `id` takes part in, on either side.
    pub fn remove(&mut self, id: ClientId) -> Option<SwallowLink> {
        let link = if let Some(child) = self.by_terminal.get(&id).copied() {
            SwallowLink { terminal: id, child }
        } else if let Some(terminal) = self.by_child.get(&id).copied() {
            SwallowLink { terminal, child: id }
        } else {
            return None;
        };
        self.by_terminal.remove(&link.terminal);
        self.by_child.remove(&link.child);
        Some(link)
    }

    pub fn is_empty(&self) -> bool { self.by_terminal.is_empty() }
}

/// Finds the terminal that should swallow the freshly registered `child`:
/// the nearest process ancestor that owns an eligible terminal.
pub fn find_swallower(
    registry: &ClientRegistry,
    child: ClientId,
    processes: &dyn ProcessTree,
    policy: SwallowPolicy,
) -> Option<ClientId> {
    let client = registry.get(child)?;
    if client.is_terminal()
        || client.flags.contains(crate::model::client::ClientFlags::NO_SWALLOW)
        || (client.is_floating() && !policy.swallow_floating)
    {
        return None;
    }
    let child_pid = client.pid?;
    let terminals: Vec<(ClientId, u32)> = registry
        .iter()
        .filter(|(id, terminal)| {
            *id != child
                && terminal.is_terminal()
                && !terminal.is_hidden()
                && !registry.swallow_links().involves(*id)
        })
        .filter_map(|(id, terminal)| terminal.pid.map(|pid| (id, pid)))
        .collect();
    if terminals.is_empty() {
        return None;
    }
    processes.ancestry(child_pid).into_iter().find_map(|pid| {
        terminals.iter().find(|(_, terminal_pid)| *terminal_pid == pid).map(|(id, _)| *id)
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::client::{Client, ClientFlags, WindowHandle, WindowInfo};
    use crate::model::monitor::MonitorId;
    use crate::model::tags::TagMask;
    use crate::sys::geometry::Rect;

    /// pid -> parent pid
    struct FakeTree(Vec<(u32, u32)>);

    impl ProcessTree for FakeTree {
        fn parent(&self, pid: u32) -> Option<u32> {
            self.0.iter().find(|(p, _)| *p == pid).map(|(_, parent)| *parent)
        }
    }

    fn tree() -> FakeTree { FakeTree(vec![(300, 200), (200, 100), (100, 1)]) }

    fn client(window: u64, pid: u32, terminal: bool) -> Client {
        let mut c = Client::new(
            WindowInfo {
                window: WindowHandle(window),
                pid: Some(pid),
                geometry: Rect::new(0, 0, 100, 100),
                ..Default::default()
            },
            MonitorId(0),
            TagMask::single(0),
            2,
        );
        c.flags.set(ClientFlags::TERMINAL, terminal);
        c
    }

    fn registry() -> ClientRegistry {
        let mut registry = ClientRegistry::default();
        registry.set_monitor_count(1);
        registry
    }

    #[test]
    fn descendant_of_terminal_is_swallowed() {
        let mut registry = registry();
        let term = registry.register(client(1, 100, true)).unwrap();
        let child = registry.register(client(2, 300, false)).unwrap();
        assert_eq!(find_swallower(&registry, child, &tree(), SwallowPolicy::default()), Some(term));
    }

    #[test]
    fn the_nearest_terminal_ancestor_swallows() {
        let mut registry = registry();
        registry.register(client(1, 100, true)).unwrap();
        let inner = registry.register(client(2, 200, true)).unwrap();
        let child = registry.register(client(3, 300, false)).unwrap();
        assert_eq!(find_swallower(&registry, child, &tree(), SwallowPolicy::default()), Some(inner));
    }

    #[test]
    fn unrelated_process_is_not_swallowed() {
        let mut registry = registry();
        registry.register(client(1, 100, true)).unwrap();
        let child = registry.register(client(2, 999, false)).unwrap();
        assert_eq!(find_swallower(&registry, child, &tree(), SwallowPolicy::default()), None);
    }

    #[test]
    fn terminals_and_no_swallow_clients_are_never_swallowed() {
        let mut registry = registry();
        registry.register(client(1, 100, true)).unwrap();
        let nested = registry.register(client(2, 200, true)).unwrap();
        assert_eq!(find_swallower(&registry, nested, &tree(), SwallowPolicy::default()), None);

        let mut excluded = client(3, 300, false);
        excluded.flags.insert(ClientFlags::NO_SWALLOW);
        let excluded = registry.register(excluded).unwrap();
        assert_eq!(find_swallower(&registry, excluded, &tree(), SwallowPolicy::default()), None);
    }

    #[test]
    fn floating_children_need_the_policy() {
        let mut registry = registry();
        let term = registry.register(client(1, 100, true)).unwrap();
        let mut floating = client(2, 300, false);
        floating.flags.insert(ClientFlags::FLOATING);
        let child = registry.register(floating).unwrap();
        assert_eq!(find_swallower(&registry, child, &tree(), SwallowPolicy::default()), None);
        let policy = SwallowPolicy { swallow_floating: true };
        assert_eq!(find_swallower(&registry, child, &tree(), policy), Some(term));
    }

    #[test]
    fn a_terminal_swallows_at_most_one_child() {
        let mut registry = registry();
        let term = registry.register(client(1, 100, true)).unwrap();
        let first = registry.register(client(2, 300, false)).unwrap();
        registry.swap_in(term, first).unwrap();
        let second = registry.register(client(3, 300, false)).unwrap();
        assert_eq!(find_swallower(&registry, second, &tree(), SwallowPolicy::default()), None);
    }

    #[test]
    fn links_are_exclusive() {
        let mut registry = registry();
        let a = registry.register(client(1, 1, true)).unwrap();
        let b = registry.register(client(2, 2, false)).unwrap();
        let c = registry.register(client(3, 3, false)).unwrap();
        let mut links = SwallowLinks::default();
        assert!(links.insert(SwallowLink { terminal: a, child: b }));
        assert!(!links.insert(SwallowLink { terminal: a, child: c }));
        assert!(!links.insert(SwallowLink { terminal: c, child: b }));
        assert_eq!(links.remove(b), Some(SwallowLink { terminal: a, child: b }));
        assert!(links.is_empty());
    }
}

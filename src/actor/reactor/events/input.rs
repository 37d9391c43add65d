use tracing::{debug, trace, warn};

use crate::actor::reactor::events::command::CommandEventHandler;
use crate::actor::reactor::{ButtonPress, ClickContext, Command, DragKind, Reactor};
use crate::model::{ClientId, MonitorId, WindowHandle};
use crate::sys::geometry::{Point, Rect};
use crate::sys::hotkey::{Button, ClickRegion, KeyCode, Modifiers};

pub struct InputEventHandler;

impl InputEventHandler {
    pub fn handle_key_press(reactor: &mut Reactor, modifiers: Modifiers, key: KeyCode) {
        let commands = reactor.bindings.key_commands(modifiers, key);
        if commands.is_empty() {
            trace!(?modifiers, %key, "Unbound key");
        }
        Self::run_all(reactor, &commands, ClickContext::default());
    }

    pub fn handle_button_press(reactor: &mut Reactor, press: ButtonPress) {
        let monitor = match press.region {
            ClickRegion::ClientWindow => None,
            ClickRegion::Root => Some(reactor.monitor_at(press.position)),
            _ => press.monitor,
        };
        if let Some(monitor) = monitor
            && monitor != reactor.selected_monitor
            && reactor.monitor(monitor).is_some()
        {
            if let Some(selected) = reactor.selected_client() {
                reactor.unfocus(selected);
            }
            reactor.selected_monitor = monitor;
            reactor.focus(None);
        }

        let client = match press.region {
            ClickRegion::ClientWindow => press.window.and_then(|w| reactor.registry.lookup(w)),
            _ => None,
        };
        if let Some(id) = client {
            reactor.focus(Some(id));
            let monitor = reactor.selected_monitor;
            reactor.restack(monitor);
        }

        let commands =
            reactor.bindings.button_commands(press.region, press.modifiers, press.button, press.tag);
        let context = ClickContext {
            client,
            block: press.block,
            position: press.position,
        };
        Self::run_all(reactor, &commands, context);
    }

    /// Ends a drag. A client dropped onto another monitor moves there.
    pub fn handle_button_release(reactor: &mut Reactor, button: Button, position: Point) {
        let Some(drag) = reactor.drag.take() else {
            return;
        };
        trace!(?button, ?position, kind = ?drag.kind, "Drag finished");
        let Some(client) = reactor.registry.get(drag.client) else {
            return;
        };
        let source = client.monitor;
        let target = reactor.monitor_at(client.geometry.center());
        if target == source {
            return;
        }
        let Some(tags) = reactor.monitor(target).map(|m| m.tags()) else {
            return;
        };
        if let Err(e) = reactor.registry.send_to_monitor(drag.client, target, tags) {
            warn!("Could not move dropped client: {e}");
            return;
        }
        if let Some(mon) = reactor.monitor_mut(source)
            && mon.selected == Some(drag.client)
        {
            mon.selected = None;
        }
        debug!(client = ?drag.client, ?source, ?target, "Client dropped on another monitor");
        reactor.selected_monitor = target;
        reactor.focus(Some(drag.client));
        reactor.arrange(None);
    }

    pub fn handle_pointer_motion(reactor: &mut Reactor, position: Point) {
        let Some(drag) = reactor.drag else {
            let monitor = reactor.monitor_at(position);
            if monitor != reactor.selected_monitor {
                if let Some(selected) = reactor.selected_client() {
                    reactor.unfocus(selected);
                }
                reactor.selected_monitor = monitor;
                reactor.focus(None);
            }
            return;
        };
        let Some(client) = reactor.registry.get(drag.client) else {
            reactor.drag = None;
            return;
        };
        let monitor = client.monitor;
        let border = client.border_width;
        let current = client.geometry;
        let floating = client.is_floating();
        let area = reactor.monitor(monitor).map(|m| m.work_area()).unwrap_or_default();
        let snap = reactor.config.settings.snap;
        let dx = position.x - drag.start_pointer.x;
        let dy = position.y - drag.start_pointer.y;

        let start = drag.start_geometry;
        let rect = match drag.kind {
            DragKind::Move => {
                let outer_w = start.width + 2 * border;
                let outer_h = start.height + 2 * border;
                let x = snap_edge(start.x + dx, outer_w, area.x, area.max_x(), snap);
                let y = snap_edge(start.y + dy, outer_h, area.y, area.max_y(), snap);
                Rect::new(x, y, start.width, start.height)
            }
            DragKind::Resize => Rect::new(
                start.x,
                start.y,
                (start.width + dx).max(1),
                (start.height + dy).max(1),
            ),
        };

        let tiled_layout = reactor.is_tiled_layout(monitor);
        if !floating && tiled_layout && moved_past(current, rect, snap) {
            Self::float_dragged(reactor, drag.client, monitor);
        }
        let floating = reactor.registry.get(drag.client).is_some_and(|c| c.is_floating());
        if floating || !tiled_layout {
            reactor.resize(drag.client, rect, true);
        }
    }

    fn float_dragged(reactor: &mut Reactor, id: ClientId, monitor: MonitorId) {
        if reactor.registry.toggle_floating(id) {
            debug!(client = ?id, "Dragged client now floats");
            reactor.arrange(Some(monitor));
        }
    }

    /// Focus follows the pointer into windows and across monitors.
    pub fn handle_pointer_enter(
        reactor: &mut Reactor,
        window: Option<WindowHandle>,
        position: Point,
    ) {
        if !reactor.config.settings.focus_follows_mouse || reactor.drag.is_some() {
            return;
        }
        let client = window.and_then(|w| reactor.registry.lookup(w));
        let monitor = client
            .and_then(|id| reactor.registry.get(id))
            .map(|c| c.monitor)
            .unwrap_or_else(|| reactor.monitor_at(position));
        if monitor != reactor.selected_monitor {
            if let Some(selected) = reactor.selected_client() {
                reactor.unfocus(selected);
            }
            reactor.selected_monitor = monitor;
        } else if client.is_none() || client == reactor.selected_client() {
            return;
        }
        reactor.focus(client);
    }

    fn run_all(reactor: &mut Reactor, commands: &[Command], context: ClickContext) {
        for command in commands {
            if let Err(e) = CommandEventHandler::handle_command(reactor, command, context) {
                e.log();
            }
        }
    }
}

/// Snaps the leading or trailing edge of a span to the area edge when within
/// `snap` pixels.
fn snap_edge(start: i32, len: i32, min: i32, max: i32, snap: i32) -> i32 {
    if (min - start).abs() < snap {
        min
    } else if (max - (start + len)).abs() < snap {
        max - len
    } else {
        start
    }
}

fn moved_past(current: Rect, next: Rect, snap: i32) -> bool {
    (next.x - current.x).abs() > snap
        || (next.y - current.y).abs() > snap
        || (next.width - current.width).abs() > snap
        || (next.height - current.height).abs() > snap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapping_pulls_to_the_nearest_edge() {
        assert_eq!(snap_edge(10, 100, 0, 1000, 16), 0);
        assert_eq!(snap_edge(890, 100, 0, 1000, 16), 900);
        assert_eq!(snap_edge(400, 100, 0, 1000, 16), 400);
    }

    #[test]
    fn moved_past_needs_more_than_snap() {
        let r = Rect::new(0, 0, 100, 100);
        assert!(!moved_past(r, Rect::new(16, 0, 100, 100), 16));
        assert!(moved_past(r, Rect::new(17, 0, 100, 100), 16));
        assert!(moved_past(r, Rect::new(0, 0, 100, 120), 16));
    }
}

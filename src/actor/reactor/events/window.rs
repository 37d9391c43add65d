use tracing::{debug, trace, warn};

use crate::actor::reactor::{PropertyChange, Reactor, ReactorError};
use crate::model::{
    Client, ClientFlags, ClientId, Monitor, MonitorId, SwallowPolicy, WindowHandle, WindowInfo,
};
use crate::model::swallow::find_swallower;
use crate::sys::geometry::Rect;

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_window_created(
        reactor: &mut Reactor,
        info: WindowInfo,
    ) -> Result<(), ReactorError> {
        if reactor.registry.lookup(info.window).is_some() {
            trace!(window = ?info.window, "Window already managed");
            return Ok(());
        }

        let outcome = reactor.rules.apply(&info.class, &info.instance, &info.title);
        let monitor = outcome
            .monitor
            .map(MonitorId)
            .filter(|m| m.0 < reactor.monitors.len())
            .unwrap_or(reactor.selected_monitor);
        let tags = match reactor.tags.clamp(outcome.tags) {
            tags if tags.is_empty() => reactor.monitors[monitor.0].tags(),
            tags => tags,
        };
        let fullscreen = info.fullscreen;
        let area = reactor.monitors[monitor.0].work_area();

        let mut client = Client::new(info, monitor, tags, reactor.config.settings.border_width);
        if outcome.floating {
            client.flags.insert(ClientFlags::FLOATING);
        }
        client.flags.set(ClientFlags::TERMINAL, outcome.terminal);
        client.flags.set(ClientFlags::NO_SWALLOW, outcome.no_swallow);
        client.geometry = clamp_into(client.geometry, client.border_width, area);
        debug!(
            window = ?client.window,
            class = %client.class,
            ?tags,
            ?monitor,
            "Managing window"
        );

        if monitor == reactor.selected_monitor
            && let Some(previous) = reactor.selected_client()
        {
            reactor.unfocus(previous);
        }

        let window = client.window;
        let id = reactor.registry.register(client)?;

        let policy = SwallowPolicy {
            swallow_floating: reactor.config.settings.swallow_floating,
        };
        if let Some(terminal) =
            find_swallower(&reactor.registry, id, reactor.processes.as_ref(), policy)
        {
            Self::swallow(reactor, terminal, id)?;
        }

        let Some(client) = reactor.registry.get(id) else {
            return Err(ReactorError::WindowNotFound(window));
        };
        let (geometry, border, monitor) = (client.geometry, client.border_width, client.monitor);
        let normal = reactor.config.colors.normal.border.clone();
        reactor.window_system.set_border_color(window, &normal);
        reactor.window_system.move_resize(window, geometry, border);
        if fullscreen {
            reactor.set_fullscreen(id, true);
        }

        if let Some(mon) = reactor.monitor_mut(monitor) {
            mon.selected = Some(id);
        }
        reactor.arrange(Some(monitor));
        reactor.focus(None);
        Ok(())
    }

    /// The child takes the terminal's place; the terminal is unmapped until
    /// the child goes away.
    fn swallow(reactor: &mut Reactor, terminal: ClientId, child: ClientId) -> Result<(), ReactorError> {
        reactor.registry.swap_in(terminal, child)?;
        for monitor in &mut reactor.monitors {
            if monitor.selected == Some(terminal) {
                monitor.selected = None;
            }
        }
        if let Some(term) = reactor.registry.get_mut(terminal)
            && term.flags.contains(ClientFlags::MAPPED)
        {
            term.flags.remove(ClientFlags::MAPPED);
            reactor.window_system.unmap(term.window);
        }
        Ok(())
    }

    pub fn handle_window_destroyed(
        reactor: &mut Reactor,
        window: WindowHandle,
    ) -> Result<(), ReactorError> {
        match reactor.registry.lookup(window) {
            Some(id) => reactor.unmanage(id),
            None => trace!(?window, "Destroyed window was not managed"),
        }
        Ok(())
    }

    /// Floating clients, and every client on the floating layout, get the
    /// geometry they asked for. Tiled clients are told their current geometry
    /// again.
    pub fn handle_configure_request(
        reactor: &mut Reactor,
        window: WindowHandle,
        geometry: Rect,
    ) -> Result<(), ReactorError> {
        let Some(id) = reactor.registry.lookup(window) else {
            reactor.window_system.move_resize(window, geometry, 0);
            return Ok(());
        };
        let Some(client) = reactor.registry.get(id) else {
            return Err(ReactorError::WindowNotFound(window));
        };
        let monitor = client.monitor;
        let free = !client.is_fullscreen()
            && (client.is_floating() || !reactor.is_tiled_layout(monitor));
        if free {
            let screen = reactor.monitor(monitor).map(Monitor::screen).unwrap_or_default();
            let rect = if screen.is_empty() || screen.overlaps(&geometry) {
                geometry
            } else {
                center_in(geometry, screen)
            };
            let visible = reactor
                .monitor(monitor)
                .is_some_and(|m| client.is_visible_on(m.tags()));
            if visible {
                reactor.resize(id, rect, true);
            } else if let Some(client) = reactor.registry.get_mut(id) {
                client.geometry = rect;
            }
        } else {
            let (geometry, border) = (client.geometry, client.border_width);
            reactor.window_system.move_resize(window, geometry, border);
        }
        Ok(())
    }

    pub fn handle_property_changed(
        reactor: &mut Reactor,
        window: WindowHandle,
        change: PropertyChange,
    ) -> Result<(), ReactorError> {
        let id = reactor.registry.lookup(window).ok_or(ReactorError::WindowNotFound(window))?;
        match change {
            PropertyChange::Title(title) => {
                if let Some(client) = reactor.registry.get_mut(id) {
                    client.title = title;
                }
                if reactor.monitors.iter().any(|m| m.selected == Some(id)) {
                    reactor.update_bars();
                }
            }
            PropertyChange::Urgent(urgent) => {
                let focused = reactor.selected_client() == Some(id);
                if let Some(client) = reactor.registry.get_mut(id) {
                    client.flags.set(ClientFlags::URGENT, urgent && !focused);
                }
                reactor.update_bars();
            }
            PropertyChange::Fullscreen(fullscreen) => reactor.set_fullscreen(id, fullscreen),
            PropertyChange::SizeHints(hints) => {
                let Some(client) = reactor.registry.get_mut(id) else {
                    return Err(ReactorError::WindowNotFound(window));
                };
                client.hints = hints;
                client.flags.set(ClientFlags::FIXED, hints.is_fixed());
                if hints.is_fixed() {
                    client.flags.insert(ClientFlags::FLOATING);
                }
                let monitor = client.monitor;
                reactor.arrange(Some(monitor));
            }
        }
        Ok(())
    }

    /// Resizes existing monitors, creates new ones and drops surplus ones.
    /// Clients of dropped monitors move to the last remaining monitor.
    pub fn handle_screens(reactor: &mut Reactor, screens: Vec<Rect>) {
        if screens.is_empty() {
            warn!("Ignoring empty screen list");
            return;
        }
        let settings = reactor.config.monitor_settings();
        for (i, screen) in screens.iter().enumerate() {
            match reactor.monitors.get_mut(i) {
                Some(monitor) => monitor.set_screen(*screen),
                None => reactor.monitors.push(Monitor::new(MonitorId(i), *screen, &settings)),
            }
        }
        reactor.monitors.truncate(screens.len());
        reactor.registry.set_monitor_count(screens.len());
        if reactor.selected_monitor.0 >= reactor.monitors.len() {
            reactor.selected_monitor = MonitorId(0);
        }
        debug!(count = screens.len(), "Screens updated");
        reactor.arrange(None);
        reactor.focus(None);
    }
}

/// Keeps the whole outer rectangle inside `area` where it fits, and the top
/// left corner inside it where it does not.
fn clamp_into(geometry: Rect, border: i32, area: Rect) -> Rect {
    if area.is_empty() {
        return geometry;
    }
    let outer_w = geometry.width + 2 * border;
    let outer_h = geometry.height + 2 * border;
    let mut rect = geometry;
    if rect.x + outer_w > area.max_x() {
        rect.x = area.max_x() - outer_w;
    }
    if rect.y + outer_h > area.max_y() {
        rect.y = area.max_y() - outer_h;
    }
    rect.x = rect.x.max(area.x);
    rect.y = rect.y.max(area.y);
    rect
}

fn center_in(geometry: Rect, screen: Rect) -> Rect {
    Rect::new(
        screen.x + (screen.width - geometry.width) / 2,
        screen.y + (screen.height - geometry.height) / 2,
        geometry.width,
        geometry.height,
    )
}

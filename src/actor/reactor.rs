//! The reactor owns all window-manager state and handles one event at a
//! time to completion.
//!
//! Events arrive from the bridge reader and the signal threads over an
//! unbounded channel. Handlers mutate the registry and monitors directly and
//! then run an arrange pass, which turns layout results into placement
//! requests.

pub mod bindings;
mod error;
pub mod events;
#[cfg(test)]
pub mod testing;

use std::path::PathBuf;

pub use error::ReactorError;
use events::command::CommandEventHandler;
use events::input::InputEventHandler;
use events::window::WindowEventHandler;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::actor;
use crate::common::config::Config;
use crate::layout_engine::{LayoutKind, LayoutRequest, calculate_layout};
use crate::model::{
    ClientFlags, ClientId, ClientRegistry, Monitor, MonitorId, RuleSet, SizeHints, TagMask,
    TagSelector, TagSet, WindowHandle, WindowInfo,
};
use crate::sys::bridge::{BarContent, Request, TagIndicator, WindowSystem};
use crate::sys::geometry::{Point, Rect};
use crate::sys::hotkey::{Button, ClickRegion, KeyCode, Modifiers};
use crate::sys::process::{ExecCmd, Launcher, ProcessTree};
use crate::sys::signal::pid_file_path;
use bindings::Bindings;

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// A tag argument. `clicked` stands for the tag under the pointer on tag-bar
/// clicks; anywhere else it resolves to no tags, which `view` treats as
/// "previous tags" and every other command ignores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagArg {
    Clicked,
    Tag(TagSelector),
}

const CLICKED: &str = "clicked";

impl Serialize for TagArg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagArg::Clicked => serializer.serialize_str(CLICKED),
            TagArg::Tag(selector) => selector.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TagArg {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<TagArg, D::Error> {
        Ok(match TagSelector::deserialize(deserializer)? {
            TagSelector::Name(name) if name == CLICKED => TagArg::Clicked,
            selector => TagArg::Tag(selector),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, strum_macros::VariantNames)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Fire-and-forget launch; `{monitor}` becomes the selected monitor index.
    Spawn(ExecCmd),
    ToggleBar,
    FocusStack(i32),
    IncMaster(i32),
    /// Below 1.0 a delta, from 1.0 up an absolute fraction plus one.
    SetMasterFraction(f64),
    Zoom,
    View(TagArg),
    ViewPrevious,
    ToggleView(TagArg),
    Tag(TagArg),
    ToggleTag(TagArg),
    KillClient,
    SetLayout(LayoutKind),
    ToggleLayout,
    ToggleFloating,
    ToggleFullscreen,
    FocusMonitor(i32),
    TagMonitor(i32),
    AdjustGaps(i32),
    AdjustInnerGaps(i32),
    AdjustOuterGaps(i32),
    ResetGaps,
    ToggleGaps,
    MoveMouse,
    ResizeMouse,
    /// Refreshes the status block under the pointer.
    SignalBlock,
    /// Sends block signal `n` to the scheduler.
    RefreshBlock(u8),
    Restart,
    Quit,
}

impl Command {
    pub fn view_index(tag: usize) -> Command { Command::View(TagArg::Tag(TagSelector::Index(tag))) }

    pub fn toggle_view_index(tag: usize) -> Command {
        Command::ToggleView(TagArg::Tag(TagSelector::Index(tag)))
    }

    pub fn tag_index(tag: usize) -> Command { Command::Tag(TagArg::Tag(TagSelector::Index(tag))) }

    pub fn toggle_tag_index(tag: usize) -> Command {
        Command::ToggleTag(TagArg::Tag(TagSelector::Index(tag)))
    }

    pub fn with_clicked_tag(&self, tag: usize) -> Command {
        let sub = |arg: &TagArg| match arg {
            TagArg::Clicked => TagArg::Tag(TagSelector::Index(tag)),
            other => other.clone(),
        };
        match self {
            Command::View(arg) => Command::View(sub(arg)),
            Command::ToggleView(arg) => Command::ToggleView(sub(arg)),
            Command::Tag(arg) => Command::Tag(sub(arg)),
            Command::ToggleTag(arg) => Command::ToggleTag(sub(arg)),
            other => other.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyChange {
    Title(String),
    Urgent(bool),
    Fullscreen(bool),
    SizeHints(SizeHints),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ButtonPress {
    pub region: ClickRegion,
    #[serde(default)]
    pub modifiers: Modifiers,
    pub button: Button,
    #[serde(default)]
    pub window: Option<WindowHandle>,
    /// Monitor whose bar was clicked.
    #[serde(default)]
    pub monitor: Option<MonitorId>,
    /// Tag cell under the pointer on tag-bar clicks.
    #[serde(default)]
    pub tag: Option<usize>,
    /// Signal number of the status block under the pointer.
    #[serde(default)]
    pub block: Option<u8>,
    #[serde(default)]
    pub position: Point,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The full set of screen rectangles, in monitor order.
    Screens {
        screens: Vec<Rect>,
    },
    KeyPress {
        #[serde(default)]
        modifiers: Modifiers,
        key: KeyCode,
    },
    ButtonPress(ButtonPress),
    ButtonRelease {
        button: Button,
        #[serde(default)]
        position: Point,
    },
    PointerMotion {
        position: Point,
    },
    /// The pointer entered `window`, or the root window when absent.
    PointerEnter {
        #[serde(default)]
        window: Option<WindowHandle>,
        #[serde(default)]
        position: Point,
    },
    WindowCreated(WindowInfo),
    WindowDestroyed {
        window: WindowHandle,
    },
    ConfigureRequest {
        window: WindowHandle,
        geometry: Rect,
    },
    PropertyChanged {
        window: WindowHandle,
        change: PropertyChange,
    },
    StatusText {
        text: String,
    },
    Command {
        command: Command,
    },
    Restart,
    Quit,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Quit,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

/// An interactive move or resize in progress, driven by pointer motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
    pub client: ClientId,
    pub kind: DragKind,
    pub start_pointer: Point,
    pub start_geometry: Rect,
}

/// What a command may need to know about the input that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickContext {
    pub client: Option<ClientId>,
    pub block: Option<u8>,
    pub position: Point,
}

pub struct Reactor {
    config: Config,
    tags: TagSet,
    rules: RuleSet,
    bindings: Bindings,
    registry: ClientRegistry,
    monitors: Vec<Monitor>,
    selected_monitor: MonitorId,
    window_system: Box<dyn WindowSystem>,
    launcher: Box<dyn Launcher>,
    processes: Box<dyn ProcessTree>,
    status_text: String,
    drag: Option<DragState>,
    run_state: RunState,
    scheduler_pid_file: PathBuf,
}

impl Reactor {
    pub fn new(
        config: Config,
        window_system: Box<dyn WindowSystem>,
        launcher: Box<dyn Launcher>,
        processes: Box<dyn ProcessTree>,
    ) -> Reactor {
        let tags = config.tag_set();
        let rules = RuleSet::new(&config.rules, &tags);
        let bindings = Bindings::new(config.keys.clone(), config.buttons.clone());
        let monitors = vec![Monitor::new(MonitorId(0), Rect::default(), &config.monitor_settings())];
        let mut reactor = Reactor {
            config,
            tags,
            rules,
            bindings,
            registry: ClientRegistry::new(1),
            monitors,
            selected_monitor: MonitorId(0),
            window_system,
            launcher,
            processes,
            status_text: String::new(),
            drag: None,
            run_state: RunState::Running,
            scheduler_pid_file: pid_file_path(),
        };
        reactor.refresh_layout_symbols();
        reactor
    }

    pub fn with_scheduler_pid_file(mut self, path: PathBuf) -> Self {
        self.scheduler_pid_file = path;
        self
    }

    /// Forwards the appearance to the bar renderer and runs the autostart
    /// commands.
    pub fn start(&mut self) {
        self.window_system.send(Request::Appearance(self.config.appearance()));
        crate::common::util::execute_startup_commands(
            &self.config.settings.autostart,
            self.launcher.as_ref(),
        );
        self.update_bars();
    }

    /// Handles events until a quit or restart is requested or every sender is
    /// gone. Bridge resources are released before returning.
    pub fn run(mut self, mut events: Receiver) -> RunState {
        while let Some((span, event)) = events.blocking_recv() {
            let _guard = span.enter();
            self.handle_event(event);
            if self.run_state != RunState::Running {
                break;
            }
        }
        info!(state = ?self.run_state, "Reactor stopping");
        self.window_system.release();
        match self.run_state {
            RunState::Running => RunState::Quit,
            state => state,
        }
    }

    pub fn run_state(&self) -> RunState { self.run_state }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        let result = match event {
            Event::Screens { screens } => {
                WindowEventHandler::handle_screens(self, screens);
                Ok(())
            }
            Event::KeyPress { modifiers, key } => {
                InputEventHandler::handle_key_press(self, modifiers, key);
                Ok(())
            }
            Event::ButtonPress(press) => {
                InputEventHandler::handle_button_press(self, press);
                Ok(())
            }
            Event::ButtonRelease { button, position } => {
                InputEventHandler::handle_button_release(self, button, position);
                Ok(())
            }
            Event::PointerMotion { position } => {
                InputEventHandler::handle_pointer_motion(self, position);
                Ok(())
            }
            Event::PointerEnter { window, position } => {
                InputEventHandler::handle_pointer_enter(self, window, position);
                Ok(())
            }
            Event::WindowCreated(info) => WindowEventHandler::handle_window_created(self, info),
            Event::WindowDestroyed { window } => {
                WindowEventHandler::handle_window_destroyed(self, window)
            }
            Event::ConfigureRequest { window, geometry } => {
                WindowEventHandler::handle_configure_request(self, window, geometry)
            }
            Event::PropertyChanged { window, change } => {
                WindowEventHandler::handle_property_changed(self, window, change)
            }
            Event::StatusText { text } => {
                self.status_text = text;
                self.update_bars();
                Ok(())
            }
            Event::Command { command } => {
                CommandEventHandler::handle_command(self, &command, ClickContext::default())
            }
            Event::Restart => {
                info!("Restart requested");
                self.run_state = RunState::Restart;
                Ok(())
            }
            Event::Quit => {
                info!("Quit requested");
                self.run_state = RunState::Quit;
                Ok(())
            }
            Event::Unknown => {
                debug!("Ignoring unknown event");
                Ok(())
            }
        };
        if let Err(e) = result {
            e.log();
        }
    }

    fn monitor(&self, id: MonitorId) -> Option<&Monitor> { self.monitors.get(id.0) }

    fn monitor_mut(&mut self, id: MonitorId) -> Option<&mut Monitor> { self.monitors.get_mut(id.0) }

    fn selmon(&self) -> &Monitor { &self.monitors[self.selected_monitor.0] }

    fn selmon_mut(&mut self) -> &mut Monitor { &mut self.monitors[self.selected_monitor.0] }

    fn selected_client(&self) -> Option<ClientId> { self.selmon().selected }

    /// The monitor whose screen contains `point`, else the selected one.
    fn monitor_at(&self, point: Point) -> MonitorId {
        self.monitors
            .iter()
            .find(|m| m.screen().contains(point))
            .map(|m| m.id)
            .unwrap_or(self.selected_monitor)
    }

    /// The monitor `delta` steps away from the selected one, wrapping.
    fn monitor_in_direction(&self, delta: i32) -> MonitorId {
        let len = self.monitors.len() as i64;
        MonitorId((self.selected_monitor.0 as i64 + i64::from(delta)).rem_euclid(len) as usize)
    }

    /// Resolves a tag argument against the configured tags. `clicked` outside
    /// the tag bar is the empty mask; unknown tags are `None`.
    fn resolve_tags(&self, arg: &TagArg) -> Option<TagMask> {
        match arg {
            TagArg::Clicked => Some(TagMask::EMPTY),
            TagArg::Tag(selector) => {
                let mask = self.tags.resolve(selector);
                if mask.is_none() {
                    debug!(?selector, "Unknown tag");
                }
                mask
            }
        }
    }

    fn is_tiled_layout(&self, monitor: MonitorId) -> bool {
        self.monitor(monitor).is_some_and(|m| !m.layout().is_floating())
    }

    fn refresh_layout_symbols(&mut self) {
        for i in 0..self.monitors.len() {
            let id = MonitorId(i);
            let layout = self.monitors[i].layout();
            let symbol = if layout == LayoutKind::Monocle {
                let count = self.registry.visible(id, self.monitors[i].tags()).count();
                if count > 0 {
                    format!("[{count}]")
                } else {
                    self.config.layout.symbols.symbol(layout).to_string()
                }
            } else {
                self.config.layout.symbols.symbol(layout).to_string()
            };
            self.monitors[i].layout_symbol = symbol;
        }
    }

    /// Full arrange pass for one monitor, or every monitor when `None`.
    pub(crate) fn arrange(&mut self, monitor: Option<MonitorId>) {
        let ids: Vec<MonitorId> = match monitor {
            Some(id) => vec![id],
            None => self.monitors.iter().map(|m| m.id).collect(),
        };
        for id in &ids {
            self.show_hide(*id);
        }
        for id in &ids {
            self.arrange_monitor(*id);
            self.restack(*id);
        }
        self.update_bars();
    }

    /// Maps visible clients and unmaps the rest.
    fn show_hide(&mut self, monitor: MonitorId) {
        let Some(mask) = self.monitor(monitor).map(|m| m.tags()) else {
            return;
        };
        let ids: Vec<ClientId> = self.registry.focus_order(monitor).to_vec();
        for id in ids {
            let Some(client) = self.registry.get_mut(id) else {
                continue;
            };
            let visible = client.is_visible_on(mask);
            let mapped = client.flags.contains(ClientFlags::MAPPED);
            if visible && !mapped {
                client.flags.insert(ClientFlags::MAPPED);
                self.window_system.map(client.window);
            } else if !visible && mapped {
                client.flags.remove(ClientFlags::MAPPED);
                self.window_system.unmap(client.window);
            }
        }
    }

    fn arrange_monitor(&mut self, monitor: MonitorId) {
        let Some(mon) = self.monitor(monitor) else {
            return;
        };
        let mask = mon.tags();
        let kind = mon.layout();
        let area = mon.work_area();
        let screen = mon.screen();
        let params = mon.layout_params();
        let gaps = mon.gaps.gaps();

        if !kind.is_floating() {
            let ids = self.registry.arrangeable(monitor, mask);
            let windows: Vec<Rect> = ids
                .iter()
                .filter_map(|id| self.registry.get(*id).map(|c| c.outer_rect()))
                .collect();
            let rects = calculate_layout(&LayoutRequest {
                kind,
                area,
                windows: &windows,
                params,
                gaps,
            });
            for (id, rect) in ids.into_iter().zip(rects) {
                let border = self.registry.get(id).map_or(0, |c| c.border_width);
                self.resize(id, rect.without_border(border), false);
            }
        }

        let fullscreen: Vec<ClientId> = self
            .registry
            .visible(monitor, mask)
            .filter(|id| self.registry.get(*id).is_some_and(|c| c.is_fullscreen()))
            .collect();
        for id in fullscreen {
            self.resize(id, screen, false);
        }
        self.refresh_layout_symbols();
    }

    /// Applies size hints where they apply and sends a placement request when
    /// the geometry changed.
    fn resize(&mut self, id: ClientId, rect: Rect, force: bool) {
        let tiled_layout = self.registry.get(id).is_some_and(|c| self.is_tiled_layout(c.monitor));
        let resize_hints = self.config.layout.resize_hints;
        let Some(client) = self.registry.get_mut(id) else {
            return;
        };
        let mut rect = rect;
        if resize_hints || client.is_floating() || !tiled_layout {
            let (w, h) = client.hints.constrain(rect.width, rect.height);
            rect.width = w;
            rect.height = h;
        }
        rect.width = rect.width.max(1);
        rect.height = rect.height.max(1);
        if !force && client.geometry == rect {
            return;
        }
        client.geometry = rect;
        trace!(window = ?client.window, ?rect, "move_resize");
        self.window_system.move_resize(client.window, rect, client.border_width);
    }

    /// Raises the selected client when it floats above the tiling.
    fn restack(&mut self, monitor: MonitorId) {
        let Some(selected) = self.monitor(monitor).and_then(|m| m.selected) else {
            return;
        };
        let tiled_layout = self.is_tiled_layout(monitor);
        if let Some(client) = self.registry.get(selected)
            && (client.is_floating() || client.is_fullscreen() || !tiled_layout)
        {
            self.window_system.raise(client.window);
        }
    }

    /// Focuses `target`, or the most recently focused visible client of the
    /// selected monitor when `target` is absent or not visible. Explicit focus
    /// moves the client to the front of the focus order.
    pub(crate) fn focus(&mut self, target: Option<ClientId>) { self.set_focus(target, true); }

    pub(crate) fn set_focus(&mut self, target: Option<ClientId>, reorder: bool) {
        let target = target
            .filter(|id| {
                self.registry.get(*id).is_some_and(|c| {
                    self.monitor(c.monitor).is_some_and(|m| c.is_visible_on(m.tags()))
                })
            })
            .or_else(|| {
                let mon = self.selmon();
                self.registry.first_visible_in_focus_order(mon.id, mon.tags())
            });

        let previous = self.selected_client();
        if previous != target
            && let Some(previous) = previous
        {
            self.unfocus(previous);
        }

        match target {
            Some(id) => {
                let Some(client) = self.registry.get_mut(id) else {
                    return;
                };
                let monitor = client.monitor;
                let window = client.window;
                let never_focus = client.flags.contains(ClientFlags::NEVER_FOCUS);
                client.flags.remove(ClientFlags::URGENT);
                if monitor != self.selected_monitor {
                    self.selected_monitor = monitor;
                }
                if reorder {
                    self.registry.focus_push(id);
                }
                let border = self.config.colors.selected.border.clone();
                self.window_system.set_border_color(window, &border);
                if !never_focus {
                    self.window_system.set_input_focus(Some(window));
                }
            }
            None => self.window_system.set_input_focus(None),
        }
        self.selmon_mut().selected = target;
        self.update_bars();
    }

    fn unfocus(&mut self, id: ClientId) {
        if let Some(client) = self.registry.get(id) {
            let border = self.config.colors.normal.border.clone();
            self.window_system.set_border_color(client.window, &border);
        }
    }

    /// Enters or leaves fullscreen: the client covers the whole screen
    /// without a border, and gets its geometry back afterwards.
    pub(crate) fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) {
        if !self.registry.set_fullscreen(id, fullscreen) {
            return;
        }
        let Some(client) = self.registry.get(id) else {
            return;
        };
        let monitor = client.monitor;
        if fullscreen {
            if let Some(screen) = self.monitor(monitor).map(|m| m.screen()) {
                self.resize(id, screen, true);
            }
            if let Some(client) = self.registry.get(id) {
                self.window_system.raise(client.window);
            }
        } else if let Some(client) = self.registry.get(id) {
            let rect = client.geometry;
            self.resize(id, rect, true);
        }
        self.arrange(Some(monitor));
    }

    /// Removes a client and resolves its swallow link, if any.
    pub(crate) fn unmanage(&mut self, id: ClientId) {
        for monitor in &mut self.monitors {
            if monitor.selected == Some(id) {
                monitor.selected = None;
            }
        }
        if self.drag.is_some_and(|d| d.client == id) {
            self.drag = None;
        }
        let Some((client, link)) = self.registry.unregister(id) else {
            return;
        };
        debug!(window = ?client.window, class = %client.class, "Unmanaged");
        if let Some(link) = link
            && link.child == id
            && let Some(terminal) = self.registry.get(link.terminal)
        {
            let window = terminal.window;
            let geometry = terminal.geometry;
            let border = terminal.border_width;
            self.window_system.move_resize(window, geometry, border);
        }
        self.arrange(Some(client.monitor));
        self.focus(None);
    }

    fn build_bar(&self, monitor: &Monitor) -> BarContent {
        let active = monitor.id == self.selected_monitor;
        let clients: Vec<_> = self
            .registry
            .tiling_order(monitor.id)
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .collect();
        let selected = monitor.selected.and_then(|id| self.registry.get(id));
        let tags = (0..self.tags.len())
            .map(|i| TagIndicator {
                name: self.tags.name(i).unwrap_or_default().to_string(),
                selected: monitor.tags().contains(i),
                occupied: clients.iter().any(|c| c.tags.contains(i)),
                urgent: clients.iter().any(|c| c.is_urgent() && c.tags.contains(i)),
                focused: active && selected.is_some_and(|c| c.tags.contains(i)),
            })
            .collect();
        BarContent {
            monitor: monitor.id,
            show: monitor.bar().show,
            rect: monitor.bar_rect(),
            active,
            tags,
            layout_symbol: monitor.layout_symbol.clone(),
            title: selected.map(|c| c.title.clone()),
            status: if active { self.status_text.clone() } else { String::new() },
        }
    }

    pub(crate) fn update_bars(&mut self) {
        let bars: Vec<BarContent> = self.monitors.iter().map(|m| self.build_bar(m)).collect();
        for bar in bars {
            self.window_system.update_bar(bar);
        }
    }
}

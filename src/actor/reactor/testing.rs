//! In-memory window system, launcher and process table for reactor tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use super::{ButtonPress, Command, Event, Reactor, Receiver, RunState};
use crate::common::collections::HashMap;
use crate::common::config::Config;
use crate::layout_engine::LayoutKind;
use crate::model::{Client, ClientId, Monitor, WindowHandle, WindowInfo};
use crate::sys::bridge::{BarContent, Request, WindowSystem};
use crate::sys::geometry::{Point, Rect};
use crate::sys::hotkey::{Button, ClickRegion, Hotkey, Modifiers};
use crate::sys::process::{Launcher, ProcessTree, SpawnError};

#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<Request>>>);

impl WindowSystem for Recorder {
    fn send(&mut self, request: Request) { self.0.borrow_mut().push(request); }
}

#[derive(Clone, Default)]
pub struct RecordingLauncher(Rc<RefCell<Vec<Vec<String>>>>);

impl Launcher for RecordingLauncher {
    fn spawn(&self, argv: &[String]) -> Result<(), SpawnError> {
        if argv.is_empty() {
            return Err(SpawnError::EmptyCommand);
        }
        self.0.borrow_mut().push(argv.to_vec());
        Ok(())
    }
}

/// A fixed pid → parent table.
#[derive(Clone, Default)]
pub struct FakeProcesses(HashMap<u32, u32>);

impl FakeProcesses {
    pub fn new(parents: &[(u32, u32)]) -> Self { Self(parents.iter().copied().collect()) }
}

impl ProcessTree for FakeProcesses {
    fn parent(&self, pid: u32) -> Option<u32> { self.0.get(&pid).copied() }
}

/// The tile layout first so geometry assertions are easy to follow.
pub fn tiling_config() -> Config {
    let mut config = Config::default();
    config.layout.default_layouts = [LayoutKind::Tile, LayoutKind::Monocle];
    config
}

pub struct Harness {
    pub reactor: Reactor,
    requests: Recorder,
    spawned: RecordingLauncher,
}

impl Harness {
    pub fn new(config: Config) -> Self { Self::with_processes(config, &[]) }

    pub fn with_processes(config: Config, parents: &[(u32, u32)]) -> Self {
        let requests = Recorder::default();
        let spawned = RecordingLauncher::default();
        let reactor = Reactor::new(
            config,
            Box::new(requests.clone()),
            Box::new(spawned.clone()),
            Box::new(FakeProcesses::new(parents)),
        );
        Self { reactor, requests, spawned }
    }

    pub fn screens(&mut self, screens: &[Rect]) {
        self.reactor.handle_event(Event::Screens { screens: screens.to_vec() });
    }

    /// A harness with one 1000×2000 screen and no pending requests.
    pub fn with_screen(config: Config) -> Self {
        let mut harness = Self::new(config);
        harness.screens(&[Rect::new(0, 0, 1000, 2000)]);
        harness.take_requests();
        harness
    }

    pub fn take_requests(&self) -> Vec<Request> { std::mem::take(&mut *self.requests.0.borrow_mut()) }

    pub fn spawned(&self) -> Vec<Vec<String>> { self.spawned.0.borrow().clone() }

    pub fn create(&mut self, window: u64) -> ClientId {
        self.create_with(WindowInfo {
            window: WindowHandle(window),
            class: format!("app{window}"),
            title: format!("window {window}"),
            geometry: Rect::new(10, 30, 300, 200),
            ..Default::default()
        })
    }

    pub fn create_with(&mut self, info: WindowInfo) -> ClientId {
        let window = info.window;
        self.reactor.handle_event(Event::WindowCreated(info));
        self.id(window.0)
    }

    pub fn destroy(&mut self, window: u64) {
        self.reactor.handle_event(Event::WindowDestroyed { window: WindowHandle(window) });
    }

    pub fn press(&mut self, hotkey: &str) {
        let hotkey = Hotkey::from_str(hotkey).unwrap();
        self.reactor.handle_event(Event::KeyPress {
            modifiers: hotkey.modifiers,
            key: hotkey.key_code,
        });
    }

    pub fn click(
        &mut self,
        region: ClickRegion,
        modifiers: Modifiers,
        button: Button,
        tag: Option<usize>,
    ) {
        self.reactor.handle_event(Event::ButtonPress(ButtonPress {
            region,
            modifiers,
            button,
            window: None,
            monitor: None,
            tag,
            block: None,
            position: Point::default(),
        }));
    }

    pub fn click_window(&mut self, window: u64, modifiers: Modifiers, button: Button, at: Point) {
        self.reactor.handle_event(Event::ButtonPress(ButtonPress {
            region: ClickRegion::ClientWindow,
            modifiers,
            button,
            window: Some(WindowHandle(window)),
            monitor: None,
            tag: None,
            block: None,
            position: at,
        }));
    }

    /// Runs the event loop to completion and returns every request it made.
    pub fn run(self, events: Receiver) -> (RunState, Vec<Request>) {
        let state = self.reactor.run(events);
        let requests = std::mem::take(&mut *self.requests.0.borrow_mut());
        (state, requests)
    }

    pub fn command(&mut self, command: Command) {
        self.reactor.handle_event(Event::Command { command });
    }

    pub fn id(&self, window: u64) -> ClientId {
        self.reactor.registry.lookup(WindowHandle(window)).unwrap()
    }

    pub fn client(&self, window: u64) -> &Client {
        self.reactor.registry.get(self.id(window)).unwrap()
    }

    pub fn windows(&self, ids: &[ClientId]) -> Vec<u64> {
        ids.iter().map(|id| self.reactor.registry.get(*id).unwrap().window.0).collect()
    }

    pub fn tiling_windows(&self) -> Vec<u64> {
        let monitor = self.reactor.selected_monitor;
        self.windows(self.reactor.registry.tiling_order(monitor))
    }

    pub fn focus_windows(&self) -> Vec<u64> {
        let monitor = self.reactor.selected_monitor;
        self.windows(self.reactor.registry.focus_order(monitor))
    }

    pub fn selected_window(&self) -> Option<u64> {
        self.reactor.selected_client().map(|id| self.reactor.registry.get(id).unwrap().window.0)
    }

    pub fn monitor(&self) -> &Monitor { self.reactor.selmon() }
}

pub fn last_bar(requests: &[Request], monitor: usize) -> Option<&BarContent> {
    requests.iter().rev().find_map(|r| match r {
        Request::UpdateBar(bar) if bar.monitor.0 == monitor => Some(bar),
        _ => None,
    })
}

pub fn placements(requests: &[Request]) -> Vec<(u64, Rect)> {
    requests
        .iter()
        .filter_map(|r| match r {
            Request::MoveResize { window, rect, .. } => Some((window.0, *rect)),
            _ => None,
        })
        .collect()
}

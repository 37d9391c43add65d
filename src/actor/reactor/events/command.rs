use tracing::{debug, info, trace};

use crate::actor::reactor::{
    ClickContext, Command, DragKind, DragState, Reactor, ReactorError, RunState,
};
use crate::model::{ClientId, MonitorId, TagMask};
use crate::sys::signal::signal_scheduler;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_command(
        reactor: &mut Reactor,
        command: &Command,
        context: ClickContext,
    ) -> Result<(), ReactorError> {
        trace!(?command, "Running command");
        match command {
            Command::Spawn(cmd) => {
                let argv = cmd.with_monitor(reactor.selected_monitor.0);
                reactor.launcher.spawn(&argv)?;
            }
            Command::ToggleBar => {
                reactor.selmon_mut().toggle_bar();
                Self::arrange_selected(reactor);
            }
            Command::FocusStack(direction) => Self::handle_focus_stack(reactor, *direction),
            Command::IncMaster(delta) => {
                if reactor.selmon_mut().set_master_count(*delta) {
                    Self::arrange_selected(reactor);
                }
            }
            Command::SetMasterFraction(value) => {
                if reactor.selmon_mut().set_master_fraction(*value) {
                    Self::arrange_selected(reactor);
                }
            }
            Command::Zoom => Self::handle_zoom(reactor),
            Command::View(arg) => {
                if let Some(mask) = reactor.resolve_tags(arg) {
                    Self::view(reactor, mask);
                }
            }
            Command::ViewPrevious => Self::view(reactor, TagMask::EMPTY),
            Command::ToggleView(arg) => {
                if let Some(mask) = reactor.resolve_tags(arg)
                    && reactor.selmon_mut().toggle_view(mask)
                {
                    Self::arrange_then_focus(reactor);
                }
            }
            Command::Tag(arg) => {
                if let Some(id) = reactor.selected_client()
                    && let Some(mask) = reactor.resolve_tags(arg)
                    && reactor.registry.set_tags(id, mask)
                {
                    Self::arrange_then_focus(reactor);
                }
            }
            Command::ToggleTag(arg) => {
                if let Some(id) = reactor.selected_client()
                    && let Some(mask) = reactor.resolve_tags(arg)
                    && reactor.registry.toggle_tags(id, mask)
                {
                    Self::arrange_then_focus(reactor);
                }
            }
            Command::KillClient => {
                let selected = reactor.selected_client().and_then(|id| reactor.registry.get(id));
                if let Some(window) = selected.map(|c| c.window) {
                    debug!(?window, "Closing client");
                    reactor.window_system.close(window);
                }
            }
            Command::SetLayout(kind) => {
                reactor.selmon_mut().set_layout(Some(*kind));
                Self::arrange_selected(reactor);
            }
            Command::ToggleLayout => {
                reactor.selmon_mut().set_layout(None);
                Self::arrange_selected(reactor);
            }
            Command::ToggleFloating => {
                if let Some(id) = reactor.selected_client()
                    && reactor.registry.toggle_floating(id)
                {
                    if let Some(rect) = reactor.registry.get(id).map(|c| c.geometry) {
                        reactor.resize(id, rect, false);
                    }
                    Self::arrange_selected(reactor);
                }
            }
            Command::ToggleFullscreen => {
                if let Some(id) = reactor.selected_client() {
                    let fullscreen = reactor.registry.get(id).is_some_and(|c| c.is_fullscreen());
                    reactor.set_fullscreen(id, !fullscreen);
                }
            }
            Command::FocusMonitor(delta) => Self::handle_focus_monitor(reactor, *delta),
            Command::TagMonitor(delta) => Self::handle_tag_monitor(reactor, *delta)?,
            Command::AdjustGaps(delta) => {
                reactor.selmon_mut().gaps.adjust(*delta);
                Self::arrange_selected(reactor);
            }
            Command::AdjustInnerGaps(delta) => {
                reactor.selmon_mut().gaps.adjust_inner(*delta);
                Self::arrange_selected(reactor);
            }
            Command::AdjustOuterGaps(delta) => {
                reactor.selmon_mut().gaps.adjust_outer(*delta);
                Self::arrange_selected(reactor);
            }
            Command::ResetGaps => {
                reactor.selmon_mut().gaps.reset();
                Self::arrange_selected(reactor);
            }
            Command::ToggleGaps => {
                reactor.selmon_mut().gaps.toggle();
                Self::arrange_selected(reactor);
            }
            Command::MoveMouse => Self::start_drag(reactor, DragKind::Move, context),
            Command::ResizeMouse => Self::start_drag(reactor, DragKind::Resize, context),
            Command::SignalBlock => match context.block {
                Some(signal) if signal > 0 => {
                    signal_scheduler(&reactor.scheduler_pid_file, signal)?;
                }
                _ => trace!("No signalled block under the pointer"),
            },
            Command::RefreshBlock(signal) => {
                signal_scheduler(&reactor.scheduler_pid_file, *signal)?;
            }
            Command::Restart => {
                info!("Restart requested");
                reactor.run_state = RunState::Restart;
            }
            Command::Quit => {
                info!("Quit requested");
                reactor.run_state = RunState::Quit;
            }
        }
        Ok(())
    }

    fn arrange_selected(reactor: &mut Reactor) {
        let monitor = reactor.selected_monitor;
        reactor.arrange(Some(monitor));
    }

    /// The empty mask swaps back to the previously viewed tags.
    fn view(reactor: &mut Reactor, mask: TagMask) {
        if reactor.selmon_mut().view(mask) {
            Self::arrange_then_focus(reactor);
        }
    }

    /// Clients that became visible are mapped before one of them takes input
    /// focus; the newly selected client is raised afterwards.
    fn arrange_then_focus(reactor: &mut Reactor) {
        Self::arrange_selected(reactor);
        reactor.focus(None);
        let monitor = reactor.selected_monitor;
        reactor.restack(monitor);
    }

    /// Walks the focus order without reordering it, so repeated steps visit
    /// every visible client.
    fn handle_focus_stack(reactor: &mut Reactor, direction: i32) {
        let current = reactor.selected_client();
        if reactor.config.layout.lock_fullscreen
            && current.and_then(|id| reactor.registry.get(id)).is_some_and(|c| c.is_fullscreen())
        {
            return;
        }
        let mon = reactor.selmon();
        let (monitor, mask) = (mon.id, mon.tags());
        if let Some(next) = reactor.registry.focus_step(monitor, mask, current, direction) {
            reactor.set_focus(Some(next), false);
            reactor.restack(monitor);
        }
    }

    /// Moves the selected client to master. The master itself swaps with the
    /// next tiled client.
    fn handle_zoom(reactor: &mut Reactor) {
        let Some(selected) = reactor.selected_client() else {
            return;
        };
        let mon = reactor.selmon();
        let (monitor, mask, floating_layout) = (mon.id, mon.tags(), mon.layout().is_floating());
        if floating_layout || reactor.registry.get(selected).is_none_or(|c| c.is_floating()) {
            return;
        }
        let tiled = reactor.registry.arrangeable(monitor, mask);
        let target = match tiled.as_slice() {
            [master, next, ..] if *master == selected => *next,
            [master] if *master == selected => return,
            _ => selected,
        };
        reactor.registry.raise_to_master(target);
        reactor.focus(Some(target));
        reactor.arrange(Some(monitor));
    }

    fn handle_focus_monitor(reactor: &mut Reactor, delta: i32) {
        if reactor.monitors.len() <= 1 {
            return;
        }
        let target = reactor.monitor_in_direction(delta);
        if target == reactor.selected_monitor {
            return;
        }
        if let Some(selected) = reactor.selected_client() {
            reactor.unfocus(selected);
        }
        reactor.selected_monitor = target;
        reactor.focus(None);
    }

    /// Sends the selected client to the neighbouring monitor, where it takes
    /// that monitor's viewed tags.
    fn handle_tag_monitor(reactor: &mut Reactor, delta: i32) -> Result<(), ReactorError> {
        let Some(selected) = reactor.selected_client() else {
            return Ok(());
        };
        if reactor.monitors.len() <= 1 {
            return Ok(());
        }
        let target = reactor.monitor_in_direction(delta);
        Self::send_to_monitor(reactor, selected, target)
    }

    fn send_to_monitor(
        reactor: &mut Reactor,
        id: ClientId,
        target: MonitorId,
    ) -> Result<(), ReactorError> {
        let Some(tags) = reactor.monitor(target).map(|m| m.tags()) else {
            return Ok(());
        };
        reactor.unfocus(id);
        reactor.registry.send_to_monitor(id, target, tags)?;
        for monitor in &mut reactor.monitors {
            if monitor.selected == Some(id) {
                monitor.selected = None;
            }
        }
        debug!(client = ?id, ?target, "Sent client to monitor");
        reactor.arrange(None);
        reactor.focus(None);
        Ok(())
    }

    /// Starts an interactive move or resize of the clicked client, or of the
    /// selected one for key bindings. Fullscreen clients are never dragged.
    fn start_drag(reactor: &mut Reactor, kind: DragKind, context: ClickContext) {
        let Some(id) = context.client.or_else(|| reactor.selected_client()) else {
            return;
        };
        let Some(client) = reactor.registry.get(id) else {
            return;
        };
        if client.is_fullscreen() {
            return;
        }
        let start_geometry = client.geometry;
        let monitor = client.monitor;
        reactor.restack(monitor);
        reactor.drag = Some(DragState {
            client: id,
            kind,
            start_pointer: context.position,
            start_geometry,
        });
        trace!(client = ?id, ?kind, "Drag started");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actor::reactor::TagArg;
    use crate::model::TagSelector;

    #[test]
    fn clicked_tag_arguments_become_indices() {
        let command = Command::ToggleTag(TagArg::Clicked).with_clicked_tag(4);
        assert_eq!(command, Command::ToggleTag(TagArg::Tag(TagSelector::Index(4))));
        assert_eq!(Command::Zoom.with_clicked_tag(4), Command::Zoom);
        assert_eq!(Command::view_index(1).with_clicked_tag(4), Command::view_index(1));
    }
}

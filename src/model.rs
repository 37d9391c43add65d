pub mod client;
pub mod monitor;
pub mod registry;
pub mod rules;
pub mod swallow;
pub mod tags;

pub use client::{Client, ClientFlags, ClientId, SizeHints, WindowHandle, WindowInfo};
pub use monitor::{BarState, GapState, Monitor, MonitorId, MonitorSettings};
pub use registry::{ClientRegistry, RegistryError};
pub use rules::{Rule, RuleOutcome, RuleSet};
pub use swallow::{SwallowLink, SwallowLinks, SwallowPolicy};
pub use tags::{MAX_TAGS, TagMask, TagSelector, TagSet};

//! Live execution timeline and flame graph for hermes trace streams.
//!
//! Two pipelines share the [`event`] vocabulary:
//!
//! * [`ingest`] stamps incoming records into an [`ingest::EventLog`];
//!   [`timeline::correlate`] pairs them into segments and
//!   [`timeline::window`] clips those to the trailing window, driven by
//!   [`live::LiveTimeline`].
//! * [`callstack::build_call_stacks`] (or a playback file) produces nested
//!   call-stack entries that the [`flame`] engine lays out and hit-tests.
//!
//! The [`widgets`] module paints both with egui.

pub mod callstack;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod event;
pub mod flame;
pub mod ingest;
pub mod live;
pub mod prelude;
pub mod themes;
pub mod time;
pub mod timeline;
pub mod widgets;

pub use eframe::egui;

//! # Roombox - host runtime for sandboxed rooms
//!
//! Roombox renders untrusted room content inside an isolated frame and keeps
//! that content in sync with host-owned state through a one-way action
//! protocol.
//!
//! The host owns two key-value stores: a global **inventory** and a per-room
//! **room state**. Content never reads them directly. Every time the active
//! room or canonical state changes, the room is recompiled with fresh
//! snapshots of both stores injected into its document, and the previous
//! frame is torn down.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roombox::compiler::RoomCompiler;
//! use roombox::controller::{LogAlerts, TransitionController};
//! use roombox::rooms::demo_rooms;
//! use roombox::sandbox::NativeFrames;
//! use roombox::store::HostStateStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = HostStateStore::initialize(demo_rooms())?;
//!     let mut controller = TransitionController::start(
//!         store,
//!         RoomCompiler::new("*"),
//!         NativeFrames::new(),
//!         LogAlerts,
//!     )?;
//!
//!     if let Some(frame) = controller.host_mut().frame_mut() {
//!         frame.set_inventory("shinyKey", serde_json::json!(true));
//!         frame.to_room("Room Two");
//!     }
//!     controller.pump()?;
//!     assert_eq!(controller.store().current_room(), "Room Two");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`protocol`] - action messages crossing the trust boundary
//! - [`state`] - key-value maps shared by host store and local mirror
//! - [`rooms`] - room schemas, registry and JSON loading
//! - [`store`] - canonical host state and its single mutation entry point
//! - [`compiler`] - compiles a room plus state snapshots into a document
//! - [`sandbox`] - frames, local mirrors and the client API
//! - [`controller`] - routes actions to the store and drives remounts
//! - [`config`] - TOML configuration
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  snapshot   ┌──────────────────┐  document
//! │ HostStateStore   │ ──────────► │ RoomCompiler     │ ─────────┐
//! └──────────────────┘             └──────────────────┘          ▼
//!          ▲                                            ┌──────────────────┐
//!          │ apply_message                              │ Frame (mirror)   │
//! ┌──────────────────┐     one-way action channel       └──────────────────┘
//! │ Transition       │ ◄──────────────────────────────────────────┘
//! │ Controller       │
//! └──────────────────┘
//! ```

pub mod compiler;
pub mod config;
pub mod controller;
pub mod errors;
pub mod logutil;
pub mod protocol;
pub mod rooms;
pub mod sandbox;
pub mod state;
pub mod store;

//! # trellis-core
//!
//! Embeddable finite state machine runtime.
//!
//! This crate provides:
//! - Machine definitions with build-time validation
//! - Atomic guarded transitions with action execution
//! - Ordered lifecycle hook dispatch
//! - A thread-safe shared context
//! - A fluent machine builder
//!
//! ```
//! use trellis_core::MachineBuilder;
//!
//! let machine = MachineBuilder::new()
//!     .transition("red", "timer", "green")
//!     .transition("green", "timer", "yellow")
//!     .transition("yellow", "timer", "red")
//!     .initial_state("red")
//!     .build()
//!     .unwrap();
//!
//! machine.send_event("timer").unwrap();
//! assert_eq!(machine.current_state(), Some("green".into()));
//! ```

pub mod action;
pub mod builder;
pub mod context;
pub mod definition;
pub mod error;
pub mod guard;
pub mod hook;
pub mod machine;

pub use action::{Action, ActionError};
pub use builder::MachineBuilder;
pub use context::Context;
pub use definition::{Event, MachineDefinition, State, Transition};
pub use error::CoreError;
pub use guard::Guard;
pub use hook::{Hook, HookKind, HookSet};
pub use machine::{Machine, TransitionResult};

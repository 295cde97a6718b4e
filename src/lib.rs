//! Discrete-event simulation of a serverless compute service: a head-node
//! controller that admits function invocations, stages immutable container
//! images through a repository → head-disk → node-disk → node-RAM
//! hierarchy, delegates scheduling to a pluggable policy, and dispatches
//! each invocation to a bare-metal executor under time/RAM/disk limits.
//!
//! Embed this crate by constructing a [`platform::Platform`], a
//! [`config::ServerlessConfig`], and a [`scheduler::Scheduler`], spawning a
//! [`head_controller::HeadController`], and driving it through a
//! [`function_manager::FunctionManager`].

pub mod action;
pub mod bare_metal;
pub mod config;
pub mod error;
pub mod function;
pub mod function_manager;
pub mod head_controller;
pub mod invocation;
pub mod messages;
pub mod platform;
pub mod registered_function;
pub mod residency;
pub mod scheduler;
pub mod state_view;
pub mod storage;

pub use config::ServerlessConfig;
pub use error::FailureCause;
pub use function::{Function, FunctionBody, FunctionInput, FunctionOutput, Image, Scratch};
pub use function_manager::{FunctionManager, InvocationOutcome};
pub use head_controller::{HeadController, HeadControllerHandle};
pub use invocation::{Invocation, InvocationId, InvocationInfo, InvocationNotification, InvocationState};
pub use platform::{Host, Link, Platform};
pub use registered_function::{FunctionId, RegisteredFunction};
pub use residency::ResourceSnapshot;
pub use scheduler::random::RandomScheduler;
pub use scheduler::{Scheduler, SchedulingDecisions};
pub use state_view::StateView;

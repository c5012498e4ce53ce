//! zero platform
//!
//! Task scheduling for embedding a JavaScript engine: a worker pool for
//! background work, per-isolate foreground queues serviced by each isolate's
//! event loop, and delayed tasks backed by loop timers.
//!
//! # Example
//! ```rust,ignore
//! use zero_platform::{Platform, PlatformConfig, spin_event_loop};
//! use zero_loop::EventLoop;
//!
//! let platform = Platform::new(PlatformConfig::from_env()?);
//! let event_loop = EventLoop::new();
//! platform.register_isolate(isolate.clone(), &event_loop);
//! platform.call_on_foreground_thread(isolate.id(), Box::new(|| println!("hello")));
//! spin_event_loop(&platform, isolate.as_ref(), &event_loop);
//! platform.unregister_isolate(isolate.id());
//! platform.shutdown();
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod isolate;
pub mod per_isolate;
pub mod platform;
pub mod sync;
pub mod task;
pub mod task_queue;
pub mod tracing_controller;
pub mod worker;

pub use config::PlatformConfig;
pub use driver::spin_event_loop;
pub use error::PlatformError;
pub use isolate::{InternalCallbackScope, Isolate, IsolateId};
pub use per_isolate::{PerIsolatePlatformData, delay_to_timeout};
pub use platform::Platform;
pub use task::{IdleTask, Task, TaskRunner};
pub use task_queue::TaskQueue;
pub use tracing_controller::TracingController;
pub use worker::WorkerThreadsTaskRunner;

pub use zero_loop::{EventLoop, RunMode};

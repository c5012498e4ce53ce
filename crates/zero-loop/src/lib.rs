//! zero event loop
//!
//! A single-threaded event loop in the style of libuv, built on `smol`.
//!
//! # Features
//! - Wake-up handles that can be signalled from any thread
//! - One-shot timers backed by the monotonic clock
//! - Handle ref/unref so background handles do not keep the loop alive
//! - `Default`, `Once` and `NoWait` run modes
//!
//! # Example
//! ```rust,ignore
//! use zero_loop::{EventLoop, RunMode};
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new();
//! let _timer = event_loop.start_timer(Duration::from_millis(10), || println!("tick"));
//! event_loop.run(RunMode::Default);
//! ```

mod async_handle;
mod event_loop;
mod handle;
mod timer;

pub use async_handle::AsyncHandle;
pub use event_loop::{EventLoop, RunMode};
pub use timer::TimerHandle;

//! Reminder lifecycle: due detection, dispatch, status transition and
//! recurrence re-enrollment.
//!
//! - [`recurrence`]: next due time for a recurring reminder
//! - [`scheduler`]: the poll loop ([`ReminderScheduler`])
//! - [`service`]: validated `add_user` / `add_reminder`
//! - [`memory`]: in-process [`MemoryStore`]
//! - [`clock`]: time source seam

pub mod clock;
pub mod memory;
pub mod recurrence;
pub mod scheduler;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryStore;
pub use recurrence::next_due;
pub use scheduler::{ReminderScheduler, SchedulerError, TickReport};
pub use service::{ReminderDraft, ReminderService, parse_due_time};

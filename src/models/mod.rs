pub mod activity;
pub mod entry;
pub mod task;
pub mod user;

pub use activity::{Activity, ActivityCategory, NewActivity};
pub use entry::{EntryPatch, JournalEntry};
pub use task::{NewTask, Task, TaskPriority};
pub use user::{User, UserAccount};

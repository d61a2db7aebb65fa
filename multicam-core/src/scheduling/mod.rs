pub mod manual_scheduler;
pub mod thread_scheduler;

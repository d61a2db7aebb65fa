pub mod audio_router;
pub mod engine;
pub(crate) mod events;
pub mod freeze;
pub mod stream_pool;
pub mod time_sync;

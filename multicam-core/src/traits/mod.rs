pub mod playback_delegate;
pub mod scheduler;
pub mod stream_handle;

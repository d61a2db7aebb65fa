use crate::session::stream_pool::StreamPool;

/// Keeps exactly one stream audible.
///
/// Works only through the mute flag, never volume, and looks streams up in
/// the pool on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioRouter;

impl AudioRouter {
    pub fn new() -> Self {
        Self
    }

    /// Unmute the stream at `active_index` and mute every other one.
    ///
    /// Others are muted first so two streams are never audible at once.
    /// Rejected as a no-op when the index is out of range.
    pub fn apply_mute(&self, pool: &mut StreamPool, active_index: usize) {
        if active_index >= pool.len() {
            log::debug!(
                "Audio routing to {} ignored: pool holds {} streams",
                active_index,
                pool.len()
            );
            return;
        }

        for (index, stream) in pool.iter_mut().enumerate() {
            if index != active_index {
                stream.set_muted(true);
            }
        }
        if let Some(stream) = pool.stream_mut(active_index) {
            stream.set_muted(false);
        }
    }

    /// Silence every stream, for the window while a new angle is seeking.
    pub fn mute_all(&self, pool: &mut StreamPool) {
        for stream in pool.iter_mut() {
            stream.set_muted(true);
        }
    }

    /// The single unmuted stream, if exactly one is unmuted.
    pub fn audible_index(pool: &StreamPool) -> Option<usize> {
        let mut audible = pool
            .iter()
            .enumerate()
            .filter(|(_, stream)| !stream.is_muted())
            .map(|(index, _)| index);

        match (audible.next(), audible.next()) {
            (Some(index), None) => Some(index),
            _ => None,
        }
    }
}

//! The "up next" view shown beside the playlist.

/// Catalog indices of the `count` tracks after `current`, wrapping at the
/// end and never listing the current track itself.
pub fn up_next(current: Option<usize>, len: usize, count: usize) -> Vec<usize> {
    let Some(current) = current else {
        return Vec::new();
    };
    if len == 0 {
        return Vec::new();
    }
    let current = current % len;
    let take = count.min(len - 1);
    (1..=take).map(|step| (current + step) % len).collect()
}

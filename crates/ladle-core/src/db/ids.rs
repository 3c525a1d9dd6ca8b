//! Identifier generation

/// Generate a UUID-shaped identifier without an external dependency.
///
/// Mixes the wall clock, process id, and an atomic counter; the counter
/// guarantees uniqueness even for two calls in the same nanosecond.
pub fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let pid = std::process::id();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let random_part = timestamp ^ (pid as u128 * 6_364_136_223_846_793_005) ^ ((seq as u128) << 32);

    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (random_part >> 96) as u32,
        (random_part >> 80) as u16,
        (random_part >> 64) as u16 & 0x0FFF,
        ((random_part >> 48) as u16 & 0x3FFF) | 0x8000,
        random_part as u64 & 0xFFFF_FFFF_FFFF,
    )
}

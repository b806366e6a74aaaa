use crate::domain::tuning::ProjectileGc;
use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// `PROJECTILE_GC=sweep` collects every out-of-bounds projectile each tick;
/// anything else keeps the head-only policy.
pub fn projectile_gc() -> ProjectileGc {
    match env::var("PROJECTILE_GC").as_deref() {
        Ok("sweep") => ProjectileGc::FullSweep,
        Ok("head") | Err(_) => ProjectileGc::HeadOnly,
        Ok(other) => {
            tracing::warn!(value = other, "unknown PROJECTILE_GC; using head");
            ProjectileGc::HeadOnly
        }
    }
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 30);
// Grace period between a disconnect broadcast and its topic teardown.
pub const TEARDOWN_DELAY: Duration = Duration::from_secs(1);

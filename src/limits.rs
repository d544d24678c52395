//! Public parameter limits. Part of the wire contract: callers rely on
//! these exact values, not just "some validated range".

pub const SPEED_MIN: u32 = 4;
pub const SPEED_MAX: u32 = 60;
pub const SPEED_INITIAL: u32 = 12;

pub const FREQ_MIN: u16 = 0;
pub const FREQ_MAX: u16 = 4000;
pub const FREQ_INITIAL: u16 = 800;

pub const VOL_MIN: u32 = 0;
pub const VOL_MAX: u32 = 100;
pub const VOL_INITIAL: u32 = 70;

pub const GAP_MIN: u32 = 0;
pub const GAP_MAX: u32 = 60;

pub const WEIGHT_MIN: u32 = 20;
pub const WEIGHT_MAX: u32 = 80;
pub const WEIGHT_INITIAL: u32 = 50;

pub const TOL_MIN: u32 = 0;
pub const TOL_MAX: u32 = 90;
pub const TOL_INITIAL: u32 = 50;

/// Library-defined bound on tone queue capacity.
pub const CAPACITY_MAX: usize = 3000;

/// Default tone queue capacity used by [`crate::generator::Generator::new`].
pub const DEFAULT_CAPACITY: usize = 3000;

/// A tone with this exact duration is redelivered by the consumer until a
/// successor tone is enqueued behind it. See [`crate::tone::Tone::is_forever`].
pub const FOREVER_DURATION_US: i32 = i32::MAX;

/// How many microseconds of samples a "forever" tone is synthesized in at a
/// time, so a freshly enqueued tone can preempt it promptly.
pub const FOREVER_QUANTUM_US: i32 = 100;

// Spin scheduling
pub const BLOCK_SIZE: usize = 10;
pub const CLASSIC_WINS_PER_BLOCK: usize = 2;
pub const ONE_TIME_WINS_PER_BLOCK: usize = 3;
pub const GLOBAL_WIN_CAP: u32 = 15;

// Session lifecycle
pub const SESSION_DURATION_SECS: u64 = 10 * 60;
pub const SESSIONS_PER_RUN: u32 = 2;

// Presentation timing, in milliseconds
pub const SPIN_DURATION_MS: u64 = 3800;  // Decision to reveal
pub const CELEBRATION_DURATION_MS: u64 = 5000;
pub const COUNTDOWN_TICK_MS: u64 = 1000;

// Guests
pub const TOTAL_GUESTS: u32 = 300;
pub const SPECIAL_GUEST_ID: u32 = 262;
pub const SPECIAL_GUEST_PRIZE: u64 = 50_000;
pub const SPECIAL_GUEST_SESSION: u32 = 1;

// Wheel geometry
pub const BASE_TURNS: u32 = 6;  // Full rotations before landing

// Prize display
pub const CURRENCY_GLYPH: &str = "₦";
pub const GRAND_TIER_THRESHOLD: u64 = 200_000;
pub const MAJOR_TIER_THRESHOLD: u64 = 100_000;
pub const MINOR_TIER_THRESHOLD: u64 = 50_000;
pub const COMPACT_VIEWPORT_MAX_WIDTH: u32 = 480;

pub const SEGMENT_PALETTE: [&str; 5] = [
    "#ff0033", // red
    "#111111", // near black
    "#8a001a", // dark red
    "#2b2b2b", // dark gray
    "#acacac", // near-white highlight
];

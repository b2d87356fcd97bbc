// Reward Service endpoints
pub const SPIN_ENDPOINT: &str = "/api/spin";
pub const LUCKY_SPIN_ENDPOINT: &str = "/api/spin/lucky";
pub const CONFIG_ENDPOINT: &str = "/api/config";
pub const ITEMS_ENDPOINT: &str = "/api/items";

// Fetcher timing
pub const SPIN_COOLDOWN_MS: f64 = 3000.0;
pub const SPIN_TIMEOUT_MS: u32 = 15_000;
pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

// 5x spin
pub const FIVE_X_REELS: usize = 5;
pub const TRIPLE_LUCKY_REELS: usize = 3;
pub const MAX_EVENT_RETRIES: u32 = 5;
pub const REEL_STAGGER_MS: [u32; 5] = [0, 200, 400, 600, 800];

// Wheel fallbacks, used when the config document is unreachable or invalid
pub const DEFAULT_ITEM_WIDTH: f64 = 80.0;
pub const DEFAULT_SPIN_DURATION_MS: f64 = 4000.0;
pub const DEFAULT_REEL_LENGTH: usize = 80;
pub const DEFAULT_FINAL_INDEX: usize = 72;
pub const DEFAULT_IMAGE_BASE_URL: &str =
    "https://raw.githubusercontent.com/btlmt-de/FIB/main/ForceItemBattle/assets/minecraft/textures/fib";
pub const DEFAULT_WHEEL_TEXTURE_URL: &str =
    "https://raw.githubusercontent.com/btlmt-de/FIB/main/ForceItemBattle/assets/minecraft/textures/item/wheel.png";

// Filler rolls: cumulative thresholds, highest rarity first
pub const FILLER_INSANE_THRESHOLD: f64 = 0.001;
pub const FILLER_MYTHIC_THRESHOLD: f64 = 0.003;
pub const FILLER_LEGENDARY_THRESHOLD: f64 = 0.033;
pub const FILLER_RARE_THRESHOLD: f64 = 0.053;

// Edge tension: shared by every variant
pub const EDGE_SHORT_PROBABILITY: f64 = 0.15;
pub const EDGE_PAST_PROBABILITY: f64 = 0.15;
pub const EDGE_STRONG_MIN: f64 = 0.30; // fraction of one item width
pub const EDGE_STRONG_MAX: f64 = 0.42;
pub const EDGE_SOFT_MAX: f64 = 0.15;

// Bonus wheel
pub const BONUS_REEL_LENGTH: usize = 40;
pub const BONUS_FINAL_INDEX: usize = BONUS_REEL_LENGTH - 5;
pub const BONUS_ITEM_WIDTH: f64 = 140.0;
pub const BONUS_SPIN_DURATION_MS: f64 = 3500.0;
pub const EVENT_REVEAL_DELAY_MS: u32 = 1500;
pub const BONUS_RESULT_DELAY_MS: u32 = 1500;

// User-facing messages
pub const COOLDOWN_MESSAGE: &str = "Please wait a moment before spinning again.";
pub const NETWORK_ERROR_MESSAGE: &str = "Server unavailable. Please try again later.";
pub const GENERIC_SPIN_ERROR: &str = "Spin failed. Please try again.";
pub const MALFORMED_RESPONSE_ERROR: &str = "The server sent an incomplete spin result.";
pub const UNKNOWN_BONUS_ERROR: &str = "Unknown bonus event.";

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Activity pair forced for a top-tier draw and used when no activity list
/// is available at all.
pub const GREAT_LUCK_GOOD: &str = "诸事皆宜";
pub const GREAT_LUCK_BAD: &str = "无";

/// Deterministic xorshift64 generator.
///
/// Library RNGs do not promise the same sequence across versions or
/// platforms, and the daily draw must be bit-identical everywhere, so the
/// generator is self-contained. Never swap in a non-deterministic source
/// here.
struct LuckRng {
    state: u64,
}

impl LuckRng {
    fn new(seed: u64) -> Self {
        // xorshift requires a non-zero state
        let state = if seed == 0 { 1 } else { seed };
        LuckRng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Reproducible per-(user, date) luck value in [1, 100].
///
/// The md5 digest of `user_id + date` is the sole source of randomness:
/// repeating the call with the same inputs yields the same value on any
/// process and platform, which defeats re-roll attempts within a day.
pub fn luck_value(user_id: &str, date: &str) -> u32 {
    let seed_str = format!("{}{}", user_id, date);
    let digest = md5::compute(seed_str.as_bytes());
    let wide = u128::from_be_bytes(digest.0);
    let seed = (wide >> 64) as u64 ^ wide as u64;

    let mut rng = LuckRng::new(seed);
    (rng.next_u64() % 100) as u32 + 1
}

/// Five ordered luck tiers derived from the luck value by fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuckLevel {
    DaJi,
    ZhongJi,
    XiaoJi,
    Ping,
    Xiong,
}

impl LuckLevel {
    pub fn from_value(value: u32) -> Self {
        match value {
            90..=u32::MAX => LuckLevel::DaJi,
            80..=89 => LuckLevel::ZhongJi,
            50..=79 => LuckLevel::XiaoJi,
            30..=49 => LuckLevel::Ping,
            _ => LuckLevel::Xiong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LuckLevel::DaJi => "大吉",
            LuckLevel::ZhongJi => "中吉",
            LuckLevel::XiaoJi => "小吉",
            LuckLevel::Ping => "平",
            LuckLevel::Xiong => "凶",
        }
    }
}

impl std::fmt::Display for LuckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Pick one suggested and one discouraged activity.
///
/// Unlike the luck value this choice is intentionally not reproducible; a
/// luck value of 90 or above overrides both picks with the fixed pair.
pub fn pick_activities(good: &[String], bad: &[String], luck: u32) -> (String, String) {
    if luck >= 90 {
        return (GREAT_LUCK_GOOD.to_string(), GREAT_LUCK_BAD.to_string());
    }

    let mut rng = rand::rng();
    let good_pick = if good.is_empty() {
        GREAT_LUCK_GOOD.to_string()
    } else {
        good[rng.random_range(0..good.len())].clone()
    };
    let bad_pick = if bad.is_empty() {
        GREAT_LUCK_BAD.to_string()
    } else {
        bad[rng.random_range(0..bad.len())].clone()
    };
    (good_pick, bad_pick)
}

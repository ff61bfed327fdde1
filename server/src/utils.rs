use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const ADJECTIVES: [&str; 24] = [
    "brave", "clumsy", "dizzy", "eager", "fancy", "fuzzy", "gentle", "grumpy", "happy", "jolly",
    "lucky", "mighty", "nimble", "plucky", "quirky", "rusty", "sleepy", "sneaky", "soggy",
    "spicy", "sturdy", "wobbly", "zany", "zesty",
];

const NOUNS: [&str; 24] = [
    "badger", "biscuit", "bishop", "castle", "falcon", "ferret", "gambit", "goblin", "hedgehog",
    "kettle", "knight", "llama", "lobster", "muffin", "noodle", "otter", "pawn", "pickle",
    "pigeon", "rook", "sardine", "teapot", "walrus", "wombat",
];

// Current Unix time in milliseconds
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Random two-word name for games nobody named
pub fn silly_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("odd");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("board");
    format!("{}-{}-{}", adjective, noun, rng.gen_range(10..100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silly_name_shape() {
        for _ in 0..50 {
            let name = silly_name();
            let parts: Vec<&str> = name.split('-').collect();
            assert_eq!(parts.len(), 3);
            assert!(ADJECTIVES.contains(&parts[0]));
            assert!(NOUNS.contains(&parts[1]));
            let n: u32 = parts[2].parse().unwrap();
            assert!((10..100).contains(&n));
        }
    }

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01 in ms
        assert!(timestamp_ms() > 1_577_836_800_000);
    }
}

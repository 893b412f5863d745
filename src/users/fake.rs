//! Fabricated user details.

use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bill", "Carmen", "Dmitri", "Elena", "Farah", "Grace", "Hiro", "Ines", "Jonas", "Kwame", "Lena",
];

const LAST_NAMES: &[&str] = &[
    "Jones", "Okafor", "Lindqvist", "Moreau", "Nakamura", "Patel", "Quinn", "Rossi", "Santos", "Tanaka",
];

const DOMAINS: &[&str] = &["example.com", "mail.test", "bigcorp.com", "inbox.dev"];

pub fn name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Doe");
    format!("{} {}", first, last)
}

/// Address derived from a name, e.g. `grace.rossi42@mail.test`.
pub fn email<R: Rng + ?Sized>(rng: &mut R, name: &str) -> String {
    let local = name.to_ascii_lowercase().replace(' ', ".");
    let domain = DOMAINS.choose(rng).copied().unwrap_or("example.com");
    format!("{}{}@{}", local, rng.gen_range(1..100), domain)
}

pub fn id<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..100_000)
}

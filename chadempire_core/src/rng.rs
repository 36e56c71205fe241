use std::collections::VecDeque;
use std::sync::Mutex;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

// Every draw in the game consumes floats in [0,1) from a RandomSource, in a
// fixed order, so a scripted stream reproduces a spin exactly.

pub type HmacSha256 = Hmac<Sha256>;

pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

// Live spin path. Not verifiable by players.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Replays a fixed sequence, then repeats `fallback` forever.
#[derive(Debug)]
pub struct ScriptedRandom {
    values: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self::with_fallback(values, 0.0)
    }

    pub fn with_fallback(values: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            fallback,
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

fn chunk_to_unit(chunk: &[u8]) -> f64 {
    let v = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    (v as f64) / (u32::MAX as f64 + 1.0)
}

struct SeededStream {
    buffer: Vec<u8>,
    offset: usize,
}

/// Reproducible HMAC-SHA256 stream keyed by `server_seed` over
/// `client_seed:nonce`. Used for offline simulations, not on the live path.
pub struct SeededRandom {
    server_seed: String,
    stream: Mutex<SeededStream>,
}

impl SeededRandom {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let server_seed: String = server_seed.into();
        let client_seed: String = client_seed.into();
        let buffer = hmac_bytes(&server_seed, &client_seed, nonce).to_vec();
        Self {
            server_seed,
            stream: Mutex::new(SeededStream { buffer, offset: 0 }),
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        let mut stream = self.stream.lock().unwrap_or_else(|e| e.into_inner());
        if stream.offset + 4 > stream.buffer.len() {
            stream.buffer = Sha256::digest(&stream.buffer).to_vec();
            stream.offset = 0;
        }
        let at = stream.offset;
        stream.offset += 4;
        chunk_to_unit(&stream.buffer[at..at + 4])
    }
}

pub fn hmac_bytes(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes()).expect("HMAC key");
    mac.update(format!("{client_seed}:{nonce}").as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

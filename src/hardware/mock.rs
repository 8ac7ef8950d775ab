//! Mock Hardware Implementations
//!
//! Simulated UV-erasable memory for testing without a programmer attached.
//! All delays use `tokio::time`, so tests running on a paused clock see exact,
//! repeatable timings.
//!
//! # Erase model
//!
//! After a write, byte `i` of `n` keeps its programmed value until
//! `start + (end - start) * (i + 1) / n` has elapsed and reads `0xFF` afterwards, so the
//! erase percentage ramps from the programmed state to 100% across the erase window.
//!
//! Optional flicker clears one bit of an otherwise blank image with a fixed probability,
//! reproducing parts that read erased, drop out once, then settle.

use crate::error::AppResult;
use crate::hardware::capabilities::MemoryDevice;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Programmer identity written into run headers for simulated runs.
pub const PROGRAMMER_ID: &str = "mock";

struct MockState {
    programmed: Vec<u8>,
    written_at: Instant,
    script: VecDeque<Vec<u8>>,
    last_scripted: Option<Vec<u8>>,
    rng: StdRng,
}

/// Flicker parameters
#[derive(Debug, Clone, Copy)]
struct Flicker {
    probability: f64,
}

/// Simulated EPROM
///
/// # Example
///
/// ```rust,ignore
/// let eprom = MockEprom::new("2716", 2048)
///     .with_erase_window(Duration::from_secs(30), Duration::from_secs(90))
///     .with_read_latency(Duration::from_millis(500));
/// let image = eprom.read().await?;
/// ```
pub struct MockEprom {
    name: String,
    erase_start: Duration,
    erase_end: Duration,
    read_latency: Duration,
    write_latency: Duration,
    flicker: Option<Flicker>,
    scripted: bool,
    state: Mutex<MockState>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MockEprom {
    /// Create a fully programmed (all zero) device of `size` bytes.
    ///
    /// Defaults: erase window 10..60 s, no latency, no flicker.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            erase_start: Duration::from_secs(10),
            erase_end: Duration::from_secs(60),
            read_latency: Duration::ZERO,
            write_latency: Duration::ZERO,
            flicker: None,
            scripted: false,
            state: Mutex::new(MockState {
                programmed: vec![0u8; size],
                written_at: Instant::now(),
                script: VecDeque::new(),
                last_scripted: None,
                rng: StdRng::seed_from_u64(0),
            }),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Create a device that returns `images` in order, repeating the last one.
    pub fn scripted(name: impl Into<String>, images: Vec<Vec<u8>>) -> Self {
        let size = images.first().map_or(0, Vec::len);
        let mut eprom = Self::new(name, size);
        eprom.scripted = true;
        eprom.state.get_mut().script = images.into();
        eprom
    }

    /// Set the window over which the programmed image erases, relative to the last write.
    pub fn with_erase_window(mut self, start: Duration, end: Duration) -> Self {
        self.erase_start = start;
        self.erase_end = end.max(start);
        self
    }

    /// Start from the given programmed contents instead of all zeros.
    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.state.get_mut().programmed = contents;
        self
    }

    /// Simulate programmer read time.
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = latency;
        self
    }

    /// Simulate programmer write time.
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    /// Clear a bit of a blank image with `probability` per read, using a seeded RNG.
    pub fn with_flicker(mut self, probability: f64, seed: u64) -> Self {
        self.flicker = Some(Flicker {
            probability: probability.clamp(0.0, 1.0),
        });
        self.state.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of completed reads
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of completed writes
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn modeled_image(&self, state: &MockState) -> Vec<u8> {
        let elapsed = state.written_at.elapsed();
        let n = state.programmed.len();
        let window = self.erase_end.saturating_sub(self.erase_start);
        state
            .programmed
            .iter()
            .enumerate()
            .map(|(i, &byte)| {
                let fraction = (i + 1) as f64 / n as f64;
                let erased_at = self.erase_start + window.mul_f64(fraction);
                if elapsed >= erased_at {
                    0xFF
                } else {
                    byte
                }
            })
            .collect()
    }
}

#[async_trait]
impl MemoryDevice for MockEprom {
    fn name(&self) -> &str {
        &self.name
    }

    fn programmer(&self) -> &str {
        PROGRAMMER_ID
    }

    async fn read(&self) -> AppResult<Vec<u8>> {
        sleep(self.read_latency).await;

        let mut state = self.state.lock().await;
        let mut image = if self.scripted {
            match state.script.pop_front() {
                Some(next) => {
                    state.last_scripted = Some(next.clone());
                    next
                }
                None => state.last_scripted.clone().unwrap_or_default(),
            }
        } else {
            self.modeled_image(&state)
        };

        if let Some(flicker) = self.flicker {
            let blank = !image.is_empty() && image.iter().all(|&b| b == 0xFF);
            if blank && state.rng.gen_bool(flicker.probability) {
                let index = state.rng.gen_range(0..image.len());
                image[index] &= 0xFE;
            }
        }

        self.reads.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(device = %self.name, bytes = image.len(), "MockEprom: read");
        Ok(image)
    }

    async fn write(&self, image: &[u8], _verify: bool) -> AppResult<()> {
        sleep(self.write_latency).await;

        let mut state = self.state.lock().await;
        state.programmed = image.to_vec();
        state.written_at = Instant::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(device = %self.name, bytes = image.len(), "MockEprom: write");
        Ok(())
    }
}

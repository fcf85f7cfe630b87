//! Snowflake ID Generator
//!
//! Time-ordered 64-bit ids for chats, messages and friend requests.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Default epoch (2024-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1_704_067_200_000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const MACHINE_MASK: u64 = (1 << MACHINE_BITS) - 1;

/// Snowflake ID generator
///
/// Layout: 41 bits of milliseconds since `epoch`, 10 bits of machine id,
/// 12 bits of per-millisecond sequence.
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch: u64,
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, epoch: u64) -> Self {
        Self {
            machine_id: machine_id & MACHINE_MASK,
            epoch,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let mut timestamp = current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond
                while timestamp <= state.last_timestamp {
                    timestamp = current_timestamp();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let elapsed = timestamp.saturating_sub(self.epoch);
        ((elapsed << (MACHINE_BITS + SEQUENCE_BITS))
            | (self.machine_id << SEQUENCE_BITS)
            | state.sequence) as i64
    }

    /// Extract the creation time (ms since Unix epoch) from an id made by this generator
    pub fn timestamp_of(&self, id: i64) -> u64 {
        ((id as u64) >> (MACHINE_BITS + SEQUENCE_BITS)) + self.epoch
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(1, DEFAULT_EPOCH)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

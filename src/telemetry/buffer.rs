//! Fixed-capacity rolling buffer of readings, oldest first.

use super::TelemetryError;
use crate::types::Reading;
use std::collections::VecDeque;

/// Readings strictly ascending by timestamp, never more than `capacity`.
///
/// Once full, every accepted push evicts exactly one reading from the front.
#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl TelemetryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Replace the contents with `history`, keeping its newest `capacity`
    /// readings. Rejects unordered input and leaves the buffer untouched.
    pub fn replace(&mut self, history: Vec<Reading>) -> Result<(), TelemetryError> {
        if let Some(pair) = history
            .windows(2)
            .find(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(TelemetryError::OutOfOrder {
                newest: pair[0].timestamp,
                rejected: pair[1].timestamp,
            });
        }

        let skip = history.len().saturating_sub(self.capacity);
        self.readings = history.into_iter().skip(skip).collect();
        Ok(())
    }

    /// Append `reading`, returning the evicted oldest reading once full.
    pub fn push(&mut self, reading: Reading) -> Result<Option<Reading>, TelemetryError> {
        if let Some(newest) = self.readings.back() {
            if reading.timestamp <= newest.timestamp {
                return Err(TelemetryError::OutOfOrder {
                    newest: newest.timestamp,
                    rejected: reading.timestamp,
                });
            }
        }
        if self.capacity == 0 {
            return Ok(Some(reading));
        }

        let evicted = if self.readings.len() >= self.capacity {
            self.readings.pop_front()
        } else {
            None
        };
        self.readings.push_back(reading);
        Ok(evicted)
    }

    /// Owned copy, oldest first.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<Reading> {
        self.readings.back().copied()
    }

    pub fn oldest(&self) -> Option<Reading> {
        self.readings.front().copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.readings.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

//! Round-trip latency estimation from periodic ping/pong.

use protocol::ClientPacket;
use std::collections::VecDeque;

const HISTORY_LEN: usize = 100;

#[derive(Debug)]
pub struct LatencyProbe {
    last_ping_sent: Option<u64>,
    latency_ms: Option<u64>,
    history: VecDeque<u64>,
}

impl LatencyProbe {
    pub fn new() -> Self {
        Self {
            last_ping_sent: None,
            latency_ms: None,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn ping(&mut self, now_ms: u64) -> ClientPacket {
        self.last_ping_sent = Some(now_ms);
        ClientPacket::Ping { timestamp: now_ms }
    }

    /// Records the round trip of an echoed ping timestamp.
    pub fn on_pong(&mut self, echoed_ms: u64, now_ms: u64) -> u64 {
        let rtt = now_ms.saturating_sub(echoed_ms);
        self.latency_ms = Some(rtt);

        self.history.push_back(rtt);
        while self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
        rtt
    }

    /// Latest round-trip estimate in milliseconds.
    pub fn latency(&self) -> Option<u64> {
        self.latency_ms
    }

    pub fn last_ping_sent(&self) -> Option<u64> {
        self.last_ping_sent
    }

    pub fn average(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        let sum: u64 = self.history.iter().sum();
        Some(sum as f32 / self.history.len() as f32)
    }

    /// Spread between the slowest and fastest recent samples.
    pub fn jitter(&self) -> Option<u64> {
        let max = self.history.iter().max()?;
        let min = self.history.iter().min()?;
        Some(max - min)
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.last_ping_sent = None;
        self.latency_ms = None;
        self.history.clear();
    }
}

impl Default for LatencyProbe {
    fn default() -> Self {
        Self::new()
    }
}

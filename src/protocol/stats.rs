//! Handoff counters

/// Producer-side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Frames written and handed to the consumer
    pub frames_written: u64,
    /// Frames dropped because the consumer still held the payload
    pub frames_skipped: u64,
}

impl ProducerStats {
    /// Share of offered frames that were dropped (0.0 to 1.0)
    pub fn drop_rate(&self) -> f64 {
        let offered = self.frames_written + self.frames_skipped;
        if offered == 0 {
            return 0.0;
        }
        self.frames_skipped as f64 / offered as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "ProducerStats {{ written: {}, skipped: {}, drop_rate: {:.2}% }}",
            self.frames_written,
            self.frames_skipped,
            self.drop_rate() * 100.0
        )
    }
}

/// Consumer-side counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Frames copied out of the region
    pub frames_consumed: u64,
    /// Polls that found the producer still holding the payload
    pub empty_polls: u64,
}

impl ConsumerStats {
    /// Share of polls that yielded a frame (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let polls = self.frames_consumed + self.empty_polls;
        if polls == 0 {
            return 0.0;
        }
        self.frames_consumed as f64 / polls as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "ConsumerStats {{ consumed: {}, empty_polls: {}, hit_rate: {:.2}% }}",
            self.frames_consumed,
            self.empty_polls,
            self.hit_rate() * 100.0
        )
    }
}

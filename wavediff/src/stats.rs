/// Converts an amplitude to decibels.
pub fn to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

/// Peak and average of the absolute difference of one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStats {
    /// Largest absolute difference.
    pub peak: f64,
    /// Frame index of the first occurrence of the peak.
    pub peak_frame: u64,
    sum: f64,
    count: u64,
}

impl ChannelStats {
    pub fn add(&mut self, frame: u64, diff: f64) {
        let value = diff.abs();
        if value > self.peak {
            self.peak = value;
            self.peak_frame = frame;
        }
        self.sum += value;
        self.count += 1;
    }

    /// Mean of the absolute differences, 0 if nothing was added.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    pub fn peak_db(&self) -> f64 {
        to_db(self.peak)
    }

    pub fn average_db(&self) -> f64 {
        to_db(self.average())
    }
}

use std::time::Duration;

/// Coax bus bit rate in bits per second.
pub const BIT_RATE: u32 = 2_358_700;

/// Line samples per bit period.
///
/// The signal generator runs at twelve times the bit rate, so every timing on
/// the line is a whole number of ticks.
pub const TICKS_PER_BIT: usize = 12;

/// Ticks in half a bit period, the width of one Manchester half.
pub const HALF_BIT: usize = TICKS_PER_BIT / 2;

/// A sampled line signal, one level per tick. `true` is high.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Waveform {
    samples: Vec<bool>,
}

/// A run of identical samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub level: bool,
    pub ticks: usize,
}

impl Waveform {
    /// Create an empty waveform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty waveform with room for `ticks` samples.
    pub fn with_capacity(ticks: usize) -> Self {
        Self {
            samples: Vec::with_capacity(ticks),
        }
    }

    /// Wrap raw samples.
    pub fn from_samples(samples: Vec<bool>) -> Self {
        Self { samples }
    }

    /// Hold `level` for `ticks`.
    pub fn push(&mut self, level: bool, ticks: usize) {
        self.samples.extend(std::iter::repeat(level).take(ticks));
    }

    /// Hold the line low for `ticks`.
    pub fn idle(&mut self, ticks: usize) {
        self.push(false, ticks);
    }

    /// Append another waveform.
    pub fn extend(&mut self, other: &Waveform) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// All samples.
    pub fn samples(&self) -> &[bool] {
        &self.samples
    }

    /// Consume the waveform and return its samples.
    pub fn into_samples(self) -> Vec<bool> {
        self.samples
    }

    /// Level at `tick`, if within the waveform.
    pub fn level_at(&self, tick: usize) -> Option<bool> {
        self.samples.get(tick).copied()
    }

    /// Number of ticks.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Wall-clock duration of the waveform at [`BIT_RATE`].
    pub fn duration(&self) -> Duration {
        ticks_to_duration(self.samples.len())
    }

    /// Iterate over runs of identical level.
    pub fn runs(&self) -> Runs<'_> {
        Runs {
            samples: &self.samples,
            pos: 0,
        }
    }
}

/// Wall-clock duration of `ticks` line ticks.
pub fn ticks_to_duration(ticks: usize) -> Duration {
    let ticks_per_second = TICKS_PER_BIT as u64 * BIT_RATE as u64;
    Duration::from_nanos(ticks as u64 * 1_000_000_000 / ticks_per_second)
}

/// Iterator returned by [`Waveform::runs`].
pub struct Runs<'a> {
    samples: &'a [bool],
    pos: usize,
}

impl Iterator for Runs<'_> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        let level = *self.samples.get(self.pos)?;
        let ticks = self.samples[self.pos..]
            .iter()
            .take_while(|&&sample| sample == level)
            .count();
        self.pos += ticks;
        Some(Run { level, ticks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_runs() {
        let mut wave = Waveform::new();
        wave.idle(3);
        wave.push(true, HALF_BIT);
        wave.push(true, 2);
        wave.idle(1);

        let runs: Vec<Run> = wave.runs().collect();
        assert_eq!(
            runs,
            vec![
                Run { level: false, ticks: 3 },
                Run { level: true, ticks: 8 },
                Run { level: false, ticks: 1 },
            ]
        );
        assert_eq!(wave.len(), 12);
        assert_eq!(wave.level_at(3), Some(true));
        assert_eq!(wave.level_at(12), None);
    }

    #[test]
    fn duration_of_one_bit() {
        let mut wave = Waveform::new();
        wave.idle(TICKS_PER_BIT * BIT_RATE as usize / 1000);
        // One millisecond worth of bits, give or take integer rounding.
        let nanos = wave.duration().as_nanos();
        assert!((999_000..=1_000_000).contains(&nanos), "{nanos}");
    }

    #[test]
    fn empty_waveform_has_no_runs() {
        let wave = Waveform::new();
        assert!(wave.is_empty());
        assert_eq!(wave.runs().count(), 0);
        assert_eq!(wave.duration(), Duration::ZERO);
    }
}

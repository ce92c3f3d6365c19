//! Focus time accounting for a single recording session.

use std::time::Duration;

use tokio::time::Instant;

/// Accumulated focus time per raw window title, in first-seen order.
///
/// Order matters: [`FocusAccumulator::dominant`] breaks ties in favour of the
/// title that was recorded first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusAccumulator {
    entries: Vec<(String, Duration)>,
}

impl FocusAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `elapsed` to the total for `title`, creating the entry if needed.
    pub fn credit(&mut self, title: &str, elapsed: Duration) {
        if let Some((_, total)) = self.entries.iter_mut().find(|(t, _)| t == title) {
            *total += elapsed;
        } else {
            self.entries.push((title.to_string(), elapsed));
        }
    }

    /// Total time credited to `title`.
    pub fn get(&self, title: &str) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, total)| *total)
    }

    /// The title with the most accumulated time.
    ///
    /// Ties go to the earliest inserted title. Returns `None` when nothing was
    /// recorded.
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<&(String, Duration)> = None;
        for entry in &self.entries {
            if best.is_none_or(|(_, max)| entry.1 > *max) {
                best = Some(entry);
            }
        }
        best.map(|(title, _)| title.as_str())
    }

    /// Sum of all accumulated durations.
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, total)| *total).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.entries.iter().map(|(title, total)| (title.as_str(), *total))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Turns a sequence of title samples into accumulated durations.
///
/// Each sample credits the interval since the previous sample to the
/// *previous* title: the title seen at a poll is assumed to have held focus
/// until the next poll.
#[derive(Debug, Default)]
pub struct FocusSampler {
    last: Option<(String, Instant)>,
}

impl FocusSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `title` was focused at `now`.
    pub fn record(&mut self, title: &str, now: Instant, focus: &mut FocusAccumulator) {
        if let Some((last_title, last_at)) = &self.last {
            focus.credit(last_title, now.saturating_duration_since(*last_at));
        }
        self.last = Some((title.to_string(), now));
    }

    /// Credits the tail interval up to `now` and forgets the last sample.
    pub fn flush(&mut self, now: Instant, focus: &mut FocusAccumulator) {
        if let Some((last_title, last_at)) = self.last.take() {
            focus.credit(&last_title, now.saturating_duration_since(last_at));
        }
    }

    /// The most recently sampled title.
    pub fn last_title(&self) -> Option<&str> {
        self.last.as_ref().map(|(title, _)| title.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn dominant_picks_largest_total() {
        let mut focus = FocusAccumulator::new();
        focus.credit("Editor", secs(3));
        focus.credit("Game", secs(4));
        focus.credit("Editor", secs(2));

        assert_eq!(focus.get("Editor"), Some(secs(5)));
        assert_eq!(focus.dominant(), Some("Editor"));
        assert_eq!(focus.total(), secs(9));
    }

    #[test]
    fn dominant_tie_goes_to_first_inserted() {
        let mut focus = FocusAccumulator::new();
        focus.credit("A", secs(5));
        focus.credit("B", secs(5));
        assert_eq!(focus.dominant(), Some("A"));

        let mut reversed = FocusAccumulator::new();
        reversed.credit("B", secs(5));
        reversed.credit("A", secs(5));
        assert_eq!(reversed.dominant(), Some("B"));
    }

    #[test]
    fn empty_accumulator_has_no_dominant() {
        let focus = FocusAccumulator::new();
        assert_eq!(focus.dominant(), None);
        assert!(focus.is_empty());
    }

    #[test]
    fn sampler_credits_previous_title() {
        let start = Instant::now();
        let mut focus = FocusAccumulator::new();
        let mut sampler = FocusSampler::new();

        sampler.record("Editor", start, &mut focus);
        assert!(focus.is_empty());

        sampler.record("Game", start + secs(2), &mut focus);
        sampler.record("Game", start + secs(3), &mut focus);
        sampler.flush(start + secs(10), &mut focus);

        assert_eq!(focus.get("Editor"), Some(secs(2)));
        assert_eq!(focus.get("Game"), Some(secs(8)));
        assert_eq!(focus.total(), secs(10));
        assert_eq!(sampler.last_title(), None);
    }

    #[test]
    fn flush_without_samples_is_a_no_op() {
        let mut focus = FocusAccumulator::new();
        FocusSampler::new().flush(Instant::now(), &mut focus);
        assert!(focus.is_empty());
    }
}

use std::time::{Duration, Instant};

/// Character-by-character reveal of text that is already fully known.
///
/// Progress is derived from the clock, so there is no timer to cancel and the
/// owning log never waits on it.
#[derive(Debug, Clone)]
pub struct Reveal {
    text: String,
    total_chars: usize,
    started_at: Instant,
    interval: Duration,
}

impl Reveal {
    pub fn new(text: impl Into<String>, interval: Duration) -> Self {
        Self::starting_at(text, interval, Instant::now())
    }

    pub fn starting_at(text: impl Into<String>, interval: Duration, started_at: Instant) -> Self {
        let text = text.into();
        let total_chars = text.chars().count();
        Self {
            text,
            total_chars,
            started_at,
            interval,
        }
    }

    /// Already complete.
    pub fn instant(text: impl Into<String>) -> Self {
        Self::new(text, Duration::ZERO)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visible_chars(&self, now: Instant) -> usize {
        if self.interval.is_zero() {
            return self.total_chars;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        let shown = elapsed.as_nanos() / self.interval.as_nanos();
        shown.min(self.total_chars as u128) as usize
    }

    pub fn visible(&self, now: Instant) -> &str {
        let chars = self.visible_chars(now);
        let end = self
            .text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[..end]
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.visible_chars(now) >= self.total_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_one_char_per_interval() {
        let start = Instant::now();
        let reveal = Reveal::starting_at("hello", Duration::from_millis(30), start);

        assert_eq!(reveal.visible(start), "");
        assert_eq!(reveal.visible(start + Duration::from_millis(29)), "");
        assert_eq!(reveal.visible(start + Duration::from_millis(30)), "h");
        assert_eq!(reveal.visible(start + Duration::from_millis(95)), "hel");
        assert!(!reveal.is_complete(start + Duration::from_millis(120)));
        assert_eq!(reveal.visible(start + Duration::from_secs(10)), "hello");
        assert!(reveal.is_complete(start + Duration::from_millis(150)));
    }

    #[test]
    fn never_splits_multibyte_chars() {
        let start = Instant::now();
        let reveal = Reveal::starting_at("né€o", Duration::from_millis(10), start);
        assert_eq!(reveal.visible(start + Duration::from_millis(20)), "né");
        assert_eq!(reveal.visible(start + Duration::from_millis(30)), "né€");
    }

    #[test]
    fn instant_reveal_is_complete() {
        let reveal = Reveal::instant("typed by you");
        assert_eq!(reveal.visible(Instant::now()), "typed by you");
    }

    #[test]
    fn clock_before_start_shows_nothing() {
        let start = Instant::now() + Duration::from_secs(5);
        let reveal = Reveal::starting_at("abc", Duration::from_millis(10), start);
        assert_eq!(reveal.visible_chars(Instant::now()), 0);
    }
}

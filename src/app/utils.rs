// src/app/utils.rs
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

const PLACEHOLDER_TITLE_CHARS: usize = 20;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern")
});

/// Stand-in artwork for titles without a poster.
pub(crate) fn placeholder_poster_url(title: &str) -> String {
    let short: String = title.chars().take(PLACEHOLDER_TITLE_CHARS).collect();
    format!(
        "https://placehold.co/230x288/png?text={}",
        urlencoding::encode(&short)
    )
}

/// Source rating (0..=10) as five stars in half steps, e.g. "★★★★½".
pub(crate) fn star_rating(rating: f64) -> String {
    let halves = (rating.clamp(0.0, 10.0)).round() as usize;
    let full = halves / 2;
    let half = halves % 2 == 1;
    let empty = 5 - full - usize::from(half);
    let mut s = "★".repeat(full);
    if half {
        s.push('½');
    }
    s.push_str(&"☆".repeat(empty));
    s
}

/// "9.3 (2900000)", or empty when unrated.
pub(crate) fn rating_line(rating: f64, votes: u64) -> String {
    if rating <= 0.0 {
        return String::new();
    }
    if votes > 0 {
        format!("{rating:.1} ({votes})")
    } else {
        format!("{rating:.1}")
    }
}

pub(crate) fn format_runtime(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, 0) => "N/A".into(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

pub(crate) fn avatar_initial(username: &str) -> String {
    username
        .trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "U".into())
}

pub(crate) fn is_plausible_email(s: &str) -> bool {
    EMAIL_RE.is_match(s.trim())
}

/// Holds the latest value until it has been quiet for `delay`.
pub(crate) struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub(crate) const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub(crate) fn push(&mut self, value: String, now: Instant) {
        self.pending = Some((value, now));
    }

    pub(crate) fn poll(&mut self, now: Instant) -> Option<String> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.duration_since(*at) >= self.delay);
        if due {
            self.pending.take().map(|(v, _)| v)
        } else {
            None
        }
    }

    pub(crate) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_truncates_and_encodes() {
        assert_eq!(
            placeholder_poster_url("Dr. Strangelove or: How I Learned to Stop Worrying"),
            "https://placehold.co/230x288/png?text=Dr.%20Strangelove%20or%3A%20"
        );
        assert_eq!(
            placeholder_poster_url("Amélie"),
            "https://placehold.co/230x288/png?text=Am%C3%A9lie"
        );
    }

    #[test]
    fn stars_use_half_steps() {
        assert_eq!(star_rating(0.0), "☆☆☆☆☆");
        assert_eq!(star_rating(9.3), "★★★★½");
        assert_eq!(star_rating(10.0), "★★★★★");
        assert_eq!(star_rating(6.0), "★★★☆☆");
        assert_eq!(star_rating(42.0), "★★★★★");
    }

    #[test]
    fn rating_line_hides_unrated() {
        assert_eq!(rating_line(0.0, 100), "");
        assert_eq!(rating_line(9.3, 2_900_000), "9.3 (2900000)");
        assert_eq!(rating_line(7.0, 0), "7.0");
    }

    #[test]
    fn runtime_formats() {
        assert_eq!(format_runtime(0), "N/A");
        assert_eq!(format_runtime(45), "45m");
        assert_eq!(format_runtime(120), "2h");
        assert_eq!(format_runtime(142), "2h 22m");
    }

    #[test]
    fn avatar_falls_back_to_u() {
        assert_eq!(avatar_initial("ripley"), "R");
        assert_eq!(avatar_initial("  "), "U");
    }

    #[test]
    fn email_shape_check() {
        assert!(is_plausible_email("a@b.co"));
        assert!(is_plausible_email(" ripley@nostromo.space "));
        assert!(!is_plausible_email("ripley"));
        assert!(!is_plausible_email("ripley@nostromo"));
        assert!(!is_plausible_email("rip ley@x.io"));
    }

    #[test]
    fn debouncer_emits_after_quiet_period() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.push("al".into(), t0);
        d.push("ali".into(), t0 + Duration::from_millis(100));
        assert_eq!(d.poll(t0 + Duration::from_millis(350)), None);
        assert!(d.is_pending());
        assert_eq!(
            d.poll(t0 + Duration::from_millis(400)),
            Some("ali".to_string())
        );
        assert!(!d.is_pending());
        assert_eq!(d.poll(t0 + Duration::from_secs(5)), None);
    }
}

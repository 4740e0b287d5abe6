use time::{Duration, OffsetDateTime};

/// Whether the best available evidence is stale: the decision is made on the
/// most recently modified cited passage, so one fresh citation keeps an
/// answer from being flagged.
pub fn evidence_is_stale(
	last_modified: &[OffsetDateTime],
	now: OffsetDateTime,
	max_age_days: i64,
) -> bool {
	match last_modified.iter().max() {
		Some(newest) => now - *newest > Duration::days(max_age_days),
		None => false,
	}
}

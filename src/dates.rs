//! Calendar helpers for sprint summaries.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Number of weekdays from `today` until the sprint ends on `end`.
///
/// An end date on a weekend counts as the Friday before it. Dates already in
/// the past give zero. `None` when the end date is unknown.
pub fn weekdays_until(end: Option<NaiveDate>, today: NaiveDate) -> Option<u32> {
  let end = previous_weekday_or_same(end?);

  let mut day = today;
  let mut count = 0;
  while day < end {
    day = next_weekday(day);
    count += 1;
  }
  Some(count)
}

fn is_weekend(date: NaiveDate) -> bool {
  matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn previous_weekday_or_same(mut date: NaiveDate) -> NaiveDate {
  while is_weekend(date) {
    date -= Duration::days(1);
  }
  date
}

fn next_weekday(mut date: NaiveDate) -> NaiveDate {
  date += Duration::days(1);
  while is_weekend(date) {
    date += Duration::days(1);
  }
  date
}

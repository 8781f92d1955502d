use chrono::{
  Datelike,
  Days,
  NaiveDate,
  Weekday
};
use serde::Serialize;

pub const WEEK_START: Weekday =
  Weekday::Mon;

/// An ascending, gap-free run of
/// calendar days whose length is a
/// multiple of seven.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct DateRange {
  days: Vec<NaiveDate>
}

impl DateRange {
  pub fn days(&self) -> &[NaiveDate] {
    &self.days
  }

  pub fn len(&self) -> usize {
    self.days.len()
  }

  pub fn is_empty(&self) -> bool {
    self.days.is_empty()
  }

  pub fn start(&self) -> NaiveDate {
    self
      .days
      .first()
      .copied()
      .unwrap_or(NaiveDate::MIN)
  }

  pub fn end(&self) -> NaiveDate {
    self
      .days
      .last()
      .copied()
      .unwrap_or(NaiveDate::MIN)
  }

  pub fn get(
    &self,
    index: usize
  ) -> Option<NaiveDate> {
    self.days.get(index).copied()
  }

  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    !self.days.is_empty()
      && date >= self.start()
      && date <= self.end()
  }

  pub fn index_of(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    if !self.contains(date) {
      return None;
    }
    usize::try_from(
      (date - self.start()).num_days()
    )
    .ok()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = NaiveDate> + '_
  {
    self.days.iter().copied()
  }
}

/// The Monday-to-Sunday week that
/// contains `anchor`.
#[must_use]
pub fn week_range(
  anchor: NaiveDate
) -> DateRange {
  let start =
    start_of_week(anchor, WEEK_START);
  DateRange {
    days: (0..7)
      .map(|offset| {
        add_days(start, offset)
      })
      .collect()
  }
}

/// Every week intersecting the month
/// of `anchor`, concatenated.
#[must_use]
pub fn month_range(
  anchor: NaiveDate
) -> DateRange {
  let first = first_day_of_month(
    anchor.year(),
    anchor.month()
  );
  let last = last_day_of_month(
    anchor.year(),
    anchor.month()
  );

  let mut days =
    Vec::with_capacity(42);
  let mut week_anchor = first;
  while week_anchor
    <= end_of_week(last, WEEK_START)
  {
    days.extend(
      week_range(week_anchor).days
    );
    week_anchor =
      add_days(week_anchor, 7);
  }

  DateRange {
    days
  }
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

pub fn end_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    start_of_week(day, week_start),
    6
  )
}

/// `None` when the result leaves
/// chrono's representable range.
pub fn checked_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  let step =
    Days::new(days.unsigned_abs());
  if days >= 0 {
    date.checked_add_days(step)
  } else {
    date.checked_sub_days(step)
  }
}

/// Stays on `date` at the edges of
/// the representable calendar.
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  checked_add_days(date, days)
    .unwrap_or(date)
}

/// Moves by whole months, clamping
/// the day to the target month's
/// length (Jan 31 + 1 = Feb 29/28).
pub fn checked_shift_months(
  date: NaiveDate,
  months: i32
) -> Option<NaiveDate> {
  let index = i64::from(date.year())
    * 12
    + i64::from(date.month0())
    + i64::from(months);
  let year =
    i32::try_from(index.div_euclid(12))
      .ok()?;
  let month =
    u32::try_from(index.rem_euclid(12))
      .ok()?
      + 1;

  let first =
    NaiveDate::from_ymd_opt(year, month, 1)?;
  let day = date
    .day()
    .min(days_in_month(year, month));
  first.with_day(day)
}

/// Stays on `date` at the edges of
/// the representable calendar.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  checked_shift_months(date, months)
    .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn week_range_for_midweek_anchor() {
    let range =
      week_range(date(2024, 3, 6));

    assert_eq!(range.len(), 7);
    assert_eq!(
      range.start(),
      date(2024, 3, 4)
    );
    assert_eq!(
      range.end(),
      date(2024, 3, 10)
    );
    assert_eq!(
      range.index_of(date(2024, 3, 6)),
      Some(2)
    );
  }

  #[test]
  fn monday_anchor_starts_the_range() {
    let range =
      week_range(date(2024, 3, 4));
    assert_eq!(
      range.start(),
      date(2024, 3, 4)
    );
  }

  #[test]
  fn week_range_holds_for_a_full_year()
  {
    let mut anchor = date(2023, 12, 25);
    for _ in 0..400 {
      let range = week_range(anchor);
      assert_eq!(range.len(), 7);
      assert_eq!(
        range.start().weekday(),
        Weekday::Mon
      );
      assert!(range.contains(anchor));
      assert!(
        range
          .days()
          .windows(2)
          .all(|w| {
            add_days(w[0], 1) == w[1]
          })
      );
      anchor = add_days(anchor, 1);
    }
  }

  #[test]
  fn month_range_covers_every_day_of_the_month()
   {
    for month in 1..=12 {
      let anchor = date(2024, month, 15);
      let range = month_range(anchor);

      assert_eq!(range.len() % 7, 0);
      assert!(
        (28..=42).contains(&range.len())
      );
      assert_eq!(
        range.start().weekday(),
        Weekday::Mon
      );
      let last =
        last_day_of_month(2024, month);
      assert!(range.contains(
        first_day_of_month(2024, month)
      ));
      assert!(range.contains(last));
    }
  }

  #[test]
  fn month_range_for_march_2024() {
    let range =
      month_range(date(2024, 3, 6));
    assert_eq!(
      range.start(),
      date(2024, 2, 26)
    );
    assert_eq!(
      range.end(),
      date(2024, 3, 31)
    );
    assert_eq!(range.len(), 35);
  }

  #[test]
  fn shift_months_clamps_day_of_month() {
    assert_eq!(
      shift_months(date(2024, 1, 31), 1),
      date(2024, 2, 29)
    );
    assert_eq!(
      shift_months(date(2023, 3, 31), -1),
      date(2023, 2, 28)
    );
    assert_eq!(
      shift_months(date(2024, 12, 15), 1),
      date(2025, 1, 15)
    );
    assert_eq!(
      shift_months(date(2024, 1, 15), -1),
      date(2023, 12, 15)
    );
  }

  #[test]
  fn arithmetic_stops_at_calendar_bounds() {
    assert_eq!(
      checked_add_days(
        date(2024, 3, 6),
        i64::MAX
      ),
      None
    );
    assert_eq!(
      checked_add_days(
        date(2024, 3, 6),
        i64::MIN
      ),
      None
    );
    assert_eq!(
      add_days(NaiveDate::MAX, 7),
      NaiveDate::MAX
    );
    assert_eq!(
      checked_shift_months(
        date(2024, 3, 6),
        i32::MAX
      ),
      None
    );
    assert_eq!(
      shift_months(NaiveDate::MIN, -1),
      NaiveDate::MIN
    );
    assert_eq!(
      checked_add_days(
        date(2024, 3, 6),
        -7
      ),
      Some(date(2024, 2, 28))
    );
  }

  #[test]
  fn index_of_outside_range_is_none() {
    let range =
      week_range(date(2024, 3, 6));
    assert_eq!(
      range.index_of(date(2024, 3, 11)),
      None
    );
    assert_eq!(
      range.get(7),
      None
    );
  }
}

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::date_range::{
  add_days,
  checked_add_days,
  checked_shift_months
};

const TIMEZONE_ENV_VAR: &str =
  "CALGRID_TIMEZONE";
const DEFAULT_TIMEZONE: &str = "UTC";

/// Resolves the timezone used to
/// project timestamps onto calendar
/// days: env var, then config, then
/// UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return tz;
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_TIMEZONE,
    "default"
  )
  .unwrap_or_else(|| {
    tracing::error!(
      "failed to parse fallback \
       timezone; using UTC"
    );
    chrono_tz::UTC
  })
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  Utc::now()
    .with_timezone(&tz)
    .date_naive()
}

#[must_use]
pub fn to_local_date(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  dt.with_timezone(&tz).date_naive()
}

/// Parses the `date` field of a task
/// record. Plain dates are taken as
/// is; timestamps are projected onto
/// the day they fall on in `tz`.
pub fn parse_task_date(
  raw: &str,
  tz: Tz
) -> anyhow::Result<NaiveDate> {
  let token = raw.trim();

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(to_local_date(
      dt.with_timezone(&Utc),
      tz
    ));
  }

  if let Ok(ndt) =
    NaiveDateTime::parse_from_str(
      token,
      "%Y%m%dT%H%M%SZ"
    )
  {
    return Ok(to_local_date(
      ndt.and_utc(),
      tz
    ));
  }

  Err(anyhow!(
    "unrecognized task date: {token}"
  ))
}

/// Parses a date argument relative to
/// `today`: `today`, `tomorrow`,
/// `yesterday`, `+Nd`/`-Nw`/`+Nm`, or
/// `YYYY-MM-DD`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_arg(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile failure: \
       {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let sign = caps
      .name("sign")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative sign")
      })?;
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!("missing relative unit")
      })?;
    let num =
      if sign == "-" { -num } else { num };

    let shifted = match unit {
      | "d" => checked_add_days(today, num),
      | "w" => {
        num
          .checked_mul(7)
          .and_then(|days| {
            checked_add_days(today, days)
          })
      }
      | "m" => {
        i32::try_from(num)
          .ok()
          .and_then(|months| {
            checked_shift_months(
              today, months
            )
          })
      }
      | _ => {
        return Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ));
      }
    };
    return shifted.ok_or_else(|| {
      anyhow!(
        "relative offset out of range: \
         {token}"
      )
    });
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .with_context(|| {
    format!(
      "invalid date '{token}'; \
       expected today, +Nd, -Nw, \
       +Nm or YYYY-MM-DD"
    )
  })
}

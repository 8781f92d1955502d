use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::de::IntoDeserializer;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::navigation::NavigationOptions;

const CONFIG_ENV_VAR: &str =
  "CALGRID_CONFIG";
const CONFIG_DIR_NAME: &str = "calgrid";
const CONFIG_FILE_NAME: &str =
  "calgrid.toml";

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct DisplayConfig {
  pub color:             bool,
  pub show_week_numbers: bool,
  pub max_title_width:   usize
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self {
      color:             true,
      show_week_numbers: true,
      max_title_width:
        default_max_title_width()
    }
  }
}

fn default_max_title_width() -> usize {
  24
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct CalendarConfig {
  pub timezone:     Option<String>,
  pub navigation:   NavigationOptions,
  pub display:      DisplayConfig,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

impl CalendarConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) = resolve_config_path(
      config_override
    )?
    else {
      warn!(
        "no config file found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    Self::from_file(&path)
  }

  pub fn from_file(
    path: &Path
  ) -> anyhow::Result<Self> {
    let text =
      fs::read_to_string(path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg = Self::from_toml(&text)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    cfg
      .loaded_files
      .push(path.to_path_buf());
    Ok(cfg)
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Self =
      toml::from_str(text)?;
    cfg.sanitize();
    trace!(?cfg, "parsed config");
    Ok(cfg)
  }

  /// Applies `key=value` overrides on
  /// top of the loaded file.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self
        .set(key.trim(), value.trim())
        .with_context(|| {
          format!(
            "invalid override \
             {key}={value}"
          )
        })?;
    }
    self.sanitize();
    Ok(())
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    match key {
      | "timezone" => {
        self.timezone =
          (!value.is_empty())
            .then(|| value.to_string());
      }
      | "navigation.default_view" => {
        self.navigation.default_view =
          parse_variant(value)?;
      }
      | "navigation.month_banding" => {
        self.navigation.month_banding =
          parse_variant(value)?;
      }
      | "navigation.selection_policy" => {
        self
          .navigation
          .selection_policy =
          parse_variant(value)?;
      }
      | "display.color" => {
        self.display.color =
          parse_bool(value)?;
      }
      | "display.show_week_numbers" => {
        self.display.show_week_numbers =
          parse_bool(value)?;
      }
      | "display.max_title_width" => {
        self.display.max_title_width =
          value.parse().context(
            "expected a width"
          )?;
      }
      | other => {
        return Err(anyhow!(
          "unknown config key: {other}"
        ));
      }
    }
    Ok(())
  }

  fn sanitize(&mut self) {
    if self.display.max_title_width == 0
    {
      self.display.max_title_width =
        default_max_title_width();
    }

    if self
      .timezone
      .as_deref()
      .is_some_and(|tz| {
        tz.trim().is_empty()
      })
    {
      self.timezone = None;
    }
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if trimmed == "/dev/null" {
      return Ok(None);
    }
    if !trimmed.is_empty() {
      return Ok(Some(PathBuf::from(
        trimmed
      )));
    }
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    debug!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn parse_variant<T>(
  value: &str
) -> anyhow::Result<T>
where
  T: for<'de> Deserialize<'de>
{
  let de: serde::de::value::StrDeserializer<
    '_,
    serde::de::value::Error
  > = value.into_deserializer();
  T::deserialize(de)
    .map_err(|e| anyhow!("{e}"))
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(anyhow!(
        "expected a boolean, got: \
         {other}"
      ))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::navigation::{
    CalendarView,
    MonthBanding,
    SelectionPolicy
  };

  #[test]
  fn empty_toml_yields_defaults() {
    let cfg = CalendarConfig::from_toml("")
      .expect("empty config");
    assert_eq!(
      cfg,
      CalendarConfig::default()
    );
    assert_eq!(
      cfg.navigation.month_banding,
      MonthBanding::FullMonth
    );
    assert_eq!(
      cfg.display.max_title_width,
      24
    );
  }

  #[test]
  fn toml_sections_are_read() {
    let cfg = CalendarConfig::from_toml(
      r#"
timezone = "Europe/Berlin"

[navigation]
default_view = "month"
month_banding = "anchor-week"
selection_policy = "remap"

[display]
color = false
max_title_width = 0
"#
    )
    .expect("valid config");

    assert_eq!(
      cfg.timezone.as_deref(),
      Some("Europe/Berlin")
    );
    assert_eq!(
      cfg.navigation.default_view,
      CalendarView::Month
    );
    assert_eq!(
      cfg.navigation.month_banding,
      MonthBanding::AnchorWeek
    );
    assert_eq!(
      cfg.navigation.selection_policy,
      SelectionPolicy::Remap
    );
    assert!(!cfg.display.color);
    assert!(cfg.display.show_week_numbers);
    assert_eq!(
      cfg.display.max_title_width,
      24
    );
  }

  #[test]
  fn unknown_variant_is_an_error() {
    let err = CalendarConfig::from_toml(
      "[navigation]\ndefault_view = \
       \"year\"\n"
    );
    assert!(err.is_err());
  }

  #[test]
  fn overrides_replace_loaded_values() {
    let mut cfg =
      CalendarConfig::default();
    cfg
      .apply_overrides(vec![
        (
          "navigation.default_view"
            .to_string(),
          "month".to_string()
        ),
        (
          "display.color".to_string(),
          "off".to_string()
        ),
        (
          "timezone".to_string(),
          "Asia/Tokyo".to_string()
        ),
      ])
      .expect("valid overrides");

    assert_eq!(
      cfg.navigation.default_view,
      CalendarView::Month
    );
    assert!(!cfg.display.color);
    assert_eq!(
      cfg.timezone.as_deref(),
      Some("Asia/Tokyo")
    );

    assert!(
      cfg
        .apply_overrides(vec![(
          "display.colour".to_string(),
          "on".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides(vec![(
          "navigation.month_banding"
            .to_string(),
          "fortnight".to_string()
        )])
        .is_err()
    );
  }
}

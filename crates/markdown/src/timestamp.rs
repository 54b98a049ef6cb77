//! `<t:epoch:style>` display styles and label formatting.

use {
    chrono::{DateTime, TimeZone, Utc},
    chrono_tz::Tz,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampStyle {
    /// `t`: 4:20 PM
    ShortTime,
    /// `T`: 4:20:30 PM
    LongTime,
    /// `d`: 04/20/2021
    ShortDate,
    /// `D`: April 20, 2021
    LongDate,
    /// `f`: April 20, 2021 4:20 PM
    #[default]
    ShortDateTime,
    /// `F`: Tuesday, April 20, 2021 4:20 PM
    LongDateTime,
    /// `R`: 2 months ago
    Relative,
}

impl TimestampStyle {
    #[must_use]
    pub fn from_flag(flag: char) -> Option<Self> {
        Some(match flag {
            't' => Self::ShortTime,
            'T' => Self::LongTime,
            'd' => Self::ShortDate,
            'D' => Self::LongDate,
            'f' => Self::ShortDateTime,
            'F' => Self::LongDateTime,
            'R' => Self::Relative,
            _ => return None,
        })
    }

    #[must_use]
    pub fn flag(self) -> char {
        match self {
            Self::ShortTime => 't',
            Self::LongTime => 'T',
            Self::ShortDate => 'd',
            Self::LongDate => 'D',
            Self::ShortDateTime => 'f',
            Self::LongDateTime => 'F',
            Self::Relative => 'R',
        }
    }

    /// Display label for `epoch` (seconds) in `tz`. Relative labels are
    /// measured against `reference` and need one. Returns `None` for
    /// out-of-range epochs.
    #[must_use]
    pub fn format(self, epoch: i64, tz: Tz, reference: Option<DateTime<Utc>>) -> Option<String> {
        let utc = DateTime::<Utc>::from_timestamp(epoch, 0)?;
        let local = tz.from_utc_datetime(&utc.naive_utc());
        let pattern = match self {
            Self::ShortTime => "%-I:%M %p",
            Self::LongTime => "%-I:%M:%S %p",
            Self::ShortDate => "%m/%d/%Y",
            Self::LongDate => "%B %-d, %Y",
            Self::ShortDateTime => "%B %-d, %Y %-I:%M %p",
            Self::LongDateTime => "%A, %B %-d, %Y %-I:%M %p",
            Self::Relative => return reference.map(|r| relative(epoch - r.timestamp())),
        };
        Some(local.format(pattern).to_string())
    }
}

/// Humanized offset: positive deltas are in the future.
fn relative(delta_secs: i64) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let secs = delta_secs.saturating_abs();
    let span = match secs {
        s if s < 45 => "a few seconds".to_string(),
        s if s < 90 => "a minute".to_string(),
        s if s < 45 * MINUTE => format!("{} minutes", (s + MINUTE / 2) / MINUTE),
        s if s < 90 * MINUTE => "an hour".to_string(),
        s if s < 22 * HOUR => format!("{} hours", (s + HOUR / 2) / HOUR),
        s if s < 36 * HOUR => "a day".to_string(),
        s if s < 26 * DAY => format!("{} days", (s + DAY / 2) / DAY),
        s if s < 45 * DAY => "a month".to_string(),
        s if s < 320 * DAY => format!("{} months", ((s / DAY) + 15) / 30),
        s if s < 548 * DAY => "a year".to_string(),
        s => format!("{} years", ((s / DAY) + 182) / 365),
    };
    if delta_secs > 0 {
        format!("in {span}")
    } else {
        format!("{span} ago")
    }
}

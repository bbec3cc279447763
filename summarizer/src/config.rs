use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
    time::Duration,
};

use chrono::{DateTime, Days, Months};
use types::primitives::UnixSeconds;

use crate::error::ConfigError;

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SummarizerConfig {
    pub enable_epoch_summaries: bool,
    pub enable_block_summaries: bool,
    pub enable_validator_summaries: bool,
    pub enable_periodic_validator_rollups: bool,
    pub validator_epoch_retention: Option<RetentionPeriod>,
    /// Upper bound on the number of days worth of epochs summarized in one pass.
    /// Only applies when `validator_epoch_retention` is set. 0 means unbounded.
    pub max_days_per_run: u64,
    pub timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enable_epoch_summaries: true,
            enable_block_summaries: true,
            enable_validator_summaries: true,
            enable_periodic_validator_rollups: false,
            validator_epoch_retention: None,
            max_days_per_run: 0,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }
}

impl SummarizerConfig {
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_periodic_validator_rollups && !self.enable_validator_summaries {
            return Err(ConfigError::PeriodicRollupsWithoutValidatorSummaries);
        }

        if self.validator_epoch_retention.is_some() && !self.enable_periodic_validator_rollups {
            return Err(ConfigError::RetentionWithoutPeriodicRollups);
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}

/// A calendar period in ISO 8601 notation restricted to date components (`PnYnMnWnD`).
///
/// Months and years are calendar months and years, so the length of a period depends on the
/// timestamp it is subtracted from.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct RetentionPeriod {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
}

impl RetentionPeriod {
    /// Subtracts the period from `timestamp`.
    ///
    /// Results that cannot be represented are clamped to the Unix epoch.
    #[must_use]
    pub fn cutoff(self, timestamp: UnixSeconds) -> UnixSeconds {
        let months = self.years.saturating_mul(12).saturating_add(self.months);
        let days = u64::from(self.weeks) * 7 + u64::from(self.days);

        i64::try_from(timestamp)
            .ok()
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
            .and_then(|time| time.checked_sub_months(Months::new(months)))
            .and_then(|time| time.checked_sub_days(Days::new(days)))
            .and_then(|time| u64::try_from(time.timestamp()).ok())
            .unwrap_or_default()
    }

    const fn is_zero(self) -> bool {
        self.years == 0 && self.months == 0 && self.weeks == 0 && self.days == 0
    }
}

impl FromStr for RetentionPeriod {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidRetentionPeriod {
            input: input.to_owned(),
        };

        let mut rest = input.strip_prefix('P').ok_or_else(invalid)?;

        if rest.is_empty() {
            return Err(invalid());
        }

        let mut period = Self::default();

        // Components must appear in this order and at most once each.
        let mut units = ['Y', 'M', 'W', 'D'].into_iter();

        while !rest.is_empty() {
            let digits_end = rest
                .find(|character: char| !character.is_ascii_digit())
                .filter(|end| *end > 0)
                .ok_or_else(invalid)?;

            let (digits, tail) = rest.split_at(digits_end);
            let value = digits.parse().map_err(|_| invalid())?;

            let mut characters = tail.chars();
            let unit = characters.next().ok_or_else(invalid)?;

            if !units.any(|expected| expected == unit) {
                return Err(invalid());
            }

            match unit {
                'Y' => period.years = value,
                'M' => period.months = value,
                'W' => period.weeks = value,
                _ => period.days = value,
            }

            rest = characters.as_str();
        }

        Ok(period)
    }
}

impl Display for RetentionPeriod {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        if self.is_zero() {
            return formatter.write_str("P0D");
        }

        formatter.write_str("P")?;

        let components = [
            (self.years, 'Y'),
            (self.months, 'M'),
            (self.weeks, 'W'),
            (self.days, 'D'),
        ];

        for (value, unit) in components {
            if value > 0 {
                write!(formatter, "{value}{unit}")?;
            }
        }

        Ok(())
    }
}

//! CF-convention time decoding.
//!
//! Raw time values are offsets from an epoch (`days since 1949-12-01`) in a
//! declared calendar. Decoding yields a plain Gregorian date; the clock time
//! is dropped since everything downstream works at daily granularity.
//! Dates that exist in the source calendar but not in the Gregorian one
//! (e.g. 30 February in a `360_day` calendar, or 29 February 2100 in the
//! `julian` calendar) fail to decode. So do offsets too large to be a real
//! date, such as an unmasked fill value.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, TimeDelta};

use crate::error::{NetCdfError, NetCdfResult};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest accepted offset from the epoch, roughly 27,000 years.
const MAX_OFFSET_DAYS: f64 = 10_000_000.0;

const NOLEAP_MONTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const ALL_LEAP_MONTHS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const DAY360_MONTHS: [u32; 12] = [30; 12];

/// Calendar systems found in climate model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// Proleptic Gregorian (also used for `standard`, `gregorian`)
    Standard,
    /// Leap year every fourth year, no century rule
    Julian,
    /// Every year has 365 days
    NoLeap,
    /// Every year has 366 days
    AllLeap,
    /// Twelve 30-day months
    Day360,
}

impl FromStr for Calendar {
    type Err = NetCdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(Calendar::Standard),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(NetCdfError::InvalidFormat(format!(
                "unsupported calendar '{}'",
                other
            ))),
        }
    }
}

impl Calendar {
    fn month_lengths(&self) -> &'static [u32; 12] {
        match self {
            Calendar::Standard | Calendar::Julian | Calendar::NoLeap => &NOLEAP_MONTHS,
            Calendar::AllLeap => &ALL_LEAP_MONTHS,
            Calendar::Day360 => &DAY360_MONTHS,
        }
    }

    fn days_per_year(&self) -> i64 {
        self.month_lengths().iter().map(|d| *d as i64).sum()
    }

    /// Shift an epoch `(year, month, day)` by whole days within this calendar.
    fn add_days(&self, epoch: (i32, u32, u32), days: i64) -> Result<(i32, u32, u32), String> {
        let overflow = || format!("offset of {} days overflows", days);

        match self {
            Calendar::Standard => {
                let start = NaiveDate::from_ymd_opt(epoch.0, epoch.1, epoch.2)
                    .ok_or_else(|| format!("invalid epoch {:?}", epoch))?;
                let date = TimeDelta::try_days(days)
                    .and_then(|delta| start.checked_add_signed(delta))
                    .ok_or_else(overflow)?;
                Ok((date.year(), date.month(), date.day()))
            }
            Calendar::Julian => {
                let (year, month, day) = epoch;
                if month == 0 || month > 12 || day == 0 || day > julian_month_length(year, month) {
                    return Err(format!("epoch {:?} does not exist in {:?} calendar", epoch, self));
                }
                let jdn = julian_day_number(year, month, day)
                    .checked_add(days)
                    .ok_or_else(overflow)?;
                julian_from_day_number(jdn)
            }
            _ => self.add_days_fixed(epoch, days),
        }
    }

    /// Day arithmetic for calendars whose years all have the same length.
    fn add_days_fixed(&self, epoch: (i32, u32, u32), days: i64) -> Result<(i32, u32, u32), String> {
        let overflow = || format!("offset of {} days overflows", days);
        let months = self.month_lengths();
        let (year, month, day) = epoch;
        if month == 0 || month > 12 || day == 0 || day > months[(month - 1) as usize] {
            return Err(format!("epoch {:?} does not exist in {:?} calendar", epoch, self));
        }

        let day_of_year: i64 = months[..(month - 1) as usize]
            .iter()
            .map(|d| *d as i64)
            .sum::<i64>()
            + (day - 1) as i64;
        let ordinal = (year as i64)
            .checked_mul(self.days_per_year())
            .and_then(|o| o.checked_add(day_of_year))
            .and_then(|o| o.checked_add(days))
            .ok_or_else(overflow)?;

        let year = ordinal.div_euclid(self.days_per_year());
        let mut remaining = ordinal.rem_euclid(self.days_per_year());
        let mut month = 1u32;
        for len in months.iter() {
            if remaining < *len as i64 {
                break;
            }
            remaining -= *len as i64;
            month += 1;
        }
        let year = i32::try_from(year).map_err(|_| format!("year {} out of range", year))?;
        Ok((year, month, remaining as u32 + 1))
    }
}

fn julian_month_length(year: i32, month: u32) -> u32 {
    if month == 2 && year.rem_euclid(4) == 0 {
        29
    } else {
        NOLEAP_MONTHS[(month - 1) as usize]
    }
}

/// Julian day number of a Julian calendar date.
fn julian_day_number(year: i32, month: u32, day: u32) -> i64 {
    let a = (14 - month as i64) / 12;
    let y = year as i64 + 4800 - a;
    let m = month as i64 + 12 * a - 3;
    day as i64 + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32083
}

/// Julian calendar date of a Julian day number.
fn julian_from_day_number(jdn: i64) -> Result<(i32, u32, u32), String> {
    let c = jdn + 32082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    let year = i32::try_from(year).map_err(|_| format!("year {} out of range", year))?;
    Ok((year, month as u32, day as u32))
}

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Days => SECONDS_PER_DAY,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Seconds => 1.0,
        }
    }
}

/// Parsed `"<unit> since <epoch>"` attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: (i32, u32, u32),
    /// Clock time of the epoch in seconds after midnight
    pub epoch_seconds: f64,
}

impl FromStr for TimeUnits {
    type Err = NetCdfError;

    /// Accepts `days since 1950-01-01`, `hours since 1950-1-1 12:00:00`,
    /// `seconds since 1970-01-01T00:00:00Z` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetCdfError::InvalidFormat(format!("unparseable time units '{}'", s));

        let (unit, rest) = s.trim().split_once(" since ").ok_or_else(invalid)?;
        let unit = match unit.trim().to_lowercase().as_str() {
            "days" | "day" | "d" => TimeUnit::Days,
            "hours" | "hour" | "h" => TimeUnit::Hours,
            "minutes" | "minute" | "min" => TimeUnit::Minutes,
            "seconds" | "second" | "s" => TimeUnit::Seconds,
            _ => return Err(invalid()),
        };

        let rest = rest.trim().trim_end_matches('Z').trim_end_matches(" UTC");
        let (date_part, clock_part) = match rest.split_once(['T', ' ']) {
            Some((d, c)) => (d, Some(c.trim())),
            None => (rest, None),
        };

        let mut fields = date_part.split('-');
        let year = fields.next().and_then(|f| f.parse::<i32>().ok()).ok_or_else(invalid)?;
        let month = fields.next().and_then(|f| f.parse::<u32>().ok()).ok_or_else(invalid)?;
        let day = fields.next().and_then(|f| f.parse::<u32>().ok()).ok_or_else(invalid)?;

        let epoch_seconds = match clock_part.filter(|c| !c.is_empty()) {
            Some(clock) => {
                let mut parts = clock.split(':').map(|p| p.parse::<f64>());
                let hours = parts.next().unwrap_or(Ok(0.0)).map_err(|_| invalid())?;
                let minutes = parts.next().unwrap_or(Ok(0.0)).map_err(|_| invalid())?;
                let seconds = parts.next().unwrap_or(Ok(0.0)).map_err(|_| invalid())?;
                hours * 3_600.0 + minutes * 60.0 + seconds
            }
            None => 0.0,
        };

        Ok(TimeUnits {
            unit,
            epoch: (year, month, day),
            epoch_seconds,
        })
    }
}

/// Decodes raw time values to calendar dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDecoder {
    pub units: TimeUnits,
    pub calendar: Calendar,
}

impl TimeDecoder {
    /// Build a decoder from the `units` and optional `calendar` attributes.
    pub fn from_attributes(units: &str, calendar: Option<&str>) -> NetCdfResult<Self> {
        Ok(Self {
            units: units.parse()?,
            calendar: calendar.map(str::parse).transpose()?.unwrap_or(Calendar::Standard),
        })
    }

    /// Decode one raw value, truncating any clock time.
    pub fn decode(&self, raw: f64) -> Result<NaiveDate, String> {
        if !raw.is_finite() {
            return Err(format!("non-finite time value {}", raw));
        }
        let seconds = raw * self.units.unit.seconds() + self.units.epoch_seconds;
        // Absorb float noise such as 2.9999999 days from hourly offsets.
        let days = (seconds / SECONDS_PER_DAY + 1e-9).floor();
        if !days.is_finite() || days.abs() > MAX_OFFSET_DAYS {
            return Err(format!("time value {} is out of range", raw));
        }
        let days = days as i64;

        let (year, month, day) = self.calendar.add_days(self.units.epoch, days)?;
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            format!(
                "{:04}-{:02}-{:02} ({:?} calendar) has no Gregorian equivalent",
                year, month, day, self.calendar
            )
        })
    }
}

//! # Weekly Hour-by-Hour Tables
//!
//! Every time-dependent quantity of the simulation (how likely a user type acts,
//! how attractive a destination is, how many drivers arrive) is a 7 × 24 table
//! indexed by day of week and hour of day.
//!
//! Inputs arrive in four loose shapes and are normalized into the canonical table
//! immediately:
//!
//! - a single value, broadcast to all 168 cells
//! - a mapping hour → value (must contain hour 23), repeated for every day
//! - a mapping day → value (must contain day 6), repeated for every hour of that day
//! - a mapping day → (hour → value) covering the whole week
//!
//! ```rust
//! use chargesim::domain::{ProbabilityMatrix, WeeklyInput};
//!
//! let evening = WeeklyInput::keyed((0..24).map(|hour| (hour, if hour >= 18 { 0.8 } else { 0.1 })));
//! let p = ProbabilityMatrix::probability(&evening).unwrap();
//! assert_eq!(p.get(3, 20), 0.8);
//! ```

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::types::{DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::error::ConfigError;

/// Day or hour key of a loosely shaped weekly input.
///
/// Accepts integers as well as numeric strings, since TOML and JSON only have
/// string keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(pub usize);

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotVisitor;

        impl<'de> Visitor<'de> for SlotVisitor {
            type Value = Slot;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a day or hour index")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Slot, E> {
                usize::try_from(v)
                    .map(Slot)
                    .map_err(|_| E::custom(format!("slot index {} too large", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Slot, E> {
                usize::try_from(v)
                    .map(Slot)
                    .map_err(|_| E::custom(format!("negative slot index {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Slot, E> {
                v.trim()
                    .parse()
                    .map(Slot)
                    .map_err(|_| E::custom(format!("invalid slot index '{}'", v)))
            }
        }

        deserializer.deserialize_any(SlotVisitor)
    }
}

/// Loosely shaped weekly input, as written in configuration files
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WeeklyInput<T> {
    Constant(T),
    Mapping(BTreeMap<Slot, SlotInput<T>>),
}

/// Entry of a weekly input mapping: a scalar, or a full day of hours
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SlotInput<T> {
    Value(T),
    Hours(BTreeMap<Slot, T>),
}

impl<T> WeeklyInput<T> {
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// Scalars keyed by slot. Whether the keys are hours or days is decided
    /// when the input is resolved.
    pub fn keyed<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (usize, T)>,
    {
        Self::Mapping(
            values
                .into_iter()
                .map(|(slot, value)| (Slot(slot), SlotInput::Value(value)))
                .collect(),
        )
    }

    pub fn hourly(values: [T; HOURS_PER_DAY]) -> Self {
        Self::keyed(values.into_iter().enumerate())
    }

    pub fn daily(values: [T; DAYS_PER_WEEK]) -> Self {
        Self::keyed(values.into_iter().enumerate())
    }

    /// Day → hour → value mapping
    pub fn nested<I, H>(days: I) -> Self
    where
        I: IntoIterator<Item = (usize, H)>,
        H: IntoIterator<Item = (usize, T)>,
    {
        Self::Mapping(
            days.into_iter()
                .map(|(day, hours)| {
                    let hours = hours
                        .into_iter()
                        .map(|(hour, value)| (Slot(hour), value))
                        .collect();
                    (Slot(day), SlotInput::Hours(hours))
                })
                .collect(),
        )
    }
}

/// Canonical 7 × 24 table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTable<T> {
    cells: [[T; HOURS_PER_DAY]; DAYS_PER_WEEK],
}

/// Per-hour probability (user activity or destination attraction)
pub type ProbabilityMatrix = WeeklyTable<f64>;

/// Number of driver events injected each hour
pub type DriverSchedule = WeeklyTable<u32>;

impl<T: Copy> WeeklyTable<T> {
    pub fn filled(value: T) -> Self {
        Self {
            cells: [[value; HOURS_PER_DAY]; DAYS_PER_WEEK],
        }
    }

    pub fn from_cells(cells: [[T; HOURS_PER_DAY]; DAYS_PER_WEEK]) -> Self {
        Self { cells }
    }

    /// Resolve a loosely shaped input into the full table
    pub fn from_input(input: &WeeklyInput<T>) -> Result<Self, ConfigError> {
        let map = match input {
            WeeklyInput::Constant(value) => return Ok(Self::filled(*value)),
            WeeklyInput::Mapping(map) if map.is_empty() => return Err(ConfigError::EmptyInput),
            WeeklyInput::Mapping(map) => map,
        };

        if map.values().all(|slot| matches!(slot, SlotInput::Hours(_))) {
            let rows = dense(map, DAYS_PER_WEEK, "day")?
                .into_iter()
                .map(|slot| match slot {
                    SlotInput::Hours(hours) => hours_row(hours),
                    SlotInput::Value(_) => Err(ConfigError::InvalidShape(
                        "full table entries must map hours to values".to_string(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self {
                cells: std::array::from_fn(|day| rows[day]),
            });
        }

        let scalars: Option<BTreeMap<Slot, T>> = map
            .iter()
            .map(|(slot, entry)| match entry {
                SlotInput::Value(value) => Some((*slot, *value)),
                SlotInput::Hours(_) => None,
            })
            .collect();
        let Some(scalars) = scalars else {
            return Err(ConfigError::InvalidShape(
                "mapping mixes scalar and per-hour entries".to_string(),
            ));
        };

        if scalars.contains_key(&Slot(HOURS_PER_DAY - 1)) {
            let hours = hours_row(&scalars)?;
            return Ok(Self {
                cells: [hours; DAYS_PER_WEEK],
            });
        }

        if scalars.contains_key(&Slot(DAYS_PER_WEEK - 1)) {
            let days = dense(&scalars, DAYS_PER_WEEK, "day")?;
            return Ok(Self {
                cells: std::array::from_fn(|day| [*days[day]; HOURS_PER_DAY]),
            });
        }

        Err(ConfigError::InvalidShape(format!(
            "keys {:?} cover neither every hour nor every day",
            scalars.keys().map(|slot| slot.0).collect::<Vec<_>>()
        )))
    }

    /// # Panics
    /// On `day >= 7` or `hour >= 24`.
    pub fn get(&self, day: usize, hour: usize) -> T {
        self.cells[day][hour]
    }

    pub fn set(&mut self, day: usize, hour: usize, value: T) {
        self.cells[day][hour] = value;
    }

    pub fn day(&self, day: usize) -> &[T; HOURS_PER_DAY] {
        &self.cells[day]
    }

    pub fn set_day(&mut self, day: usize, values: [T; HOURS_PER_DAY]) {
        self.cells[day] = values;
    }

    pub fn cells(&self) -> &[[T; HOURS_PER_DAY]; DAYS_PER_WEEK] {
        &self.cells
    }

    pub fn set_cells(&mut self, cells: [[T; HOURS_PER_DAY]; DAYS_PER_WEEK]) {
        self.cells = cells;
    }

    /// `(day, hour, value)` in day-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.cells.iter().enumerate().flat_map(|(day, hours)| {
            hours
                .iter()
                .enumerate()
                .map(move |(hour, value)| (day, hour, *value))
        })
    }

    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> WeeklyTable<U> {
        WeeklyTable {
            cells: self.cells.map(|hours| hours.map(&f)),
        }
    }

    /// Cell-wise combination with another table
    pub fn zip_with(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        let mut cells = self.cells;
        for (day, hours) in cells.iter_mut().enumerate() {
            for (hour, cell) in hours.iter_mut().enumerate() {
                *cell = f(*cell, other.cells[day][hour]);
            }
        }
        Self { cells }
    }
}

impl WeeklyTable<f64> {
    /// Resolve a probability input; cells must be finite and non-negative
    pub fn probability(input: &WeeklyInput<f64>) -> Result<Self, ConfigError> {
        let table = Self::from_input(input)?;
        if let Some((day, hour, value)) = table
            .iter()
            .find(|(_, _, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(ConfigError::InvalidProbability { day, hour, value });
        }
        Ok(table)
    }

    pub fn sum(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a + b)
    }

    /// Largest cell of the week (0 for an all-zero table)
    pub fn max_value(&self) -> f64 {
        self.iter().map(|(_, _, value)| value).fold(0.0, f64::max)
    }

    pub fn day_max(&self, day: usize) -> f64 {
        self.cells[day].iter().copied().fold(0.0, f64::max)
    }
}

impl WeeklyTable<u32> {
    pub fn weekly_total(&self) -> u64 {
        self.iter().map(|(_, _, value)| u64::from(value)).sum()
    }
}

impl fmt::Display for WeeklyTable<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hour")?;
        for day in 0..DAYS_PER_WEEK {
            write!(f, " {:>7}", day)?;
        }
        writeln!(f)?;
        for hour in 0..HOURS_PER_DAY {
            write!(f, "{:>4}", hour)?;
            for day in 0..DAYS_PER_WEEK {
                write!(f, " {:>7.4}", self.cells[day][hour])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn dense<'a, V>(
    map: &'a BTreeMap<Slot, V>,
    len: usize,
    slot: &'static str,
) -> Result<Vec<&'a V>, ConfigError> {
    if let Some(index) = map.keys().map(|key| key.0).find(|&index| index >= len) {
        return Err(ConfigError::SlotOutOfRange {
            slot,
            index,
            limit: len,
        });
    }
    (0..len)
        .map(|index| {
            map.get(&Slot(index))
                .ok_or(ConfigError::MissingSlot { slot, index })
        })
        .collect()
}

fn hours_row<T: Copy>(values: &BTreeMap<Slot, T>) -> Result<[T; HOURS_PER_DAY], ConfigError> {
    let row = dense(values, HOURS_PER_DAY, "hour")?;
    Ok(std::array::from_fn(|hour| *row[hour]))
}

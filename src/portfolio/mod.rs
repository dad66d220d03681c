//! Daily portfolio change, tracked from a persisted last-day snapshot.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Portfolio value as of the last observation, plus the value the day opened at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub opening_value: Decimal,
    pub last_value: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyChange {
    pub absolute: Decimal,
    /// Percent of the opening value; zero when the day opened at zero
    pub percent: Decimal,
}

impl PortfolioSnapshot {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, opening_value: value, last_value: value }
    }

    /// Record `value` observed on `date`. On a new day the opening value
    /// rolls over to the previous day's last value.
    pub fn observe(&mut self, date: NaiveDate, value: Decimal) -> DailyChange {
        if date > self.date {
            self.opening_value = self.last_value;
            self.date = date;
        }
        self.last_value = value;
        self.change()
    }

    pub fn change(&self) -> DailyChange {
        daily_change(self.opening_value, self.last_value)
    }
}

pub fn daily_change(opening: Decimal, current: Decimal) -> DailyChange {
    let absolute = current - opening;
    let percent = if opening.is_zero() {
        Decimal::ZERO
    } else {
        (absolute / opening * Decimal::ONE_HUNDRED).round_dp(2)
    };
    DailyChange { absolute, percent }
}

/// Update (or start) the snapshot with today's value
pub fn track(snapshot: Option<PortfolioSnapshot>, value: Decimal) -> (PortfolioSnapshot, DailyChange) {
    let today = Local::now().date_naive();
    match snapshot {
        Some(mut snap) => {
            let change = snap.observe(today, value);
            (snap, change)
        }
        None => {
            let snap = PortfolioSnapshot::new(today, value);
            (snap, DailyChange::default())
        }
    }
}

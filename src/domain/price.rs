use std::fmt;

/// Price of an offer in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i32);

impl Price {
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Price {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(format!("Price cannot be negative (got {})", value));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Length of an offer in calendar months, always at least one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationMonths(u32);

impl DurationMonths {
    pub const ONE: Self = Self(1);

    /// Whole 30-day months between two dates, clamped to at least one month
    pub fn between(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Self {
        let days = (end - start).num_days().max(0);
        let months = u32::try_from(days / 30).unwrap_or(u32::MAX);
        Self(months.max(1))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i32> for DurationMonths {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match u32::try_from(value) {
            Ok(months) if months >= 1 => Ok(Self(months)),
            _ => Err(format!("Duration must be at least one month (got {})", value)),
        }
    }
}

impl From<DurationMonths> for i32 {
    fn from(value: DurationMonths) -> i32 {
        i32::try_from(value.0).unwrap_or(i32::MAX)
    }
}

use chrono::NaiveDate;

/// Optional bounds on a subscription start date, both ends inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl Period {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, String> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(format!(
                    "Period start {} is after period end {}",
                    start, end
                ));
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| start <= date) && self.end.map_or(true, |end| date <= end)
    }
}

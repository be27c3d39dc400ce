use serde::Serialize;

/// Integer completion percentage that never moves backwards within one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const COMPLETE: Percent = Percent(100);

    /// `floor(done / total * 100)`, capped at 100. `None` when the total is unknown.
    pub fn from_ratio(done: u64, total: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let done = done.min(total) as u128;
        Some(Percent(((done * 100) / total as u128) as u8))
    }

    pub fn from_value(value: u8) -> Self {
        Percent(value.min(100))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Raise to `observed` if it is higher; lower observations are ignored.
    pub fn advance(&mut self, observed: Percent) -> bool {
        if observed > *self {
            *self = observed;
            true
        } else {
            false
        }
    }
}

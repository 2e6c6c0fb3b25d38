//! Discrete dividends paid by the underlying.
//!
//! Only the ex-date jump `S- -> S+` matters to the grids; the log-spot mesher
//! follows the forward through every jump before maturity.

use serde::{Deserialize, Serialize};

use crate::core::FdmError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DividendKind {
    /// `S+ = S- - amount`.
    Cash(f64),
    /// `S+ = S- * (1 - ratio)`.
    Proportional(f64),
}

/// A dividend going ex at `time` (year fraction from today).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub time: f64,
    pub kind: DividendKind,
}

impl DividendEvent {
    pub fn new(time: f64, kind: DividendKind) -> Result<Self, FdmError> {
        if !(time.is_finite() && time >= 0.0) {
            return Err(FdmError::invalid(format!(
                "dividend time {time} must be a finite non-negative year fraction"
            )));
        }
        let valid = match kind {
            DividendKind::Cash(amount) => amount.is_finite() && amount >= 0.0,
            DividendKind::Proportional(ratio) => (0.0..1.0).contains(&ratio),
        };
        if !valid {
            return Err(FdmError::invalid(format!("invalid dividend {kind:?} at t={time}")));
        }
        Ok(Self { time, kind })
    }

    pub fn cash(time: f64, amount: f64) -> Result<Self, FdmError> {
        Self::new(time, DividendKind::Cash(amount))
    }

    pub fn proportional(time: f64, ratio: f64) -> Result<Self, FdmError> {
        Self::new(time, DividendKind::Proportional(ratio))
    }

    /// Ex-dividend level for a cum-dividend level `cum`.
    #[inline]
    pub fn apply_jump(self, cum: f64) -> f64 {
        match self.kind {
            DividendKind::Cash(amount) => cum - amount,
            DividendKind::Proportional(ratio) => cum * (1.0 - ratio),
        }
    }
}

/// Dividends sorted by ex-date, at most one per date.
///
/// Deserialisation goes through the same checks as [`DividendSchedule::new`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<DividendEvent>", into = "Vec<DividendEvent>")]
pub struct DividendSchedule {
    events: Vec<DividendEvent>,
}

impl DividendSchedule {
    pub fn new(mut events: Vec<DividendEvent>) -> Result<Self, FdmError> {
        for e in &events {
            DividendEvent::new(e.time, e.kind)?;
        }
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        if let Some(w) = events.windows(2).find(|w| w[0].time == w[1].time) {
            return Err(FdmError::invalid(format!(
                "two dividends go ex at t={}",
                w[0].time
            )));
        }
        Ok(Self { events })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[DividendEvent] {
        &self.events
    }

    /// Events with ex-date no later than `maturity`.
    pub fn events_until(&self, maturity: f64) -> impl Iterator<Item = &DividendEvent> {
        self.events.iter().take_while(move |e| e.time <= maturity)
    }
}

impl TryFrom<Vec<DividendEvent>> for DividendSchedule {
    type Error = FdmError;

    fn try_from(events: Vec<DividendEvent>) -> Result<Self, Self::Error> {
        Self::new(events)
    }
}

impl From<DividendSchedule> for Vec<DividendEvent> {
    fn from(schedule: DividendSchedule) -> Self {
        schedule.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn events_are_sorted_and_cut_at_maturity() {
        let schedule = DividendSchedule::new(vec![
            DividendEvent::cash(0.75, 2.0).unwrap(),
            DividendEvent::proportional(0.25, 0.01).unwrap(),
            DividendEvent::cash(1.5, 2.0).unwrap(),
        ])
        .unwrap();
        let times: Vec<f64> = schedule.events_until(1.0).map(|e| e.time).collect();
        assert_eq!(times, vec![0.25, 0.75]);
        assert!(!schedule.is_empty());
    }

    #[test]
    fn ex_dividend_levels() {
        assert_eq!(DividendEvent::cash(0.5, 3.0).unwrap().apply_jump(100.0), 97.0);
        let p = DividendEvent::proportional(0.5, 0.02).unwrap().apply_jump(100.0);
        assert_relative_eq!(p, 98.0, epsilon = 1e-12);
    }

    #[test]
    fn bad_events_and_clashing_dates_fail() {
        assert!(DividendEvent::cash(0.5, -1.0).is_err());
        assert!(DividendEvent::proportional(0.5, 1.0).is_err());
        assert!(DividendEvent::cash(f64::NAN, 1.0).is_err());
        let clash = DividendSchedule::new(vec![
            DividendEvent::cash(0.5, 1.0).unwrap(),
            DividendEvent::cash(0.5, 2.0).unwrap(),
        ]);
        assert!(matches!(clash, Err(FdmError::InvalidInput(_))));
    }

    #[test]
    fn deserialisation_validates() {
        let json = r#"[{"time":1.0,"kind":{"Cash":2.0}},{"time":0.5,"kind":{"Proportional":0.1}}]"#;
        let schedule: DividendSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.events()[0].time, 0.5);

        let bad = r#"[{"time":0.5,"kind":{"Proportional":1.5}}]"#;
        assert!(serde_json::from_str::<DividendSchedule>(bad).is_err());
    }
}

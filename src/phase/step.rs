//! Ordered phase sequence joined with its duration table.
//!
//! The phase list and the name → duration mapping are supplied together and
//! must correspond one-to-one; [`StepSequence::new`] refuses anything else.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::SequencerError;

use super::speed::Speed;

/// A single named phase and its nominal duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Phase name (unique within a sequence)
    pub name: Arc<str>,
    /// Nominal duration at speed 1x
    pub duration: Duration,
}

/// Fixed, totally ordered list of phases with a duration for each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSequence {
    steps: Vec<Step>,
}

/// One row of a planned cycle at a given speed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Zero-based phase index
    pub index: usize,
    /// Phase name
    pub name: String,
    /// Duration at 1x
    #[serde(serialize_with = "as_millis")]
    pub nominal: Duration,
    /// Duration at the planned speed
    #[serde(serialize_with = "as_millis")]
    pub effective: Duration,
    /// Offset from the start of the cycle
    #[serde(serialize_with = "as_millis")]
    pub starts_at: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl StepSequence {
    /// Builds a sequence from the ordered phase names and their durations.
    ///
    /// # Errors
    ///
    /// Returns a [`SequencerError`] when the list is empty, a name repeats,
    /// a phase has no duration, a duration names no phase, or a duration
    /// is zero.
    pub fn new<S: AsRef<str>>(
        names: &[S],
        durations: &IndexMap<String, Duration>,
    ) -> Result<Self, SequencerError> {
        if names.is_empty() {
            return Err(SequencerError::EmptySequence);
        }

        let mut seen = HashSet::with_capacity(names.len());
        let mut steps = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(SequencerError::DuplicatePhase(name.to_string()));
            }
            let duration = *durations
                .get(name)
                .ok_or_else(|| SequencerError::UnmappedPhase(name.to_string()))?;
            if duration.is_zero() {
                return Err(SequencerError::ZeroDuration(name.to_string()));
            }
            steps.push(Step {
                name: Arc::from(name),
                duration,
            });
        }

        if let Some(extra) = durations.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(SequencerError::UnknownPhase(extra.clone()));
        }

        Ok(Self { steps })
    }

    /// Number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`; construction rejects empty sequences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the terminal phase.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Returns the step at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Phase name at `index`, or `"<none>"` if out of bounds.
    #[must_use]
    pub fn name(&self, index: usize) -> &str {
        self.steps.get(index).map_or("<none>", |s| &*s.name)
    }

    /// Shared handle to the phase name at `index`.
    #[must_use]
    pub fn name_arc(&self, index: usize) -> Arc<str> {
        self.steps
            .get(index)
            .map_or_else(|| Arc::from("<none>"), |s| Arc::clone(&s.name))
    }

    /// Nominal duration of the phase at `index` (zero if out of bounds).
    #[must_use]
    pub fn nominal(&self, index: usize) -> Duration {
        self.steps.get(index).map_or(Duration::ZERO, |s| s.duration)
    }

    /// Index of the phase called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| &*s.name == name)
    }

    /// Iterates over the steps in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// Phase names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| &*s.name)
    }

    /// Plans one full cycle at `speed`: each phase's start offset and
    /// effective duration.
    #[must_use]
    pub fn timeline(&self, speed: Speed) -> Vec<TimelineEntry> {
        let mut starts_at = Duration::ZERO;
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let effective = speed.effective(step.duration);
                let entry = TimelineEntry {
                    index,
                    name: step.name.to_string(),
                    nominal: step.duration,
                    effective,
                    starts_at,
                };
                starts_at = starts_at.saturating_add(effective);
                entry
            })
            .collect()
    }

    /// Wall-clock length of one cycle at `speed`, including the settle hold.
    #[must_use]
    pub fn cycle_duration(&self, speed: Speed, settle: Duration) -> Duration {
        self.steps
            .iter()
            .map(|s| speed.effective(s.duration))
            .fold(Duration::ZERO, Duration::saturating_add)
            .saturating_add(settle)
    }
}

impl<'a> IntoIterator for &'a StepSequence {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations(pairs: &[(&str, u64)]) -> IndexMap<String, Duration> {
        pairs
            .iter()
            .map(|(n, ms)| ((*n).to_string(), Duration::from_millis(*ms)))
            .collect()
    }

    fn scenario_a() -> StepSequence {
        StepSequence::new(
            &["idle", "input", "action", "complete"],
            &durations(&[
                ("idle", 1000),
                ("input", 1500),
                ("action", 2500),
                ("complete", 3000),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_new_sequence() {
        let seq = scenario_a();
        assert_eq!(seq.len(), 4);
        assert_eq!(seq.last_index(), 3);
        assert_eq!(seq.name(0), "idle");
        assert_eq!(seq.name(3), "complete");
        assert_eq!(seq.nominal(2), Duration::from_millis(2500));
        assert_eq!(seq.position("action"), Some(2));
    }

    #[test]
    fn test_out_of_bounds_queries() {
        let seq = scenario_a();
        assert_eq!(seq.name(9), "<none>");
        assert_eq!(seq.nominal(9), Duration::ZERO);
        assert!(seq.get(9).is_none());
        assert_eq!(seq.position("synthesis"), None);
    }

    #[test]
    fn test_order_follows_names_not_table() {
        let seq = StepSequence::new(
            &["b", "a"],
            &durations(&[("a", 10), ("b", 20)]),
        )
        .unwrap();
        let names: Vec<&str> = seq.names().collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let names: [&str; 0] = [];
        let err = StepSequence::new(&names, &IndexMap::new()).unwrap_err();
        assert_eq!(err, SequencerError::EmptySequence);
    }

    #[test]
    fn test_duplicate_phase_rejected() {
        let err = StepSequence::new(&["idle", "idle"], &durations(&[("idle", 10)])).unwrap_err();
        assert_eq!(err, SequencerError::DuplicatePhase("idle".to_string()));
    }

    #[test]
    fn test_unmapped_phase_rejected() {
        let err =
            StepSequence::new(&["idle", "input"], &durations(&[("idle", 10)])).unwrap_err();
        assert_eq!(err, SequencerError::UnmappedPhase("input".to_string()));
    }

    #[test]
    fn test_extra_duration_rejected() {
        let err = StepSequence::new(&["idle"], &durations(&[("idle", 10), ("ghost", 10)]))
            .unwrap_err();
        assert_eq!(err, SequencerError::UnknownPhase("ghost".to_string()));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err = StepSequence::new(&["idle"], &durations(&[("idle", 0)])).unwrap_err();
        assert_eq!(err, SequencerError::ZeroDuration("idle".to_string()));
    }

    #[test]
    fn test_timeline_at_double_speed() {
        let seq = scenario_a();
        let plan = seq.timeline(Speed::new(2.0).unwrap());
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].effective, Duration::from_millis(500));
        assert_eq!(plan[1].starts_at, Duration::from_millis(500));
        assert_eq!(plan[2].starts_at, Duration::from_millis(1250));
        assert_eq!(plan[3].starts_at, Duration::from_millis(2500));
        assert_eq!(plan[3].nominal, Duration::from_millis(3000));
    }

    #[test]
    fn test_cycle_duration_includes_settle() {
        let seq = scenario_a();
        let total = seq.cycle_duration(Speed::default(), Duration::from_secs(1));
        assert_eq!(total, Duration::from_millis(9000));
    }

    #[test]
    fn test_timeline_serializes_millis() {
        let seq = scenario_a();
        let json = serde_json::to_value(seq.timeline(Speed::default())).unwrap();
        assert_eq!(json[1]["name"], "input");
        assert_eq!(json[1]["effective"], 1500);
        assert_eq!(json[1]["starts_at"], 1000);
    }

    #[test]
    fn test_cycle_duration_saturates() {
        let seq = scenario_a();
        assert_eq!(seq.cycle_duration(Speed::NORMAL, Duration::MAX), Duration::MAX);
    }
}

//! Multi-quarter thesis signals.
//!
//! Each identifier is run through a small state machine over its ordered
//! boundary transitions. Identifiers never share state, so
//! [`detect`] can be exercised with a literal transition list.

use serde::Serialize;

use crate::domain::aligner::Alignment;
use crate::domain::config::EngineConfig;
use crate::domain::diff::{BoundaryDiff, DeltaKind};
use crate::domain::quarter::Quarter;

/// One identifier's classification at one quarter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: Quarter,
    pub to: Quarter,
    pub contiguous: bool,
    /// `None` when the identifier is absent on both sides of the boundary.
    pub kind: Option<DeltaKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorStrength {
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    ConsistentAccumulator { strength: AccumulatorStrength },
    BuildThenTrim,
    OneQuarterProbe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub identifier: String,
    pub kind: SignalKind,
    /// First and last quarter of the supporting deltas.
    pub start: Quarter,
    pub end: Quarter,
    pub confidence: Confidence,
    /// Consecutive increases for streak signals; quarters held for probes.
    pub streak: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreakState {
    Flat,
    Building {
        n: usize,
        /// Earlier quarter of the first increase.
        opened: Quarter,
        /// Later quarter of the first increase.
        first_add: Quarter,
        last: Quarter,
    },
    Trimming,
}

impl StreakState {
    /// Next state after a contiguous transition, plus any streak signal the
    /// transition closes.
    fn advance(
        self,
        t: &Transition,
        identifier: &str,
        config: &EngineConfig,
    ) -> (StreakState, Option<Signal>) {
        match (self, t.kind) {
            (
                StreakState::Building {
                    n,
                    opened,
                    first_add,
                    ..
                },
                Some(DeltaKind::Increased),
            ) => (
                StreakState::Building {
                    n: n + 1,
                    opened,
                    first_add,
                    last: t.to,
                },
                None,
            ),
            (_, Some(DeltaKind::Increased)) => (
                StreakState::Building {
                    n: 1,
                    opened: t.from,
                    first_add: t.to,
                    last: t.to,
                },
                None,
            ),
            (StreakState::Building { n, first_add, .. }, Some(DeltaKind::Decreased)) => {
                let signal = (n >= config.build_trim_min_streak).then(|| Signal {
                    identifier: identifier.to_string(),
                    kind: SignalKind::BuildThenTrim,
                    start: first_add,
                    end: t.to,
                    confidence: Confidence::Moderate,
                    streak: n,
                });
                (StreakState::Trimming, signal)
            }
            (StreakState::Trimming, Some(DeltaKind::Decreased)) => (StreakState::Trimming, None),
            (StreakState::Flat, Some(DeltaKind::Decreased)) => (StreakState::Trimming, None),
            (state, _) => (StreakState::Flat, state.close(identifier, config)),
        }
    }

    /// Accumulator signal for a streak that ends without a trim.
    fn close(self, identifier: &str, config: &EngineConfig) -> Option<Signal> {
        let StreakState::Building {
            n, opened, last, ..
        } = self
        else {
            return None;
        };
        let strength = if n >= config.accumulator_strong_streak {
            AccumulatorStrength::Strong
        } else if n >= config.accumulator_moderate_streak {
            AccumulatorStrength::Moderate
        } else {
            return None;
        };
        let confidence = match strength {
            AccumulatorStrength::Strong => Confidence::Strong,
            AccumulatorStrength::Moderate => Confidence::Moderate,
        };
        Some(Signal {
            identifier: identifier.to_string(),
            kind: SignalKind::ConsistentAccumulator { strength },
            start: opened,
            end: last,
            confidence,
            streak: n,
        })
    }
}

fn probe_signal(
    identifier: &str,
    opened: Quarter,
    closed: Quarter,
    config: &EngineConfig,
) -> Option<Signal> {
    let span = opened.span_to(&closed);
    (config.probe_min_span..=config.probe_max_span)
        .contains(&span)
        .then(|| Signal {
            identifier: identifier.to_string(),
            kind: SignalKind::OneQuarterProbe,
            start: opened,
            end: closed,
            confidence: Confidence::Weak,
            streak: (span - 1) as usize,
        })
}

/// Detects every signal in one identifier's ordered transitions.
///
/// A non-contiguous transition ends any open streak and resets the machine
/// to `Flat` without counting towards a new streak. Probe lifetimes are
/// measured in calendar quarters, so gaps count towards the span.
pub fn detect(identifier: &str, transitions: &[Transition], config: &EngineConfig) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut state = StreakState::Flat;
    let mut opened: Option<Quarter> = None;

    for t in transitions {
        if t.contiguous {
            let (next, emitted) = state.advance(t, identifier, config);
            signals.extend(emitted);
            state = next;
        } else {
            signals.extend(state.close(identifier, config));
            state = StreakState::Flat;
        }

        match t.kind {
            Some(DeltaKind::New) => opened = Some(t.to),
            Some(DeltaKind::Exited) => {
                if let Some(open) = opened.take() {
                    signals.extend(probe_signal(identifier, open, t.to, config));
                }
            }
            _ => {}
        }
    }
    signals.extend(state.close(identifier, config));
    signals
}

/// Transitions for one identifier across a fund's boundary diffs.
pub fn transitions_for(identifier: &str, diffs: &[BoundaryDiff]) -> Vec<Transition> {
    diffs
        .iter()
        .map(|b| Transition {
            from: b.from,
            to: b.to,
            contiguous: b.contiguous,
            kind: b.delta_for(identifier).map(|d| d.kind),
        })
        .collect()
}

/// Signals for every aligned identifier, in identifier order.
pub fn detect_all(alignment: &Alignment, diffs: &[BoundaryDiff], config: &EngineConfig) -> Vec<Signal> {
    alignment
        .series
        .keys()
        .flat_map(|id| detect(id, &transitions_for(id, diffs), config))
        .collect()
}

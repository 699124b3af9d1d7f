use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// The three lifecycle stages a Gradeable can belong to, plus the two
/// peer-review reply components.
///
/// `Initial` and `Final` are the stages a cover-letter-addressed patchset
/// can be classified into; `Review1`/`Review2` are the stages a peer-review
/// reply is classified into depending on which reviewee it addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Component {
    Initial,
    Final,
    Review1,
    Review2,
}

impl Component {
    pub const fn as_str(self) -> &'static str {
        match self {
            Component::Initial => "initial",
            Component::Final => "final",
            Component::Review1 => "review1",
            Component::Review2 => "review2",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Component::Initial),
            "final" => Ok(Component::Final),
            "review1" => Ok(Component::Review1),
            "review2" => Ok(Component::Review2),
            other => Err(ModelError::InvalidStage(other.to_string())),
        }
    }
}

/// The three scheduler-owned deadlines of an [`Assignment`](crate::Assignment).
///
/// Distinct from [`Component`]: a `Stage` names a *deadline slot* on the
/// Orchestrator's schedule (and the TRIGGER payload's `component_id`),
/// while a `Component` names which bucket a `Gradeable` lands in. The
/// `Peer` stage has no corresponding `Component` of its own — it releases
/// both `Review1` and `Review2` gradeables at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stage {
    Initial,
    Peer,
    Final,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Initial, Stage::Peer, Stage::Final];

    /// TRIGGER payload component id: `0` = initial, `1` = peer, `2` = final.
    pub const fn component_id(self) -> i64 {
        match self {
            Stage::Initial => 0,
            Stage::Peer => 1,
            Stage::Final => 2,
        }
    }

    pub fn from_component_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Stage::Initial),
            1 => Some(Stage::Peer),
            2 => Some(Stage::Final),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::Peer => "peer",
            Stage::Final => "final",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Stage::Initial),
            "peer" => Ok(Stage::Peer),
            "final" => Ok(Stage::Final),
            other => Err(ModelError::InvalidStage(other.to_string())),
        }
    }
}

/// Pack an `(assignment_id, stage)` pair into the signed integer carried by
/// a TRIGGER signal, and the inverse.
///
/// `encode`/`decode` round-trip for every `assignment_id >= 0`: see the
/// TRIGGER payload round-trip property in the platform test suite.
pub fn encode_trigger_payload(assignment_id: i64, stage: Stage) -> i64 {
    assignment_id * 3 + stage.component_id()
}

pub fn decode_trigger_payload(payload: i64) -> (i64, Option<Stage>) {
    let assignment_id = payload.div_euclid(3);
    let component_id = payload.rem_euclid(3);
    (assignment_id, Stage::from_component_id(component_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_payload_round_trips() {
        for assignment_id in 1..64i64 {
            for stage in Stage::ALL {
                let payload = encode_trigger_payload(assignment_id, stage);
                let (decoded_id, decoded_stage) = decode_trigger_payload(payload);
                assert_eq!(decoded_id, assignment_id);
                assert_eq!(decoded_stage, Some(stage));
            }
        }
    }

    #[test]
    fn component_round_trips_through_display() {
        for c in [Component::Initial, Component::Final, Component::Review1, Component::Review2] {
            assert_eq!(c.as_str().parse::<Component>().unwrap(), c);
        }
    }
}

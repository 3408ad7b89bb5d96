use std::str::FromStr;

use curation_core::{drag::Direction, CurationError, CurationScreen};
use shared::domain::EntityId;

/// One edit given on the command line: `toggle:ID`, `move:FROM:TO`, `up:ID` or `down:ID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Toggle(EntityId),
    Move { from: usize, to: usize },
    Shift(EntityId, Direction),
}

impl FromStr for EditOp {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.splitn(3, ':');
        let verb = parts.next().unwrap_or_default();
        let first = parts.next().filter(|part| !part.is_empty());
        let second = parts.next();

        match (verb, first, second) {
            ("toggle", Some(id), None) => Ok(EditOp::Toggle(EntityId::new(id))),
            ("up", Some(id), None) => Ok(EditOp::Shift(EntityId::new(id), Direction::Up)),
            ("down", Some(id), None) => Ok(EditOp::Shift(EntityId::new(id), Direction::Down)),
            ("move", Some(from), Some(to)) => Ok(EditOp::Move {
                from: parse_index(from)?,
                to: parse_index(to)?,
            }),
            _ => Err(format!(
                "invalid edit '{raw}', expected toggle:ID, move:FROM:TO, up:ID or down:ID"
            )),
        }
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a selection index"))
}

impl EditOp {
    /// Returns whether the selection changed.
    pub async fn apply(&self, screen: &CurationScreen) -> Result<bool, CurationError> {
        match self {
            EditOp::Toggle(id) => screen.toggle(id).await,
            EditOp::Move { from, to } => screen.move_item(*from, *to).await,
            EditOp::Shift(id, direction) => Ok(screen
                .keyboard_move(id, *direction)
                .await?
                .is_some()),
        }
    }
}

//! Drag gestures over the selection, normalized to a single `Move` per completed drag.
//!
//! Input adapters turn modality-specific events (pointer, touch, keyboard) into
//! [`DragInput`]; the controller never looks at where an input came from.

use shared::domain::EntityId;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragInput {
    Start { active: EntityId },
    Over { over: EntityId },
    /// Relative slot change, used by keyboard dragging.
    Step { delta: isize },
    Drop,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        active: EntityId,
        from: usize,
        target: Option<usize>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn active(&self) -> Option<&EntityId> {
        match &self.state {
            DragState::Dragging { active, .. } => Some(active),
            DragState::Idle => None,
        }
    }

    pub fn target(&self) -> Option<usize> {
        match &self.state {
            DragState::Dragging { target, .. } => *target,
            DragState::Idle => None,
        }
    }

    /// Feeds one input. Only a drop over a different slot yields a `Move`; hover updates
    /// are visual only.
    pub fn handle(&mut self, input: DragInput, order: &[EntityId]) -> Option<Move> {
        match input {
            DragInput::Start { active } => {
                if self.is_dragging() {
                    debug!(id = %active, "drag start ignored while another drag is active");
                    return None;
                }
                let Some(from) = order.iter().position(|id| id == &active) else {
                    debug!(id = %active, "drag start ignored for entity outside the selection");
                    return None;
                };
                self.state = DragState::Dragging {
                    active,
                    from,
                    target: Some(from),
                };
                None
            }
            DragInput::Over { over } => {
                if let DragState::Dragging { target, .. } = &mut self.state {
                    *target = order.iter().position(|id| id == &over);
                }
                None
            }
            DragInput::Step { delta } => {
                if let DragState::Dragging { from, target, .. } = &mut self.state {
                    if order.is_empty() {
                        return None;
                    }
                    let current = target.unwrap_or(*from) as isize;
                    let last = order.len() as isize - 1;
                    *target = Some((current + delta).clamp(0, last) as usize);
                }
                None
            }
            DragInput::Drop => {
                let DragState::Dragging { active, target, .. } = std::mem::take(&mut self.state)
                else {
                    return None;
                };
                // The selection may have changed mid-drag; resolve the source slot again.
                let from = order.iter().position(|id| id == &active)?;
                let to = target?;
                if to == from || to >= order.len() {
                    return None;
                }
                Some(Move { from, to })
            }
            DragInput::Cancel => {
                self.state = DragState::Idle;
                None
            }
        }
    }

    /// The order the selection would have if the drag dropped now.
    pub fn preview(&self, order: &[EntityId]) -> Option<Vec<EntityId>> {
        let DragState::Dragging { active, target, .. } = &self.state else {
            return None;
        };
        let mut preview = order.to_vec();
        let from = preview.iter().position(|id| id == active)?;
        if let Some(to) = (*target).filter(|to| *to < preview.len()) {
            let moved = preview.remove(from);
            preview.insert(to, moved);
        }
        Some(preview)
    }

    /// Move-up/move-down buttons, with the same contract as a completed drag.
    pub fn keyboard_move(id: &EntityId, direction: Direction, order: &[EntityId]) -> Option<Move> {
        let from = order.iter().position(|other| other == id)?;
        let to = match direction {
            Direction::Up => from.checked_sub(1)?,
            Direction::Down => from + 1,
        };
        (to < order.len()).then_some(Move { from, to })
    }
}

/// Normalizes one input modality into [`DragInput`].
pub trait InputAdapter {
    type Event;

    fn translate(&mut self, event: Self::Event) -> Option<DragInput>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down { id: EntityId },
    Moved { position: f32 },
    Up,
    Escape,
}

/// Pointer and touch dragging over a vertical (or horizontal) list. `layout` holds each
/// selected item with the midpoint of its box along the drag axis, in display order.
#[derive(Debug, Clone, Default)]
pub struct PointerAdapter {
    layout: Vec<(EntityId, f32)>,
    pressed: Option<usize>,
    over: Option<usize>,
}

impl PointerAdapter {
    pub fn new(layout: Vec<(EntityId, f32)>) -> Self {
        Self {
            layout,
            pressed: None,
            over: None,
        }
    }

    pub fn set_layout(&mut self, layout: Vec<(EntityId, f32)>) {
        self.layout = layout;
    }

    // The target moves one slot each time the pointer crosses a sibling's midpoint.
    fn slot_at(&self, from: usize, position: f32) -> usize {
        let mut slot = from.min(self.layout.len().saturating_sub(1));
        while slot + 1 < self.layout.len() && position > self.layout[slot + 1].1 {
            slot += 1;
        }
        while slot > 0 && position < self.layout[slot - 1].1 {
            slot -= 1;
        }
        slot
    }
}

impl InputAdapter for PointerAdapter {
    type Event = PointerEvent;

    fn translate(&mut self, event: PointerEvent) -> Option<DragInput> {
        match event {
            PointerEvent::Down { id } => {
                let index = self.layout.iter().position(|(other, _)| other == &id)?;
                self.pressed = Some(index);
                self.over = Some(index);
                Some(DragInput::Start { active: id })
            }
            PointerEvent::Moved { position } => {
                let from = self.pressed?;
                if self.layout.is_empty() {
                    return None;
                }
                let slot = self.slot_at(from, position);
                if self.over == Some(slot) {
                    return None;
                }
                self.over = Some(slot);
                Some(DragInput::Over {
                    over: self.layout[slot].0.clone(),
                })
            }
            PointerEvent::Up => {
                self.pressed.take()?;
                self.over = None;
                Some(DragInput::Drop)
            }
            PointerEvent::Escape => {
                self.pressed.take()?;
                self.over = None;
                Some(DragInput::Cancel)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    ArrowUp,
    ArrowDown,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub focused: EntityId,
    pub key: Key,
}

/// Space/Enter lifts the focused item, arrows move it, Space/Enter drops, Escape cancels.
/// Only items in `order` (the current selection) can be lifted.
#[derive(Debug, Clone, Default)]
pub struct KeyboardAdapter {
    order: Vec<EntityId>,
    lifted: bool,
}

impl KeyboardAdapter {
    pub fn new(order: Vec<EntityId>) -> Self {
        Self {
            order,
            lifted: false,
        }
    }

    pub fn set_order(&mut self, order: Vec<EntityId>) {
        self.order = order;
    }

    pub fn is_lifted(&self) -> bool {
        self.lifted
    }
}

impl InputAdapter for KeyboardAdapter {
    type Event = KeyEvent;

    fn translate(&mut self, event: KeyEvent) -> Option<DragInput> {
        match (self.lifted, event.key) {
            (false, Key::Space | Key::Enter) => {
                if !self.order.contains(&event.focused) {
                    return None;
                }
                self.lifted = true;
                Some(DragInput::Start {
                    active: event.focused,
                })
            }
            (false, _) => None,
            (true, Key::ArrowUp) => Some(DragInput::Step { delta: -1 }),
            (true, Key::ArrowDown) => Some(DragInput::Step { delta: 1 }),
            (true, Key::Space | Key::Enter) => {
                self.lifted = false;
                Some(DragInput::Drop)
            }
            (true, Key::Escape) => {
                self.lifted = false;
                Some(DragInput::Cancel)
            }
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::content::CellContent;
use crate::registry::{CloseCause, PanelId};

pub type ActorId = String;

/// What kind of entity triggered an event. Only players view panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Player,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
}

impl Actor {
    pub fn player(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            kind: ActorKind::Player,
        }
    }

    pub fn other(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            kind: ActorKind::Other,
        }
    }

    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }
}

/// Which surface a click landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickSurface {
    /// A panel's own grid.
    Panel(PanelId),
    /// The clicking actor's personal inventory below the panel.
    ActorInventory,
    /// Outside any inventory window.
    Outside,
}

/// A raw interaction with a slot. Handlers may cancel it to keep the slot's
/// content inside the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub actor: Actor,
    pub surface: ClickSurface,
    pub slot: usize,
    pub current: Option<CellContent>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ClickEvent {
    pub fn new(
        actor: Actor,
        surface: ClickSurface,
        slot: usize,
        current: Option<CellContent>,
    ) -> Self {
        Self {
            actor,
            surface,
            slot,
            current,
            cancelled: false,
        }
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn has_content(&self) -> bool {
        self.current.as_ref().is_some_and(|content| !content.is_empty())
    }
}

/// Events delivered by the host to every registered listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Click(ClickEvent),
    /// The actor closed whatever panel it had open.
    Close { actor: Actor },
    /// The actor disconnected.
    Quit { actor: Actor },
    /// The actor died; `killer` is informational only.
    Death {
        victim: Actor,
        killer: Option<Actor>,
    },
}

impl HostEvent {
    pub fn click(actor: Actor, surface: ClickSurface, slot: usize, current: Option<CellContent>) -> Self {
        Self::Click(ClickEvent::new(actor, surface, slot, current))
    }

    pub fn close(actor: Actor) -> Self {
        Self::Close { actor }
    }

    pub fn quit(actor: Actor) -> Self {
        Self::Quit { actor }
    }

    pub fn death(victim: Actor) -> Self {
        Self::Death {
            victim,
            killer: None,
        }
    }

    /// The close cause and departing actor, for the three close kinds.
    pub fn close_subject(&self) -> Option<(CloseCause, &Actor)> {
        match self {
            HostEvent::Click(_) => None,
            HostEvent::Close { actor } => Some((CloseCause::Close, actor)),
            HostEvent::Quit { actor } => Some((CloseCause::Quit, actor)),
            HostEvent::Death { victim, .. } => Some((CloseCause::Death, victim)),
        }
    }

    pub fn actor(&self) -> &Actor {
        match self {
            HostEvent::Click(click) => &click.actor,
            HostEvent::Close { actor } | HostEvent::Quit { actor } => actor,
            HostEvent::Death { victim, .. } => victim,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            HostEvent::Click(_) => "click",
            HostEvent::Close { .. } => "close",
            HostEvent::Quit { .. } => "quit",
            HostEvent::Death { .. } => "death",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_subject_maps_each_kind_to_its_cause() {
        let steve = Actor::player("steve");
        assert_eq!(
            HostEvent::close(steve.clone()).close_subject(),
            Some((CloseCause::Close, &steve))
        );
        assert_eq!(
            HostEvent::quit(steve.clone()).close_subject(),
            Some((CloseCause::Quit, &steve))
        );
        let death = HostEvent::Death {
            victim: steve.clone(),
            killer: Some(Actor::other("zombie")),
        };
        assert_eq!(death.close_subject(), Some((CloseCause::Death, &steve)));
        let click = HostEvent::click(steve, ClickSurface::Outside, 0, None);
        assert!(click.close_subject().is_none());
    }

    #[test]
    fn air_does_not_count_as_content() {
        let actor = Actor::player("alex");
        let empty = ClickEvent::new(actor.clone(), ClickSurface::Outside, 0, Some(CellContent::empty()));
        let missing = ClickEvent::new(actor.clone(), ClickSurface::Outside, 0, None);
        let stone = ClickEvent::new(actor, ClickSurface::Outside, 0, Some(CellContent::of("stone")));
        assert!(!empty.has_content());
        assert!(!missing.has_content());
        assert!(stone.has_content());
    }

    #[test]
    fn host_events_serialize_with_kind_tag() {
        let line = serde_json::to_string(&HostEvent::quit(Actor::player("alex"))).unwrap();
        assert!(line.contains("\"kind\":\"quit\""));
        let back: HostEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(back.describe(), "quit");
    }
}

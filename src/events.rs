use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 256;

/// Something that happened during a simulation step. Audio and any external
/// observer read these instead of poking at components.
#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
    /// Position in emission order, starting at 1.
    pub seq: u64,
    pub source_entity: Option<u64>,
}

#[derive(Resource, Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    /// Fixed steps simulated so far.
    pub frame: u64,
    pub dropped_events: u64,
    last_seq: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(&mut self, name: impl Into<String>, data: serde_json::Value, source: Option<Entity>) {
        self.last_seq = self.last_seq.saturating_add(1);
        self.recent.push_back(GameEvent {
            name: name.into(),
            data,
            frame: self.frame,
            seq: self.last_seq,
            source_entity: source.map(Entity::to_bits),
        });
        if self.recent.len() <= MAX_EVENTS {
            return;
        }
        let excess = self.recent.len() - MAX_EVENTS;
        self.recent.drain(..excess);
        self.dropped_events = self.dropped_events.saturating_add(excess as u64);
        if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
            self.last_overflow_log_frame = self.frame;
            warn!(
                "[Tilerun events] Dropped {} buffered events (total dropped: {})",
                excess, self.dropped_events
            );
        }
    }

    /// Events emitted after the one numbered `seq`, oldest first. Several
    /// events can share a frame, so readers keep their place by sequence.
    pub fn after(&self, seq: u64) -> impl Iterator<Item = &GameEvent> {
        self.recent.iter().filter(move |ev| ev.seq > seq)
    }

    pub fn count(&self, name: &str) -> usize {
        self.recent.iter().filter(|ev| ev.name == name).count()
    }
}

pub struct GameEventsPlugin;

impl Plugin for GameEventsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameEventBus::default()).add_systems(
            FixedFirst,
            tick_event_frame.run_if(crate::game_runtime::gameplay_systems_enabled),
        );
    }
}

fn tick_event_frame(mut bus: ResMut<GameEventBus>) {
    bus.frame = bus.frame.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest() {
        let mut bus = GameEventBus::default();
        for i in 0..(MAX_EVENTS + 25) {
            bus.emit("pickup_collected", serde_json::json!({ "i": i }), None);
        }
        assert_eq!(bus.recent.len(), MAX_EVENTS);
        assert_eq!(bus.dropped_events, 25);
        assert_eq!(bus.recent[0].data["i"], 25);
    }

    #[test]
    fn after_filters_by_sequence_within_a_frame() {
        let mut bus = GameEventBus::default();
        bus.frame = 4;
        bus.emit("step", serde_json::Value::Null, None);
        bus.emit("player_died", serde_json::Value::Null, None);
        bus.emit("session_over", serde_json::Value::Null, None);
        let first_seq = bus.recent[0].seq;
        let names: Vec<_> = bus.after(first_seq).map(|ev| ev.name.as_str()).collect();
        assert_eq!(names, vec!["player_died", "session_over"]);
        assert!(bus.recent.iter().all(|ev| ev.frame == 4));
        assert_eq!(bus.count("step"), 1);
    }
}

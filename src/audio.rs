use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::{GameEvent, GameEventBus};

const MAX_AUDIO_EVENTS: usize = 128;

fn default_volume() -> f32 {
    1.0
}

fn default_looping() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SfxDefinition {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MusicDefinition {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_looping")]
    pub looping: bool,
}

/// A playback request waiting for whatever mixer the host provides.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AudioRequest {
    pub frame: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub path: String,
    pub volume: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_event: Option<String>,
}

#[derive(Resource)]
pub struct AudioManager {
    pub sfx: HashMap<String, SfxDefinition>,
    pub music: HashMap<String, MusicDefinition>,
    /// Game event name -> sfx name.
    pub triggers: HashMap<String, String>,
    pub current_music: Option<String>,
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub music_volume: f32,
    pub requests: Vec<AudioRequest>,
}

impl Default for AudioManager {
    fn default() -> Self {
        let sfx = [
            ("pick_up", "pick_up.wav"),
            ("dead", "dead.wav"),
            ("step", "step.wav"),
            ("hurt", "hurt.wav"),
            ("hit", "hit.wav"),
        ]
        .into_iter()
        .map(|(name, path)| {
            (
                name.to_string(),
                SfxDefinition {
                    path: path.to_string(),
                    volume: 1.0,
                },
            )
        })
        .collect();
        let music = [("menu", "menu.mp3"), ("level", "level.mp3")]
            .into_iter()
            .map(|(name, path)| {
                (
                    name.to_string(),
                    MusicDefinition {
                        path: path.to_string(),
                        volume: 0.5,
                        looping: true,
                    },
                )
            })
            .collect();
        let triggers = [
            ("pickup_collected", "pick_up"),
            ("key_collected", "pick_up"),
            ("player_died", "dead"),
            ("step", "step"),
            ("damage_taken", "hurt"),
            ("enemy_killed", "hit"),
            ("boss_hit", "hit"),
        ]
        .into_iter()
        .map(|(event, sfx)| (event.to_string(), sfx.to_string()))
        .collect();
        Self {
            sfx,
            music,
            triggers,
            current_music: None,
            master_volume: 1.0,
            sfx_volume: 1.0,
            music_volume: 1.0,
            requests: Vec::new(),
        }
    }
}

impl AudioManager {
    pub fn set_volume(&mut self, channel: &str, value: f32) -> Result<(), String> {
        let v = value.clamp(0.0, 2.0);
        match channel {
            "master" => self.master_volume = v,
            "sfx" => self.sfx_volume = v,
            "music" => self.music_volume = v,
            _ => return Err(format!("Unknown volume channel: {channel}")),
        }
        Ok(())
    }

    pub fn play_sfx(
        &mut self,
        name: &str,
        frame: u64,
        source_event: Option<String>,
    ) -> Result<(), String> {
        let Some(def) = self.sfx.get(name) else {
            return Err(format!("Unknown sfx: {name}"));
        };
        let request = AudioRequest {
            frame,
            kind: "sfx".to_string(),
            name: name.to_string(),
            path: def.path.clone(),
            volume: def.volume * self.sfx_volume * self.master_volume,
            source_event,
        };
        self.push(request);
        Ok(())
    }

    pub fn play_music(&mut self, name: &str, frame: u64) -> Result<(), String> {
        let Some(def) = self.music.get(name) else {
            return Err(format!("Unknown music track: {name}"));
        };
        let request = AudioRequest {
            frame,
            kind: "music".to_string(),
            name: name.to_string(),
            path: def.path.clone(),
            volume: def.volume * self.music_volume * self.master_volume,
            source_event: None,
        };
        self.current_music = Some(name.to_string());
        self.push(request);
        Ok(())
    }

    pub fn stop_music(&mut self, frame: u64) {
        if let Some(name) = self.current_music.take() {
            self.push(AudioRequest {
                frame,
                kind: "music_stop".to_string(),
                name,
                path: String::new(),
                volume: 0.0,
                source_event: None,
            });
        }
    }

    /// Hand the queued requests to the mixer.
    pub fn drain_requests(&mut self) -> Vec<AudioRequest> {
        std::mem::take(&mut self.requests)
    }

    fn push(&mut self, request: AudioRequest) {
        self.requests.push(request);
        if self.requests.len() > MAX_AUDIO_EVENTS {
            let excess = self.requests.len() - MAX_AUDIO_EVENTS;
            self.requests.drain(0..excess);
        }
    }
}

#[derive(Resource, Default)]
struct AudioEventCursor {
    last_seq: u64,
}

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AudioManager::default())
            .insert_resource(AudioEventCursor::default())
            .add_systems(Startup, start_level_music)
            .add_systems(Update, audio_from_events);
    }
}

fn start_level_music(mut audio: ResMut<AudioManager>) {
    if let Err(e) = audio.play_music("level", 0) {
        warn!("[Tilerun audio] {e}");
    }
}

fn audio_from_events(
    mut audio: ResMut<AudioManager>,
    bus: Res<GameEventBus>,
    mut cursor: ResMut<AudioEventCursor>,
) {
    let mut newest = cursor.last_seq;
    for ev in bus.after(cursor.last_seq) {
        newest = newest.max(ev.seq);
        handle_event(&mut audio, ev);
    }
    cursor.last_seq = newest;
}

fn handle_event(audio: &mut AudioManager, ev: &GameEvent) {
    match ev.name.as_str() {
        "session_over" => audio.stop_music(ev.frame),
        other => {
            if let Some(mapped) = audio.triggers.get(other).cloned() {
                if let Err(e) = audio.play_sfx(&mapped, ev.frame, Some(other.to_string())) {
                    debug!("[Tilerun audio] {e}");
                }
            }
        }
    }
}

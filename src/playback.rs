// Announce Core - Audio clip library and announcement builder
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Single-slot playback session
//!
//! At most one clip plays at a time. Starting a clip stops the previous
//! one. The session only tracks state; producing sound belongs to the
//! presentation layer that owns the session.

use crate::storage::models::AudioFile;
use serde::Serialize;

/// Volume a new session starts with
pub const DEFAULT_VOLUME: f32 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    current_clip: Option<AudioFile>,
    is_playing: bool,
    volume: f32,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            current_clip: None,
            is_playing: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `clip`, returning the clip that was interrupted, if any
    pub fn play(&mut self, clip: AudioFile) -> Option<AudioFile> {
        let interrupted = if self.is_playing {
            self.current_clip.take()
        } else {
            None
        };
        self.current_clip = Some(clip);
        self.is_playing = true;
        interrupted
    }

    /// Stop playback and release the slot
    pub fn stop(&mut self) -> Option<AudioFile> {
        self.is_playing = false;
        self.current_clip.take()
    }

    /// The current clip reached its end; it stays selected
    pub fn finished(&mut self) {
        self.is_playing = false;
    }

    /// Set volume, clamped to `[0, 1]`. NaN is ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_nan() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn current_clip(&self) -> Option<&AudioFile> {
        self.current_clip.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Whether `path` is the clip currently playing
    pub fn is_playing_path(&self, path: &str) -> bool {
        self.is_playing
            && self
                .current_clip
                .as_ref()
                .map(|clip| clip.path == path)
                .unwrap_or(false)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn clip(name: &str) -> AudioFile {
        AudioFile {
            name: name.to_string(),
            path: format!("/audio/{}", name),
            category: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_play_replaces_current_clip() {
        let mut session = PlaybackSession::new();
        assert_eq!(session.play(clip("a.mp3")), None);

        let interrupted = session.play(clip("b.mp3"));
        assert_eq!(interrupted.map(|c| c.name), Some("a.mp3".to_string()));
        assert!(session.is_playing_path("/audio/b.mp3"));
        assert!(!session.is_playing_path("/audio/a.mp3"));
    }

    #[test]
    fn test_finished_then_play_interrupts_nothing() {
        let mut session = PlaybackSession::new();
        session.play(clip("a.mp3"));
        session.finished();

        assert!(!session.is_playing());
        assert_eq!(session.current_clip().map(|c| c.name.as_str()), Some("a.mp3"));
        assert_eq!(session.play(clip("b.mp3")), None);
    }

    #[test]
    fn test_stop() {
        let mut session = PlaybackSession::new();
        session.play(clip("a.mp3"));
        assert!(session.stop().is_some());
        assert!(session.current_clip().is_none());
        assert!(session.stop().is_none());
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut session = PlaybackSession::new();
        assert_eq!(session.volume(), DEFAULT_VOLUME);
        session.set_volume(1.5);
        assert_eq!(session.volume(), 1.0);
        session.set_volume(-0.2);
        assert_eq!(session.volume(), 0.0);
        session.set_volume(f32::NAN);
        assert_eq!(session.volume(), 0.0);
    }
}

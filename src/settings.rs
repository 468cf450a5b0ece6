//! Player preferences
//!
//! Persisted in LocalStorage, separate from anything the session publishes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sync::PeerId;

/// Player settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Gameplay ===
    /// Attraction between balls
    pub attraction: bool,
    /// Stored identity seed so the avatar survives reloads
    pub avatar_seed: Option<String>,

    // === HUD ===
    /// Show join/leave notifications
    pub show_notifications: bool,
    /// Show the title/score text
    pub show_score: bool,

    // === Accessibility ===
    /// Reduced motion (no growing title text)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attraction: true,
            avatar_seed: None,

            show_notifications: true,
            show_score: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// The stored identity, or a fresh one that is remembered from now on
    pub fn identity<R: Rng>(&mut self, rng: &mut R) -> PeerId {
        match &self.avatar_seed {
            Some(seed) if !seed.is_empty() => PeerId::new(seed.clone()),
            _ => {
                let peer = PeerId::generate(rng);
                self.avatar_seed = Some(peer.to_string());
                peer
            }
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "magmag_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY)
        {
            match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring stored settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(json) = serde_json::to_string(self)
        {
            let _ = storage.set_item(Self::STORAGE_KEY, &json);
            log::info!("Settings saved");
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

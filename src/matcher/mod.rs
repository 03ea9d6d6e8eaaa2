//! Resolves which library game is being played from a window snapshot.
//!
//! The cascade tries the selected window first (exact executable path, then
//! fuzzy name containment) and only then scans the other windows. A hit on
//! another window promotes it to the selection; the caller applies that
//! promotion from the returned outcome.

mod normalize;

use serde::Serialize;

use crate::{
    db::GameRecord,
    platform::{WindowInfo, WindowKey},
};

pub use normalize::{exe_stem, normalize_path, process_stem};

/// Which step of the cascade produced the match.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchTier {
    ExactSelected,
    FuzzySelected,
    ExactOther,
    FuzzyOther,
}

impl MatchTier {
    pub fn rank(self) -> u8 {
        match self {
            MatchTier::ExactSelected => 1,
            MatchTier::FuzzySelected => 2,
            MatchTier::ExactOther => 3,
            MatchTier::FuzzyOther => 4,
        }
    }

    pub fn promotes(self) -> bool {
        matches!(self, MatchTier::ExactOther | MatchTier::FuzzyOther)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Minimum token length for fuzzy matching on the selected window.
    pub selected_min_len: usize,
    /// Minimum token length for fuzzy matching on other windows.
    pub other_min_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            selected_min_len: 2,
            other_min_len: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub selected_key: Option<WindowKey>,
    pub game: Option<GameRecord>,
    pub tier: Option<MatchTier>,
}

impl MatchOutcome {
    pub fn promoted(&self) -> bool {
        self.tier.is_some_and(MatchTier::promotes)
    }
}

/// Keep `prev` while it is still in the snapshot, otherwise fall back to the
/// cached foreground window, the live foreground window, then the first one.
pub fn resolve_selection(
    windows: &[WindowInfo],
    prev: Option<&WindowKey>,
    last_foreground: Option<&WindowInfo>,
) -> Option<WindowKey> {
    if let Some(key) = prev {
        if windows.iter().any(|w| w.has_key(key)) {
            return Some(key.clone());
        }
    }

    if let Some(cached) = last_foreground {
        let key = cached.key();
        if windows.iter().any(|w| w.has_key(&key)) {
            return Some(key);
        }
    }

    windows
        .iter()
        .find(|w| w.is_foreground)
        .or_else(|| windows.first())
        .map(WindowInfo::key)
}

fn exact_match<'a>(window: &WindowInfo, library: &'a [GameRecord]) -> Option<&'a GameRecord> {
    let window_path = normalize_path(&window.executable_path);
    if window_path.is_empty() {
        return None;
    }

    library.iter().find(|game| {
        game.executable_path
            .as_deref()
            .map(normalize_path)
            .is_some_and(|path| !path.is_empty() && path == window_path)
    })
}

fn contains(haystack: &str, needle: &str, min_len: usize) -> bool {
    !needle.is_empty() && needle.chars().count() >= min_len && haystack.contains(needle)
}

fn fuzzy_match<'a>(
    window: &WindowInfo,
    library: &'a [GameRecord],
    min_len: usize,
) -> Option<&'a GameRecord> {
    // Under Wine/Proton the exe is the loader; the process name still
    // carries the game binary.
    let tokens = [
        window.title.trim().to_lowercase(),
        exe_stem(&window.executable_path, &window.process_name),
        process_stem(&window.process_name),
    ];

    library.iter().find(|game| {
        let name = game.name.trim().to_lowercase();
        if name.chars().count() < min_len {
            return false;
        }

        tokens
            .iter()
            .any(|token| contains(token, &name, min_len) || contains(&name, token, min_len))
    })
}

/// Run the four-tier cascade. Never mutates its inputs.
pub fn match_game(
    windows: &[WindowInfo],
    library: &[GameRecord],
    prev: Option<&WindowKey>,
    last_foreground: Option<&WindowInfo>,
    config: &MatchConfig,
) -> MatchOutcome {
    let selected_key = resolve_selection(windows, prev, last_foreground);
    let selected = selected_key
        .as_ref()
        .and_then(|key| windows.iter().find(|w| w.has_key(key)));

    let hit = |game: &GameRecord, tier: MatchTier, key: Option<WindowKey>| MatchOutcome {
        selected_key: key,
        game: Some(game.clone()),
        tier: Some(tier),
    };

    if let Some(window) = selected {
        if let Some(game) = exact_match(window, library) {
            return hit(game, MatchTier::ExactSelected, selected_key.clone());
        }
        if let Some(game) = fuzzy_match(window, library, config.selected_min_len) {
            return hit(game, MatchTier::FuzzySelected, selected_key.clone());
        }
    }

    let skip = selected_key.as_ref();
    let others = || {
        windows
            .iter()
            .filter(move |w| skip.map_or(true, |key| !w.has_key(key)))
    };

    for window in others() {
        if let Some(game) = exact_match(window, library) {
            return hit(game, MatchTier::ExactOther, Some(window.key()));
        }
    }

    for window in others() {
        if let Some(game) = fuzzy_match(window, library, config.other_min_len) {
            return hit(game, MatchTier::FuzzyOther, Some(window.key()));
        }
    }

    MatchOutcome {
        selected_key,
        game: None,
        tier: None,
    }
}

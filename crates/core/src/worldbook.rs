//! World-book (lore) entry records.
//!
//! A world-book entry is conditionally activated text: the scanner matches
//! its keywords against recent conversation text, subject to per-entry
//! timers, recursion controls, and mutual-exclusion groups. Entries arrive
//! from the platform as plain data — no persistence types cross this seam.

use serde::{Deserialize, Serialize};

/// How secondary keywords combine with the primary keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectiveLogic {
    /// Primary matched AND any secondary matched (vacuously true with none)
    #[default]
    AndAny,
    /// Primary matched AND all secondaries matched
    AndAll,
    /// Primary matched AND no secondary matched
    NotAny,
    /// Primary matched AND at least one secondary did not match
    NotAll,
}

/// Where an activated entry's content lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LorePosition {
    /// Before the character definition
    #[default]
    BeforeChar,
    /// After the character definition
    AfterChar,
    /// Top of the author's note block
    AnTop,
    /// Bottom of the author's note block
    AnBottom,
    /// Spliced into history at `depth` messages from the end
    AtDepth,
    /// Above the example block
    EmTop,
    /// Below the example block
    EmBottom,
    /// A named outlet, keyed by the entry's name
    Outlet,
}

fn default_order() -> i32 {
    crate::component::DEFAULT_ORDER
}

fn default_group_weight() -> u32 {
    100
}

/// A single world-book entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldBookEntry {
    /// Stable identity. Used for scan-dedup and cross-call timer persistence.
    pub uid: String,

    /// Display name. Also the outlet key for `LorePosition::Outlet` entries.
    pub name: String,

    /// The text injected when this entry activates
    pub content: String,

    /// Primary trigger keywords. Plain substrings, or `/pattern/` regexes
    /// (optionally `/pattern/i`).
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Secondary keywords, combined per `selective_logic`
    #[serde(default)]
    pub secondary_keywords: Vec<String>,

    #[serde(default)]
    pub selective_logic: SelectiveLogic,

    #[serde(default)]
    pub position: LorePosition,

    /// Injection depth for `AtDepth` entries
    #[serde(default)]
    pub depth: u32,

    /// Ordering weight (smaller = earlier)
    #[serde(default = "default_order")]
    pub order: i32,

    /// Inclusion group name. Entries sharing a non-empty group are mutually
    /// exclusive per scan.
    #[serde(default)]
    pub group: String,

    /// Wins its inclusion group outright (lowest order among overrides)
    #[serde(default)]
    pub group_override: bool,

    /// Weight for random group selection
    #[serde(default = "default_group_weight")]
    pub group_weight: u32,

    /// Use match-count scoring instead of random selection for the group
    #[serde(default)]
    pub use_group_scoring: bool,

    /// Always active, ignoring keywords (non-recursive rounds only)
    #[serde(default)]
    pub constant: bool,

    /// Never scanned
    #[serde(default)]
    pub disable: bool,

    /// Turns the entry stays active after triggering
    #[serde(default)]
    pub sticky: u32,

    /// Turns the entry is suppressed after its sticky period
    #[serde(default)]
    pub cooldown: u32,

    /// Message index before which the entry can never trigger
    #[serde(default)]
    pub delay: u32,

    /// Exempt from the scanner's token-budget filter
    #[serde(default)]
    pub ignore_budget: bool,

    /// Per-entry override of how much history the scan text includes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_depth: Option<usize>,

    /// Match keywords case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,

    /// Only match keywords at word boundaries
    #[serde(default)]
    pub match_whole_words: bool,

    /// This entry's content never feeds later recursion rounds
    #[serde(default)]
    pub exclude_recursion: bool,

    /// This entry can only activate in round 0 (never via recursion)
    #[serde(default)]
    pub prevent_recursion: bool,

    /// This entry is ineligible until recursion round >= this value
    #[serde(default)]
    pub delay_until_recursion: u32,
}

impl WorldBookEntry {
    /// Create an entry with default metadata and no keywords.
    pub fn new(uid: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            content: content.into(),
            keywords: Vec::new(),
            secondary_keywords: Vec::new(),
            selective_logic: SelectiveLogic::default(),
            position: LorePosition::default(),
            depth: 0,
            order: default_order(),
            group: String::new(),
            group_override: false,
            group_weight: default_group_weight(),
            use_group_scoring: false,
            constant: false,
            disable: false,
            sticky: 0,
            cooldown: 0,
            delay: 0,
            ignore_budget: false,
            scan_depth: None,
            case_sensitive: false,
            match_whole_words: false,
            exclude_recursion: false,
            prevent_recursion: false,
            delay_until_recursion: 0,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_position(mut self, position: LorePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }
}

//! Injection risk detection.
//!
//! Seven fixed pattern categories, each with a weight. Matches within a
//! category contribute `weight / sqrt(rank)` so the first hit counts in
//! full and repeats decay; firing two or more distinct categories applies a
//! 20%-per-extra-category multiplier. The final score is clamped to
//! [0, 100] and mapped to a level through fixed cutoffs.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Risk severity, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Fixed score cutoffs: CRITICAL ≥ 80, HIGH ≥ 60, MEDIUM ≥ 40, LOW ≥ 20.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Critical,
            60..80 => Self::High,
            40..60 => Self::Medium,
            20..40 => Self::Low,
            _ => Self::Safe,
        }
    }
}

/// The seven detection categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    InstructionOverride,
    RoleSwitch,
    FakeSystemTag,
    ParameterEscape,
    DelimiterConfusion,
    DirectLeakage,
    IndirectLeakage,
}

impl PatternCategory {
    fn weight(self) -> f64 {
        match self {
            Self::InstructionOverride => 45.0,
            Self::RoleSwitch => 35.0,
            Self::FakeSystemTag => 40.0,
            Self::ParameterEscape => 30.0,
            Self::DelimiterConfusion => 20.0,
            Self::DirectLeakage => 45.0,
            Self::IndirectLeakage => 30.0,
        }
    }

    fn suggestion(self) -> &'static str {
        match self {
            Self::InstructionOverride => {
                "Text tries to override standing instructions; keep it quoted as user content"
            }
            Self::RoleSwitch => "Text attempts a role or mode switch; ignore persona changes",
            Self::FakeSystemTag => "Text forges system/ChatML markup; strip or neutralize tags",
            Self::ParameterEscape => "Text probes template boundaries; escape placeholder syntax",
            Self::DelimiterConfusion => "Text imitates section delimiters; break up long runs",
            Self::DirectLeakage => "Text requests the system prompt; do not echo instructions",
            Self::IndirectLeakage => {
                "Text requests instruction paraphrases; do not summarize or translate the prompt"
            }
        }
    }
}

/// One pattern hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub category: PatternCategory,
    /// The regex that fired
    pub pattern: String,
    /// The matched text
    pub matched: String,
    /// Byte offset of the match
    pub offset: usize,
}

/// The detector's verdict for one piece of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// 0–100
    pub score: u32,
    pub patterns: Vec<DetectedPattern>,
    pub suggestions: Vec<String>,
}

impl RiskAssessment {
    /// The verdict for empty or trivially safe text.
    pub fn safe() -> Self {
        Self {
            level: RiskLevel::Safe,
            score: 0,
            patterns: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

// Pattern tables. All case-insensitive via inline flags; compiled once at
// detector construction.
const INSTRUCTION_OVERRIDE: &[&str] = &[
    r"(?i)ignore\s+(all\s+)?(previous|prior|above|earlier)\s+(instructions?|prompts?|rules|directives)",
    r"(?i)disregard\s+(all\s+)?(previous|prior|above|your)\s+(instructions?|rules|guidelines)",
    r"(?i)forget\s+(everything|all|your)\s+(previous\s+)?(instructions?|rules|training)",
    r"(?i)new\s+instructions?\s*:",
    r"(?i)override\s+(the\s+)?(system|previous)\s+(prompt|instructions?)",
];

const ROLE_SWITCH: &[&str] = &[
    r"(?i)you\s+are\s+now\s+(a|an|the)\s+\w+",
    r"(?i)act\s+as\s+(if\s+you\s+(are|were)\s+)?(a|an|the)?\s*(system|admin(istrator)?|root|developer)",
    r"(?i)pretend\s+(to\s+be|you\s+are)\s+(the\s+)?(system|admin(istrator)?|developer)",
    r"(?i)switch\s+(to\s+)?(developer|admin|god)\s+mode",
    r"(?i)enable\s+(developer|dan|jailbreak)\s+mode",
];

const FAKE_SYSTEM_TAG: &[&str] = &[
    r"(?i)<\|\s*(system|im_start|im_end|endoftext)\s*\|?>",
    r"(?i)<\s*/?\s*(system|instructions?)\s*>",
    r"(?i)\[\s*(system|assistant)\s*\]\s*:",
    r"(?i)###\s*(system|instruction)",
];

const PARAMETER_ESCAPE: &[&str] = &[
    r"\{\{\s*[a-zA-Z_][a-zA-Z0-9_]*\s*\}\}",
    r"\$\{[^}\n]*\}",
    r"\}\}[^{]*\{\{",
    r"(?i)end\s+of\s+(parameter|variable|input|template)",
];

const DELIMITER_CONFUSION: &[&str] = &[
    r"-{5,}",
    r"={5,}",
    r"#{4,}",
    r"(?i)(begin|end)\s+(of\s+)?(system|prompt|context)\b",
];

const DIRECT_LEAKAGE: &[&str] = &[
    r"(?i)(reveal|show|print|display|output|repeat)\s+(me\s+)?(your|the)\s+(system\s+|initial\s+)?(prompt|instructions?)",
    r"(?i)what\s+(are|is)\s+your\s+(system\s+)?(prompt|instructions?|rules)",
    r"(?i)(copy|paste|echo)\s+(your|the)\s+(system\s+)?(prompt|instructions?)",
];

const INDIRECT_LEAKAGE: &[&str] = &[
    r"(?i)(summarize|paraphrase)\s+(your|the)\s+(rules|instructions?|guidelines|prompt)",
    r"(?i)translate\s+(your|the)\s+(prompt|instructions?)",
    r"(?i)first\s+(line|word|sentence)\s+of\s+(your|the)\s+(prompt|instructions?)",
    r"(?i)(everything|all\s+(the\s+)?text)\s+(above|before)\s+this",
];

const NARRATIVE_VERBS: &[&str] = &[
    "said", "asked", "replied", "whispered", "smiled", "laughed", "nodded", "sighed", "walked",
    "turned", "looked", "leaned", "grinned", "frowned",
];

/// The injection detector. Compiles its pattern tables once; construct it in
/// the engine factory and reuse it.
pub struct InjectionDetector {
    rules: Vec<(PatternCategory, Vec<Regex>)>,
    dialogue: Regex,
    stage_action: Regex,
}

impl InjectionDetector {
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("built-in detection pattern must compile"))
                .collect()
        };
        Self {
            rules: vec![
                (PatternCategory::InstructionOverride, compile(INSTRUCTION_OVERRIDE)),
                (PatternCategory::RoleSwitch, compile(ROLE_SWITCH)),
                (PatternCategory::FakeSystemTag, compile(FAKE_SYSTEM_TAG)),
                (PatternCategory::ParameterEscape, compile(PARAMETER_ESCAPE)),
                (PatternCategory::DelimiterConfusion, compile(DELIMITER_CONFUSION)),
                (PatternCategory::DirectLeakage, compile(DIRECT_LEAKAGE)),
                (PatternCategory::IndirectLeakage, compile(INDIRECT_LEAKAGE)),
            ],
            dialogue: Regex::new(r#"["“][^"“”]{2,}["”]"#)
                .expect("built-in detection pattern must compile"),
            stage_action: Regex::new(r"\*[^*\n]{2,}\*")
                .expect("built-in detection pattern must compile"),
        }
    }

    /// Assess one piece of text. Never fails; empty input is SAFE/0.
    pub fn assess(&self, text: &str) -> RiskAssessment {
        if text.trim().is_empty() {
            return RiskAssessment::safe();
        }

        let mut patterns: Vec<DetectedPattern> = Vec::new();
        let mut raw_score = 0.0f64;
        let mut categories_fired = 0u32;

        for (category, regexes) in &self.rules {
            let mut rank = 0usize;
            for re in regexes {
                for m in re.find_iter(text) {
                    rank += 1;
                    raw_score += category.weight() / (rank as f64).sqrt();
                    patterns.push(DetectedPattern {
                        category: *category,
                        pattern: re.as_str().to_string(),
                        matched: m.as_str().to_string(),
                        offset: m.start(),
                    });
                }
            }
            if rank > 0 {
                categories_fired += 1;
            }
        }

        if categories_fired >= 2 {
            raw_score *= 1.0 + 0.2 * (categories_fired - 1) as f64;
        }
        let score = raw_score.round().clamp(0.0, 100.0) as u32;
        let level = RiskLevel::from_score(score);

        let mut suggestions: Vec<String> = Vec::new();
        for p in &patterns {
            let s = p.category.suggestion().to_string();
            if !suggestions.contains(&s) {
                suggestions.push(s);
            }
        }

        RiskAssessment {
            level,
            score,
            patterns,
            suggestions,
        }
    }

    /// Heuristic: does this read like narrative or dialogue rather than an
    /// attack? Used to suppress false-positive sanitization on roleplay
    /// text. Two or more creative signals make the call.
    pub fn is_creative_content(&self, text: &str) -> bool {
        let mut signals = 0u32;

        if self.dialogue.is_match(text) {
            signals += 1;
        }
        if self.stage_action.is_match(text) {
            signals += 1;
        }

        let lower = text.to_lowercase();
        let verb_hits = NARRATIVE_VERBS
            .iter()
            .filter(|v| contains_word(&lower, v))
            .count();
        if verb_hits >= 2 {
            signals += 1;
        }

        if text.chars().count() >= 200 {
            signals += 1;
        }

        signals >= 2
    }
}

impl Default for InjectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, matched)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[start + matched.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

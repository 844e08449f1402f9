//! The injection guard facade.
//!
//! Combines detection and sanitization for the two entry points untrusted
//! text has into the pipeline: live user input and parameter values. The
//! creative-content heuristic keeps narrative prose intact at moderate risk;
//! parameter values never get boundary fences (they may be substituted into
//! `{{name}}` placeholders, where fences would leak).

use std::collections::BTreeMap;

use tracing::debug;

use crate::detector::{InjectionDetector, RiskAssessment, RiskLevel};
use crate::sanitizer::Sanitizer;

/// The outcome of protecting one piece of text.
#[derive(Debug, Clone)]
pub struct GuardedText {
    pub original: String,
    pub protected: String,
    pub risk: RiskAssessment,
    /// True when `protected` differs from `original`
    pub modified: bool,
}

/// Detector + sanitizer behind one door.
pub struct InjectionGuard {
    detector: InjectionDetector,
}

impl InjectionGuard {
    pub fn new() -> Self {
        Self {
            detector: InjectionDetector::new(),
        }
    }

    /// Assess without modifying.
    pub fn assess(&self, text: &str) -> RiskAssessment {
        self.detector.assess(text)
    }

    /// Protect live user input.
    ///
    /// Assess, then sanitize at MEDIUM+ — unless the text reads as creative
    /// content and the risk is no worse than MEDIUM, in which case the prose
    /// is left intact. A MEDIUM+ warning banner is prepended either way.
    /// `boundary` wraps the result in literal fencing when given.
    pub fn protect_user_input(&self, text: &str, boundary: Option<&str>) -> GuardedText {
        let risk = self.detector.assess(text);
        let mut protected = text.to_string();

        if risk.level >= RiskLevel::Medium {
            let creative = self.detector.is_creative_content(text);
            if creative && risk.level <= RiskLevel::Medium {
                debug!(score = risk.score, "creative content, skipping sanitization");
            } else {
                protected = Sanitizer::sanitize(&protected, &risk);
            }
            protected = Sanitizer::add_warning(&protected, risk.level);
        }

        if let Some(kind) = boundary {
            protected = Sanitizer::mark_boundaries(&protected, kind);
        }

        let modified = protected != text;
        if modified {
            debug!(level = ?risk.level, score = risk.score, "user input protected");
        }
        GuardedText {
            original: text.to_string(),
            protected,
            risk,
            modified,
        }
    }

    /// Protect parameter values. Same policy as user input, with boundary
    /// marking forced off.
    pub fn protect_parameters(
        &self,
        params: &BTreeMap<String, String>,
    ) -> BTreeMap<String, GuardedText> {
        params
            .iter()
            .map(|(name, value)| (name.clone(), self.protect_user_input(value, None)))
            .collect()
    }
}

impl Default for InjectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

//! Voice styles and their stage-direction wrapping.
//!
//! A style wraps outgoing text with parenthetical, non-verbal instructions
//! that the synthesis channel performs rather than speaks. Wrapping happens
//! at dispatch time with whatever style is active *then*.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery style applied to every real segment before dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceStyle {
    Breathy,
    Dramatic,
    Enthusiastic,
    Formal,
    Conversational,
    #[default]
    Natural,
}

impl VoiceStyle {
    pub const ALL: [Self; 6] = [
        Self::Breathy,
        Self::Dramatic,
        Self::Enthusiastic,
        Self::Formal,
        Self::Conversational,
        Self::Natural,
    ];

    /// Stage direction placed before the text, if any.
    #[must_use]
    pub const fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Breathy => Some("(soft inhale)"),
            Self::Dramatic => Some("(slowly)"),
            Self::Enthusiastic => Some("(excitedly)"),
            Self::Formal => Some("(professionally)"),
            Self::Conversational => Some("(casually)"),
            Self::Natural => None,
        }
    }

    /// Stage direction placed after the text, if any.
    #[must_use]
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Breathy => Some("... (pause)"),
            Self::Dramatic => Some("... (long pause)"),
            _ => None,
        }
    }

    /// Wrap `text` with this style's stage directions.
    ///
    /// Blank input yields an empty string so the caller can drop the segment
    /// instead of sending bare stage directions.
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }

        let mut out = String::with_capacity(text.len() + 32);
        if let Some(prefix) = self.prefix() {
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(text);
        if let Some(suffix) = self.suffix() {
            out.push(' ');
            out.push_str(suffix);
        }
        out
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Breathy => "breathy",
            Self::Dramatic => "dramatic",
            Self::Enthusiastic => "enthusiastic",
            Self::Formal => "formal",
            Self::Conversational => "conversational",
            Self::Natural => "natural",
        }
    }
}

impl fmt::Display for VoiceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown style name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown voice style '{0}'")]
pub struct UnknownStyle(pub String);

impl FromStr for VoiceStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dramatic_wraps_both_sides() {
        assert_eq!(
            VoiceStyle::Dramatic.apply("Hello"),
            "(slowly) Hello ... (long pause)"
        );
    }

    #[test]
    fn natural_is_identity() {
        assert_eq!(VoiceStyle::Natural.apply("Hello"), "Hello");
    }

    #[test]
    fn prefix_only_styles() {
        assert_eq!(VoiceStyle::Enthusiastic.apply("Hi"), "(excitedly) Hi");
        assert_eq!(VoiceStyle::Formal.apply("Hi"), "(professionally) Hi");
        assert_eq!(VoiceStyle::Conversational.apply("Hi"), "(casually) Hi");
        assert_eq!(VoiceStyle::Breathy.apply("Hi"), "(soft inhale) Hi ... (pause)");
    }

    #[test]
    fn blank_text_yields_empty() {
        for style in VoiceStyle::ALL {
            assert!(style.apply("   ").is_empty(), "{style} should drop blank text");
        }
    }

    #[test]
    fn parse_style_names() {
        assert_eq!("Dramatic".parse::<VoiceStyle>(), Ok(VoiceStyle::Dramatic));
        assert_eq!("natural".parse::<VoiceStyle>(), Ok(VoiceStyle::Natural));
        assert!("whisper".parse::<VoiceStyle>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&VoiceStyle::Enthusiastic).unwrap();
        assert_eq!(json, "\"enthusiastic\"");
    }
}

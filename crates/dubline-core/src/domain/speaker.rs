//! Speaker lexicon: the closed set of speech channels.
//!
//! Every segment targets exactly one speaker. The lexicon is fixed: a
//! transcript line may start with one of these labels followed by a colon
//! (`"Male 1: Hi there"`) and is otherwise routed to [`SpeakerKey::Default`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one speech channel (and therefore one voice).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerKey {
    /// The primary channel. Untagged and unrecognised lines land here.
    #[default]
    Default,
    Male1,
    Male2,
    Female1,
    Female2,
}

impl SpeakerKey {
    /// Every speaker, primary first. Channel pools are built from this table.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Male1,
        Self::Male2,
        Self::Female1,
        Self::Female2,
    ];

    /// The tag used in transcript text (without the trailing colon).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Male1 => "Male 1",
            Self::Male2 => "Male 2",
            Self::Female1 => "Female 1",
            Self::Female2 => "Female 2",
        }
    }

    /// Voice identity the channel for this speaker is bound to.
    #[must_use]
    pub const fn voice(self) -> &'static str {
        match self {
            Self::Default => "Kore",
            Self::Male1 => "Puck",
            Self::Male2 => "Charon",
            Self::Female1 => "Aoede",
            Self::Female2 => "Leda",
        }
    }

    /// Whether this is the primary channel.
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Look up a speaker by its transcript label.
    ///
    /// Matching ignores ASCII case and surrounding whitespace, so `"male 1"`
    /// and `" Male 1 "` both resolve to [`SpeakerKey::Male1`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.label().eq_ignore_ascii_case(label))
    }

    /// Split a leading `"<label>:"` tag off a line.
    ///
    /// Returns the speaker and the remaining text (trimmed), or `None` when
    /// the line carries no recognised tag.
    #[must_use]
    pub fn strip_tag(line: &str) -> Option<(Self, &str)> {
        let (head, rest) = line.split_once(':')?;
        let key = Self::from_label(head)?;
        Some((key, rest.trim()))
    }
}

impl fmt::Display for SpeakerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//! Segmenter: turns snapshot text into ordered queue items.
//!
//! Text is split on newlines, each paragraph is trimmed, and empty
//! paragraphs are dropped. Every remaining paragraph becomes one
//! [`Segment`] in source order.
//!
//! The stateful [`Segmenter`] also injects a filler item after every Nth
//! real segment. The count runs for the whole session and is never reset.
//! Style wrapping is *not* done here; it happens at dispatch time.

use std::sync::Arc;

use crate::domain::{QueueItem, Segment, TranscriptSnapshot};

/// Default number of real segments between two filler items.
pub const DEFAULT_FILLER_EVERY: u32 = 3;

/// Split raw source text into ordered segments.
///
/// Pure and stateless: no filler items are produced.
#[must_use]
pub fn split_segments(text: &str) -> Vec<Segment> {
    text.split('\n')
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(Segment::from_paragraph)
        .collect()
}

/// Session-scoped segmenter with filler injection.
#[derive(Debug, Clone)]
pub struct Segmenter {
    /// Inject a filler after every `filler_every` real segments (0 disables).
    filler_every: u32,
    /// Real segments produced so far this session.
    real_segments: u64,
}

impl Segmenter {
    #[must_use]
    pub const fn new(filler_every: u32) -> Self {
        Self {
            filler_every,
            real_segments: 0,
        }
    }

    /// Number of real (non-filler) segments produced so far.
    #[must_use]
    pub const fn real_segments(&self) -> u64 {
        self.real_segments
    }

    /// Segment a snapshot into queue items, fillers included, in dispatch order.
    pub fn segment(&mut self, snapshot: &Arc<TranscriptSnapshot>) -> Vec<QueueItem> {
        let segments = split_segments(&snapshot.text);
        let mut items = Vec::with_capacity(segments.len() + segments.len() / 2);

        for segment in segments {
            items.push(QueueItem::new(segment, Arc::clone(snapshot)));
            self.real_segments += 1;

            if self.filler_every > 0 && self.real_segments % u64::from(self.filler_every) == 0 {
                items.push(QueueItem::filler());
            }
        }

        tracing::debug!(
            snapshot = %snapshot.id,
            items = items.len(),
            total_real = self.real_segments,
            "Segmented snapshot"
        );

        items
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_EVERY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FILLER_TEXT, SpeakerKey};

    fn snapshot(id: &str, text: &str) -> Arc<TranscriptSnapshot> {
        Arc::new(TranscriptSnapshot::new(id, text))
    }

    fn texts(items: &[QueueItem]) -> Vec<&str> {
        items.iter().map(|i| i.segment.display_text.as_str()).collect()
    }

    #[test]
    fn splits_on_newline_runs_and_trims() {
        let segs = split_segments("  first  \n\n\n second\r\n\t\nthird ");
        let display: Vec<_> = segs.iter().map(|s| s.display_text.as_str()).collect();
        assert_eq!(display, ["first", "second", "third"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_segments("").is_empty());
        assert!(split_segments("\n \n\t\n").is_empty());
    }

    #[test]
    fn preserves_paragraph_order_across_speakers() {
        let segs = split_segments("Male 1: one\nFemale 2: two\nthree");
        let speakers: Vec<_> = segs.iter().map(|s| s.speaker).collect();
        assert_eq!(
            speakers,
            [SpeakerKey::Male1, SpeakerKey::Female2, SpeakerKey::Default]
        );
        assert_eq!(segs[2].display_text, "three");
    }

    #[test]
    fn unknown_tags_stay_in_text() {
        let segs = split_segments("A:1\nB:2\nC:3");
        assert!(segs.iter().all(|s| s.speaker == SpeakerKey::Default));
        let display: Vec<_> = segs.iter().map(|s| s.display_text.as_str()).collect();
        assert_eq!(display, ["A:1", "B:2", "C:3"]);
    }

    #[test]
    fn filler_after_every_third_real_segment() {
        let mut segmenter = Segmenter::new(3);
        let items = segmenter.segment(&snapshot("s1", "a\nb\nc\nd"));
        assert_eq!(texts(&items), ["a", "b", "c", FILLER_TEXT, "d"]);
        assert!(items[3].is_filler());
        assert!(items[3].snapshot.is_none());
    }

    #[test]
    fn filler_count_spans_snapshots() {
        let mut segmenter = Segmenter::new(3);
        let first = segmenter.segment(&snapshot("s1", "a\nb"));
        assert_eq!(texts(&first), ["a", "b"]);

        let second = segmenter.segment(&snapshot("s2", "c\nd\ne\nf"));
        assert_eq!(texts(&second), ["c", FILLER_TEXT, "d", "e", "f", FILLER_TEXT]);
        assert_eq!(segmenter.real_segments(), 6);
    }

    #[test]
    fn zero_cadence_disables_fillers() {
        let mut segmenter = Segmenter::new(0);
        let items = segmenter.segment(&snapshot("s1", "a\nb\nc\nd\ne\nf"));
        assert!(items.iter().all(|i| !i.is_filler()));
    }

    #[test]
    fn items_reference_their_snapshot() {
        let mut segmenter = Segmenter::default();
        let snap = snapshot("s9", "hello");
        let items = segmenter.segment(&snap);
        let owner = items[0].snapshot.as_ref().unwrap();
        assert!(Arc::ptr_eq(owner, &snap));
    }
}

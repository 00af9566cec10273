//! Voices command handler.

use dubline_core::SpeakerKey;

/// Rows of the speaker table: label, voice, tag to write in a transcript.
pub fn rows() -> Vec<(&'static str, &'static str, String)> {
    SpeakerKey::ALL
        .into_iter()
        .map(|speaker| {
            let tag = if speaker.is_default() {
                "(untagged)".to_string()
            } else {
                format!("{}:", speaker.label())
            };
            (speaker.label(), speaker.voice(), tag)
        })
        .collect()
}

pub fn execute() {
    println!("{:<10} {:<10} Tag", "Speaker", "Voice");
    println!("{}", "-".repeat(34));
    for (label, voice, tag) in rows() {
        println!("{label:<10} {voice:<10} {tag}");
    }
}

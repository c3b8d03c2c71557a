//! NMEA 0183 sentence framing, classification and decoding
//!
//! Only the GNSS talkers (`$GP $GL $GA $GB $GQ $GN`) and the GSV, GSA, GST,
//! GGA and GNS formatters are interpreted. Checksums are not verified; any
//! sentence that cannot be decoded is skipped.
//!
//! # Example
//!
//! ```
//! use gnss_relay::nmea::{Sentence, types::FixQuality};
//!
//! let line = "$GNGGA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,M,46.9,M,,*47";
//! match Sentence::parse(line) {
//!     Some(Sentence::Gga(gga)) => assert_eq!(gga.quality, Some(FixQuality::RtkFixed)),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

/// Line framing over the raw byte stream
pub mod assembler;
/// Field splitting
pub mod fields;
/// Per-sentence decoders
pub mod sentences;
/// Talkers, constellations and fix quality codes
pub mod types;

use fields::{Fields, MAX_FIELDS};
use sentences::{Gga, Gns, Gsa, Gst, Gsv};
use types::{SentenceKind, Talker};

/// A decoded sentence, ready to be applied to the fix state
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gsv(Gsv),
    Gsa(Gsa),
    Gst(Gst),
    Gga(Gga),
    Gns(Gns),
}

impl Sentence {
    /// Classifies and decodes one complete line
    ///
    /// Returns `None` for foreign talkers, uninterpreted formatters, and
    /// sentences too short or malformed to carry their facts.
    pub fn parse(line: &str) -> Option<Sentence> {
        let (talker, kind) = classify(line)?;
        let fields = Fields::split(line, MAX_FIELDS);

        match kind {
            SentenceKind::Gsv => Gsv::decode(talker, &fields).map(Sentence::Gsv),
            SentenceKind::Gsa => Gsa::decode(talker, &fields).map(Sentence::Gsa),
            SentenceKind::Gst => Gst::decode(&fields).map(Sentence::Gst),
            SentenceKind::Gga => Gga::decode(talker, &fields).map(Sentence::Gga),
            SentenceKind::Gns => Gns::decode(talker, &fields).map(Sentence::Gns),
        }
    }

    pub fn kind(&self) -> SentenceKind {
        match self {
            Sentence::Gsv(_) => SentenceKind::Gsv,
            Sentence::Gsa(_) => SentenceKind::Gsa,
            Sentence::Gst(_) => SentenceKind::Gst,
            Sentence::Gga(_) => SentenceKind::Gga,
            Sentence::Gns(_) => SentenceKind::Gns,
        }
    }
}

/// Works out the talker and formatter of a line
///
/// The formatter is found by searching the line for each three-letter code
/// in [`SentenceKind::PRIORITY`] order; the first hit wins.
pub fn classify(line: &str) -> Option<(Talker, SentenceKind)> {
    let talker = Talker::from_address(line)?;
    let kind = SentenceKind::PRIORITY
        .into_iter()
        .find(|kind| line.contains(kind.code()))?;
    Some((talker, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_talkers_are_ignored() {
        assert_eq!(classify("$PUBX,00,081350.00"), None);
        assert_eq!(classify("$BDGSV,1,1,04"), None);
        assert!(Sentence::parse("$GNRMC,123519,A,4807.038,N").is_none());
    }

    #[test]
    fn classification_follows_priority() {
        assert_eq!(
            classify("$GNGGA,1,2,3"),
            Some((Talker::Combined, SentenceKind::Gga))
        );
        assert_eq!(
            classify("$GLGSV,3,1,10"),
            Some((Talker::Glonass, SentenceKind::Gsv))
        );
        // GSA is probed before GGA
        assert_eq!(
            classify("$GPGGA,GSA"),
            Some((Talker::Gps, SentenceKind::Gsa))
        );
    }

    #[test]
    fn short_sentences_decode_to_nothing() {
        assert!(Sentence::parse("$GNGNS,112257.00,3844.24011,N").is_none());
        assert!(Sentence::parse("$GNGST,1,2").is_none());
    }

    #[test]
    fn parse_reports_kind() {
        let sentence = Sentence::parse("$GAGSV,2,1,07,02,40,100,38*6A").unwrap();
        assert_eq!(sentence.kind(), SentenceKind::Gsv);
    }
}

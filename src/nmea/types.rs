use serde::Serialize;
use serde_repr::Serialize_repr;

/// Two-letter talker identifier following the `$`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Talker {
    /// `GP`
    Gps,
    /// `GL`
    Glonass,
    /// `GA`
    Galileo,
    /// `GB`
    BeiDou,
    /// `GQ`
    Qzss,
    /// `GN`, multi-constellation solution
    Combined,
}

impl Talker {
    /// Reads the talker from the first three bytes of a sentence (`$GP`, ...)
    pub fn from_address(line: &str) -> Option<Talker> {
        match line.get(..3)? {
            "$GP" => Some(Talker::Gps),
            "$GL" => Some(Talker::Glonass),
            "$GA" => Some(Talker::Galileo),
            "$GB" => Some(Talker::BeiDou),
            "$GQ" => Some(Talker::Qzss),
            "$GN" => Some(Talker::Combined),
            _ => None,
        }
    }

    /// Constellation this talker reports for; `None` for [`Talker::Combined`]
    pub fn constellation(self) -> Option<Constellation> {
        match self {
            Talker::Gps => Some(Constellation::Gps),
            Talker::Glonass => Some(Constellation::Glonass),
            Talker::Galileo => Some(Constellation::Galileo),
            Talker::BeiDou => Some(Constellation::BeiDou),
            Talker::Qzss => Some(Constellation::Qzss),
            Talker::Combined => None,
        }
    }

    pub fn is_combined(self) -> bool {
        self == Talker::Combined
    }
}

/// Sentence formatters interpreted by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentenceKind {
    /// Satellites in view
    Gsv,
    /// DOP and active satellites
    Gsa,
    /// Pseudorange error statistics
    Gst,
    /// Fix data
    Gga,
    /// Multi-constellation fix data
    Gns,
}

impl SentenceKind {
    /// Classification order. GGA precedes GNS so a GGA quality indicator can
    /// refine what GNS derived from its mode string.
    pub const PRIORITY: [SentenceKind; 5] = [
        SentenceKind::Gsv,
        SentenceKind::Gsa,
        SentenceKind::Gst,
        SentenceKind::Gga,
        SentenceKind::Gns,
    ];

    pub fn code(self) -> &'static str {
        match self {
            SentenceKind::Gsv => "GSV",
            SentenceKind::Gsa => "GSA",
            SentenceKind::Gst => "GST",
            SentenceKind::Gga => "GGA",
            SentenceKind::Gns => "GNS",
        }
    }
}

/// Satellite systems tracked per constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    BeiDou,
    Qzss,
}

impl Constellation {
    pub const ALL: [Constellation; 5] = [
        Constellation::Gps,
        Constellation::Glonass,
        Constellation::Galileo,
        Constellation::BeiDou,
        Constellation::Qzss,
    ];

    /// NMEA 4.11 GNSS System ID, as carried in the last field of `$GNGSA`
    pub fn from_system_id(id: u8) -> Option<Constellation> {
        match id {
            1 => Some(Constellation::Gps),
            2 => Some(Constellation::Glonass),
            3 => Some(Constellation::Galileo),
            4 => Some(Constellation::BeiDou),
            5 => Some(Constellation::Qzss),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn flag(self) -> ConstellationSet {
        match self {
            Constellation::Gps => ConstellationSet::GPS,
            Constellation::Glonass => ConstellationSet::GLONASS,
            Constellation::Galileo => ConstellationSet::GALILEO,
            Constellation::BeiDou => ConstellationSet::BEIDOU,
            Constellation::Qzss => ConstellationSet::QZSS,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConstellationSet: u8 {
        const GPS = 0x01;
        const GLONASS = 0x02;
        const GALILEO = 0x04;
        const BEIDOU = 0x08;
        const QZSS = 0x10;
    }
}

impl Serialize for ConstellationSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

/// GGA-style fix quality code
///
/// GNS mode strings are folded onto the same codes so both sentences write
/// one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize_repr)]
#[repr(u8)]
pub enum FixQuality {
    #[default]
    NoFix = 0,
    Autonomous = 1,
    Differential = 2,
    /// Precise Positioning Service
    HighPrecision = 3,
    RtkFixed = 4,
    RtkFloat = 5,
    /// Dead reckoning
    Estimated = 6,
    Manual = 7,
    Simulator = 8,
}

impl FixQuality {
    /// Maps a GGA quality indicator; codes outside `0..=8` are rejected
    pub fn from_code(code: u8) -> Option<FixQuality> {
        match code {
            0 => Some(FixQuality::NoFix),
            1 => Some(FixQuality::Autonomous),
            2 => Some(FixQuality::Differential),
            3 => Some(FixQuality::HighPrecision),
            4 => Some(FixQuality::RtkFixed),
            5 => Some(FixQuality::RtkFloat),
            6 => Some(FixQuality::Estimated),
            7 => Some(FixQuality::Manual),
            8 => Some(FixQuality::Simulator),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a GGA quality code describes a usable navigation fix
    pub fn is_navigational(self) -> bool {
        (1..=5).contains(&self.code())
    }

    pub fn is_rtk(self) -> bool {
        matches!(self, FixQuality::RtkFixed | FixQuality::RtkFloat)
    }

    /// Short label for the display
    pub fn label(self) -> &'static str {
        match self {
            FixQuality::NoFix => "NO FIX",
            FixQuality::Autonomous => "GPS",
            FixQuality::Differential => "DGPS",
            FixQuality::HighPrecision => "PPS",
            FixQuality::RtkFixed => "RTK Fix",
            FixQuality::RtkFloat => "RTK Flt",
            FixQuality::Estimated => "EST",
            FixQuality::Manual => "MANUAL",
            FixQuality::Simulator => "SIMUL",
        }
    }
}

impl core::fmt::Display for FixQuality {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// One character of a GNS mode indicator string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionMode {
    /// `N`, or anything unrecognised
    NoFix,
    Simulator,
    Manual,
    Autonomous,
    Differential,
    HighPrecision,
    RtkFloat,
    RtkFixed,
}

impl PositionMode {
    pub fn from_char(c: char) -> PositionMode {
        match c {
            'R' => PositionMode::RtkFixed,
            'F' => PositionMode::RtkFloat,
            'P' => PositionMode::HighPrecision,
            'D' => PositionMode::Differential,
            'A' => PositionMode::Autonomous,
            'M' => PositionMode::Manual,
            'S' => PositionMode::Simulator,
            _ => PositionMode::NoFix,
        }
    }

    /// Ordering used to pick the best mode across constellations
    pub fn rank(self) -> i8 {
        match self {
            PositionMode::RtkFixed => 6,
            PositionMode::RtkFloat => 5,
            PositionMode::HighPrecision => 4,
            PositionMode::Differential => 3,
            PositionMode::Autonomous => 2,
            PositionMode::Manual => 1,
            PositionMode::Simulator => 0,
            PositionMode::NoFix => -1,
        }
    }

    /// Manual and simulator modes carry a quality code but are not a fix
    pub fn is_navigational(self) -> bool {
        matches!(
            self,
            PositionMode::Autonomous
                | PositionMode::Differential
                | PositionMode::HighPrecision
                | PositionMode::RtkFloat
                | PositionMode::RtkFixed
        )
    }

    pub fn fix_quality(self) -> FixQuality {
        match self {
            PositionMode::Autonomous => FixQuality::Autonomous,
            PositionMode::Differential => FixQuality::Differential,
            PositionMode::HighPrecision => FixQuality::HighPrecision,
            PositionMode::RtkFixed => FixQuality::RtkFixed,
            PositionMode::RtkFloat => FixQuality::RtkFloat,
            PositionMode::Manual => FixQuality::Manual,
            PositionMode::Simulator => FixQuality::Simulator,
            PositionMode::NoFix => FixQuality::NoFix,
        }
    }
}

/// Best fix derived from a GNS mode string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSummary {
    pub fix_quality: FixQuality,
    pub valid: bool,
}

/// Longest mode string considered: GPS, GLONASS, Galileo, BeiDou, QZSS, NavIC
pub const MAX_MODE_CHARS: usize = 6;

impl ModeSummary {
    /// Reduces a per-constellation mode string (e.g. `"AR"`) to one fix
    ///
    /// The highest-ranked character sets the quality. The fix is valid if any
    /// character is a navigational mode.
    pub fn from_modes(modes: &str) -> ModeSummary {
        let mut best = PositionMode::NoFix;
        let mut valid = false;
        for mode in modes.chars().take(MAX_MODE_CHARS).map(PositionMode::from_char) {
            valid |= mode.is_navigational();
            if mode.rank() > best.rank() {
                best = mode;
            }
        }
        ModeSummary {
            fix_quality: best.fix_quality(),
            valid,
        }
    }
}

/// Converts NMEA `DDMM.MMMM` / `DDDMM.MMMM` to decimal degrees
pub fn convert_to_decimal_degrees(raw: f64) -> f64 {
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    degrees + minutes / 60.0
}

/// Converts a coordinate plus hemisphere letter; `S` and `W` are negative
pub fn signed_degrees(raw: f64, hemisphere: char) -> f64 {
    let degrees = convert_to_decimal_degrees(raw);
    match hemisphere {
        'S' | 'W' => -degrees,
        _ => degrees,
    }
}

//! Decoders for the interpreted sentence types
//!
//! Each decoder takes the split fields of one sentence and returns the facts
//! it carries, or `None` if the sentence is too short or otherwise unusable.
//! Field indices below count the address as field 0.

use chrono::NaiveTime;

use super::fields::Fields;
use super::types::{Constellation, FixQuality, ModeSummary, Talker, signed_degrees};

/// Accuracy values outside this open interval are treated as noise
pub const ACCURACY_RANGE_M: (f64, f64) = (0.0, 100.0);

/// Number of PRN slots in a GSA sentence
pub const GSA_PRN_SLOTS: usize = 12;

fn plausible_accuracy(fields: &Fields<'_>, index: usize) -> Option<f64> {
    let (low, high) = ACCURACY_RANGE_M;
    fields
        .parse::<f64>(index)
        .filter(|value| *value > low && *value < high)
}

/// Parses `hhmmss` or `hhmmss.sss`; rejects out-of-range components
pub fn parse_utc_time(field: &str) -> Option<NaiveTime> {
    let (whole, fraction) = match field.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (field, ""),
    };
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hour: u32 = whole[0..2].parse().ok()?;
    let minute: u32 = whole[2..4].parse().ok()?;
    let second: u32 = whole[4..6].parse().ok()?;
    let milli = if fraction.is_empty() {
        0
    } else {
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits: String = fraction.chars().chain("000".chars()).take(3).collect();
        digits.parse().ok()?
    };

    // from_hms_milli_opt accepts milli >= 1000 as a leap second; a receiver
    // never reports one in a fraction
    if second > 59 {
        return None;
    }
    NaiveTime::from_hms_milli_opt(hour, minute, second, milli)
}

/// `f64::from_str` accepts `nan` and `inf`; neither is a measurement
fn finite(fields: &Fields<'_>, index: usize) -> Option<f64> {
    fields.parse::<f64>(index).filter(|value| value.is_finite())
}

fn coordinate(fields: &Fields<'_>, value: usize, hemisphere: usize) -> Option<f64> {
    let raw = finite(fields, value)?;
    let hemisphere = fields.first_char(hemisphere)?;
    Some(signed_degrees(raw, hemisphere))
}

/// GST: pseudorange error statistics
///
/// `$GNGST,time,rms,major,minor,orient,lat_err,lon_err,alt_err*cs`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gst {
    /// Latitude 1-sigma error in meters
    pub lat_error: Option<f64>,
    /// Longitude 1-sigma error in meters
    pub lon_error: Option<f64>,
    /// Altitude 1-sigma error in meters
    pub alt_error: Option<f64>,
}

impl Gst {
    pub const MIN_FIELDS: usize = 9;

    pub fn decode(fields: &Fields<'_>) -> Option<Gst> {
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        Some(Gst {
            lat_error: plausible_accuracy(fields, 6),
            lon_error: plausible_accuracy(fields, 7),
            alt_error: plausible_accuracy(fields, 8),
        })
    }

    /// Whether at least one error estimate passed the plausibility check
    pub fn has_any(&self) -> bool {
        self.lat_error.is_some() || self.lon_error.is_some() || self.alt_error.is_some()
    }
}

/// GNS: multi-constellation fix data
///
/// `$GNGNS,time,lat,N/S,lon,E/W,mode,numSV,HDOP,alt,sep,age,stnID*cs`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gns {
    pub talker: Talker,
    pub time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub mode: Option<ModeSummary>,
    /// Only read from the combined `$GNGNS` sentence
    pub satellites: Option<u32>,
    /// Only read from the combined `$GNGNS` sentence
    pub altitude: Option<f64>,
}

impl Gns {
    pub const MIN_FIELDS: usize = 11;

    pub fn decode(talker: Talker, fields: &Fields<'_>) -> Option<Gns> {
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }

        let (satellites, altitude) = if talker.is_combined() {
            (fields.parse::<u32>(7), finite(fields, 9))
        } else {
            (None, None)
        };

        Some(Gns {
            talker,
            time: fields.get(1).and_then(parse_utc_time),
            latitude: coordinate(fields, 2, 3),
            longitude: coordinate(fields, 4, 5),
            mode: fields.get(6).map(ModeSummary::from_modes),
            satellites,
            altitude,
        })
    }
}

/// GGA: fix data, used here for its quality indicator
///
/// `$GNGGA,time,lat,N/S,lon,E/W,quality,numSV,hdop,alt,M,sep,M,age,stnID*cs`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gga {
    pub time: Option<NaiveTime>,
    pub quality: Option<FixQuality>,
}

impl Gga {
    pub const MIN_FIELDS: usize = 7;

    /// Only the combined `$GNGGA` is decoded; per-constellation GGA would
    /// count the same fix twice.
    pub fn decode(talker: Talker, fields: &Fields<'_>) -> Option<Gga> {
        if !talker.is_combined() || fields.len() < Self::MIN_FIELDS {
            return None;
        }
        Some(Gga {
            time: fields.get(1).and_then(parse_utc_time),
            quality: fields.parse::<u8>(6).and_then(FixQuality::from_code),
        })
    }
}

/// GSV: satellites in view for one constellation
///
/// `$GPGSV,totalMsg,msgNum,totalSats,...*cs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gsv {
    pub constellation: Constellation,
    pub visible: u32,
}

impl Gsv {
    pub const MIN_FIELDS: usize = 4;

    pub fn decode(talker: Talker, fields: &Fields<'_>) -> Option<Gsv> {
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }
        Some(Gsv {
            constellation: talker.constellation()?,
            visible: fields.parse(3)?,
        })
    }
}

/// GSA: satellites used in the solution
///
/// `$GPGSA,mode,fixType,sv1,...,sv12,PDOP,HDOP,VDOP[,systemID]*cs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gsa {
    pub constellation: Constellation,
    pub used: u32,
}

impl Gsa {
    pub const MIN_FIELDS: usize = 4;
    const FIRST_PRN: usize = 3;
    const SYSTEM_ID: usize = Self::FIRST_PRN + GSA_PRN_SLOTS + 3;

    /// Per-constellation talkers name their system directly. `$GNGSA`
    /// repeats once per system and names it in the System ID field instead.
    pub fn decode(talker: Talker, fields: &Fields<'_>) -> Option<Gsa> {
        if fields.len() < Self::MIN_FIELDS {
            return None;
        }

        let constellation = match talker.constellation() {
            Some(constellation) => constellation,
            None => Constellation::from_system_id(fields.parse(Self::SYSTEM_ID)?)?,
        };

        let last_prn = (Self::FIRST_PRN + GSA_PRN_SLOTS).min(fields.len());
        let used = (Self::FIRST_PRN..last_prn)
            .filter_map(|index| fields.parse::<u32>(index))
            .filter(|prn| *prn > 0)
            .count();

        Some(Gsa {
            constellation,
            used: used as u32,
        })
    }
}

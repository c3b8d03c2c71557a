//! Live picture of the receiver's fix and satellite counts
//!
//! Parsers in the ingestion context are the only writers. Display and
//! diagnostic readers take whole-state snapshots through [`SharedState`], so
//! they never observe half of an update (a quality without its validity
//! flag, a latitude without its longitude).

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{FixedOffset, NaiveTime, TimeDelta};
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::{
    Result,
    clock::elapsed_ms,
    config::{Staleness, millis},
    error::GnssRelayError,
    nmea::{
        Sentence,
        sentences::{Gga, Gns, Gsa, Gst, Gsv},
        types::{Constellation, ConstellationSet, FixQuality},
    },
};

/// Accuracy value meaning "not known"
pub const ACCURACY_UNKNOWN: f64 = 999.9;

/// Position, accuracy and fix quality
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GnssFix {
    /// Decimal degrees, positive north
    pub latitude: f64,
    /// Decimal degrees, positive east
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude: f64,
    /// Meters, [`ACCURACY_UNKNOWN`] until a plausible GST arrives
    pub lat_accuracy: f64,
    pub lon_accuracy: f64,
    pub vertical_accuracy: f64,
    /// Satellites used in the combined solution
    pub satellites_in_fix: u32,
    pub fix_quality: FixQuality,
    pub valid: bool,
    /// UTC time of day of the latest fix sentence
    pub utc_time: Option<NaiveTime>,
    pub last_position_update_ms: u64,
    pub last_accuracy_update_ms: u64,
}

impl Default for GnssFix {
    fn default() -> Self {
        GnssFix {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            lat_accuracy: ACCURACY_UNKNOWN,
            lon_accuracy: ACCURACY_UNKNOWN,
            vertical_accuracy: ACCURACY_UNKNOWN,
            satellites_in_fix: 0,
            fix_quality: FixQuality::NoFix,
            valid: false,
            utc_time: None,
            last_position_update_ms: 0,
            last_accuracy_update_ms: 0,
        }
    }
}

impl GnssFix {
    pub fn time_valid(&self) -> bool {
        self.utc_time.is_some()
    }

    pub fn has_accuracy(&self) -> bool {
        self.lat_accuracy != ACCURACY_UNKNOWN
            || self.lon_accuracy != ACCURACY_UNKNOWN
            || self.vertical_accuracy != ACCURACY_UNKNOWN
    }

    fn reset_accuracy(&mut self) {
        self.lat_accuracy = ACCURACY_UNKNOWN;
        self.lon_accuracy = ACCURACY_UNKNOWN;
        self.vertical_accuracy = ACCURACY_UNKNOWN;
    }
}

impl core::fmt::Display for GnssFix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:.6},{:.6} alt={:.1} sat={} fix={} acc={:.2}/{:.2}/{:.2}",
            self.latitude,
            self.longitude,
            self.altitude,
            self.satellites_in_fix,
            self.fix_quality,
            self.lat_accuracy,
            self.lon_accuracy,
            self.vertical_accuracy
        )
    }
}

/// Satellite counts of one constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SatelliteInfo {
    /// Satellites in view, from GSV
    pub visible_count: u32,
    /// Satellites used in the solution, from GSA
    pub used_count: u32,
    pub last_update_ms: u64,
}

/// Satellite counts of every tracked constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SatelliteTable {
    pub gps: SatelliteInfo,
    pub glonass: SatelliteInfo,
    pub galileo: SatelliteInfo,
    pub beidou: SatelliteInfo,
    pub qzss: SatelliteInfo,
}

impl SatelliteTable {
    pub fn get(&self, constellation: Constellation) -> &SatelliteInfo {
        match constellation {
            Constellation::Gps => &self.gps,
            Constellation::Glonass => &self.glonass,
            Constellation::Galileo => &self.galileo,
            Constellation::BeiDou => &self.beidou,
            Constellation::Qzss => &self.qzss,
        }
    }

    pub fn get_mut(&mut self, constellation: Constellation) -> &mut SatelliteInfo {
        match constellation {
            Constellation::Gps => &mut self.gps,
            Constellation::Glonass => &mut self.glonass,
            Constellation::Galileo => &mut self.galileo,
            Constellation::BeiDou => &mut self.beidou,
            Constellation::Qzss => &mut self.qzss,
        }
    }

    /// Constellations with any satellite in view or in use
    pub fn active(&self) -> ConstellationSet {
        Constellation::ALL
            .into_iter()
            .filter(|c| {
                let info = self.get(*c);
                info.visible_count > 0 || info.used_count > 0
            })
            .fold(ConstellationSet::empty(), |set, c| set | c.flag())
    }

    pub fn total_visible(&self) -> u32 {
        Constellation::ALL
            .into_iter()
            .map(|c| self.get(c).visible_count)
            .sum()
    }

    pub fn total_used(&self) -> u32 {
        Constellation::ALL
            .into_iter()
            .map(|c| self.get(c).used_count)
            .sum()
    }
}

/// What a timeout sweep cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Constellations whose non-zero counts were zeroed
    pub expired: ConstellationSet,
    /// Whether known accuracy values were reset to [`ACCURACY_UNKNOWN`]
    pub accuracy_reset: bool,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && !self.accuracy_reset
    }
}

/// Fix plus satellite table
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GnssState {
    pub fix: GnssFix,
    pub satellites: SatelliteTable,
}

impl GnssState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one decoded sentence into the state
    pub fn apply(&mut self, sentence: &Sentence, now_ms: u64) {
        match sentence {
            Sentence::Gst(gst) => self.apply_gst(gst, now_ms),
            Sentence::Gns(gns) => self.apply_gns(gns, now_ms),
            Sentence::Gga(gga) => self.apply_gga(gga),
            Sentence::Gsv(gsv) => self.apply_gsv(gsv, now_ms),
            Sentence::Gsa(gsa) => self.apply_gsa(gsa, now_ms),
        }
    }

    fn apply_gst(&mut self, gst: &Gst, now_ms: u64) {
        if !gst.has_any() {
            return;
        }
        if let Some(value) = gst.lat_error {
            self.fix.lat_accuracy = value;
        }
        if let Some(value) = gst.lon_error {
            self.fix.lon_accuracy = value;
        }
        if let Some(value) = gst.alt_error {
            self.fix.vertical_accuracy = value;
        }
        self.fix.last_accuracy_update_ms = now_ms;
    }

    fn apply_gns(&mut self, gns: &Gns, now_ms: u64) {
        if let Some(time) = gns.time {
            self.fix.utc_time = Some(time);
        }
        if let Some(latitude) = gns.latitude {
            self.fix.latitude = latitude;
            self.fix.last_position_update_ms = now_ms;
        }
        if let Some(longitude) = gns.longitude {
            self.fix.longitude = longitude;
        }
        if let Some(mode) = gns.mode {
            self.fix.fix_quality = mode.fix_quality;
            self.fix.valid = mode.valid;
        }
        if let Some(satellites) = gns.satellites {
            self.fix.satellites_in_fix = satellites;
        }
        if let Some(altitude) = gns.altitude {
            self.fix.altitude = altitude;
        }
    }

    fn apply_gga(&mut self, gga: &Gga) {
        if let Some(time) = gga.time {
            self.fix.utc_time = Some(time);
        }
        if let Some(quality) = gga.quality {
            self.fix.fix_quality = quality;
            self.fix.valid = quality.is_navigational();
        }
    }

    fn apply_gsv(&mut self, gsv: &Gsv, now_ms: u64) {
        let info = self.satellites.get_mut(gsv.constellation);
        info.visible_count = gsv.visible;
        info.last_update_ms = now_ms;
    }

    fn apply_gsa(&mut self, gsa: &Gsa, now_ms: u64) {
        let info = self.satellites.get_mut(gsa.constellation);
        info.used_count = gsa.used;
        info.last_update_ms = now_ms;
    }

    /// Zeroes stale satellite counts and resets stale accuracy
    ///
    /// Accuracy is reset when there is no valid fix, or when the last GST is
    /// older than the accuracy window. RTK fixes get the longer RTK window
    /// because their GST may legitimately arrive less often.
    pub fn sweep(&mut self, now_ms: u64, staleness: &Staleness) -> SweepReport {
        let mut report = SweepReport::default();

        let satellite_window = millis(staleness.satellites);
        for constellation in Constellation::ALL {
            let info = self.satellites.get_mut(constellation);
            if elapsed_ms(now_ms, info.last_update_ms) > satellite_window {
                if info.visible_count > 0 || info.used_count > 0 {
                    report.expired |= constellation.flag();
                }
                info.visible_count = 0;
                info.used_count = 0;
            }
        }

        let accuracy_window = if self.fix.fix_quality.is_rtk() {
            millis(staleness.rtk_accuracy)
        } else {
            millis(staleness.accuracy)
        };
        let stale = elapsed_ms(now_ms, self.fix.last_accuracy_update_ms) > accuracy_window;
        if !self.fix.valid || stale {
            report.accuracy_reset = self.fix.has_accuracy();
            self.fix.reset_accuracy();
        }

        report
    }

    /// Valid fix whose position was refreshed within `timeout_ms`
    pub fn has_recent_fix(&self, now_ms: u64, timeout_ms: u64) -> bool {
        self.fix.valid && elapsed_ms(now_ms, self.fix.last_position_update_ms) < timeout_ms
    }

    /// UTC time of day shifted by `offset_minutes`, wrapping past midnight
    pub fn local_time(&self, offset_minutes: i32) -> Option<NaiveTime> {
        let utc = self.fix.utc_time?;
        let offset = FixedOffset::east_opt(offset_minutes.checked_mul(60)?)?;
        let (local, _) =
            utc.overflowing_add_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())));
        Some(local)
    }

    /// JSON diagnostic snapshot
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(GnssRelayError::SerdeError)
    }
}

/// Cloneable handle to the state shared between contexts
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<GnssState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> GnssState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `f` with exclusive access; all of its writes land together
    pub fn update<T>(&self, f: impl FnOnce(&mut GnssState) -> T) -> T {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn apply(&self, sentence: &Sentence, now_ms: u64) {
        self.update(|state| state.apply(sentence, now_ms));
    }

    pub fn sweep(&self, now_ms: u64, staleness: &Staleness) -> SweepReport {
        self.update(|state| state.sweep(now_ms, staleness))
    }
}

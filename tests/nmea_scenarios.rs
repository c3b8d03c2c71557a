//! Receiver byte streams driven through the ingestion path.

use std::sync::Arc;

use gnss_relay::{
    config::Staleness,
    ingest::Ingestor,
    nmea::types::{ConstellationSet, FixQuality, convert_to_decimal_degrees},
    ring_buffer::RingBuffer,
    state::{ACCURACY_UNKNOWN, SharedState},
    sweeper::Sweeper,
};

const GNS: &str = "$GNGNS,123519.00,4807.038,N,01131.000,E,AA,08,0.9,545.4,46.9,,*00\r\n";
const GGA: &str = "$GNGGA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,M,46.9,M,,*?\n";

fn ingestor() -> Ingestor {
    Ingestor::new(SharedState::new(), 256)
}

#[test]
fn gga_after_gns_reports_rtk_fixed() {
    let mut ingestor = ingestor();
    for byte in GNS.bytes().chain(GGA.bytes()) {
        ingestor.parse_byte(byte, 1_000);
    }

    let fix = ingestor.state().snapshot().fix;
    assert_eq!(fix.fix_quality, FixQuality::RtkFixed);
    assert_eq!(fix.fix_quality.code(), 4);
    assert!(fix.valid);
    assert!((fix.latitude - 48.1173).abs() < 1e-4);
    assert!((fix.longitude - 11.516_666).abs() < 1e-4);
    assert_eq!(fix.altitude, 545.4);
    assert_eq!(fix.satellites_in_fix, 8);
}

#[test]
fn southern_and_western_hemispheres_are_negative() {
    let mut ingestor = ingestor();
    ingestor.feed(
        b"$GNGNS,112257.00,3344.24011,S,07008.43828,W,DA,12,1.0,114.3,51.7,,*00\r\n",
        0,
    );

    let fix = ingestor.state().snapshot().fix;
    assert!((fix.latitude + convert_to_decimal_degrees(3344.24011)).abs() < 1e-9);
    assert!((fix.longitude + convert_to_decimal_degrees(7008.43828)).abs() < 1e-9);
    assert!(fix.latitude < 0.0 && fix.longitude < 0.0);
}

#[test]
fn mode_rank_beats_position_in_field() {
    let mut ingestor = ingestor();
    ingestor.feed(
        b"$GNGNS,123519.00,4807.038,N,01131.000,E,AR,08,0.9,545.4,46.9,,*00\n",
        0,
    );

    let fix = ingestor.state().snapshot().fix;
    assert_eq!(fix.fix_quality, FixQuality::RtkFixed);
    assert!(fix.valid);
}

#[test]
fn single_constellation_gns_leaves_combined_counts() {
    let mut ingestor = ingestor();
    ingestor.feed(GNS.as_bytes(), 0);
    ingestor.feed(
        b"$GPGNS,123520.00,4807.038,N,01131.000,E,A,04,0.9,999.9,46.9,,*00\n",
        100,
    );

    let fix = ingestor.state().snapshot().fix;
    assert_eq!(fix.satellites_in_fix, 8);
    assert_eq!(fix.altitude, 545.4);
}

#[test]
fn combined_gsa_uses_system_id() {
    let mut ingestor = ingestor();
    ingestor.feed(
        b"$GNGSA,A,3,80,71,73,79,69,,,,,,,,1.83,1.09,1.47,2*0B\r\n\
          $GNGSA,A,3,07,02,26,27,09,04,15,,,,,,1.83,1.09,1.47,1*0D\r\n\
          $GNGSA,A,3,,,,,,,,,,,,,1.83,1.09,1.47,4*0C\r\n",
        0,
    );

    let satellites = ingestor.state().snapshot().satellites;
    assert_eq!(satellites.glonass.used_count, 5);
    assert_eq!(satellites.gps.used_count, 7);
    assert_eq!(satellites.beidou.used_count, 0);
    assert_eq!(
        satellites.active(),
        ConstellationSet::GPS | ConstellationSet::GLONASS
    );
}

#[test]
fn accuracy_stays_unknown_without_gst() {
    let state = SharedState::new();
    let mut ingestor = Ingestor::new(state.clone(), 256);
    let mut sweeper = Sweeper::new(state.clone(), Staleness::default());

    for second in 0..15u64 {
        let now = second * 1_000;
        ingestor.feed(GNS.as_bytes(), now);
        ingestor.feed(GGA.as_bytes(), now);
        sweeper.tick(now);

        let fix = state.snapshot().fix;
        assert_eq!(fix.lat_accuracy, ACCURACY_UNKNOWN);
        assert_eq!(fix.lon_accuracy, ACCURACY_UNKNOWN);
        assert_eq!(fix.vertical_accuracy, ACCURACY_UNKNOWN);
    }
}

#[test]
fn non_finite_coordinates_keep_prior_position() {
    let mut ingestor = ingestor();
    ingestor.feed(GNS.as_bytes(), 0);
    ingestor.feed(
        b"$GNGNS,123520.00,nan,N,inf,E,AA,08,0.9,NaN,46.9,,*00\r\n",
        1_000,
    );

    let snapshot = ingestor.state().snapshot();
    let fix = &snapshot.fix;
    assert!((fix.latitude - 48.1173).abs() < 1e-4);
    assert!((fix.longitude - 11.516_666).abs() < 1e-4);
    assert_eq!(fix.altitude, 545.4);
    assert_eq!(fix.last_position_update_ms, 0);
    assert!(fix.valid);

    let json = snapshot.to_json().unwrap();
    assert!(!json.contains("\"latitude\":null"));
    assert!(!json.contains("\"altitude\":null"));
}

#[test]
fn implausible_accuracy_keeps_prior_value() {
    let mut ingestor = ingestor();
    ingestor.feed(GGA.as_bytes(), 0);
    ingestor.feed(b"$GNGST,123519.00,0.8,,,,0.012,0.010,0.020*00\n", 0);
    ingestor.feed(b"$GNGST,123520.00,0.8,,,,150.0,-1,0*00\n", 1_000);

    let fix = ingestor.state().snapshot().fix;
    assert_eq!(fix.lat_accuracy, 0.012);
    assert_eq!(fix.lon_accuracy, 0.010);
    assert_eq!(fix.vertical_accuracy, 0.020);
    assert_eq!(fix.last_accuracy_update_ms, 0);
}

#[test]
fn used_count_expires_after_six_quiet_seconds() {
    let state = SharedState::new();
    let mut ingestor = Ingestor::new(state.clone(), 256);
    let mut sweeper = Sweeper::new(state.clone(), Staleness::default());

    ingestor.feed(b"$GBGSA,A,3,19,20,22,35,44,,,,,,,,1.2,0.8,0.9*00\r\n", 0);
    assert_eq!(state.snapshot().satellites.beidou.used_count, 5);

    sweeper.tick(6_000);
    assert_eq!(state.snapshot().satellites.beidou.used_count, 0);
}

#[test]
fn overlong_line_does_not_poison_the_next() {
    let mut ingestor = Ingestor::new(SharedState::new(), 64);
    let mut junk = b"$GNGGA,".to_vec();
    junk.extend(std::iter::repeat_n(b'9', 200));
    junk.push(b'\n');

    ingestor.feed(&junk, 0);
    ingestor.feed(b"$GNGGA,000001,,,,,2,08*00\n", 0);

    let fix = ingestor.state().snapshot().fix;
    assert_eq!(fix.fix_quality, FixQuality::Differential);
    assert_eq!(ingestor.sentences(), 1);
}

#[test]
fn every_received_byte_is_relayed() {
    let ring = Arc::new(RingBuffer::new(16384));
    let mut ingestor = ingestor().with_relay_buffer(ring.clone());

    // Binary UBX frames share the stream with NMEA
    let mut stream = GNS.as_bytes().to_vec();
    stream.extend_from_slice(&[0xb5, 0x62, 0x01, 0x07, 0x00, 0x00, 0x08, 0x19]);
    stream.extend_from_slice(GNS.as_bytes());
    stream.extend_from_slice(b"garbage without newline");
    ingestor.feed(&stream, 0);

    assert_eq!(ring.read(16384), stream);
    assert_eq!(ingestor.sentences(), 1);
}

//! Sun position calculation.
//!
//! Computes the solar elevation for a latitude, longitude and Unix timestamp
//! using the low-precision solar coordinates from Meeus' *Astronomical
//! Algorithms*: Julian Day, mean longitude and anomaly, a three-term equation
//! of center, and a cubic for the obliquity of the ecliptic. The hour angle is
//! taken from mean local time (UTC shifted by longitude).

use chrono::{DateTime, Datelike, Timelike};

use crate::core::{Error, Result};
use crate::math::Vector3;

/// Julian Day of the J2000.0 epoch.
const J2000: f64 = 2_451_545.0;
/// Days per Julian century.
const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Intermediate and final values of one solar position evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarPosition {
    pub julian_day: f64,
    /// Solar declination (radians).
    pub declination: f64,
    /// Local hour angle (radians), zero at local solar noon.
    pub hour_angle: f64,
    /// Altitude above the horizon (radians), in `[-pi/2, pi/2]`.
    pub elevation: f64,
}

/// Reject non-finite or out-of-range coordinates.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::InvalidCoordinate(format!(
            "latitude {latitude} outside [-90, 90]"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidCoordinate(format!(
            "longitude {longitude} outside [-180, 180]"
        )));
    }
    Ok(())
}

/// Reject timestamps that do not fit a signed 32-bit integer.
pub fn validate_timestamp(timestamp: i64) -> Result<()> {
    if i32::try_from(timestamp).is_err() {
        return Err(Error::InvalidTimestamp(timestamp));
    }
    Ok(())
}

/// Julian Day for a Gregorian calendar date. `day` carries the fraction of
/// the day elapsed since 0h UTC.
pub fn julian_day(year: i32, month: u32, day: f64) -> f64 {
    // January and February count as months 13 and 14 of the previous year
    let (y, m) = if month <= 2 {
        (year as f64 - 1.0, month as f64 + 12.0)
    } else {
        (year as f64, month as f64)
    };
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (m + 1.0)).floor() + day + b - 1524.5
}

/// Solar declination (radians) from the Sun's true longitude and the mean
/// obliquity of the ecliptic at `julian_day`.
fn solar_declination(julian_day: f64) -> f64 {
    let t = (julian_day - J2000) / DAYS_PER_CENTURY;

    // Geometric mean longitude and mean anomaly (degrees)
    let mean_longitude = (280.46646 + t * (36_000.76983 + t * 0.0003032)).rem_euclid(360.0);
    let mean_anomaly = (357.52911 + t * (35_999.05029 - t * 0.0001537)).to_radians();

    let center = mean_anomaly.sin() * (1.914602 - t * (0.004817 + t * 0.000014))
        + (2.0 * mean_anomaly).sin() * (0.019993 - t * 0.000101)
        + (3.0 * mean_anomaly).sin() * 0.000289;
    let true_longitude = (mean_longitude + center).to_radians();

    let obliquity_seconds = 21.448 - t * (46.815 + t * (0.00059 - t * 0.001813));
    let obliquity = (23.0 + (26.0 + obliquity_seconds / 60.0) / 60.0).to_radians();

    (obliquity.sin() * true_longitude.sin()).asin()
}

/// Full solar position for a validated timestamp (seconds since the Unix epoch).
pub fn solar_position(latitude: f64, longitude: f64, timestamp: i64) -> Result<SolarPosition> {
    validate_coordinates(latitude, longitude)?;
    validate_timestamp(timestamp)?;

    let datetime = DateTime::from_timestamp(timestamp, 0)
        .ok_or(Error::InvalidTimestamp(timestamp))?;
    let minutes = datetime.hour() as f64 * 60.0
        + datetime.minute() as f64
        + datetime.second() as f64 / 60.0;
    let day = datetime.day() as f64 + minutes / 1440.0;

    let jd = julian_day(datetime.year(), datetime.month(), day);
    let declination = solar_declination(jd);

    // Four minutes of time per degree of longitude
    let solar_minutes = minutes + 4.0 * longitude;
    let hour_angle = (solar_minutes / 4.0 - 180.0).to_radians();

    let lat = latitude.to_radians();
    let sin_elevation =
        lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();
    let elevation = sin_elevation.clamp(-1.0, 1.0).asin();

    Ok(SolarPosition {
        julian_day: jd,
        declination,
        hour_angle,
        elevation,
    })
}

/// Solar elevation in radians. A `None` timestamp means "now".
pub fn solar_elevation(latitude: f64, longitude: f64, timestamp: Option<i64>) -> Result<f64> {
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
    solar_position(latitude, longitude, timestamp).map(|p| p.elevation)
}

/// Unit vector toward the sun for a given elevation, in the vertical plane the
/// view fan sweeps (y up, z toward the horizon being viewed).
pub fn sun_direction(elevation: f64) -> Vector3 {
    Vector3::new(0.0, elevation.sin(), elevation.cos())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// 2024-03-20 00:00:00 UTC, the day of the March equinox.
    const EQUINOX_MIDNIGHT: i64 = 1_710_892_800;

    /// Elevation via the Unix-epoch Julian Day shortcut, bypassing the
    /// calendar conversion entirely.
    fn reference_elevation(latitude: f64, longitude: f64, timestamp: i64) -> f64 {
        let jd = timestamp as f64 / 86_400.0 + 2_440_587.5;
        let t = (jd - 2_451_545.0) / 36_525.0;
        let l0 = 280.46646 + 36_000.76983 * t + 0.0003032 * t * t;
        let m = (357.52911 + 35_999.05029 * t - 0.0001537 * t * t).to_radians();
        let c = (1.914602 - 0.004817 * t - 0.000014 * t * t) * m.sin()
            + (0.019993 - 0.000101 * t) * (2.0 * m).sin()
            + 0.000289 * (3.0 * m).sin();
        let lambda = (l0 + c).to_radians();
        let eps = (23.0 + 26.0 / 60.0
            + (21.448 - 46.815 * t - 0.00059 * t * t + 0.001813 * t * t * t) / 3600.0)
            .to_radians();
        let dec = (eps.sin() * lambda.sin()).asin();

        let utc_minutes = timestamp.rem_euclid(86_400) as f64 / 60.0;
        let ha = ((utc_minutes + 4.0 * longitude) / 4.0 - 180.0).to_radians();
        let lat = latitude.to_radians();
        (lat.sin() * dec.sin() + lat.cos() * dec.cos() * ha.cos()).asin()
    }

    #[test]
    fn test_julian_day_j2000() {
        // 2000-01-01 12:00 UTC
        assert!((julian_day(2000, 1, 1.5) - J2000).abs() < 1e-9);
        // 1987-06-19 12:00 UTC (Meeus example 7.a)
        assert!((julian_day(1987, 6, 19.5) - 2_446_966.0).abs() < 1e-9);
        // January and February take the year carry
        assert!((julian_day(1988, 1, 27.0) - 2_447_187.5).abs() < 1e-9);
        assert!((julian_day(2000, 2, 29.0) - 2_451_603.5).abs() < 1e-9);
        assert!((julian_day(2000, 3, 1.0) - 2_451_604.5).abs() < 1e-9);
    }

    #[test]
    fn test_declination_matches_published_value() {
        // Meeus example 25.a: 1992-10-13 0h, declination -7.78507 degrees
        let jd = julian_day(1992, 10, 13.0);
        assert!((jd - 2_448_908.5).abs() < 1e-9);
        let dec = solar_declination(jd).to_degrees();
        assert!((dec + 7.78507).abs() < 0.01, "declination {dec}");

        // Same instant through the timestamp path
        let position = solar_position(0.0, 0.0, 718_934_400).unwrap();
        assert!((position.julian_day - 2_448_908.5).abs() < 1e-9);
        assert!((position.declination.to_degrees() + 7.78507).abs() < 0.01);
    }

    #[test]
    fn test_solstice_declination_near_obliquity() {
        // 2024-06-20 20:51 UTC (June solstice) and 2024-12-21 09:20 UTC
        let june = solar_position(0.0, 0.0, 1_718_916_660).unwrap();
        let december = solar_position(0.0, 0.0, 1_734_772_800).unwrap();
        assert!((june.declination.to_degrees() - 23.44).abs() < 0.02, "{}", june.declination.to_degrees());
        assert!((december.declination.to_degrees() + 23.44).abs() < 0.02, "{}", december.declination.to_degrees());
    }

    #[test]
    fn test_matches_reference_at_null_island() {
        for offset in [0, 21_600, 43_200, 64_800, 9_876_543] {
            let ts = EQUINOX_MIDNIGHT + offset;
            let got = solar_elevation(0.0, 0.0, Some(ts)).unwrap();
            let want = reference_elevation(0.0, 0.0, ts);
            assert!(
                (got - want).abs() < 1e-4,
                "ts={ts}: elevation {got} != reference {want}"
            );
        }
    }

    #[test]
    fn test_matches_reference_elsewhere() {
        let ts = 1_700_000_000;
        for (lat, lon) in [(51.5, -0.12), (-33.9, 151.2), (64.1, -21.9), (90.0, 180.0)] {
            let got = solar_elevation(lat, lon, Some(ts)).unwrap();
            let want = reference_elevation(lat, lon, ts);
            assert!((got - want).abs() < 1e-4, "({lat}, {lon}): {got} != {want}");
        }
    }

    #[test]
    fn test_equinox_noon_overhead_at_equator() {
        let noon = solar_position(0.0, 0.0, EQUINOX_MIDNIGHT + 43_200).unwrap();
        assert!(noon.declination.abs() < 0.01, "declination {}", noon.declination);
        assert!(noon.elevation > 85.0_f64.to_radians(), "noon elevation {}", noon.elevation);

        let midnight = solar_elevation(0.0, 0.0, Some(EQUINOX_MIDNIGHT)).unwrap();
        assert!(midnight < -85.0_f64.to_radians(), "midnight elevation {midnight}");
    }

    #[test]
    fn test_longitude_shifts_noon() {
        // 90 degrees east sees noon six hours earlier
        let ts = EQUINOX_MIDNIGHT + 6 * 3600;
        let e = solar_elevation(0.0, 90.0, Some(ts)).unwrap();
        assert!(e > 85.0_f64.to_radians(), "elevation {e}");
    }

    #[test]
    fn test_elevation_in_range() {
        for i in 0..48 {
            let ts = EQUINOX_MIDNIGHT + i * 7_919;
            let e = solar_elevation(-45.0, 120.0, Some(ts)).unwrap();
            assert!((-FRAC_PI_2..=FRAC_PI_2).contains(&e));
        }
    }

    #[test]
    fn test_invalid_coordinates() {
        for (lat, lon) in [(91.0, 0.0), (-90.5, 0.0), (0.0, 180.1), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            let err = solar_elevation(lat, lon, Some(0)).unwrap_err();
            assert!(matches!(err, Error::InvalidCoordinate(_)), "({lat}, {lon}) gave {err:?}");
        }
        // Bounds are inclusive
        solar_elevation(-90.0, -180.0, Some(0)).unwrap();
    }

    #[test]
    fn test_invalid_timestamp() {
        let too_late = i32::MAX as i64 + 1;
        assert!(matches!(
            solar_elevation(0.0, 0.0, Some(too_late)),
            Err(Error::InvalidTimestamp(t)) if t == too_late
        ));
        assert!(matches!(
            solar_elevation(0.0, 0.0, Some(i32::MIN as i64 - 1)),
            Err(Error::InvalidTimestamp(_))
        ));
        // Negative timestamps before 1970 are fine
        solar_elevation(0.0, 0.0, Some(-86_400)).unwrap();
    }

    #[test]
    fn test_default_timestamp_is_now() {
        let e = solar_elevation(10.0, 10.0, None).unwrap();
        assert!(e.is_finite());
    }

    #[test]
    fn test_sun_direction() {
        let horizon = sun_direction(0.0);
        assert!((horizon - Vector3::Z).length() < 1e-12);
        let zenith = sun_direction(FRAC_PI_2);
        assert!((zenith - Vector3::Y).length() < 1e-12);
        assert!((sun_direction(0.3).length() - 1.0).abs() < 1e-12);
    }
}

//! Value Objects for the marketplace

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Non-negative monetary amount in the marketplace currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        Ok(Self(amount.normalize()))
    }

    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn times(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) { self.0 += rhs.0; }
}

/// Saturates at zero.
impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money((self.0 - rhs.0).max(Decimal::ZERO)) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money { iter.copied().sum() }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
}

/// WGS84 coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::OutOfRange { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    /// Great-circle distance (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("coordinates out of range: ({latitude}, {longitude})")]
    OutOfRange { latitude: f64, longitude: f64 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: Option<String>,
}

/// Running rating aggregate kept on users and products.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingStats {
    pub count: u32,
    pub total: u32,
}

impl RatingStats {
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| f64::from(self.total) / f64::from(self.count))
    }

    pub fn record(&mut self, score: Score) {
        self.count += 1;
        self.total += u32::from(score.value());
    }

    pub fn replace(&mut self, previous: Score, score: Score) {
        self.total = self.total.saturating_sub(u32::from(previous.value())) + u32::from(score.value());
    }
}

/// Rating score in 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub fn new(value: u8) -> Result<Self, ScoreError> {
        if (1..=5).contains(&value) { Ok(Self(value)) } else { Err(ScoreError(value)) }
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<u8> for Score {
    type Error = ScoreError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 { score.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("score must be between 1 and 5, got {0}")]
pub struct ScoreError(pub u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rejects_negative() {
        assert_eq!(Money::new(Decimal::new(-1, 0)), Err(MoneyError::Negative));
        assert!(Money::new(Decimal::ZERO).unwrap().is_zero());
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(Decimal::new(1050, 2)).unwrap();
        assert_eq!(a.times(3).amount(), Decimal::new(3150, 2));
        assert_eq!([a, a].iter().sum::<Money>().amount(), Decimal::new(21, 0));
        assert_eq!((a - a.times(2)), Money::ZERO);
        assert_eq!(a.to_string(), "10.50");
    }

    #[test]
    fn test_geo_distance() {
        let cairo = GeoPoint::new(30.0444, 31.2357).unwrap();
        let alexandria = GeoPoint::new(31.2001, 29.9187).unwrap();
        let d = cairo.distance_km(&alexandria);
        assert!((175.0..185.0).contains(&d), "distance was {d}");
        assert!(GeoPoint::new(91.0, 0.0).is_err());
    }

    #[test]
    fn test_rating_stats() {
        let mut stats = RatingStats::default();
        assert_eq!(stats.average(), None);
        stats.record(Score::new(4).unwrap());
        stats.record(Score::new(2).unwrap());
        assert_eq!(stats.average(), Some(3.0));
        stats.replace(Score::new(2).unwrap(), Score::new(5).unwrap());
        assert_eq!(stats, RatingStats { count: 2, total: 9 });
    }

    #[test]
    fn test_score_bounds() {
        assert!(Score::new(0).is_err());
        assert!(Score::new(6).is_err());
        assert!(serde_json::from_str::<Score>("7").is_err());
        assert_eq!(serde_json::from_str::<Score>("3").unwrap().value(), 3);
    }
}

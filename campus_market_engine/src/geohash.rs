//! # GeoIndex
//!
//! Pure geohash helpers backing the "stores near me" lookup.
//!
//! A geohash is built by repeatedly bisecting the longitude range (even bit positions) and the latitude range (odd bit
//! positions), starting with longitude. A coordinate at or above the midpoint of its current range yields a
//! `1` bit and keeps the upper half; anything below yields a `0` bit and keeps the lower half. Bits are packed five per
//! character through the 32-symbol alphabet [`BASE32`].
//!
//! Stores sharing a prefix lie in the same rectangular cell, so a prefix match returns a sound, but not necessarily
//! complete, neighbourhood: a point close to a cell edge may have its nearest neighbours in an adjacent cell with a
//! different prefix. Callers that need an exact radius must post-filter by true distance.
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";
pub const DEFAULT_PRECISION: usize = 8;
/// Beyond 12 characters the cell is smaller than what an `f64` degree can resolve.
pub const MAX_PRECISION: usize = 12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeohashError {
    #[error("Coordinate ({latitude}, {longitude}) is outside lat [-90, 90] / lon [-180, 180]")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("Geohash precision must be between 1 and {MAX_PRECISION}, got {0}")]
    InvalidPrecision(usize),
    #[error("'{0}' is not a geohash character")]
    InvalidCharacter(char),
    #[error("An empty geohash was supplied")]
    Empty,
}

/// The rectangular cell described by a geohash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCell {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoCell {
    pub fn center(&self) -> (f64, f64) {
        ((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude) && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), GeohashError> {
    let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
    let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(GeohashError::InvalidCoordinate { latitude, longitude })
    }
}

/// Encodes `(latitude, longitude)` as a geohash of exactly `precision` characters.
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> Result<String, GeohashError> {
    validate_coordinates(latitude, longitude)?;
    if precision == 0 || precision > MAX_PRECISION {
        return Err(GeohashError::InvalidPrecision(precision));
    }
    let (mut lat_lo, mut lat_hi) = (-90.0f64, 90.0f64);
    let (mut lon_lo, mut lon_hi) = (-180.0f64, 180.0f64);
    let mut hash = String::with_capacity(precision);
    let mut even = true;
    let mut bits = 0usize;
    let mut index = 0usize;
    while hash.len() < precision {
        let (value, lo, hi) =
            if even { (longitude, &mut lon_lo, &mut lon_hi) } else { (latitude, &mut lat_lo, &mut lat_hi) };
        let mid = (*lo + *hi) / 2.0;
        index <<= 1;
        if value >= mid {
            index |= 1;
            *lo = mid;
        } else {
            *hi = mid;
        }
        even = !even;
        bits += 1;
        if bits == 5 {
            hash.push(BASE32[index] as char);
            bits = 0;
            index = 0;
        }
    }
    Ok(hash)
}

/// Returns the cell described by `geohash`. Upper-case input is accepted.
pub fn decode(geohash: &str) -> Result<GeoCell, GeohashError> {
    if geohash.is_empty() {
        return Err(GeohashError::Empty);
    }
    let mut cell = GeoCell { min_lat: -90.0, max_lat: 90.0, min_lon: -180.0, max_lon: 180.0 };
    let mut even = true;
    for c in geohash.chars() {
        let index = symbol_index(c)?;
        for shift in (0..5).rev() {
            let bit = (index >> shift) & 1 == 1;
            let (lo, hi) =
                if even { (&mut cell.min_lon, &mut cell.max_lon) } else { (&mut cell.min_lat, &mut cell.max_lat) };
            let mid = (*lo + *hi) / 2.0;
            if bit {
                *lo = mid;
            } else {
                *hi = mid;
            }
            even = !even;
        }
    }
    Ok(cell)
}

fn symbol_index(c: char) -> Result<usize, GeohashError> {
    let lower = c.to_ascii_lowercase();
    BASE32.iter().position(|&b| b as char == lower).ok_or(GeohashError::InvalidCharacter(c))
}

//--------------------------------------   GeohashPrefix    ---------------------------------------------------------
/// A validated, lower-cased geohash prefix used to look up stores in the same cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeohashPrefix(String);

impl GeohashPrefix {
    pub fn new(prefix: &str) -> Result<Self, GeohashError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(GeohashError::Empty);
        }
        if prefix.chars().count() > MAX_PRECISION {
            return Err(GeohashError::InvalidPrecision(prefix.chars().count()));
        }
        for c in prefix.chars() {
            symbol_index(c)?;
        }
        Ok(Self(prefix.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `geohash` lies inside this prefix's cell (case-insensitive).
    pub fn matches(&self, geohash: &str) -> bool {
        geohash.get(..self.0.len()).map(|head| head.eq_ignore_ascii_case(&self.0)).unwrap_or(false)
    }

    /// The half-open lexical range `[start, end)` covering every geohash with this prefix.
    ///
    /// The alphabet is in ascending ASCII order, so the range can be served by an ordinary index scan. `end` is `None`
    /// when the prefix consists only of `z`s and the range is unbounded above.
    pub fn range(&self) -> (String, Option<String>) {
        let mut chars: Vec<u8> = self.0.bytes().collect();
        while let Some(last) = chars.pop() {
            if let Some(pos) = BASE32.iter().position(|&b| b == last) {
                if pos + 1 < BASE32.len() {
                    chars.push(BASE32[pos + 1]);
                    let end = String::from_utf8_lossy(&chars).into_owned();
                    return (self.0.clone(), Some(end));
                }
            }
        }
        (self.0.clone(), None)
    }

    pub fn cell(&self) -> GeoCell {
        // Validated on construction
        decode(&self.0).unwrap_or(GeoCell { min_lat: -90.0, max_lat: 90.0, min_lon: -180.0, max_lon: 180.0 })
    }
}

impl TryFrom<String> for GeohashPrefix {
    type Error = GeohashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GeohashPrefix> for String {
    fn from(value: GeohashPrefix) -> Self {
        value.0
    }
}

impl Display for GeohashPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! The closed quantity vocabulary and the [`QuantitySet`] bitset.
//!
//! A scenery requests a set of quantities to compute along each ray. The
//! set is stored as a bitmask; parsing accepts the space-separated textual
//! form used by scenery descriptions, with an optional bracketed unit
//! suffix per name (`"Intensity[mJy/pix2]"`) that is recorded but not
//! converted here — unit handling is the caller's collaborator.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// A computable quantity along a traced ray.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Quantity {
    /// Specific intensity integrated over the line of sight.
    Intensity = 1 << 0,
    /// Coordinate date of first impact.
    EmissionTime = 1 << 1,
    /// Minimum squared distance between ray and emitter.
    MinDistance = 1 << 2,
    /// Squared distance at the first local minimum of the approach.
    FirstDistMin = 1 << 3,
    /// Emitted-to-observed frequency ratio at first impact.
    Redshift = 1 << 4,
    /// Photon and emitter 8-coordinates at first impact (16 slots).
    ImpactCoords = 1 << 5,
    /// Per-channel specific intensity (n_spectral slots).
    Spectrum = 1 << 6,
    /// Per-bin frequency-integrated intensity (n_spectral slots).
    BinSpectrum = 1 << 7,
    /// Accumulated optical depth along the ray.
    Opacity = 1 << 8,
    /// Number of equatorial-plane crossings of the worldline.
    NbCrossEqPlane = 1 << 9,
}

/// All quantities, in canonical (bit) order.
pub const ALL_QUANTITIES: [Quantity; 10] = [
    Quantity::Intensity,
    Quantity::EmissionTime,
    Quantity::MinDistance,
    Quantity::FirstDistMin,
    Quantity::Redshift,
    Quantity::ImpactCoords,
    Quantity::Spectrum,
    Quantity::BinSpectrum,
    Quantity::Opacity,
    Quantity::NbCrossEqPlane,
];

impl Quantity {
    /// Canonical name, as accepted by the textual form.
    pub fn name(self) -> &'static str {
        match self {
            Self::Intensity => "Intensity",
            Self::EmissionTime => "EmissionTime",
            Self::MinDistance => "MinDistance",
            Self::FirstDistMin => "FirstDistMin",
            Self::Redshift => "Redshift",
            Self::ImpactCoords => "ImpactCoords",
            Self::Spectrum => "Spectrum",
            Self::BinSpectrum => "BinSpectrum",
            Self::Opacity => "Opacity",
            Self::NbCrossEqPlane => "NbCrossEqPlane",
        }
    }

    /// Number of output slots per pixel, given the spectrometer size.
    pub fn slot_width(self, n_spectral: usize) -> usize {
        match self {
            Self::Spectrum | Self::BinSpectrum => n_spectral,
            Self::ImpactCoords => 16,
            _ => 1,
        }
    }

    /// Whether this quantity occupies a single scalar slot per pixel.
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Spectrum | Self::BinSpectrum | Self::ImpactCoords)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quantity {
    type Err = QuantityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Strip an optional bracketed unit suffix.
        let name = match s.find('[') {
            Some(open) if s.ends_with(']') => &s[..open],
            _ => s,
        };
        ALL_QUANTITIES
            .iter()
            .copied()
            .find(|q| q.name() == name)
            .ok_or_else(|| QuantityParseError {
                name: name.to_string(),
            })
    }
}

/// An unrecognized quantity name. A configuration error: aborts scenery
/// construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantityParseError {
    /// The unrecognized name.
    pub name: String,
}

impl fmt::Display for QuantityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown quantity '{}'", self.name)
    }
}

impl Error for QuantityParseError {}

/// A set of quantities, implemented as a bitmask over the closed vocabulary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuantitySet {
    bits: u32,
}

impl QuantitySet {
    /// The empty set.
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Insert a quantity.
    pub fn insert(&mut self, q: Quantity) {
        self.bits |= q as u32;
    }

    /// Membership test.
    pub fn contains(self, q: Quantity) -> bool {
        self.bits & q as u32 != 0
    }

    /// Union of two sets.
    pub fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Intersection of two sets.
    pub fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Returns `true` if no quantity is requested.
    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Number of requested quantities.
    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Number of requested quantities of scalar nature (everything except
    /// Spectrum, BinSpectrum and ImpactCoords).
    pub fn scalar_count(self) -> usize {
        self.iter().filter(|q| q.is_scalar()).count()
    }

    /// Iterate in canonical (bit) order.
    pub fn iter(self) -> QuantitySetIter {
        QuantitySetIter { set: self, pos: 0 }
    }
}

impl FromIterator<Quantity> for QuantitySet {
    fn from_iter<I: IntoIterator<Item = Quantity>>(iter: I) -> Self {
        let mut set = Self::empty();
        for q in iter {
            set.insert(q);
        }
        set
    }
}

impl IntoIterator for QuantitySet {
    type Item = Quantity;
    type IntoIter = QuantitySetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for QuantitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for q in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(q.name())?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for QuantitySet {
    type Err = QuantityParseError;

    /// Parse a whitespace-separated quantity list. Order is not stored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace().map(Quantity::from_str).collect()
    }
}

/// Iterator over a [`QuantitySet`] in canonical order.
#[derive(Clone, Debug)]
pub struct QuantitySetIter {
    set: QuantitySet,
    pos: usize,
}

impl Iterator for QuantitySetIter {
    type Item = Quantity;

    fn next(&mut self) -> Option<Quantity> {
        while self.pos < ALL_QUANTITIES.len() {
            let q = ALL_QUANTITIES[self.pos];
            self.pos += 1;
            if self.set.contains(q) {
                return Some(q);
            }
        }
        None
    }
}

use std::fmt;

/// An integer land-cover class code (e.g. `10` for trees in ESA WorldCover).
///
/// The set of labels observed in a table is a subset of an externally
/// defined enumeration; [`LandCoverClass`] covers the WorldCover codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ClassLabel(i32);

impl ClassLabel {
    /// Create a label from a raw class code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Return the raw class code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Return the WorldCover class for this code, if it is one.
    #[must_use]
    pub fn land_cover(self) -> Option<LandCoverClass> {
        LandCoverClass::from_code(self.0)
    }
}

impl From<i32> for ClassLabel {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ESA WorldCover land-cover classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LandCoverClass {
    /// Tree cover (10).
    Trees,
    /// Shrubland (20).
    Shrubland,
    /// Grassland (30).
    Grassland,
    /// Cropland (40).
    Cropland,
    /// Built-up (50).
    BuiltUp,
    /// Bare / sparse vegetation (60).
    BareSparse,
    /// Snow and ice (70).
    SnowIce,
    /// Permanent water bodies (80).
    Water,
    /// Herbaceous wetland (90).
    HerbaceousWetland,
    /// Mangroves (95).
    Mangroves,
    /// Moss and lichen (100).
    MossLichen,
}

impl LandCoverClass {
    /// All classes in ascending code order.
    pub const ALL: [LandCoverClass; 11] = [
        LandCoverClass::Trees,
        LandCoverClass::Shrubland,
        LandCoverClass::Grassland,
        LandCoverClass::Cropland,
        LandCoverClass::BuiltUp,
        LandCoverClass::BareSparse,
        LandCoverClass::SnowIce,
        LandCoverClass::Water,
        LandCoverClass::HerbaceousWetland,
        LandCoverClass::Mangroves,
        LandCoverClass::MossLichen,
    ];

    /// Return the WorldCover class code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            LandCoverClass::Trees => 10,
            LandCoverClass::Shrubland => 20,
            LandCoverClass::Grassland => 30,
            LandCoverClass::Cropland => 40,
            LandCoverClass::BuiltUp => 50,
            LandCoverClass::BareSparse => 60,
            LandCoverClass::SnowIce => 70,
            LandCoverClass::Water => 80,
            LandCoverClass::HerbaceousWetland => 90,
            LandCoverClass::Mangroves => 95,
            LandCoverClass::MossLichen => 100,
        }
    }

    /// Return the human-readable class name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LandCoverClass::Trees => "Trees",
            LandCoverClass::Shrubland => "Shrubland",
            LandCoverClass::Grassland => "Grassland",
            LandCoverClass::Cropland => "Cropland",
            LandCoverClass::BuiltUp => "Built-up",
            LandCoverClass::BareSparse => "Bare/Sparse",
            LandCoverClass::SnowIce => "Snow/Ice",
            LandCoverClass::Water => "Water",
            LandCoverClass::HerbaceousWetland => "Herbaceous Wetland",
            LandCoverClass::Mangroves => "Mangroves",
            LandCoverClass::MossLichen => "Moss/Lichen",
        }
    }

    /// Look up a class by its WorldCover code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Return this class as a [`ClassLabel`].
    #[must_use]
    pub const fn label(self) -> ClassLabel {
        ClassLabel::new(self.code())
    }
}

impl fmt::Display for LandCoverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

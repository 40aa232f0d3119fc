//! Bravais lattice metadata attached to orientation data.

use std::fmt;
use std::str::FromStr;

/// Crystal family of a Bravais lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CrystalFamily {
    /// Triclinic.
    Triclinic,
    /// Monoclinic.
    Monoclinic,
    /// Orthorhombic.
    Orthorhombic,
    /// Tetragonal.
    Tetragonal,
    /// Hexagonal.
    Hexagonal,
    /// Cubic.
    Cubic,
}

impl fmt::Display for CrystalFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Triclinic => "triclinic",
            Self::Monoclinic => "monoclinic",
            Self::Orthorhombic => "orthorhombic",
            Self::Tetragonal => "tetragonal",
            Self::Hexagonal => "hexagonal",
            Self::Cubic => "cubic",
        };
        f.write_str(name)
    }
}

/// Bravais lattice, written with its Pearson symbol (`cF`, `hP`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lattice {
    /// Triclinic primitive.
    AP,
    /// Monoclinic primitive.
    MP,
    /// Monoclinic base-centred.
    MS,
    /// Orthorhombic primitive.
    OP,
    /// Orthorhombic base-centred.
    OS,
    /// Orthorhombic body-centred.
    OI,
    /// Orthorhombic face-centred.
    OF,
    /// Tetragonal primitive.
    TP,
    /// Tetragonal body-centred.
    TI,
    /// Hexagonal primitive.
    HP,
    /// Cubic primitive.
    CP,
    /// Cubic body-centred.
    CI,
    /// Cubic face-centred.
    CF,
}

impl Lattice {
    /// Crystal family the lattice belongs to.
    pub fn family(self) -> CrystalFamily {
        match self {
            Self::AP => CrystalFamily::Triclinic,
            Self::MP | Self::MS => CrystalFamily::Monoclinic,
            Self::OP | Self::OS | Self::OI | Self::OF => CrystalFamily::Orthorhombic,
            Self::TP | Self::TI => CrystalFamily::Tetragonal,
            Self::HP => CrystalFamily::Hexagonal,
            Self::CP | Self::CI | Self::CF => CrystalFamily::Cubic,
        }
    }

    /// Pearson symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::AP => "aP",
            Self::MP => "mP",
            Self::MS => "mS",
            Self::OP => "oP",
            Self::OS => "oS",
            Self::OI => "oI",
            Self::OF => "oF",
            Self::TP => "tP",
            Self::TI => "tI",
            Self::HP => "hP",
            Self::CP => "cP",
            Self::CI => "cI",
            Self::CF => "cF",
        }
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Lattice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "aP" => Self::AP,
            "mP" => Self::MP,
            "mS" => Self::MS,
            "oP" => Self::OP,
            "oS" => Self::OS,
            "oI" => Self::OI,
            "oF" => Self::OF,
            "tP" => Self::TP,
            "tI" => Self::TI,
            "hP" => Self::HP,
            "cP" => Self::CP,
            "cI" => Self::CI,
            "cF" => Self::CF,
            other => return Err(format!("unknown lattice '{other}'")),
        })
    }
}

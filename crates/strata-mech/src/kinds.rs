//! Tagged parameters that select between fixed kernel variants.
//!
//! Each tag renders to the token used in formula function names and
//! output labels (`eigenvalue_max`, `|x|_inf`, `epsilon_V^0.0(F)`, ...).

use std::fmt;
use std::str::FromStr;

use strata_core::MechError;

fn invalid(what: &str, got: &str, allowed: &str) -> MechError {
    MechError::InvalidArgument {
        reason: format!("unknown {what} '{got}', expected one of {allowed}"),
    }
}

/// Which eigenvalue (by magnitude order) of a symmetric tensor to take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EigenRank {
    /// Largest eigenvalue.
    Max,
    /// Middle eigenvalue.
    Mid,
    /// Smallest eigenvalue.
    Min,
}

impl EigenRank {
    /// Position in the ascending eigenvalue order.
    pub fn position(self) -> usize {
        match self {
            Self::Min => 0,
            Self::Mid => 1,
            Self::Max => 2,
        }
    }
}

impl fmt::Display for EigenRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Max => "max",
            Self::Mid => "mid",
            Self::Min => "min",
        })
    }
}

impl FromStr for EigenRank {
    type Err = MechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "mid" => Ok(Self::Mid),
            "min" => Ok(Self::Min),
            other => Err(invalid("eigenvalue rank", other, "max, mid, min")),
        }
    }
}

/// Whether a tensor holds a stress or a strain, for the von Mises
/// equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MisesKind {
    /// `sqrt(3/2 s:s)` of the deviator `s`.
    Stress,
    /// `sqrt(2/3 e:e)` of the deviator `e`.
    Strain,
}

impl MisesKind {
    /// Factor applied to the squared deviator norm.
    pub fn scale(self) -> f64 {
        match self {
            Self::Stress => 1.5,
            Self::Strain => 2.0 / 3.0,
        }
    }
}

impl fmt::Display for MisesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stress => "stress",
            Self::Strain => "strain",
        })
    }
}

impl FromStr for MisesKind {
    type Err = MechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stress" => Ok(Self::Stress),
            "strain" => Ok(Self::Strain),
            other => Err(invalid("Mises kind", other, "stress, strain")),
        }
    }
}

/// Left (`V`, from `F Fᵀ`) or right (`U`, from `Fᵀ F`) stretch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StretchKind {
    /// Left stretch tensor.
    V,
    /// Right stretch tensor.
    U,
}

impl fmt::Display for StretchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V => "V",
            Self::U => "U",
        })
    }
}

impl FromStr for StretchKind {
    type Err = MechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V" => Ok(Self::V),
            "U" => Ok(Self::U),
            other => Err(invalid("stretch kind", other, "V, U")),
        }
    }
}

/// Order of a vector or matrix norm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NormOrder {
    /// Sum of magnitudes (vectors) or maximum column sum (matrices).
    One,
    /// Euclidean length (vectors) or largest singular value (matrices).
    Two,
    /// Maximum magnitude (vectors) or maximum row sum (matrices).
    Inf,
    /// Frobenius norm (matrices only).
    Fro,
}

impl fmt::Display for NormOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Inf => "inf",
            Self::Fro => "fro",
        })
    }
}

impl FromStr for NormOrder {
    type Err = MechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            "inf" => Ok(Self::Inf),
            "fro" => Ok(Self::Fro),
            other => Err(invalid("norm order", other, "1, 2, inf, fro")),
        }
    }
}

impl TryFrom<u32> for NormOrder {
    type Error = MechError;

    fn try_from(p: u32) -> Result<Self, Self::Error> {
        match p {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(invalid("norm order", &other.to_string(), "1, 2, inf, fro")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_text() {
        for r in [EigenRank::Max, EigenRank::Mid, EigenRank::Min] {
            assert_eq!(r.to_string().parse::<EigenRank>(), Ok(r));
        }
        for o in [NormOrder::One, NormOrder::Two, NormOrder::Inf, NormOrder::Fro] {
            assert_eq!(o.to_string().parse::<NormOrder>(), Ok(o));
        }
        assert_eq!("U".parse::<StretchKind>(), Ok(StretchKind::U));
        assert_eq!("strain".parse::<MisesKind>(), Ok(MisesKind::Strain));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!("median".parse::<EigenRank>().is_err());
        assert!("".parse::<MisesKind>().is_err());
        assert!(NormOrder::try_from(3).is_err());
        assert_eq!(NormOrder::try_from(2), Ok(NormOrder::Two));
    }
}

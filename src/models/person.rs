// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::NaiveDateTime;
use thiserror::Error;

/// `coordinates.x` must be strictly greater than this bound.
pub const COORD_X_FLOOR: i32 = -271;

/// Returned when a `Person` payload violates a field-level constraint.
///
/// Validation happens at decode time; a failing payload surfaces as a
/// per-message decode error, never as a connection close.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidPerson {
    #[error("name must not be empty")]
    EmptyName,
    #[error("coordinates.x must be greater than {COORD_X_FLOOR}, got {0}")]
    CoordinateX(i32),
    #[error("height must be positive, got {0}")]
    Height(i32),
    #[error("weight must be positive, got {0}")]
    Weight(i32),
}

/// Returned when an enum tag on the wire matches no declared variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} tag {tag:?}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub tag: String,
}

/// Hair color. Declaration order is meaningful: it is the sort key of
/// `print_field_descending_hair_color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HairColor {
    Green,
    Blue,
    Yellow,
    Orange,
    White,
}

impl HairColor {
    pub const ALL: [HairColor; 5] = [
        HairColor::Green,
        HairColor::Blue,
        HairColor::Yellow,
        HairColor::Orange,
        HairColor::White,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HairColor::Green => "GREEN",
            HairColor::Blue => "BLUE",
            HairColor::Yellow => "YELLOW",
            HairColor::Orange => "ORANGE",
            HairColor::White => "WHITE",
        }
    }
}

impl fmt::Display for HairColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HairColor {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GREEN" => HairColor::Green,
            "BLUE" => HairColor::Blue,
            "YELLOW" => HairColor::Yellow,
            "ORANGE" => HairColor::Orange,
            "WHITE" => HairColor::White,
            other => {
                return Err(UnknownTag {
                    kind: "hair color",
                    tag: other.to_string(),
                });
            },
        })
    }
}

/// Nationality of a `Person`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nationality {
    Usa,
    Germany,
    Vatican,
    NorthKorea,
}

impl Nationality {
    pub fn as_str(self) -> &'static str {
        match self {
            Nationality::Usa => "USA",
            Nationality::Germany => "GERMANY",
            Nationality::Vatican => "VATICAN",
            Nationality::NorthKorea => "NORTH_KOREA",
        }
    }
}

impl fmt::Display for Nationality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Nationality {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "USA" => Nationality::Usa,
            "GERMANY" => Nationality::Germany,
            "VATICAN" => Nationality::Vatican,
            "NORTH_KOREA" => Nationality::NorthKorea,
            other => {
                return Err(UnknownTag {
                    kind: "nationality",
                    tag: other.to_string(),
                });
            },
        })
    }
}

/// Integer plane position. `x` is bounded from below by `COORD_X_FLOOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

/// Free-form location; only `x` is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: Option<f64>,
    pub name: Option<String>,
}

/// One roster record.
///
/// `id` and `creation_date` are assigned by the persistence gateway on first
/// insert and immutable afterwards; a client-supplied `id` is ignored on
/// `add`. `owner_id` points at the user that created the record and gates
/// every mutating command.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i32,
    pub owner_id: i64,
    pub name: String,
    pub coordinates: Coordinates,
    pub creation_date: Option<NaiveDateTime>,
    pub height: i32,
    pub weight: i32,
    pub hair_color: HairColor,
    pub nationality: Nationality,
    pub location: Location,
}

impl Person {
    /// Checks the field-level constraints the wire and persistence layers
    /// rely on.
    pub fn validate(&self) -> Result<(), InvalidPerson> {
        if self.name.is_empty() {
            return Err(InvalidPerson::EmptyName);
        }
        if self.coordinates.x <= COORD_X_FLOOR {
            return Err(InvalidPerson::CoordinateX(self.coordinates.x));
        }
        if self.height <= 0 {
            return Err(InvalidPerson::Height(self.height));
        }
        if self.weight <= 0 {
            return Err(InvalidPerson::Weight(self.weight));
        }
        Ok(())
    }

    /// Body-mass index, `weight / height²`. The natural order of `Person`.
    pub fn bmi(&self) -> f64 {
        f64::from(self.weight) / (f64::from(self.height) * f64::from(self.height))
    }

    /// Total order on BMI ascending. Heights and weights are validated
    /// positive, so the quotient is always finite.
    pub fn cmp_bmi(&self, other: &Person) -> Ordering {
        self.bmi().total_cmp(&other.bmi())
    }
}

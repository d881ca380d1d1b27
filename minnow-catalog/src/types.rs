// Copyright (c) 2026 minnowdb Contributors
//
// Use of this source code is governed by an MIT-style license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! The SQL type lattice and the typed constants that flow through
//! statistics and plans.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Column types understood by the catalog.
///
/// The integer family is ordered `TinyInt < SmallInt < Int < BigInt` and the
/// floating family `Float < Double`; [`DataType::common_type`] widens within
/// a family and promotes across the integer/floating boundary. String and
/// temporal families never promote across each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Numeric { precision: u8, scale: u8 },
    Char(u16),
    VarChar(u16),
    Date,
}

impl DataType {
    /// Parse a catalog type string, e.g. `integer`, `numeric`, `date`,
    /// `character varying(25)`.
    pub fn parse(text: &str) -> Result<DataType, CatalogError> {
        let text = text.trim();
        let lower = text.to_ascii_lowercase();
        let parsed = match lower.as_str() {
            "tinyint" => Some(DataType::TinyInt),
            "smallint" => Some(DataType::SmallInt),
            "integer" | "int" => Some(DataType::Int),
            "bigint" => Some(DataType::BigInt),
            "float" | "real" => Some(DataType::Float),
            "double" | "double precision" => Some(DataType::Double),
            "numeric" => Some(DataType::Numeric {
                precision: 18,
                scale: 2,
            }),
            "date" => Some(DataType::Date),
            _ => None,
        };
        if let Some(ty) = parsed {
            return Ok(ty);
        }
        if let Some(n) = parse_length(&lower, "character varying") {
            return Ok(DataType::VarChar(n));
        }
        if let Some(n) = parse_length(&lower, "varchar") {
            return Ok(DataType::VarChar(n));
        }
        if let Some(n) = parse_length(&lower, "character") {
            return Ok(DataType::Char(n));
        }
        if let Some(n) = parse_length(&lower, "char") {
            return Ok(DataType::Char(n));
        }
        Err(CatalogError::UnknownType(text.to_string()))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Char(_) | DataType::VarChar(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date)
    }

    /// Storage width in bytes, before normalization to a page fraction.
    pub fn byte_width(&self) -> u32 {
        match self {
            DataType::TinyInt => 1,
            DataType::SmallInt => 2,
            DataType::Int | DataType::Float => 4,
            DataType::BigInt | DataType::Double | DataType::Date => 8,
            DataType::Numeric { .. } => 16,
            DataType::Char(n) | DataType::VarChar(n) => *n as u32,
        }
    }

    fn int_rank(&self) -> Option<u8> {
        match self {
            DataType::TinyInt => Some(0),
            DataType::SmallInt => Some(1),
            DataType::Int => Some(2),
            DataType::BigInt => Some(3),
            _ => None,
        }
    }

    /// An integer "fits" a `Float` when its values survive the 24-bit
    /// mantissa unscathed.
    fn fits_in_float(&self) -> bool {
        matches!(self, DataType::TinyInt | DataType::SmallInt)
    }

    /// The least common type two operands promote to, or `None` when the
    /// families are incomparable. Commutative by construction.
    pub fn common_type(self, other: DataType) -> Option<DataType> {
        if self == other {
            return Some(self);
        }
        match (self.int_rank(), other.int_rank()) {
            (Some(a), Some(b)) => {
                return Some(if a >= b { self } else { other });
            }
            _ => {}
        }
        if self.is_floating() && other.is_floating() {
            // Only two members, and they differ.
            return Some(DataType::Double);
        }
        if self.is_integer() && other.is_floating() {
            return Some(promote_int_float(self, other));
        }
        if self.is_floating() && other.is_integer() {
            return Some(promote_int_float(other, self));
        }
        match (self, other) {
            (
                DataType::Numeric {
                    precision: p1,
                    scale: s1,
                },
                DataType::Numeric {
                    precision: p2,
                    scale: s2,
                },
            ) => Some(DataType::Numeric {
                precision: p1.max(p2),
                scale: s1.max(s2),
            }),
            (DataType::Numeric { .. }, o) if o.is_integer() => Some(self),
            (o, DataType::Numeric { .. }) if o.is_integer() => Some(other),
            (DataType::Numeric { .. }, o) if o.is_floating() => Some(DataType::Double),
            (o, DataType::Numeric { .. }) if o.is_floating() => Some(DataType::Double),
            (DataType::Char(a), DataType::Char(b)) => Some(DataType::Char(a.max(b))),
            (DataType::Char(a), DataType::VarChar(b))
            | (DataType::VarChar(a), DataType::Char(b))
            | (DataType::VarChar(a), DataType::VarChar(b)) => Some(DataType::VarChar(a.max(b))),
            _ => None,
        }
    }
}

fn promote_int_float(int: DataType, float: DataType) -> DataType {
    if float == DataType::Float && int.fits_in_float() {
        DataType::Float
    } else {
        DataType::Double
    }
}

fn parse_length(text: &str, prefix: &str) -> Option<u16> {
    let rest = text.strip_prefix(prefix)?.trim();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    inner.trim().parse().ok()
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::TinyInt => write!(f, "tinyint"),
            DataType::SmallInt => write!(f, "smallint"),
            DataType::Int => write!(f, "integer"),
            DataType::BigInt => write!(f, "bigint"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::Numeric { precision, scale } => write!(f, "numeric({precision},{scale})"),
            DataType::Char(n) => write!(f, "character({n})"),
            DataType::VarChar(n) => write!(f, "character varying({n})"),
            DataType::Date => write!(f, "date"),
        }
    }
}

/// A typed constant: a statistic bound (column min/max) or a query literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Datum {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Date(NaiveDate),
}

impl Datum {
    /// Parse a statistic literal according to the column type it annotates.
    pub fn parse(text: &str, ty: DataType) -> Result<Datum, CatalogError> {
        let bad = |kind: &'static str| CatalogError::BadStatistic {
            text: text.to_string(),
            ty: kind,
        };
        match ty {
            _ if ty.is_integer() => text
                .trim()
                .parse::<i64>()
                .map(Datum::Int)
                .map_err(|_| bad("integer")),
            _ if ty.is_floating() => text
                .trim()
                .parse::<f64>()
                .map(|v| Datum::Float(OrderedFloat(v)))
                .map_err(|_| bad("float")),
            DataType::Numeric { .. } => text
                .trim()
                .parse::<f64>()
                .map(|v| Datum::Float(OrderedFloat(v)))
                .map_err(|_| bad("numeric")),
            DataType::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(Datum::Date)
                .map_err(|_| bad("date")),
            _ => Ok(Datum::Str(text.to_string())),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            // Booleans only arise from predicate evaluation; give them the
            // narrowest integer so the lattice stays closed.
            Datum::Bool(_) => DataType::TinyInt,
            Datum::Int(_) => DataType::BigInt,
            Datum::Float(_) => DataType::Double,
            Datum::Str(s) => DataType::VarChar(s.len().min(u16::MAX as usize) as u16),
            Datum::Date(_) => DataType::Date,
        }
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Float(v) => write!(f, "{v}"),
            Datum::Str(v) => write!(f, "'{v}'"),
            Datum::Date(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ALL: &[DataType] = &[
        DataType::TinyInt,
        DataType::SmallInt,
        DataType::Int,
        DataType::BigInt,
        DataType::Float,
        DataType::Double,
        DataType::Numeric {
            precision: 18,
            scale: 2,
        },
        DataType::Char(8),
        DataType::VarChar(25),
        DataType::Date,
    ];

    #[test]
    fn common_type_is_commutative() {
        for &a in ALL {
            for &b in ALL {
                assert_eq!(
                    a.common_type(b),
                    b.common_type(a),
                    "common_type not commutative for {a} / {b}"
                );
            }
        }
    }

    #[test_case(DataType::TinyInt, DataType::BigInt => Some(DataType::BigInt))]
    #[test_case(DataType::SmallInt, DataType::Float => Some(DataType::Float); "small int fits a float mantissa")]
    #[test_case(DataType::Int, DataType::Float => Some(DataType::Double); "wide int forces double")]
    #[test_case(DataType::BigInt, DataType::Double => Some(DataType::Double))]
    #[test_case(DataType::Char(4), DataType::VarChar(25) => Some(DataType::VarChar(25)))]
    #[test_case(DataType::Date, DataType::VarChar(25) => None; "temporal and string do not mix")]
    #[test_case(DataType::Date, DataType::Int => None)]
    fn promotions(a: DataType, b: DataType) -> Option<DataType> {
        a.common_type(b)
    }

    #[test]
    fn parse_type_strings() {
        assert_eq!(DataType::parse("integer").unwrap(), DataType::Int);
        assert_eq!(
            DataType::parse("character varying(25)").unwrap(),
            DataType::VarChar(25)
        );
        assert_eq!(DataType::parse("date").unwrap(), DataType::Date);
        assert!(DataType::parse("interval").is_err());
    }

    #[test]
    fn parse_statistics() {
        assert_eq!(
            Datum::parse("42", DataType::Int).unwrap(),
            Datum::Int(42)
        );
        assert_eq!(
            Datum::parse("1998-07-04", DataType::Date).unwrap(),
            Datum::Date(NaiveDate::from_ymd_opt(1998, 7, 4).unwrap())
        );
        assert!(Datum::parse("x", DataType::Int).is_err());
    }
}

use crate::core::{EntityRef, Result, TrackError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Type-erased scalar field value.
///
/// Structural equality is strict per variant: a `Decimal` carries its scale,
/// so `1.0` and `1.00` are structurally different even though they compare
/// equal. The equality policy decides when the comparison result overrides
/// structural equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
    Decimal { unscaled: i128, scale: u32 },
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl ScalarValue {
    /// Fixed-point decimal: `unscaled * 10^-scale`.
    pub fn decimal(unscaled: i128, scale: u32) -> Self {
        Self::Decimal { unscaled, scale }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Decimal { .. } => "DECIMAL",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Uuid(_) => "UUID",
        }
    }

    /// Total-order comparison where one exists.
    ///
    /// Numeric variants are mutually comparable (Integer, Float, Decimal);
    /// every other pairing must match exactly. Incompatible pairings are a
    /// `TypeMismatch` error, which the equality policy reads as "these two
    /// values do not expose a shared ordering".
    pub fn compare(&self, other: &ScalarValue) -> Result<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Ok(a.cmp(b)),

            (Self::Float(a), Self::Float(b)) => Ok(compare_floats(*a, *b)),

            (Self::Integer(a), Self::Float(b)) => Ok(compare_floats(*a as f64, *b)),
            (Self::Float(a), Self::Integer(b)) => Ok(compare_floats(*a, *b as f64)),

            (
                Self::Decimal {
                    unscaled: a,
                    scale: sa,
                },
                Self::Decimal {
                    unscaled: b,
                    scale: sb,
                },
            ) => compare_decimals(*a, *sa, *b, *sb),

            (Self::Integer(a), Self::Decimal { unscaled, scale }) => {
                compare_decimals(*a as i128, 0, *unscaled, *scale)
            }
            (Self::Decimal { unscaled, scale }, Self::Integer(b)) => {
                compare_decimals(*unscaled, *scale, *b as i128, 0)
            }

            (Self::Float(a), Self::Decimal { unscaled, scale }) => {
                Ok(compare_floats(*a, decimal_to_f64(*unscaled, *scale)))
            }
            (Self::Decimal { unscaled, scale }, Self::Float(b)) => {
                Ok(compare_floats(decimal_to_f64(*unscaled, *scale), *b))
            }

            (Self::Text(a), Self::Text(b)) => Ok(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Ok(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Ok(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Ok(a.cmp(b)),

            _ => Err(TrackError::TypeMismatch(format!(
                "cannot compare incompatible types: {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }
}

/// NaN sorts last and equals itself, so the ordering stays total.
fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_decimals(a: i128, sa: u32, b: i128, sb: u32) -> Result<Ordering> {
    if sa == sb {
        return Ok(a.cmp(&b));
    }
    // Align the smaller scale up to the larger one.
    let (lo, lo_scale, hi, flip) = if sa < sb {
        (a, sa, b, false)
    } else {
        (b, sb, a, true)
    };
    let diff = if sa < sb { sb - sa } else { sa - sb };
    let lifted = 10i128
        .checked_pow(diff)
        .and_then(|pow| lo.checked_mul(pow))
        .ok_or_else(|| {
            TrackError::TypeMismatch(format!(
                "decimal {}e-{} is out of comparable range",
                lo, lo_scale
            ))
        })?;
    Ok(if flip {
        hi.cmp(&lifted)
    } else {
        lifted.cmp(&hi)
    })
}

fn decimal_to_f64(unscaled: i128, scale: u32) -> f64 {
    unscaled as f64 / 10f64.powi(scale as i32)
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            // NaN is equal to itself here so that re-capturing an unchanged
            // NaN field never reads as a change.
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (
                Self::Decimal {
                    unscaled: a,
                    scale: sa,
                },
                Self::Decimal {
                    unscaled: b,
                    scale: sb,
                },
            ) => a == b && sa == sb,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Decimal { unscaled, scale } => {
                if *scale == 0 {
                    write!(f, "{}", unscaled)
                } else {
                    let sign = if *unscaled < 0 { "-" } else { "" };
                    let digits = unscaled.unsigned_abs().to_string();
                    let scale = *scale as usize;
                    if digits.len() > scale {
                        let (int, frac) = digits.split_at(digits.len() - scale);
                        write!(f, "{}{}.{}", sign, int, frac)
                    } else {
                        write!(f, "{}0.{}{}", sign, "0".repeat(scale - digits.len()), digits)
                    }
                }
            }
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for ScalarValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// A captured field value, tagged with its comparison capability.
///
/// The tag is decided by the field's registered kind when the snapshot is
/// taken, never probed per comparison: an `Ordered` value opts into
/// comparison-based equality, a `Scalar` value is structural only.
/// `Absent` means no value was ever materialized, which for collection
/// fields is distinct from a present-but-empty collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackedValue {
    Absent,
    Scalar(ScalarValue),
    Ordered(ScalarValue),
    Reference(EntityRef),
    References(Vec<EntityRef>),
    Values(Vec<ScalarValue>),
}

impl TrackedValue {
    pub fn scalar(value: impl Into<ScalarValue>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn ordered(value: impl Into<ScalarValue>) -> Self {
        Self::Ordered(value.into())
    }

    pub fn reference(entity_ref: EntityRef) -> Self {
        Self::Reference(entity_ref)
    }

    pub fn references(members: impl IntoIterator<Item = EntityRef>) -> Self {
        Self::References(members.into_iter().collect())
    }

    pub fn values(members: impl IntoIterator<Item = ScalarValue>) -> Self {
        Self::Values(members.into_iter().collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::References(_) | Self::Values(_))
    }

    /// Present-and-empty collection, as opposed to `Absent`.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Self::References(members) => members.is_empty(),
            Self::Values(members) => members.is_empty(),
            _ => false,
        }
    }

    /// Promote a structural scalar to comparison-based equality.
    /// Everything else passes through unchanged.
    pub fn into_ordered(self) -> Self {
        match self {
            Self::Scalar(s) => Self::Ordered(s),
            other => other,
        }
    }

    /// Member list of a reference collection; `Absent` reads as empty.
    pub fn reference_members(&self) -> &[EntityRef] {
        match self {
            Self::References(members) => members,
            _ => &[],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent => "ABSENT",
            Self::Scalar(s) | Self::Ordered(s) => s.type_name(),
            Self::Reference(_) => "REFERENCE",
            Self::References(_) => "REFERENCES",
            Self::Values(_) => "VALUES",
        }
    }
}

impl fmt::Display for TrackedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "ABSENT"),
            Self::Scalar(s) | Self::Ordered(s) => write!(f, "{}", s),
            Self::Reference(r) => write!(f, "{}", r),
            Self::References(members) => {
                write!(f, "[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, "]")
            }
            Self::Values(members) => {
                write!(f, "[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, "]")
            }
        }
    }
}

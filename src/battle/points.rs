use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const SCALE: u32 = 100;

/// 非负分值，以百分之一分为单位精确存储。
///
/// 对外（JSON / TOML）序列化为普通小数，例如 `0.5`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Points(u32);

impl Points {
    pub const ZERO: Points = Points(0);

    /// 超出表示范围时饱和到最大值。
    pub const fn whole(points: u32) -> Self {
        Self(points.saturating_mul(SCALE))
    }

    pub const fn from_centi(centi: u32) -> Self {
        Self(centi)
    }

    pub const fn centi(self) -> u32 {
        self.0
    }

    /// 负数、NaN、无穷大或超出范围时返回 `None`；多余的精度四舍五入到百分位。
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let scaled = (value * f64::from(SCALE)).round();
        if scaled > f64::from(u32::MAX) {
            return None;
        }
        Some(Self(scaled as u32))
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(SCALE)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Points {
    type Output = Points;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Points::ZERO, |total, points| total + points)
    }
}

impl<'a> Sum<&'a Points> for Points {
    fn sum<I: Iterator<Item = &'a Points>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.as_f64())
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::from_f64(value).ok_or_else(|| {
            de::Error::custom(format!(
                "points must be a finite, non-negative number (got {value})"
            ))
        })
    }
}

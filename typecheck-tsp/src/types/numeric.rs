use num_bigint::BigInt;
use ordered_float::OrderedFloat;
use std::fmt;

/// A numeric literal keeping both its source text and its float value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Numeric {
  text: String,
  value: OrderedFloat<f64>,
}

impl Numeric {
  pub fn new(text: impl Into<String>, value: f64) -> Self {
    Numeric {
      text: text.into(),
      value: OrderedFloat(value),
    }
  }

  pub fn from_f64(value: f64) -> Self {
    Numeric::new(format_number(value), value)
  }

  pub fn as_f64(&self) -> f64 {
    self.value.0
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub(crate) fn key(&self) -> OrderedFloat<f64> {
    self.value
  }

  pub fn is_integer(&self) -> bool {
    self.text.parse::<BigInt>().is_ok() || (self.value.is_finite() && self.value.fract() == 0.0)
  }

  /// Exact integer value; the source text is preferred over the float so
  /// integers beyond 2^53 keep their digits.
  pub fn as_bigint(&self) -> Option<BigInt> {
    if let Ok(exact) = self.text.parse::<BigInt>() {
      return Some(exact);
    }
    if !self.is_integer() {
      return None;
    }
    format!("{:.0}", self.value.0).parse().ok()
  }
}

fn format_number(value: f64) -> String {
  if value.fract() == 0.0 && value.abs() < 1e21 {
    format!("{:.0}", value)
  } else {
    value.to_string()
  }
}

impl fmt::Display for Numeric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

/// Inclusive integer bounds of a standard integer scalar.
pub(crate) fn integer_bounds(scalar: &str) -> Option<(BigInt, BigInt)> {
  let signed = |bits: u32| {
    let half = BigInt::from(1) << (bits - 1);
    (-half.clone(), half - 1)
  };
  let unsigned = |bits: u32| (BigInt::from(0), (BigInt::from(1) << bits) - 1);
  Some(match scalar {
    "int8" => signed(8),
    "int16" => signed(16),
    "int32" => signed(32),
    "int64" => signed(64),
    "uint8" => unsigned(8),
    "uint16" => unsigned(16),
    "uint32" => unsigned(32),
    "uint64" => unsigned(64),
    "safeint" => {
      let max: BigInt = (BigInt::from(1) << 53) - 1;
      (-max.clone(), max)
    }
    _ => return None,
  })
}

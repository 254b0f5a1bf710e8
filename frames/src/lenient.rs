//! Number decoding that tolerates the protobuf codec's float normalization.
//!
//! `prost_types::Value` has a single `f64` number kind, so an integer such as
//! `line_width: 3` arrives as `3.0`. These helpers accept any JSON number (or
//! null) and convert it to the target integer type, saturating at the type's
//! bounds. Range policy (for example the legal stroke widths) belongs to the
//! owning type; decoding never rejects a number for being too large or too
//! small.

use serde::{Deserialize, Deserializer};

/// Integer targets that a JSON number can be squeezed into.
pub(crate) trait Integer: Default {
    /// Round `raw` and saturate it into the type. NaN becomes zero.
    fn saturating_from(raw: f64) -> Self;
}

macro_rules! saturating_integer {
    ($($ty:ty),*) => {
        $(
            impl Integer for $ty {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn saturating_from(raw: f64) -> Self {
                    // Float-to-int `as` saturates at the bounds and maps NaN to 0.
                    raw.round() as $ty
                }
            }
        )*
    };
}

saturating_integer!(u32, usize, i64);

/// Decode an integer field, mapping null to the type's default.
pub(crate) fn int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Integer,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map_or_else(T::default, T::saturating_from))
}

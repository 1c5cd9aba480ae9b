//! Serde helpers.

use serde::{Deserialize, Deserializer};

/// Deserialize an explicit JSON `null` as `T::default()`.
///
/// PostgREST returns `null` for unset jsonb columns, which `#[serde(default)]`
/// alone does not cover.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

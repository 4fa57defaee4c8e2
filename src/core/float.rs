use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

/// Alias trait for the scalar cost type, usually f32 or f64.
///
/// Automatically implemented for every type satisfying the bounds, so there
/// is never a need to implement it manually.
pub trait Float:
    num_traits::Float
    + num_traits::FromPrimitive
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> Float for T where
    T: num_traits::Float
        + num_traits::FromPrimitive
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

pub mod announcement;
pub mod event;
pub mod image;
pub mod user;

pub use announcement::*;
pub use event::*;
pub use image::*;
pub use user::*;

/// Deserializes a field so that an absent key stays `None` while an explicit
/// `null` becomes `Some(None)`. Use together with `#[serde(default)]`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

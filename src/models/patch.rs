// src/models/patch.rs

use serde::{Deserialize, Deserializer};

/// Tri-state field for partial updates. A plain `Option` cannot tell
/// "field absent from the request" apart from "field explicitly null",
/// which matters for clearing nullable columns like `end_time` or `notes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field was not present in the request body; leave the column untouched.
    Missing,
    /// Field was present as JSON null; set the column to NULL.
    Null,
    /// Field was present with a value.
    Value(T),
}

// Hand-written so the impl exists for any T, not just T: Default.
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Missing
    }
}

impl<T> Patch<T> {
    /// `None` when missing, otherwise `Some(nullable value)` ready to bind.
    pub fn into_nullable(self) -> Option<Option<T>> {
        match self {
            Patch::Missing => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }
}

// Deserializes only for fields that are present; the container must mark
// patch fields #[serde(default)] so absent fields stay Missing.
impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Patch;
    use serde::Deserialize;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Body {
        notes: Patch<String>,
        workers: Patch<i32>,
    }

    #[test]
    fn absent_field_is_missing() {
        let b: Body = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(b.notes, Patch::Missing);
        assert_eq!(b.workers, Patch::Missing);
    }

    #[test]
    fn null_field_is_null() {
        let b: Body = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(b.notes, Patch::Null);
        assert_eq!(b.workers, Patch::Missing);
    }

    #[test]
    fn present_field_is_value() {
        let b: Body = serde_json::from_str(r#"{"notes": "wet stope", "workers": 12}"#).unwrap();
        assert_eq!(b.notes, Patch::Value("wet stope".to_string()));
        assert_eq!(b.workers, Patch::Value(12));
    }

    #[test]
    fn into_nullable_distinguishes_all_three() {
        assert_eq!(Patch::<i32>::Missing.into_nullable(), None);
        assert_eq!(Patch::<i32>::Null.into_nullable(), Some(None));
        assert_eq!(Patch::Value(5).into_nullable(), Some(Some(5)));
    }
}

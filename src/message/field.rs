//! Overridable message fields.

use crate::Error;

/// One wire field of a message.
///
/// Preparation only ever fills an [`Field::Unset`] field, so an
/// [`Field::Override`] survives any number of preparations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Unset,
    /// Parsed from the wire or computed during preparation.
    Value(T),
    /// Explicitly chosen value, emitted as is.
    Override(T),
}

impl<T> Field<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Field::Unset => None,
            Field::Value(v) | Field::Override(v) => Some(v),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Field::Unset)
    }

    pub fn is_override(&self) -> bool {
        matches!(self, Field::Override(_))
    }

    pub fn set_override(&mut self, value: T) {
        *self = Field::Override(value);
    }

    /// Forget a computed value. Overrides are kept.
    pub fn reset(&mut self) {
        if let Field::Value(_) = self {
            *self = Field::Unset;
        }
    }

    pub(crate) fn prepare_with(&mut self, f: impl FnOnce() -> T) {
        if !self.is_set() {
            *self = Field::Value(f());
        }
    }

    pub(crate) fn try_prepare_with(
        &mut self,
        f: impl FnOnce() -> Result<T, Error>,
    ) -> Result<(), Error> {
        if !self.is_set() {
            *self = Field::Value(f()?);
        }
        Ok(())
    }

    /// The value, or `Error::MissingField` naming the field.
    pub(crate) fn require(&self, name: &'static str) -> Result<&T, Error> {
        self.get().ok_or(Error::MissingField(name))
    }
}

impl<T: Copy> Field<T> {
    pub fn value(&self) -> Option<T> {
        self.get().copied()
    }
}

/// Message content that is either raw bytes or structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content<T> {
    /// Emitted verbatim, never prepared.
    Passthrough(Vec<u8>),
    Fields(T),
}

impl<T> Content<T> {
    pub fn fields(&self) -> Option<&T> {
        match self {
            Content::Fields(f) => Some(f),
            Content::Passthrough(_) => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut T> {
        match self {
            Content::Fields(f) => Some(f),
            Content::Passthrough(_) => None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, Content::Passthrough(_))
    }
}

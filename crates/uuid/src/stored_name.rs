//! Opaque storage names for uploaded attachments.

use crate::{UuidError, UuidResult, UuidService};
use std::fmt;
use std::str::FromStr;

const MAX_EXTENSION_LEN: usize = 8;

/// The name an attachment is stored under: `<canonical-uuid>.<extension>`.
///
/// The original filename supplied at upload time is kept only as metadata. Storage addressing
/// always goes through a `StoredName`, which by construction contains no path separators,
/// no `..` segments and no characters outside `[0-9a-z.]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoredName {
    id: UuidService,
    extension: String,
}

impl StoredName {
    /// Generates a fresh stored name carrying the given extension.
    ///
    /// The extension is lowercased and any leading dot is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if the extension is empty, too long or not ASCII
    /// alphanumeric.
    pub fn generate(extension: &str) -> UuidResult<Self> {
        Ok(Self {
            id: UuidService::new(),
            extension: Self::clean_extension(extension)?,
        })
    }

    /// Parses a stored name received from outside (for example a download path segment).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless `input` is exactly a canonical UUID, a dot,
    /// and a short lowercase alphanumeric extension.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let (id, extension) = input.split_once('.').ok_or_else(|| {
            UuidError::InvalidInput(format!("stored name has no extension: '{}'", input))
        })?;

        if extension.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(UuidError::InvalidInput(format!(
                "stored name extension must be lowercase: '{}'",
                input
            )));
        }

        Ok(Self {
            id: UuidService::parse(id)?,
            extension: Self::clean_extension(extension)?,
        })
    }

    /// Returns the identifier part.
    pub fn id(&self) -> &UuidService {
        &self.id
    }

    /// Returns the lowercase extension, without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn clean_extension(raw: &str) -> UuidResult<String> {
        let ext = raw.trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty()
            || ext.len() > MAX_EXTENSION_LEN
            || !ext.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(UuidError::InvalidInput(format!(
                "invalid file extension: '{}'",
                raw
            )));
        }
        Ok(ext)
    }
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.extension)
    }
}

impl FromStr for StoredName {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoredName::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StoredName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StoredName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StoredName::parse(&s).map_err(serde::de::Error::custom)
    }
}

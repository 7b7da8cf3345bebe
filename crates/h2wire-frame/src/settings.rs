//! SETTINGS payload model.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::registry::Setting;

/// Wire size of one (identifier, value) pair.
pub const SETTINGS_ENTRY_SIZE: usize = 8;

/// A SETTINGS identifier: a registered name or a raw numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Known(Setting),
    Raw(u32),
}

impl SettingKey {
    /// Resolve a numeric id, preferring the registered name when there is one.
    pub fn from_id(id: u32) -> Self {
        Setting::from_id(id).map_or(Self::Raw(id), Self::Known)
    }

    pub fn id(self) -> u32 {
        match self {
            Self::Known(setting) => setting.id(),
            Self::Raw(id) => id,
        }
    }
}

impl From<Setting> for SettingKey {
    fn from(setting: Setting) -> Self {
        Self::Known(setting)
    }
}

impl From<u32> for SettingKey {
    fn from(id: u32) -> Self {
        Self::from_id(id)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(setting) => f.write_str(setting.name()),
            Self::Raw(id) => write!(f, "{id}"),
        }
    }
}

/// Accepts a registered name (`"initial_window_size"`) or a decimal id (`"55"`).
impl FromStr for SettingKey {
    type Err = FrameError;

    fn from_str(key: &str) -> Result<Self> {
        if let Ok(id) = key.parse::<u32>() {
            return Ok(Self::from_id(id));
        }
        Setting::from_name(key)
            .map(Self::Known)
            .ok_or_else(|| FrameError::UnknownSettingsId(key.to_string()))
    }
}

/// An insertion-ordered SETTINGS map.
///
/// Entries keep the order they were inserted in (or read off the wire in).
/// Keys are compared by numeric id, so `Raw(4)` and
/// `Known(MaxConcurrentStreams)` name the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(SettingKey, u32)>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<SettingKey>, value: u32) -> Option<u32> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| k.id() == key.id()) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Insert using a symbolic key, see [`SettingKey`]'s `FromStr`.
    pub fn insert_named(&mut self, key: &str, value: u32) -> Result<Option<u32>> {
        let key: SettingKey = key.parse()?;
        Ok(self.insert(key, value))
    }

    pub fn get(&self, key: impl Into<SettingKey>) -> Option<u32> {
        let id = key.into().id();
        self.entries
            .iter()
            .find(|(k, _)| k.id() == id)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingKey, u32)> + '_ {
        self.entries.iter().copied()
    }

    /// Bytes this map occupies in a SETTINGS body.
    pub fn wire_len(&self) -> usize {
        self.entries.len() * SETTINGS_ENTRY_SIZE
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        for (key, value) in &self.entries {
            dst.put_u32(key.id());
            dst.put_u32(*value);
        }
    }

    /// Decode `(id, value)` pairs. The caller checks the body is a whole
    /// number of entries.
    pub(crate) fn decode(mut body: &[u8]) -> Self {
        let mut settings = Self::new();
        while body.remaining() >= SETTINGS_ENTRY_SIZE {
            let id = body.get_u32();
            let value = body.get_u32();
            settings.insert(SettingKey::from_id(id), value);
        }
        settings
    }
}

impl<K: Into<SettingKey>> FromIterator<(K, u32)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }
        settings
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Settings {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(key, value)| (key.to_string(), value)))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Settings {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct SettingsVisitor;

        impl<'de> serde::de::Visitor<'de> for SettingsVisitor {
            type Value = Settings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of settings names or ids to 32-bit values")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Settings, A::Error> {
                let mut settings = Settings::new();
                while let Some((key, value)) = map.next_entry::<String, u32>()? {
                    settings
                        .insert_named(&key, value)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(settings)
            }
        }

        deserializer.deserialize_map(SettingsVisitor)
    }
}

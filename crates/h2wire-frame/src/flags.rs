//! Typed flag sets.
//!
//! Each frame type that carries flags gets its own flag enum, so a flag from
//! the wrong type cannot be put on a frame. [`Flags`] stores the set as the
//! raw flags byte; an empty set is the same thing as "no flags field".

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{FrameError, Result};
use crate::registry::FrameType;

/// A flag enum bound to one frame type's flag registry.
pub trait FrameFlag: Copy + Eq + fmt::Debug + 'static {
    /// The frame type whose registry this enum mirrors.
    const FRAME_TYPE: FrameType;
    /// Every variant.
    const ALL: &'static [Self];

    fn bit(self) -> u8;

    fn name(self) -> &'static str;

    /// Resolve a symbolic flag name.
    fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|flag| flag.name() == name)
            .ok_or_else(|| FrameError::InvalidFrameFlag {
                frame_type: Self::FRAME_TYPE,
                flag: name.to_string(),
            })
    }
}

macro_rules! frame_flags {
    (
        $(#[$meta:meta])*
        $name:ident for $frame_type:expr => {
            $($(#[$vmeta:meta])* $variant:ident = $bit:literal, $flag:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl FrameFlag for $name {
            const FRAME_TYPE: FrameType = $frame_type;
            const ALL: &'static [Self] = &[$(Self::$variant,)+];

            fn bit(self) -> u8 {
                match self {
                    $(Self::$variant => $bit,)+
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $flag,)+
                }
            }
        }
    };
}

frame_flags! {
    /// DATA frame flags.
    DataFlag for FrameType::Data => {
        EndStream = 0x1, "end_stream";
        Reserved = 0x2, "reserved";
    }
}

frame_flags! {
    /// HEADERS frame flags.
    ///
    /// `Priority` announces the 32-bit priority field and is only valid
    /// together with it.
    HeadersFlag for FrameType::Headers => {
        EndStream = 0x1, "end_stream";
        Reserved = 0x2, "reserved";
        EndHeaders = 0x4, "end_headers";
        Priority = 0x8, "priority";
    }
}

frame_flags! {
    /// PUSH_PROMISE frame flags.
    PushPromiseFlag for FrameType::PushPromise => {
        EndPushPromise = 0x1, "end_push_promise";
    }
}

frame_flags! {
    /// PING frame flags.
    PingFlag for FrameType::Ping => {
        Pong = 0x1, "pong";
    }
}

frame_flags! {
    /// WINDOW_UPDATE frame flags.
    WindowUpdateFlag for FrameType::WindowUpdate => {
        EndFlowControl = 0x1, "end_flow_control";
    }
}

/// A set of flags for one frame type.
pub struct Flags<F> {
    bits: u8,
    marker: PhantomData<F>,
}

impl<F: FrameFlag> Flags<F> {
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            marker: PhantomData,
        }
    }

    /// Build a set from a flags byte, dropping bits `F` does not know.
    pub fn from_bits_truncate(bits: u8) -> Self {
        let mask = F::ALL.iter().fold(0, |mask, flag| mask | flag.bit());
        Self {
            bits: bits & mask,
            marker: PhantomData,
        }
    }

    pub fn bits(self) -> u8 {
        self.bits
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn contains(self, flag: F) -> bool {
        self.bits & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: F) {
        self.bits |= flag.bit();
    }

    pub fn remove(&mut self, flag: F) {
        self.bits &= !flag.bit();
    }

    /// Builder-style [`Flags::insert`].
    pub fn with(mut self, flag: F) -> Self {
        self.insert(flag);
        self
    }

    /// Iterate the set flags in registry order.
    pub fn iter(self) -> impl Iterator<Item = F> {
        F::ALL.iter().copied().filter(move |flag| self.contains(*flag))
    }
}

impl<F> Clone for Flags<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Flags<F> {}

impl<F> PartialEq for Flags<F> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<F> Eq for Flags<F> {}

impl<F> Hash for Flags<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<F: FrameFlag> Default for Flags<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: FrameFlag> From<F> for Flags<F> {
    fn from(flag: F) -> Self {
        Self::empty().with(flag)
    }
}

impl<F: FrameFlag> FromIterator<F> for Flags<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl<F: FrameFlag> fmt::Debug for Flags<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(F::name)).finish()
    }
}

#[cfg(feature = "serde")]
impl<F: FrameFlag> serde::Serialize for Flags<F> {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(F::name))
    }
}

#[cfg(feature = "serde")]
impl<'de, F: FrameFlag> serde::Deserialize<'de> for Flags<F> {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let names = <Vec<String> as serde::Deserialize>::deserialize(deserializer)?;
        names
            .iter()
            .map(|name| F::from_name(name))
            .collect::<Result<Self>>()
            .map_err(serde::de::Error::custom)
    }
}

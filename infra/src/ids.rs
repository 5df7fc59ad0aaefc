use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::SystemTime;

use err_derive::Error;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::untyped_ids::{UntypedId, UntypedIdParseError};

/// An identifier for documents of kind `T`; displayed as `PREFIX-body`.
pub struct Id<T> {
    inner: UntypedId,
    phantom: PhantomData<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error(display = "id {:?} does not start with {:?}", _0, _1)]
    InvalidPrefix(String, &'static str),
    #[error(display = "id {:?} is missing its divider", _0)]
    MissingDivider(String),
    #[error(display = "invalid id body")]
    Body(#[error(source)] UntypedIdParseError),
}

pub trait Entity {
    const PREFIX: &'static str;
}

pub const DIVIDER: &str = "-";

#[derive(Debug, Default)]
pub struct IdGen {
    _priv: (),
}

impl IdGen {
    pub fn new() -> Self {
        IdGen::default()
    }

    pub fn untyped(&self) -> UntypedId {
        UntypedId::from_parts(SystemTime::now(), rand::thread_rng().gen())
    }

    pub fn generate<T>(&self) -> Id<T> {
        self.untyped().typed()
    }
}

impl<T> Id<T> {
    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        UntypedId::hashed(entity).typed()
    }

    pub(crate) fn from_untyped(inner: UntypedId) -> Self {
        Id {
            inner,
            phantom: PhantomData,
        }
    }

    pub fn untyped(&self) -> UntypedId {
        self.inner
    }
}

impl<T: Entity> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}{}{}", T::PREFIX, DIVIDER, self.inner)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Id").field(&self.inner).finish()
    }
}

impl<T: Entity> std::str::FromStr for Id<T> {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if !src.starts_with(T::PREFIX) {
            return Err(IdParseError::InvalidPrefix(src.to_string(), T::PREFIX));
        }
        let remainder = &src[T::PREFIX.len()..];
        if !remainder.starts_with(DIVIDER) {
            return Err(IdParseError::MissingDivider(src.to_string()));
        }
        let body = &remainder[DIVIDER.len()..];
        let inner = body.parse::<UntypedId>().map_err(IdParseError::Body)?;
        Ok(inner.typed())
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        UntypedId::default().typed()
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T: Entity> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, T: Entity> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdStrVisitor<T>(PhantomData<T>);
        impl<'vi, T: Entity> de::Visitor<'vi> for IdStrVisitor<T> {
            type Value = Id<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an Id string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Id<T>, E> {
                value.parse::<Id<T>>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdStrVisitor(PhantomData))
    }
}

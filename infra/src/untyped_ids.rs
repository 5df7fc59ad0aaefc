use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use data_encoding::BASE64URL_NOPAD;
use err_derive::Error;
use hex_slice::AsHex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::Id;

const ID_LEN: usize = 16;

/// Sixteen bytes: a big-endian nanosecond timestamp followed by eight bytes
/// of randomness. Hashed identifiers fill both halves from the hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UntypedId {
    val: [u8; ID_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UntypedIdParseError {
    #[error(display = "unparseable id body {:?}", _0)]
    Unparseable(String),
    #[error(display = "id body {:?} has length {}, expected 16", _0, _1)]
    WrongLength(String, usize),
}

impl UntypedId {
    pub fn from_parts(stamp: SystemTime, random: u64) -> Self {
        let nanos = stamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let mut val = [0u8; ID_LEN];
        val[..8].copy_from_slice(&nanos.to_be_bytes());
        val[8..].copy_from_slice(&random.to_be_bytes());
        UntypedId { val }
    }

    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        let mut val = [0u8; ID_LEN];
        for (i, chunk) in val.chunks_mut(8).enumerate() {
            let mut h = siphasher::sip::SipHasher24::new_with_keys(0, i as u64);
            entity.hash(&mut h);
            chunk.copy_from_slice(&h.finish().to_be_bytes());
        }
        UntypedId { val }
    }

    pub fn timestamp(&self) -> SystemTime {
        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&self.val[..8]);
        UNIX_EPOCH + Duration::from_nanos(u64::from_be_bytes(stamp))
    }

    pub fn typed<T>(self) -> Id<T> {
        Id::from_untyped(self)
    }
}

impl fmt::Display for UntypedId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", BASE64URL_NOPAD.encode(&self.val))
    }
}

impl fmt::Debug for UntypedId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("UntypedId")
            .field("val", &format_args!("{:x}", self.val.as_hex()))
            .finish()
    }
}

impl FromStr for UntypedId {
    type Err = UntypedIdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64URL_NOPAD
            .decode(src.as_bytes())
            .map_err(|_| UntypedIdParseError::Unparseable(src.to_string()))?;
        if bytes.len() != ID_LEN {
            return Err(UntypedIdParseError::WrongLength(
                src.to_string(),
                bytes.len(),
            ));
        }
        let mut val = [0u8; ID_LEN];
        val.copy_from_slice(&bytes);
        Ok(UntypedId { val })
    }
}

impl Serialize for UntypedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UntypedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

//! Identifier types shared by every Polaris component
//!
//! All identifiers are opaque: they are compared, hashed and persisted as
//! fixed-width byte arrays, never interpreted.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local handle of a store (root or shared folder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sidx(pub u32);

impl Sidx {
    pub fn new(handle: u32) -> Self {
        Sidx(handle)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Fixed-width big-endian encoding
    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Sidx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Sidx {
    fn from(handle: u32) -> Self {
        Sidx(handle)
    }
}

/// Globally unique identifier of a synchronized object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Oid(pub [u8; 16]);

impl Oid {
    /// Create a new random Oid
    pub fn generate() -> Self {
        Oid(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create Oid from bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Oid(bytes)
    }

    /// Get bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 16]> for Oid {
    fn from(bytes: [u8; 16]) -> Self {
        Oid(bytes)
    }
}

/// Identifier of a synchronizing client instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Did(pub [u8; 16]);

impl Did {
    /// Create a new random Did
    pub fn generate() -> Self {
        Did(uuid::Uuid::new_v4().into_bytes())
    }

    /// Create Did from bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Did(bytes)
    }

    /// Get bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 16]> for Did {
    fn from(bytes: [u8; 16]) -> Self {
        Did(bytes)
    }
}

/// An object qualified by the store it lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Soid {
    pub sidx: Sidx,
    pub oid: Oid,
}

impl Soid {
    pub fn new(sidx: Sidx, oid: Oid) -> Self {
        Soid { sidx, oid }
    }
}

impl fmt::Display for Soid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.sidx, self.oid)
    }
}

/// Content digest, stored and compared for equality only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(Vec<u8>);

impl ContentHash {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        ContentHash(bytes.into())
    }

    /// BLAKE3 digest of `data`
    pub fn digest(data: &[u8]) -> Self {
        ContentHash(blake3::hash(data).as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Kind of object a buffered meta change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    File,
    Dir,
    Anchor,
}

impl ObjectType {
    /// Integer code persisted in the database
    pub fn as_i64(&self) -> i64 {
        match self {
            ObjectType::File => 0,
            ObjectType::Dir => 1,
            ObjectType::Anchor => 2,
        }
    }

    pub fn from_i64(code: i64) -> Option<Self> {
        match code {
            0 => Some(ObjectType::File),
            1 => Some(ObjectType::Dir),
            2 => Some(ObjectType::Anchor),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::File => write!(f, "FILE"),
            ObjectType::Dir => write!(f, "DIR"),
            ObjectType::Anchor => write!(f, "ANCHOR"),
        }
    }
}

// SQL mapping: stores as INTEGER, ids and hashes as BLOB

impl ToSql for Sidx {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl ToSql for Oid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for Oid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        fixed_16(value).map(Oid)
    }
}

impl ToSql for Did {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for Did {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        fixed_16(value).map(Did)
    }
}

impl ToSql for ContentHash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for ContentHash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_blob().map(|b| ContentHash(b.to_vec()))
    }
}

impl ToSql for ObjectType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_i64()))
    }
}

impl FromSql for ObjectType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        ObjectType::from_i64(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

fn fixed_16(value: ValueRef<'_>) -> FromSqlResult<[u8; 16]> {
    let blob = value.as_blob()?;
    <[u8; 16]>::try_from(blob).map_err(|_| FromSqlError::InvalidBlobSize {
        expected_size: 16,
        blob_size: blob.len(),
    })
}

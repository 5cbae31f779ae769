// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Index keys and their store representation.
//
// An `IndexKey` is an opaque byte string (an author id, a message type, a
// hash). In the persistence store it is rendered as lowercase hex so any
// key is a valid, printable store key.

use std::fmt;

/// The address of one sublog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The key this sublog's bitmap is stored under.
    pub fn storage_key(&self) -> Vec<u8> {
        hex::encode(&self.0).into_bytes()
    }

    /// Parse a key produced by [`IndexKey::storage_key`].
    pub fn from_storage_key(stored: &[u8]) -> Result<Self, hex::FromHexError> {
        hex::decode(stored).map(Self)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&[u8]> for IndexKey {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for IndexKey {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

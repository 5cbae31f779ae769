// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for parsing listed store keys back into index keys

#![no_main]

use libfuzzer_sys::fuzz_target;
use seqlog_multilog::IndexKey;

fuzz_target!(|data: &[u8]| {
    // Keys parsed from the store must render back to the same bytes.
    if let Ok(key) = IndexKey::from_storage_key(data) {
        assert_eq!(key.storage_key(), data.to_ascii_lowercase());
    }

    // Any byte string is a valid index key.
    let key = IndexKey::from(data);
    assert_eq!(IndexKey::from_storage_key(&key.storage_key()).ok(), Some(key));
});

// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for decoding persisted sublog bitmaps

#![no_main]

use libfuzzer_sys::fuzz_target;
use seqlog_multilog::codec;

fuzz_target!(|data: &[u8]| {
    // Arbitrary store bytes must decode or fail cleanly, never panic.
    let Ok((bitmap, encoding)) = codec::decode(data) else {
        return;
    };

    // Whatever decoded must survive a rewrite in either encoding.
    let rewritten = codec::encode(&bitmap, encoding).expect("encode into Vec");
    let (again, _) = codec::decode(&rewritten).expect("re-decode");
    assert_eq!(again, bitmap);
    assert_eq!(rewritten.len(), codec::encoded_len(&bitmap, encoding));
});

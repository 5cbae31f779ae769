// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persisted bitmap encodings.
//
// ## Value Layout
//
// ```text
// +--------+------------------------------------------------------+
// | tag u8 | body                                                 |
// +--------+------------------------------------------------------+
// tag 0x00  plain: roaring portable serialization
// tag 0x01  runs:  [u32 LE run count] then per run
//                  [u32 LE first member][u32 LE last member]
// ```
//
// Runs are ascending, non-overlapping and inclusive at both ends. The runs
// form wins for clustered membership (long stretches of consecutive
// positions); the plain form wins for scattered membership.

use std::io::Cursor;

use roaring::RoaringBitmap;
use thiserror::Error;

const TAG_PLAIN: u8 = 0x00;
const TAG_RUNS: u8 = 0x01;

const RUN_COUNT_LEN: usize = 4;
const RUN_LEN: usize = 8;

/// How a sublog's bitmap is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Plain,
    /// Run-optimized: consecutive members collapse into one run.
    Runs,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty bitmap value")]
    Empty,

    #[error("unknown bitmap encoding tag {0:#04x}")]
    UnknownTag(u8),

    #[error("runs body is {actual} bytes, expected {expected}")]
    Truncated { expected: usize, actual: usize },

    #[error("run {index} is out of order")]
    RunsOutOfOrder { index: usize },

    #[error("roaring serialization: {0}")]
    Roaring(#[from] std::io::Error),
}

/// Approximate in-memory footprint of `bitmap` in bytes.
///
/// Roaring's portable serialization mirrors its container layout, so its
/// size tracks what the bitmap occupies in memory.
pub fn memory_size(bitmap: &RoaringBitmap) -> usize {
    bitmap.serialized_size()
}

/// Exact length of `encode(bitmap, encoding)` without building it.
pub fn encoded_len(bitmap: &RoaringBitmap, encoding: Encoding) -> usize {
    match encoding {
        Encoding::Plain => 1 + bitmap.serialized_size(),
        Encoding::Runs => 1 + RUN_COUNT_LEN + RUN_LEN * runs(bitmap).count(),
    }
}

pub fn encode(bitmap: &RoaringBitmap, encoding: Encoding) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(encoded_len(bitmap, encoding));
    match encoding {
        Encoding::Plain => {
            buf.push(TAG_PLAIN);
            bitmap.serialize_into(&mut buf)?;
        }
        Encoding::Runs => {
            buf.push(TAG_RUNS);
            let count = runs(bitmap).count() as u32;
            buf.extend_from_slice(&count.to_le_bytes());
            for (first, last) in runs(bitmap) {
                buf.extend_from_slice(&first.to_le_bytes());
                buf.extend_from_slice(&last.to_le_bytes());
            }
        }
    }
    Ok(buf)
}

pub fn decode(buf: &[u8]) -> Result<(RoaringBitmap, Encoding), CodecError> {
    let (&tag, body) = buf.split_first().ok_or(CodecError::Empty)?;
    match tag {
        TAG_PLAIN => {
            let bitmap = RoaringBitmap::deserialize_from(Cursor::new(body))?;
            Ok((bitmap, Encoding::Plain))
        }
        TAG_RUNS => Ok((decode_runs(body)?, Encoding::Runs)),
        other => Err(CodecError::UnknownTag(other)),
    }
}

fn decode_runs(body: &[u8]) -> Result<RoaringBitmap, CodecError> {
    let Some((count, runs)) = body.split_first_chunk::<RUN_COUNT_LEN>() else {
        return Err(CodecError::Truncated {
            expected: RUN_COUNT_LEN,
            actual: body.len(),
        });
    };
    let count = u32::from_le_bytes(*count) as usize;

    let expected = RUN_COUNT_LEN + RUN_LEN * count;
    if body.len() != expected {
        return Err(CodecError::Truncated {
            expected,
            actual: body.len(),
        });
    }

    let mut bitmap = RoaringBitmap::new();
    let mut prev_last: Option<u32> = None;
    for (index, chunk) in runs.chunks_exact(RUN_LEN).enumerate() {
        let first = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let last = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        if first > last || prev_last.is_some_and(|p| first <= p) {
            return Err(CodecError::RunsOutOfOrder { index });
        }
        bitmap.insert_range(first..=last);
        prev_last = Some(last);
    }
    Ok(bitmap)
}

/// Maximal runs of consecutive members as inclusive `(first, last)` pairs.
fn runs(bitmap: &RoaringBitmap) -> impl Iterator<Item = (u32, u32)> + '_ {
    let mut members = bitmap.iter().peekable();
    std::iter::from_fn(move || {
        let first = members.next()?;
        let mut last = first;
        // `last < u32::MAX` whenever another member follows.
        while members.next_if(|&m| m == last + 1).is_some() {
            last += 1;
        }
        Some((first, last))
    })
}

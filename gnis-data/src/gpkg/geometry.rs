//! Decoding of GeoPackage geometry blobs.
//!
//! A blob starts with the `GP` magic, a version byte, a flags byte, and a
//! 4-byte SRS id, followed by an optional envelope and a WKB geometry. Only
//! points are decoded; callers keep other geometries as raw bytes.

use geo::Point;

const MAGIC: &[u8; 2] = b"GP";
const HEADER_LEN: usize = 8;
const EMPTY_FLAG: u8 = 0b0001_0000;
const WKB_POINT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Decoded {
    Point(Point<f64>),
    Empty,
    Other,
}

pub(crate) fn decode(blob: &[u8]) -> Decoded {
    let Some(header) = blob.get(..HEADER_LEN) else {
        return Decoded::Other;
    };
    if header.get(..2) != Some(MAGIC.as_slice()) {
        return Decoded::Other;
    }
    let Some(&flags) = header.get(3) else {
        return Decoded::Other;
    };
    let envelope_len = match (flags >> 1) & 0b111 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        _ => return Decoded::Other,
    };
    if flags & EMPTY_FLAG != 0 {
        return Decoded::Empty;
    }
    blob.get(HEADER_LEN + envelope_len..)
        .and_then(decode_wkb_point)
        .unwrap_or(Decoded::Other)
}

fn decode_wkb_point(wkb: &[u8]) -> Option<Decoded> {
    let (&order, body) = wkb.split_first()?;
    let little_endian = match order {
        0 => false,
        1 => true,
        _ => return None,
    };
    let kind = read_u32(body.get(0..4)?, little_endian)?;
    // ISO Z, M, and ZM points (1001, 2001, 3001) still lead with x and y.
    if kind % 1000 != WKB_POINT {
        return None;
    }
    let x = read_f64(body.get(4..12)?, little_endian)?;
    let y = read_f64(body.get(12..20)?, little_endian)?;
    if x.is_nan() && y.is_nan() {
        return Some(Decoded::Empty);
    }
    Some(Decoded::Point(Point::new(x, y)))
}

fn read_u32(bytes: &[u8], little_endian: bool) -> Option<u32> {
    let raw: [u8; 4] = bytes.try_into().ok()?;
    Some(if little_endian {
        u32::from_le_bytes(raw)
    } else {
        u32::from_be_bytes(raw)
    })
}

fn read_f64(bytes: &[u8], little_endian: bool) -> Option<f64> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    Some(if little_endian {
        f64::from_le_bytes(raw)
    } else {
        f64::from_be_bytes(raw)
    })
}

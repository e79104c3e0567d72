//! Encoded-polyline codec (precision 5, the format used by mapping
//! directions APIs for overview polylines).

use thiserror::Error;

use crate::geo::LatLon;

const PRECISION: f64 = 1e5;
const CHUNK_CONTINUE: u32 = 0x20;
const CHUNK_OFFSET: u8 = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolylineError {
    #[error("invalid polyline byte {byte:#04x} at offset {offset}")]
    InvalidByte { byte: u8, offset: usize },
    #[error("polyline ends mid-coordinate at offset {offset}")]
    Truncated { offset: usize },
    #[error("coordinate chunk overflows 64 bits at offset {offset}")]
    Overflow { offset: usize },
}

/// Decode an encoded polyline into an ordered coordinate sequence.
///
/// # Errors
///
/// Returns an error when the input contains bytes outside the encoding
/// alphabet or ends in the middle of a coordinate chunk.
pub fn decode(encoded: &str) -> Result<Vec<LatLon>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut offset = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while offset < bytes.len() {
        let (d_lat, next) = decode_value(bytes, offset)?;
        let (d_lon, after) = decode_value(bytes, next)?;
        lat += d_lat;
        lon += d_lon;
        points.push(LatLon::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
        offset = after;
    }

    Ok(points)
}

/// Encode a coordinate sequence into the polyline wire format.
#[must_use]
pub fn encode(points: &[LatLon]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lon = (point.lon * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

fn decode_value(bytes: &[u8], mut offset: usize) -> Result<(i64, usize), PolylineError> {
    if offset >= bytes.len() {
        return Err(PolylineError::Truncated { offset });
    }

    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let Some(&byte) = bytes.get(offset) else {
            return Err(PolylineError::Truncated { offset });
        };
        if byte < CHUNK_OFFSET {
            return Err(PolylineError::InvalidByte { byte, offset });
        }
        if shift >= 64 {
            return Err(PolylineError::Overflow { offset });
        }
        let chunk = u32::from(byte - CHUNK_OFFSET);
        result |= u64::from(chunk & 0x1F) << shift;
        shift += 5;
        offset += 1;
        if chunk < CHUNK_CONTINUE {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };
    Ok((value, offset))
}

fn encode_value(value: i64, out: &mut String) {
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
    while zigzag >= u64::from(CHUNK_CONTINUE) {
        let chunk = (zigzag & 0x1F) as u8 | CHUNK_CONTINUE as u8;
        out.push(char::from(chunk + CHUNK_OFFSET));
        zigzag >>= 5;
    }
    out.push(char::from(zigzag as u8 + CHUNK_OFFSET));
}

//! Compact encodings for persisted binding records.
//!
//! Triangle ids pack a section and a triangle into one word, barycentrics
//! and UVs pack two half floats, and normals pack three 10-bit unsigned
//! components. The layouts match what GPU-side binding readers decode, so
//! they are part of the persisted format.

use nalgebra::{Vector2, Vector3};

/// Number of sections a packed triangle id can address.
pub const MAX_SECTION_COUNT: usize = 0xFF;

/// Number of triangles per section a packed triangle id can address.
pub const MAX_TRIANGLE_COUNT: usize = 0xFF_FFFF;

/// Number of vertices a packed sample index can address.
pub const MAX_VERTEX_COUNT: usize = 0x100_0000;

/// Packs a section-local triangle index and its section.
///
/// The section occupies the top 8 bits and the triangle the low 24; both
/// are masked, so out-of-range values wrap.
///
/// # Examples
///
/// ```
/// use mesh_binding::{pack_triangle_index, unpack_triangle_index};
///
/// let id = pack_triangle_index(1234, 3);
/// assert_eq!(id, (3 << 24) | 1234);
/// assert_eq!(unpack_triangle_index(id), (1234, 3));
/// ```
#[inline]
#[must_use]
pub const fn pack_triangle_index(triangle: u32, section: u32) -> u32 {
    ((section & 0xFF) << 24) | (triangle & 0xFF_FFFF)
}

/// Splits a packed id into `(triangle, section)`.
#[inline]
#[must_use]
pub const fn unpack_triangle_index(encoded: u32) -> (u32, u32) {
    (encoded & 0xFF_FFFF, (encoded >> 24) & 0xFF)
}

/// Packs the first two barycentric coordinates as half floats, `x` low.
///
/// The third coordinate is implied as `1 - x - y`.
#[inline]
#[must_use]
pub fn pack_barycentrics(barycentrics: &Vector2<f32>) -> u32 {
    pack_half2(barycentrics)
}

/// Inverse of [`pack_barycentrics`].
///
/// # Examples
///
/// ```
/// use mesh_binding::{pack_barycentrics, unpack_barycentrics};
/// use nalgebra::Vector2;
///
/// let packed = pack_barycentrics(&Vector2::new(0.25, 0.5));
/// assert_eq!(unpack_barycentrics(packed), Vector2::new(0.25, 0.5));
/// ```
#[inline]
#[must_use]
pub fn unpack_barycentrics(packed: u32) -> Vector2<f32> {
    unpack_half2(packed)
}

/// Packs a texture coordinate as two half floats, `u` low.
#[inline]
#[must_use]
pub fn pack_uvs(uv: &Vector2<f32>) -> u32 {
    pack_half2(uv)
}

/// [`pack_uvs`] reinterpreted as the bits of an `f32`.
#[inline]
#[must_use]
pub fn pack_uvs_to_float(uv: &Vector2<f32>) -> f32 {
    f32::from_bits(pack_uvs(uv))
}

/// Packs a direction into three 10-bit unsigned components.
///
/// The vector is normalized and remapped from `[-1, 1]` to `[0, 1023]`
/// (truncating); `x` occupies bits 0..10, `y` 10..20 and `z` 20..30.
/// A zero vector packs as the midpoint `(511, 511, 511)`.
///
/// # Examples
///
/// ```
/// use mesh_binding::{pack_normal, unpack_normal};
/// use nalgebra::Vector3;
///
/// let packed = pack_normal(&Vector3::new(0.0, 0.0, 2.0));
/// assert_eq!(packed >> 20, 1023);
///
/// let n = unpack_normal(packed);
/// assert!((n.z - 1.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn pack_normal(normal: &Vector3<f32>) -> u32 {
    let n = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
    let quantize = |c: f32| -> u32 {
        let unit = (c * 0.5 + 0.5).clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let q = (unit * 1023.0) as u32;
        q & 0x3FF
    };
    quantize(n.x) | (quantize(n.y) << 10) | (quantize(n.z) << 20)
}

/// [`pack_normal`] reinterpreted as the bits of an `f32`.
///
/// This is the fourth component stored next to each triangle vertex
/// position.
#[inline]
#[must_use]
pub fn pack_normal_to_float(normal: &Vector3<f32>) -> f32 {
    f32::from_bits(pack_normal(normal))
}

/// Decodes a [`pack_normal`] word back to a direction in `[-1, 1]³`.
///
/// The result is not renormalized.
#[must_use]
pub fn unpack_normal(packed: u32) -> Vector3<f32> {
    #[allow(clippy::cast_possible_truncation)]
    let decode = |shift: u32| f32::from(((packed >> shift) & 0x3FF) as u16) / 1023.0 * 2.0 - 1.0;
    Vector3::new(decode(0), decode(10), decode(20))
}

#[inline]
fn pack_half2(v: &Vector2<f32>) -> u32 {
    u32::from(f32_to_f16_bits(v.x)) | (u32::from(f32_to_f16_bits(v.y)) << 16)
}

#[inline]
fn unpack_half2(packed: u32) -> Vector2<f32> {
    #[allow(clippy::cast_possible_truncation)]
    let (lo, hi) = ((packed & 0xFFFF) as u16, (packed >> 16) as u16);
    Vector2::new(f16_bits_to_f32(lo), f16_bits_to_f32(hi))
}

/// Smallest positive half-float subnormal, `2⁻²⁴`.
const HALF_SUBNORMAL_STEP: f32 = 5.960_464_5e-8;

/// Converts an `f32` to IEEE 754 binary16 bits, rounding to nearest even.
///
/// Values beyond the half range become infinity, values below half the
/// smallest subnormal become signed zero, and NaN stays NaN.
///
/// # Examples
///
/// ```
/// use mesh_binding::{f16_bits_to_f32, f32_to_f16_bits};
///
/// assert_eq!(f32_to_f16_bits(1.0), 0x3C00);
/// assert_eq!(f32_to_f16_bits(-2.0), 0xC000);
/// assert_eq!(f16_bits_to_f32(f32_to_f16_bits(0.1)), 0.099_975_586);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x7F_FFFF;

    if exponent == 0xFF {
        let nan = if mantissa == 0 { 0 } else { 0x200 };
        return sign | 0x7C00 | nan;
    }

    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1F {
        return sign | 0x7C00;
    }

    if half_exponent <= 0 {
        // Subnormal half: shift the full significand into the 10-bit field.
        let shift = (14 - half_exponent) as u32;
        if shift > 24 {
            return sign;
        }
        let significand = mantissa | 0x80_0000;
        let half = round_shift(significand, shift);
        return sign | half as u16;
    }

    let combined = ((half_exponent as u32) << 23) | mantissa;
    // Rounding may carry into the exponent, which is the correct result
    // (up to infinity).
    sign | round_shift(combined, 13) as u16
}

/// `value >> shift`, rounded to nearest with ties to even.
#[inline]
fn round_shift(value: u32, shift: u32) -> u32 {
    let truncated = value >> shift;
    let remainder = value & ((1 << shift) - 1);
    let halfway = 1 << (shift - 1);
    if remainder > halfway || (remainder == halfway && truncated & 1 == 1) {
        truncated + 1
    } else {
        truncated
    }
}

/// Converts IEEE 754 binary16 bits to `f32`. Exact for every input.
#[must_use]
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits & 0x8000) << 16;
    let exponent = u32::from((bits >> 10) & 0x1F);
    let mantissa = u32::from(bits & 0x3FF);

    match exponent {
        0 => {
            let magnitude = f32::from(bits & 0x3FF) * HALF_SUBNORMAL_STEP;
            if sign == 0 { magnitude } else { -magnitude }
        }
        0x1F => f32::from_bits(sign | 0x7F80_0000 | (mantissa << 13)),
        _ => f32::from_bits(sign | ((exponent + 112) << 23) | (mantissa << 13)),
    }
}

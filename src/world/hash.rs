
// xorshift + odd multiplies, each step invertible, so the whole mix is a bijection on u32.
#[inline]
pub fn hash_u32(mut v: u32) -> u32 {
    v ^= v >> 16;
    v = v.wrapping_mul(0x7feb_352d);
    v ^= v >> 15;
    v = v.wrapping_mul(0x846c_a68b);
    v ^= v >> 16;
    v
}

/// Generation seed for the tile at lattice position (x, z).
///
/// Coordinates are packed 16/16 before mixing, so seeds are unique for
/// every tile with `x` and `z` in `i16` range and merely well-spread beyond it.
#[inline]
pub fn tile_seed(x: i32, z: i32) -> i32 {
    let packed = ((x as u32) << 16) | ((z as u32) & 0xffff);
    hash_u32(packed) as i32
}

use crate::models::Position;

/// Rotate `p` about the origin by `deg` degrees using the standard
/// counter-clockwise rotation matrix.
pub fn rotate(p: Position, deg: f64) -> Position {
    let (sin, cos) = deg.to_radians().sin_cos();
    rotate_sc(p, sin, cos)
}

/// Same as [`rotate`] with a precomputed sine and cosine.
pub fn rotate_sc(p: Position, sin: f64, cos: f64) -> Position {
    Position::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos)
}

/// Inverse of [`rotate_sc`] (the transpose of the rotation matrix).
pub fn unrotate_sc(p: Position, sin: f64, cos: f64) -> Position {
    Position::new(p.x * cos + p.y * sin, -p.x * sin + p.y * cos)
}

/// Normalize an angle in degrees into [0, 360).
pub fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

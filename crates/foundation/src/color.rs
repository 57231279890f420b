/// Linear RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit channels.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Channel-wise linear interpolation of r, g and b. Alpha is taken from `self`.
    pub fn lerp_rgb(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a,
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#rrggbbaa` hex string.
    pub fn to_hex(self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            c(self.r),
            c(self.g),
            c(self.b),
            c(self.a)
        )
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::Rgba;

    #[test]
    fn lerp_midpoint_keeps_alpha() {
        let a = Rgba::new(0.0, 0.0, 0.0, 0.5);
        let b = Rgba::new(1.0, 0.5, 0.0, 1.0);
        let m = a.lerp_rgb(b, 0.5);
        assert_eq!(m, Rgba::new(0.5, 0.25, 0.0, 0.5));
    }

    #[test]
    fn hex_round_trips_8bit_channels() {
        assert_eq!(Rgba::from_rgb8(255, 128, 0).to_hex(), "#ff8000ff");
        assert_eq!(Rgba::TRANSPARENT.to_hex(), "#00000000");
    }
}

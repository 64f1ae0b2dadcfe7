//! Tint colors: [`Color`] (RGB baseline) and [`Rgba`] (what a draw binds).

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGB colour packed into a `u32` (0x00RRGGBB).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Self = Self::from_rgb(255, 255, 255);
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);

    /// Construct from individual RGB components.
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Red component.
    #[inline]
    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// Green component.
    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Blue component.
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Scale every channel by `opacity / 255` (premultiplied tinting).
    #[inline]
    pub const fn premultiplied(self, opacity: u8) -> Self {
        Self::from_rgb(
            scale_channel(self.r(), opacity),
            scale_channel(self.g(), opacity),
            scale_channel(self.b(), opacity),
        )
    }

    /// Attach an alpha channel.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Rgba {
        Rgba {
            r: self.r(),
            g: self.g(),
            b: self.b(),
            a,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[inline]
const fn scale_channel(c: u8, opacity: u8) -> u8 {
    // rounds to nearest so that 255 * 128 / 255 stays 128
    ((c as u32 * opacity as u32 + 127) / 255) as u8
}

// ---------------------------------------------------------------------------
// Rgba
// ---------------------------------------------------------------------------

/// An 8-bit RGBA color, the per-draw modulation bound with the blend state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const OPAQUE_WHITE: Self = Color::WHITE.with_alpha(255);

    /// Channels normalized to `[0, 1]`.
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

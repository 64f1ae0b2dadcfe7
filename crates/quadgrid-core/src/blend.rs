//! Source/destination blend factors applied when a batch is drawn.

use std::fmt;

/// A framebuffer blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

impl BlendFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::SrcColor => "src-color",
            Self::OneMinusSrcColor => "one-minus-src-color",
            Self::SrcAlpha => "src-alpha",
            Self::OneMinusSrcAlpha => "one-minus-src-alpha",
            Self::DstColor => "dst-color",
            Self::OneMinusDstColor => "one-minus-dst-color",
            Self::DstAlpha => "dst-alpha",
            Self::OneMinusDstAlpha => "one-minus-dst-alpha",
        }
    }
}

impl fmt::Display for BlendFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pair of factors combining a drawn color with the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendFunc {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFunc {
    /// Blending for textures whose color is already multiplied by alpha.
    pub const PREMULTIPLIED: Self = Self::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);
    /// Blending for straight-alpha textures.
    pub const STRAIGHT_ALPHA: Self =
        Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    pub const ADDITIVE: Self = Self::new(BlendFactor::SrcAlpha, BlendFactor::One);
    /// Overwrite the framebuffer.
    pub const REPLACE: Self = Self::new(BlendFactor::One, BlendFactor::Zero);

    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }

    /// The function a node picks for a texture with the given alpha layout.
    pub const fn for_texture(premultiplied_alpha: bool) -> Self {
        if premultiplied_alpha {
            Self::PREMULTIPLIED
        } else {
            Self::STRAIGHT_ALPHA
        }
    }
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::PREMULTIPLIED
    }
}

impl fmt::Display for BlendFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.src, self.dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_alpha_picks_function() {
        assert_eq!(BlendFunc::for_texture(true), BlendFunc::PREMULTIPLIED);
        assert_eq!(BlendFunc::for_texture(false), BlendFunc::STRAIGHT_ALPHA);
        assert_eq!(BlendFunc::default(), BlendFunc::PREMULTIPLIED);
    }

    #[test]
    fn display() {
        assert_eq!(BlendFunc::ADDITIVE.to_string(), "src-alpha/one");
    }
}

/// An sRGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parse `#rgb` or `#rrggbb` (the `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize, width: usize| -> Option<f32> {
            let digits = hex.get(i * width..(i + 1) * width)?;
            let value = u8::from_str_radix(digits, 16).ok()?;
            let value = if width == 1 { value * 17 } else { value };
            Some(value as f32 / 255.0)
        };
        let width = match hex.len() {
            3 => 1,
            6 => 2,
            _ => return None,
        };
        Some(Self {
            r: channel(0, width)?,
            g: channel(1, width)?,
            b: channel(2, width)?,
        })
    }

    /// Convert to linear RGB, as glTF material factors expect.
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        ((c * 0.9478672986 + 0.0521327014).powf(2.4)).min(1.0)
    }
}

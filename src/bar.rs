use crate::config::BarStyle;

/// Renders a fraction as a fixed width run of glyphs.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    style: BarStyle,
}

impl ProgressBar {
    pub fn new(style: BarStyle) -> Self {
        Self { style }
    }

    pub fn length(&self) -> usize {
        self.style.length
    }

    pub fn format(&self, fraction: f64) -> String {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let length = self.style.length;
        let filled = ((fraction * length as f64) as usize).min(length);

        let mut out = String::with_capacity(length);
        out.extend(std::iter::repeat(self.style.complete).take(filled));
        out.extend(std::iter::repeat(self.style.incomplete).take(length - filled));
        out
    }
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new(BarStyle::default())
    }
}

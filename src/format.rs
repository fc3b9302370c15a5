//! Human readable strings for [`TransferStats`](crate::TransferStats) fields.
//!
//! All outputs are fixed width so a status line does not jitter as the
//! numbers change.

use crate::bar::ProgressBar;

const STORAGE_UNITS: [&str; 9] = [
    " B  ", " KiB", " MiB", " GiB", " TiB", " PiB", " EiB", " ZiB", " YiB",
];
const SPEED_UNITS: [&str; 9] = [
    " B/s", " K/s", " M/s", " G/s", " T/s", " P/s", " E/s", " Z/s", " Y/s",
];

fn scale(value: u64, units: &[&str; 9], base: f64, decimals: usize) -> String {
    let width = if decimals == 0 { 4 } else { 5 + decimals };
    let mut n = value as f64;
    if n < base {
        return format!("{:>width$}{}", value, units[0], width = width);
    }

    for unit in &units[1..] {
        n /= base;
        if n < base {
            return format!(
                "{:>width$.prec$}{}",
                n,
                unit,
                width = width,
                prec = decimals
            );
        }
    }
    format!(">={}{}", base as u64, units[units.len() - 1])
}

/// Byte count on the binary ladder (1 KiB = 1024 B).
pub fn storage(bytes: u64, decimals: usize) -> String {
    scale(bytes, &STORAGE_UNITS, 1024.0, decimals)
}

/// Bytes per second on the decimal ladder (1 K/s = 1000 B/s).
pub fn speed(bytes_per_sec: u64, decimals: usize) -> String {
    scale(bytes_per_sec, &SPEED_UNITS, 1000.0, decimals)
}

/// `MM:SS`, or a placeholder when unknown or too long to be worth showing.
pub fn time(seconds: Option<u64>) -> String {
    match seconds {
        None => "--:--".to_string(),
        Some(s) if s >= 86_400 => " > 1d".to_string(),
        Some(s) if s >= 3_600 => " > 1h".to_string(),
        Some(s) => format!("{:02}:{:02}", s / 60, s % 60),
    }
}

pub fn percentage(fraction: f64) -> String {
    let pct = format!("{}%", (fraction * 100.0).round() as i64);
    format!("{:>4}", pct)
}

/// The formatting surface handed to render callbacks.
#[derive(Debug, Clone)]
pub struct Formatter {
    bar: ProgressBar,
    decimals: usize,
}

impl Formatter {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar, decimals: 1 }
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn storage(&self, bytes: u64) -> String {
        storage(bytes, self.decimals)
    }

    pub fn speed(&self, bytes_per_sec: u64) -> String {
        speed(bytes_per_sec, self.decimals)
    }

    pub fn time(&self, seconds: Option<u64>) -> String {
        time(seconds)
    }

    pub fn percentage(&self, fraction: f64) -> String {
        percentage(fraction)
    }

    pub fn progress_bar(&self, fraction: f64) -> String {
        self.bar.format(fraction)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(ProgressBar::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_unit_boundary() {
        assert_eq!(storage(1023, 1), "  1023 B  ");
        assert_eq!(storage(1024, 1), "   1.0 KiB");
        assert_eq!(storage(1536, 2), "   1.50 KiB");
        assert_eq!(storage(5 * 1024 * 1024, 1), "   5.0 MiB");
    }

    #[test]
    fn storage_without_decimals() {
        assert_eq!(storage(12, 0), "  12 B  ");
        assert_eq!(storage(3 * 1024, 0), "   3 KiB");
    }

    #[test]
    fn storage_handles_u64_max() {
        assert_eq!(storage(u64::MAX, 1), "  16.0 EiB");
    }

    #[test]
    fn speed_uses_powers_of_1000() {
        assert_eq!(speed(999, 1), "   999 B/s");
        assert_eq!(speed(1000, 1), "   1.0 K/s");
        assert_eq!(speed(2_500_000, 1), "   2.5 M/s");
    }

    #[test]
    fn time_placeholders_and_clock() {
        assert_eq!(time(None), "--:--");
        assert_eq!(time(Some(0)), "00:00");
        assert_eq!(time(Some(65)), "01:05");
        assert_eq!(time(Some(3_599)), "59:59");
        assert_eq!(time(Some(3_600)), " > 1h");
        assert_eq!(time(Some(86_400)), " > 1d");
    }

    #[test]
    fn percentage_rounds() {
        assert_eq!(percentage(0.999), "100%");
        assert_eq!(percentage(0.994), " 99%");
        assert_eq!(percentage(0.05), "  5%");
        assert_eq!(percentage(0.0), "  0%");
        assert_eq!(percentage(1.0), "100%");
    }

    #[test]
    fn formatter_defaults_to_one_decimal() {
        let f = Formatter::default();
        assert_eq!(f.storage(2048), "   2.0 KiB");
        assert_eq!(f.with_decimals(0).storage(2048), "   2 KiB");
    }
}

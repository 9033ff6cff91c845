//! Register template loader
//!
//! One register per line, `<address> <value>`; the value may be binary
//! (`0b0010_0001`), hex (`0x21`) or decimal. `#` starts a comment.
//!
//! ```text
//! # software reset off, ramp control idle
//! 2   0b00000000
//! 58  0b00100000
//! 16  0x3C        # PLL_N[7:0]
//! ```

use super::image::RegisterImage;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load a template file into a fresh image
pub fn load_template<P: AsRef<Path>>(path: P) -> Result<RegisterImage> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Template(format!("{}: {}", path.display(), e)))?;
    let image = parse_template(&text)
        .map_err(|e| Error::Template(format!("{}: {}", path.display(), e)))?;
    log::info!("Loaded register template {}", path.display());
    Ok(image)
}

/// Parse template text; registers not listed stay zero
pub fn parse_template(text: &str) -> std::result::Result<RegisterImage, String> {
    let mut image = RegisterImage::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(address), Some(value), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("line {}: expected `<register> <value>`", number + 1));
        };

        let address: usize = address
            .parse()
            .map_err(|_| format!("line {}: bad register `{}`", number + 1, address))?;
        let value = parse_value(value)
            .ok_or_else(|| format!("line {}: bad value `{}`", number + 1, value))?;

        image
            .set(address, value)
            .map_err(|e| format!("line {}: {}", number + 1, e))?;
    }

    Ok(image)
}

fn parse_value(text: &str) -> Option<u8> {
    let text = text.replace('_', "");
    if let Some(bin) = text.strip_prefix("0b") {
        u8::from_str_radix(bin, 2).ok()
    } else if let Some(hex) = text.strip_prefix("0x") {
        u8::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

//! Deterministic avatar images
//!
//! A seed string hashes to a face layout (wrapper shape, colours, eyes and
//! mouth) rendered as a small SVG. The same seed always yields the same image,
//! so every peer draws everyone else identically without sending pixels.

use std::fmt::Write;

/// Viewbox edge length
const SIZE: f32 = 36.0;

/// Palette as (hex, rgb)
const PALETTE: [(&str, [u8; 3]); 5] = [
    ("#F04155", [0xF0, 0x41, 0x55]),
    ("#FF823A", [0xFF, 0x82, 0x3A]),
    ("#F2F26F", [0xF2, 0xF2, 0x6F]),
    ("#FFF7BD", [0xFF, 0xF7, 0xBD]),
    ("#95CFB7", [0x95, 0xCF, 0xB7]),
];

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];

/// 31-multiplier string hash over UTF-16 code units, absolute value
pub fn hash_seed(seed: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in seed.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}

fn digit(n: u32, place: u32) -> u32 {
    (n / 10u32.pow(place)) % 10
}

fn boolean(n: u32, place: u32) -> bool {
    digit(n, place) % 2 == 0
}

/// `n % range`, negated when the digit at `place` is even (place 0 never negates)
fn unit(n: u32, range: u32, place: u32) -> f32 {
    let value = (n % range) as f32;
    if place != 0 && digit(n, place) % 2 == 0 {
        -value
    } else {
        value
    }
}

fn palette(n: u32) -> (&'static str, [u8; 3]) {
    PALETTE[(n as usize) % PALETTE.len()]
}

/// Black or white, whichever reads better on `rgb`
fn contrast(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(u32::from);
    let yiq = (r * 299 + g * 587 + b * 114) / 1000;
    if yiq >= 128 { BLACK } else { WHITE }
}

fn css(rgb: [u8; 3]) -> String {
    format!("rgb({},{},{})", rgb[0], rgb[1], rgb[2])
}

#[derive(Debug, Clone, PartialEq)]
struct Face {
    wrapper: [u8; 3],
    face: [u8; 3],
    background: [u8; 3],
    wrapper_translate: (f32, f32),
    wrapper_rotate: f32,
    wrapper_scale: f32,
    mouth_open: bool,
    circle: bool,
    eye_spread: f32,
    mouth_spread: f32,
    face_rotate: f32,
    face_translate: (f32, f32),
}

impl Face {
    fn from_seed(seed: &str) -> Self {
        let n = hash_seed(seed);
        let (_, wrapper) = palette(n);

        let nudge = |v: f32| if v < 5.0 { v + SIZE / 9.0 } else { v };
        let wx = nudge(unit(n, 10, 1));
        let wy = nudge(unit(n, 10, 2));

        Self {
            wrapper,
            face: contrast(wrapper),
            background: palette(n.wrapping_add(13)).1,
            wrapper_translate: (wx, wy),
            wrapper_rotate: unit(n, 360, 0),
            wrapper_scale: 1.0 + unit(n, (SIZE / 12.0) as u32, 0) / 10.0,
            mouth_open: boolean(n, 2),
            circle: boolean(n, 1),
            eye_spread: unit(n, 5, 0),
            mouth_spread: unit(n, 3, 0),
            face_rotate: unit(n, 10, 3),
            face_translate: (
                if wx > SIZE / 6.0 { wx / 2.0 } else { unit(n, 8, 1) },
                if wy > SIZE / 6.0 { wy / 2.0 } else { unit(n, 7, 2) },
            ),
        }
    }
}

/// Render the avatar for `seed` as an SVG document `size` pixels square
pub fn generate(seed: &str, size: u32) -> String {
    let f = Face::from_seed(seed);
    let half = SIZE / 2.0;
    let face = css(f.face);
    let mut svg = String::new();

    // Writing into a String cannot fail
    let _ = write!(
        svg,
        r#"<svg viewBox="0 0 {s} {s}" fill="none" xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}"><g>"#,
        s = SIZE,
    );
    let _ = write!(
        svg,
        r#"<rect width="{s}" height="{s}" rx="{half}" fill="{bg}"/>"#,
        s = SIZE,
        bg = css(f.background),
    );
    let _ = write!(
        svg,
        r#"<rect x="0" y="0" width="{s}" height="{s}" transform="translate({tx} {ty}) rotate({rot} {half} {half}) scale({scale})" fill="{fill}" rx="{rx}"/>"#,
        s = SIZE,
        tx = f.wrapper_translate.0,
        ty = f.wrapper_translate.1,
        rot = f.wrapper_rotate,
        scale = f.wrapper_scale,
        fill = css(f.wrapper),
        rx = if f.circle { SIZE } else { SIZE / 6.0 },
    );
    let _ = write!(
        svg,
        r#"<g transform="translate({tx} {ty}) rotate({rot} {half} {half})">"#,
        tx = f.face_translate.0,
        ty = f.face_translate.1,
        rot = f.face_rotate,
    );
    let mouth_y = 19.0 + f.mouth_spread;
    if f.mouth_open {
        let _ = write!(
            svg,
            r#"<path d="M15 {mouth_y} c2 1 4 1 6 0" stroke="{face}" fill="none" stroke-linecap="round"/>"#,
        );
    } else {
        let _ = write!(
            svg,
            r#"<path d="M13,{mouth_y} a1,0.75 0 0,0 10,0" fill="{face}"/>"#,
        );
    }
    for x in [14.0 - f.eye_spread, 20.0 + f.eye_spread] {
        let _ = write!(
            svg,
            r#"<rect x="{x}" y="14" width="1.5" height="2" rx="1" stroke="none" fill="{face}"/>"#,
        );
    }
    svg.push_str("</g></g></svg>");
    svg
}

/// The SVG wrapped as a `data:` URL, usable as an image source
pub fn data_url(seed: &str, size: u32) -> String {
    format!("data:image/svg+xml;utf8,{}", generate(seed, size))
}

/// Dominant colour of the avatar, for hosts that draw plain circles
pub fn base_color(seed: &str) -> &'static str {
    palette(hash_seed(seed)).0
}

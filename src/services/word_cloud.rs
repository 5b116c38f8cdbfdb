//! Phrase cloud layout. Each complete response is one phrase (no tokenisation), shown in
//! upper case and sized by frequency. Positions and rotations come from a fixed-seed PRNG so
//! identical input always yields the same picture.

use palette::{Clamp, FromColor, Mix, Oklab, Srgb};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::services::aggregation::{frequency_table, rank};

/// Maximum number of phrases laid out.
pub const MAX_PHRASES: usize = 20;
const LAYOUT_SEED: u64 = 42;

/// Viridis anchor stops, evenly spaced over `[0, 1]`.
const VIRIDIS: [(u8, u8, u8); 5] = [
    (0x44, 0x01, 0x54),
    (0x3b, 0x52, 0x8b),
    (0x21, 0x91, 0x8c),
    (0x5e, 0xc9, 0x62),
    (0xfd, 0xe7, 0x25),
];

/// Phrase rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Horizontal,
    Vertical,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Horizontal => 0,
            Rotation::Vertical => 90,
        }
    }
}

/// One phrase with everything a frontend needs to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPhrase {
    pub text: String,
    pub count: usize,
    pub font_size: u32,
    /// Horizontal centre in `[0, 1)`.
    pub x: f64,
    /// Vertical centre in `[0, 1)`.
    pub y: f64,
    pub rotation: Rotation,
    /// `#rrggbb` colour sampled from the viridis scale.
    pub color: String,
}

/// Laid-out phrase cloud, most frequent phrase first.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseCloud {
    pub phrases: Vec<PlacedPhrase>,
}

/// Build the phrase cloud for `responses`, or `None` when no phrase qualifies.
pub fn build<S: AsRef<str>>(responses: &[S]) -> Option<PhraseCloud> {
    let phrases: Vec<String> = responses
        .iter()
        .map(|response| response.as_ref().trim().to_uppercase())
        .filter(|phrase| !phrase.is_empty())
        .collect();

    let mut ranked = rank(frequency_table(&phrases));
    ranked.truncate(MAX_PHRASES);
    if ranked.is_empty() {
        return None;
    }

    let mut position_rng = StdRng::seed_from_u64(LAYOUT_SEED);
    let positions: Vec<(f64, f64)> = ranked
        .iter()
        .map(|_| (position_rng.random::<f64>(), position_rng.random::<f64>()))
        .collect();

    let mut rotation_rng = StdRng::seed_from_u64(LAYOUT_SEED);
    let colors = viridis_samples(ranked.len());

    let phrases = ranked
        .into_iter()
        .zip(positions)
        .zip(colors)
        .map(|((entry, (x, y)), color)| PlacedPhrase {
            font_size: font_size(entry.count),
            text: entry.response,
            count: entry.count,
            x,
            y,
            rotation: if rotation_rng.random_bool(0.5) {
                Rotation::Vertical
            } else {
                Rotation::Horizontal
            },
            color,
        })
        .collect();

    Some(PhraseCloud { phrases })
}

/// Font size for a phrase seen `count` times. Small phrases get +4, larger ones +8.
pub fn font_size(count: usize) -> u32 {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let base = count.saturating_mul(5).saturating_add(20);
    if base <= 25 {
        (base + 4).min(54)
    } else {
        base.saturating_add(8).min(58)
    }
}

/// Sample the viridis scale at `n` evenly spaced points, first point at the dark end.
pub fn viridis_samples(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = if n > 1 {
                i as f32 / (n - 1) as f32
            } else {
                0.0
            };
            rgb_hex(viridis(t))
        })
        .collect()
}

/// Interpolate the viridis anchors in Oklab at `t ∈ [0, 1]`.
fn viridis(t: f32) -> Srgb {
    let t = t.clamp(0.0, 1.0);
    let segments = VIRIDIS.len() - 1;
    #[allow(clippy::cast_precision_loss)]
    let scaled = t * segments as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = scaled.floor() as usize;
    if index >= segments {
        return anchor(segments);
    }
    #[allow(clippy::cast_precision_loss)]
    let local = scaled - index as f32;
    if local <= 0.0 {
        return anchor(index);
    }

    let from = Oklab::from_color(anchor(index));
    let to = Oklab::from_color(anchor(index + 1));
    Srgb::from_color(from.mix(to, local)).clamp()
}

/// Anchor stops are returned untouched so both ends of the scale stay exact.
fn anchor(index: usize) -> Srgb {
    let (r, g, b) = VIRIDIS[index];
    Srgb::new(r, g, b).into_format()
}

#[inline]
fn rgb_hex(c: Srgb) -> String {
    let c: Srgb<u8> = c.into_format();
    format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue)
}

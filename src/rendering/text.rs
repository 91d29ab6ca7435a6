//! Text layout: character-to-glyph mapping and per-glyph placement.

use log::trace;
use rustc_hash::FxHashMap;

use super::font::FontHandle;
use crate::core::matrix::Matrix;
use crate::core::model::{GlyphOverride, TextObject};

/// Expand a delta list, keeping at most `limit` entries.
///
/// Plain numbers are single deltas; `g N v` repeats `v` N times. A token that
/// is not a number is skipped, and a truncated `g` group expands to nothing.
/// Repeat counts are cut at `limit`, so a huge `N` costs nothing.
pub fn parse_delta(text: &str, limit: usize) -> Vec<f64> {
    let mut deltas = Vec::new();
    let mut tokens = text.split_whitespace();

    while deltas.len() < limit {
        let Some(token) = tokens.next() else {
            break;
        };
        if token == "g" {
            let count = tokens.next().and_then(|t| t.parse::<f64>().ok());
            let value = tokens.next().and_then(|t| t.parse::<f64>().ok());
            match (count, value) {
                (Some(count), Some(value)) if count.is_finite() && count >= 1.0 && value.is_finite() => {
                    let room = limit - deltas.len();
                    let count = if count >= room as f64 { room } else { count as usize };
                    deltas.extend(std::iter::repeat_n(value, count));
                }
                _ => trace!("Ignoring incomplete delta group in '{}'", text),
            }
            continue;
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => deltas.push(value),
            _ => trace!("Skipping delta token '{}'", token),
        }
    }
    deltas
}

/// Delta applied before glyph slot `slot + 1`: the listed value, else the
/// last listed value, else nothing.
fn delta_at(deltas: &[f64], slot: usize) -> f64 {
    deltas.get(slot).or(deltas.last()).copied().unwrap_or(0.0)
}

/// A glyph ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub glyph_id: u16,
    /// Maps font units (y-up) to device space
    pub transform: Matrix,
    /// Index of the text code this glyph belongs to
    pub code_index: usize,
}

/// Maps a text object's codes to placed glyphs.
pub struct TextShaper<'a> {
    text: &'a TextObject,
    font: &'a FontHandle,
}

impl<'a> TextShaper<'a> {
    /// Create a shaper for one text object in a resolved font.
    pub fn new(text: &'a TextObject, font: &'a FontHandle) -> Self {
        TextShaper { text, font }
    }

    /// Glyph-to-device transform for a glyph origin at `(x, y)` in the
    /// object's local space, where `base` maps local space to device space.
    pub fn glyph_matrix(&self, x: f64, y: f64, base: &Matrix) -> Matrix {
        let upem = f64::from(self.font.program.units_per_em().max(1));
        let hscale = self.text.hscale.unwrap_or(1.0);
        let size = self.text.size;

        Matrix::flip_y()
            .then(&Matrix::scale(hscale, 1.0))
            .then(&Matrix::scale(1.0 / upem, 1.0 / upem))
            .then(&Matrix::scale(size, size))
            .then(&Matrix::translate(x, y))
            .then(base)
    }

    fn overrides(&self) -> FxHashMap<usize, &'a GlyphOverride> {
        let mut map = FxHashMap::default();
        if self.font.substituted {
            if !self.text.glyph_overrides.is_empty() {
                trace!("Ignoring glyph overrides for substituted font");
            }
            return map;
        }
        // later declarations replace earlier ones at the same position
        for ov in &self.text.glyph_overrides {
            map.insert(ov.code_position.unwrap_or(0), ov);
        }
        map
    }

    /// Lay out every glyph of the text object.
    ///
    /// Characters missing from the font take a position but emit nothing.
    pub fn shape(&self, base: &Matrix) -> Vec<PlacedGlyph> {
        let overrides = self.overrides();
        let mut glyphs = Vec::new();

        // running character offset across all codes
        let mut offset = 0usize;
        let mut covered_until = 0usize;
        let (mut x, mut y) = (0.0, 0.0);

        for (code_index, code) in self.text.codes.iter().enumerate() {
            x = code.x.unwrap_or(x);
            y = code.y.unwrap_or(y);
            let mut slots: Vec<Option<u16>> = Vec::new();
            for ch in code.content.chars().filter(|c| *c != '\n' && *c != '\r') {
                let position = offset;
                offset += 1;
                if position < covered_until {
                    continue;
                }
                match overrides.get(&position) {
                    Some(ov) => {
                        covered_until = position + ov.code_count.max(1);
                        let count = ov.glyph_count.unwrap_or(ov.glyphs.len());
                        slots.extend(ov.glyphs.iter().take(count).map(|g| Some(*g)));
                    }
                    None => {
                        let glyph = self.font.program.glyph_index(ch);
                        if glyph.is_none() {
                            trace!("No glyph for {:?}", ch);
                        }
                        slots.push(glyph);
                    }
                }
            }

            // one delta sits between each pair of neighbouring slots
            let gaps = slots.len().saturating_sub(1);
            let delta_x = code
                .delta_x
                .as_deref()
                .map(|d| parse_delta(d, gaps))
                .unwrap_or_default();
            let delta_y = code
                .delta_y
                .as_deref()
                .map(|d| parse_delta(d, gaps))
                .unwrap_or_default();

            let (mut gx, mut gy) = (x, y);
            for (slot, glyph) in slots.into_iter().enumerate() {
                if slot > 0 {
                    gx += delta_at(&delta_x, slot - 1);
                    gy += delta_at(&delta_y, slot - 1);
                }
                if let Some(glyph_id) = glyph {
                    glyphs.push(PlacedGlyph {
                        glyph_id,
                        transform: self.glyph_matrix(gx, gy, base),
                        code_index,
                    });
                }
            }
        }
        glyphs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::model::{GraphicUnit, TextCode};
    use crate::rendering::font::FontProgram;
    use crate::rendering::path::Path;

    #[derive(Debug)]
    struct LatinFont;

    impl FontProgram for LatinFont {
        fn units_per_em(&self) -> u16 {
            1000
        }

        fn glyph_index(&self, ch: char) -> Option<u16> {
            ch.is_ascii().then(|| ch as u16)
        }

        fn outline(&self, _glyph: u16) -> Option<Path> {
            None
        }
    }

    fn handle(substituted: bool) -> FontHandle {
        FontHandle {
            program: Arc::new(LatinFont),
            substituted,
        }
    }

    fn text(codes: Vec<TextCode>) -> TextObject {
        let mut text = TextObject::new(GraphicUnit::default(), "1", 5.0);
        text.codes = codes;
        text
    }

    fn origins(glyphs: &[PlacedGlyph]) -> Vec<(f64, f64)> {
        glyphs.iter().map(|g| (g.transform.e, g.transform.f)).collect()
    }

    #[test]
    fn test_parse_delta() {
        assert_eq!(parse_delta("g 3 1.5 2.0", 10), vec![1.5, 1.5, 1.5, 2.0]);
        assert_eq!(parse_delta("1 x 2", 10), vec![1.0, 2.0]);
        assert_eq!(parse_delta("1 g 2", 10), vec![1.0]);
        assert!(parse_delta("", 10).is_empty());
    }

    #[test]
    fn test_parse_delta_respects_limit() {
        assert_eq!(parse_delta("g 1e19 1", 4), vec![1.0; 4]);
        assert_eq!(parse_delta("g 100000000000 2 5", 2), vec![2.0, 2.0]);
        assert_eq!(parse_delta("1 2 g 3 4", 3), vec![1.0, 2.0, 4.0]);
        assert!(parse_delta("g 1e300 1", 0).is_empty());
    }

    #[test]
    fn test_huge_delta_group_places_every_glyph() {
        let mut code = TextCode::at(0.0, 0.0, "ABC");
        code.delta_x = Some("g 1e19 2".into());
        let text = text(vec![code]);
        let font = handle(false);
        let glyphs = TextShaper::new(&text, &font).shape(&Matrix::identity());
        assert_eq!(origins(&glyphs), vec![(0.0, 0.0), (2.0, 0.0), (4.0, 0.0)]);
    }

    #[test]
    fn test_delta_reuses_last() {
        let deltas = [1.0, 2.0];
        assert_eq!(delta_at(&deltas, 0), 1.0);
        assert_eq!(delta_at(&deltas, 5), 2.0);
        assert_eq!(delta_at(&[], 3), 0.0);
    }

    #[test]
    fn test_positions_with_delta() {
        let mut code = TextCode::at(10.0, 20.0, "ABC");
        code.delta_x = Some("3".into());
        let text = text(vec![code]);
        let font = handle(false);
        let glyphs = TextShaper::new(&text, &font).shape(&Matrix::identity());

        assert_eq!(glyphs.len(), 3);
        assert_eq!(origins(&glyphs), vec![(10.0, 20.0), (13.0, 20.0), (16.0, 20.0)]);
        assert_eq!(glyphs[1].glyph_id, 'B' as u16);
    }

    #[test]
    fn test_glyph_matrix_scales_and_flips() {
        let text = text(vec![TextCode::at(0.0, 0.0, "A")]);
        let font = handle(false);
        let shaper = TextShaper::new(&text, &font);
        let m = shaper.glyph_matrix(2.0, 3.0, &Matrix::translate(100.0, 0.0));
        // one em up in font space is `size` units up (negative y) on the page
        assert_eq!(m.transform_point(0.0, 1000.0), (102.0, -2.0));
        assert_eq!(m.transform_point(1000.0, 0.0), (107.0, 3.0));
    }

    #[test]
    fn test_position_inherits_from_previous_code() {
        let codes = vec![
            TextCode::at(5.0, 7.0, "A"),
            TextCode {
                x: Some(9.0),
                ..TextCode::at(0.0, 0.0, "B")
            },
        ];
        let mut text = text(codes);
        text.codes[1].y = None;
        let font = handle(false);
        let glyphs = TextShaper::new(&text, &font).shape(&Matrix::identity());
        assert_eq!(origins(&glyphs), vec![(5.0, 7.0), (9.0, 7.0)]);
        assert_eq!(glyphs[1].code_index, 1);
    }

    #[test]
    fn test_newlines_removed_and_missing_glyph_advances() {
        let mut code = TextCode::at(0.0, 0.0, "A\n\u{4e2d}B");
        code.delta_x = Some("2".into());
        let text = text(vec![code]);
        let font = handle(false);
        let glyphs = TextShaper::new(&text, &font).shape(&Matrix::identity());
        // the CJK character has no glyph but still takes a slot
        assert_eq!(glyphs.len(), 2);
        assert_eq!(origins(&glyphs), vec![(0.0, 0.0), (4.0, 0.0)]);
    }

    #[test]
    fn test_last_override_wins() {
        let mut text = text(vec![TextCode::at(0.0, 0.0, "abcdefgh")]);
        text.glyph_overrides = vec![
            GlyphOverride {
                code_position: Some(5),
                code_count: 1,
                glyph_count: None,
                glyphs: vec![900],
            },
            GlyphOverride {
                code_position: Some(5),
                code_count: 2,
                glyph_count: Some(1),
                glyphs: vec![901, 902],
            },
        ];
        let font = handle(false);
        let ids: Vec<u16> = TextShaper::new(&text, &font)
            .shape(&Matrix::identity())
            .iter()
            .map(|g| g.glyph_id)
            .collect();
        // 'f' and 'g' are replaced by a single glyph
        assert_eq!(ids, vec![97, 98, 99, 100, 101, 901, 104]);
    }

    #[test]
    fn test_override_spans_codes() {
        let mut text = text(vec![TextCode::at(0.0, 0.0, "ab"), TextCode::at(0.0, 10.0, "cd")]);
        text.glyph_overrides = vec![GlyphOverride {
            code_position: Some(1),
            code_count: 2,
            glyph_count: None,
            glyphs: vec![7],
        }];
        let font = handle(false);
        let ids: Vec<u16> = TextShaper::new(&text, &font)
            .shape(&Matrix::identity())
            .iter()
            .map(|g| g.glyph_id)
            .collect();
        assert_eq!(ids, vec![97, 7, 100]);
    }

    #[test]
    fn test_substituted_font_ignores_overrides() {
        let mut text = text(vec![TextCode::at(0.0, 0.0, "ab")]);
        text.glyph_overrides = vec![GlyphOverride {
            code_position: Some(0),
            code_count: 1,
            glyph_count: None,
            glyphs: vec![500],
        }];
        let font = handle(true);
        let ids: Vec<u16> = TextShaper::new(&text, &font)
            .shape(&Matrix::identity())
            .iter()
            .map(|g| g.glyph_id)
            .collect();
        assert_eq!(ids, vec![97, 98]);
    }
}

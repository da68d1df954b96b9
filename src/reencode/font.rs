use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use ttf_parser::{Face, name_id};
use usvg::fontdb;

/// System families tried, in order, when no font file is configured.
/// Covers CJK, Cyrillic and Arabic before the generic sans-serif.
const FALLBACK_FAMILIES: &[&str] = &[
    "Noto Sans CJK SC",
    "Noto Sans SC",
    "Source Han Sans SC",
    "WenQuanYi Zen Hei",
    "WenQuanYi Micro Hei",
    "Droid Sans Fallback",
    "Hiragino Sans",
    "PingFang SC",
    "Microsoft YaHei",
    "Malgun Gothic",
    "Arial Unicode MS",
    "Noto Sans",
    "Noto Sans Arabic",
    "DejaVu Sans",
    "Arial",
    "sans-serif",
];

/// Glyph metrics of a font file used both for measuring and for embedding in PDFs.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
    face_index: u32,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("units_per_em", &self.units_per_em)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    /// Whether the face has a glyph for every visible character of `text`.
    pub fn covers(&self, text: &str) -> bool {
        self.missing_glyphs(text) == 0
    }

    fn missing_glyphs(&self, text: &str) -> usize {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return usize::MAX;
        };
        text.chars()
            .filter(|ch| !ch.is_whitespace() && !ch.is_control())
            .filter(|ch| face.glyph_index(*ch).is_none())
            .count()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Advance width of `text` in points at `font_size`.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return estimate_text_width_units(text) * font_size;
        };
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph_advance = if ch == ' ' {
                self.space_advance
            } else {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .unwrap_or(self.space_advance)
            };
            advance = advance.saturating_add(glyph_advance as u32);
        }
        advance as f32 * (font_size / self.units_per_em.max(1) as f32)
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Font for a PDF export of `text`.
///
/// A configured `font_path` always wins. Otherwise text that builtin Helvetica can show
/// needs no font, and anything else gets the system font that covers the most of it.
/// `None` leaves the caller on Helvetica.
pub fn resolve_export_font(text: &str, font_path: Option<&Path>) -> Result<Option<FontMetrics>> {
    if let Some(path) = font_path {
        return load_font_metrics(path).map(Some);
    }
    if text.chars().all(|ch| (ch as u32) <= 0xFF) {
        return Ok(None);
    }
    let resolved = resolve_system_font(system_fonts(), text);
    if let Some(font) = &resolved {
        info!(
            "pdf export: using system font {}",
            font.family().unwrap_or("(unnamed)")
        );
    }
    Ok(resolved)
}

fn system_fonts() -> &'static fontdb::Database {
    static DB: OnceLock<fontdb::Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!("loaded {} system font faces", db.len());
        db
    })
}

fn resolve_system_font(db: &fontdb::Database, text: &str) -> Option<FontMetrics> {
    let mut best = None;
    for family in FALLBACK_FAMILIES {
        if let Some(metrics) = load_font_metrics_from_family(db, family) {
            if keep_best(&mut best, metrics, text) {
                return best.map(|(_, metrics)| metrics);
            }
        }
    }
    for face in db.faces() {
        if let Some(metrics) = load_embeddable_face(db, face.id) {
            if keep_best(&mut best, metrics, text) {
                return best.map(|(_, metrics)| metrics);
            }
        }
    }
    best.map(|(_, metrics)| metrics)
}

/// Records `metrics` if it misses fewer glyphs than the current pick; true once nothing is missing.
fn keep_best(best: &mut Option<(usize, FontMetrics)>, metrics: FontMetrics, text: &str) -> bool {
    let missing = metrics.missing_glyphs(text);
    if best.as_ref().is_none_or(|(fewest, _)| missing < *fewest) {
        *best = Some((missing, metrics));
    }
    missing == 0
}

fn load_font_metrics_from_family(db: &fontdb::Database, family: &str) -> Option<FontMetrics> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        [fontdb::Family::SansSerif]
    } else {
        [fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db.query(&query)?;
    load_embeddable_face(db, id)
}

/// printpdf embeds the first face of a file as a TrueType font, so only outline-glyph
/// faces at index 0 are usable.
fn load_embeddable_face(db: &fontdb::Database, id: fontdb::ID) -> Option<FontMetrics> {
    let (data, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    if index != 0 {
        return None;
    }
    let face = Face::parse(&data, 0).ok()?;
    if face.tables().glyf.is_none() {
        return None;
    }
    load_font_metrics_from_data(data).ok()
}

pub(crate) fn measure_text_width(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    match font {
        Some(font) => font.text_width(text, font_size),
        None => estimate_text_width_units(text) * font_size,
    }
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.28
    } else if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
        0.62
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF | 0xFF00..=0xFFEF
    ) {
        1.0
    } else {
        0.6
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units_for_width).sum()
}

fn load_font_metrics_from_data(data: Vec<u8>) -> Result<FontMetrics> {
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    let data = Arc::new(data);
    for index in 0..count {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let family = extract_family_name(&face);
        return Ok(FontMetrics {
            data: data.clone(),
            units_per_em,
            space_advance,
            family,
            face_index: index,
        });
    }
    Err(anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

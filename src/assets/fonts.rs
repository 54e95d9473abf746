use std::path::Path;
use std::sync::Arc;

use usvg::fontdb;

/// Build a font database from system fonts (optional) and the given directories.
pub fn build_fontdb(dirs: &[impl AsRef<Path>], system: bool) -> Arc<fontdb::Database> {
    let mut db = fontdb::Database::new();
    if system {
        db.load_system_fonts();
    }
    for dir in dirs {
        load_fonts_from_dir(&mut db, dir.as_ref());
        load_fonts_from_dir(&mut db, &dir.as_ref().join("fonts"));
    }
    tracing::debug!(faces = db.len(), "font database ready");
    Arc::new(db)
}

fn load_fonts_from_dir(db: &mut fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable font");
        }
    }
}

/// Whether `family` resolves to a face by name.
pub fn has_family(db: &fontdb::Database, family: &str) -> bool {
    let families = [fontdb::Family::Name(family)];
    db.query(&fontdb::Query {
        families: &families,
        ..fontdb::Query::default()
    })
    .is_some()
}

/// A resolved font face: raw file bytes plus the face index inside a collection.
#[derive(Clone)]
pub struct FaceData {
    /// Font file bytes.
    pub bytes: Arc<Vec<u8>>,
    /// Face index (non-zero for `.ttc` collections).
    pub index: u32,
}

/// Bold face of `family`, falling back to generic sans-serif and then to any face.
pub fn bold_face(db: &fontdb::Database, family: Option<&str>) -> Option<FaceData> {
    let mut families = Vec::new();
    if let Some(f) = family.filter(|f| !f.trim().is_empty()) {
        families.push(fontdb::Family::Name(f.trim()));
    }
    families.push(fontdb::Family::SansSerif);
    families.push(fontdb::Family::Serif);
    let id = db
        .query(&fontdb::Query {
            families: &families,
            weight: fontdb::Weight::BOLD,
            ..fontdb::Query::default()
        })
        .or_else(|| db.faces().next().map(|f| f.id))?;
    db.with_face_data(id, |data, index| FaceData {
        bytes: Arc::new(data.to_vec()),
        index,
    })
}

/// `usvg` font resolver matching the family list with generic fallbacks, then any face.
pub fn font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, db| {
            let mut families = Vec::<fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => fontdb::Family::Name(s),
                });
            }
            families.push(fontdb::Family::SansSerif);
            families.push(fontdb::Family::Serif);

            let style = match font.style() {
                usvg::FontStyle::Normal => fontdb::Style::Normal,
                usvg::FontStyle::Italic => fontdb::Style::Italic,
                usvg::FontStyle::Oblique => fontdb::Style::Oblique,
            };
            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                style,
                ..fontdb::Query::default()
            };

            db.query(&query).or_else(|| db.faces().next().map(|f| f.id))
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

/// `usvg` options sharing `db` and resolving fonts through [`font_resolver`].
pub fn usvg_options(db: Arc<fontdb::Database>) -> usvg::Options<'static> {
    usvg::Options {
        fontdb: db,
        font_resolver: font_resolver(),
        ..usvg::Options::default()
    }
}

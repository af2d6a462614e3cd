//! Font collections and logical font resolution.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use skrifa::{attribute::Style, MetadataProvider};

use crate::{
    face::{FontFace, FontType, SharedFontData},
    raster::DeviceContext,
    Error,
};

/// Environment variable with extra font directories, in the platform's path
/// list syntax.
pub const FONT_PATH_VAR: &str = "TEIKNA_FONT_PATH";

/// Requested weight of a logical font.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn value(self) -> u16 {
        match self {
            Self::Normal => 400,
            Self::Bold => 700,
        }
    }
}

/// Requested slant of a logical font.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontSlant {
    /// Slants to try, best first.
    fn fallbacks(self) -> [FontSlant; 3] {
        match self {
            Self::Normal => [Self::Normal, Self::Oblique, Self::Italic],
            Self::Italic => [Self::Italic, Self::Oblique, Self::Normal],
            Self::Oblique => [Self::Oblique, Self::Italic, Self::Normal],
        }
    }
}

/// Which kinds of faces a logical font may resolve to.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutPrecision {
    #[default]
    Default,
    /// Only faces with scalable outlines.
    Outline,
}

/// Logical font descriptor in the shape used by the legacy font matcher.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogFont {
    pub face_name: String,
    pub weight: u16,
    pub italic: bool,
    pub out_precision: OutPrecision,
}

impl LogFont {
    pub fn new(face_name: impl Into<String>, weight: FontWeight, slant: FontSlant) -> Self {
        Self {
            face_name: face_name.into(),
            weight: weight.value(),
            italic: slant != FontSlant::Normal,
            out_precision: OutPrecision::Default,
        }
    }
}

#[derive(Clone, Debug)]
struct FaceEntry {
    data: SharedFontData,
    index: u32,
    weight: f32,
    slant: FontSlant,
    has_outlines: bool,
}

/// All faces sharing a family name.
#[derive(Clone, Debug)]
pub struct FontFamily {
    name: String,
    faces: Vec<FaceEntry>,
}

impl FontFamily {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Creates the face best matching the requested weight and slant.
    ///
    /// Slant is matched first (exact, then the other sloped style, then
    /// upright) and the nearest weight is chosen within that slant.
    pub fn first_matching_font(
        &self,
        weight: FontWeight,
        slant: FontSlant,
    ) -> Result<Arc<FontFace>, Error> {
        let entry = self
            .best_match(weight.value() as f32, slant, false)
            .ok_or(Error::FontTypeMismatch)?;
        FontFace::from_data(entry.data.clone(), entry.index)
    }

    fn best_match(&self, weight: f32, slant: FontSlant, outline_only: bool) -> Option<&FaceEntry> {
        let candidates = || {
            self.faces
                .iter()
                .filter(move |face| !outline_only || face.has_outlines)
        };
        slant.fallbacks().into_iter().find_map(|slant| {
            candidates()
                .filter(|face| face.slant == slant)
                // ties prefer the heavier face for bold requests and the
                // lighter one otherwise
                .min_by_key(|face| {
                    let distance = (face.weight - weight).abs() as u32;
                    let heavier = face.weight > weight;
                    (distance, heavier != (weight >= 600.0))
                })
        })
    }
}

/// Set of font families available for resolution.
#[derive(Clone, Default, Debug)]
pub struct FontCollection {
    families: Vec<FontFamily>,
}

impl FontCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the platform font directories and the entries of
    /// [`FONT_PATH_VAR`].
    pub fn system() -> Self {
        let mut dirs = platform_font_dirs();
        if let Some(extra) = std::env::var_os(FONT_PATH_VAR) {
            dirs.extend(std::env::split_paths(&extra));
        }
        let collection = Self::from_dirs(&dirs);
        log::debug!(
            "system font collection has {} families",
            collection.families.len()
        );
        collection
    }

    /// Builds a collection from every font file found below `dirs`.
    pub fn from_dirs(dirs: &[impl AsRef<Path>]) -> Self {
        let mut collection = Self::new();
        let mut files = vec![];
        for dir in dirs {
            collect_font_files(dir.as_ref(), &mut files);
        }
        files.sort();
        for path in files {
            match SharedFontData::map_file(&path) {
                Ok(data) => {
                    if collection.add_font_data(data) == 0 {
                        log::warn!("no usable fonts in {}", path.display());
                    }
                }
                Err(e) => log::warn!("unable to read {}: {e}", path.display()),
            }
        }
        collection
    }

    /// Adds every font in `data`, returning how many were added.
    pub fn add_font_data(&mut self, data: SharedFontData) -> usize {
        let Some(count) = data.font_count() else {
            return 0;
        };
        let mut added = 0;
        for index in 0..count {
            let Ok(face) = FontFace::with_type(data.clone(), index, FontType::Outline) else {
                continue;
            };
            let Some(name) = face.family_name() else {
                continue;
            };
            let Ok(font) = face.font_ref() else {
                continue;
            };
            let attributes = font.attributes();
            let entry = FaceEntry {
                data: data.clone(),
                index,
                weight: attributes.weight.value(),
                slant: match attributes.style {
                    Style::Normal => FontSlant::Normal,
                    Style::Italic => FontSlant::Italic,
                    Style::Oblique(_) => FontSlant::Oblique,
                },
                has_outlines: face.has_outlines(),
            };
            match self.family_index(&name) {
                Some(ix) => self.families[ix].faces.push(entry),
                None => self.families.push(FontFamily {
                    name,
                    faces: vec![entry],
                }),
            }
            added += 1;
        }
        added
    }

    pub fn families(&self) -> &[FontFamily] {
        &self.families
    }

    fn family_index(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.families
            .iter()
            .position(|family| family.name.to_lowercase() == name)
    }

    /// Finds a family by case insensitive name.
    pub fn find_family(&self, name: &str) -> Option<&FontFamily> {
        self.family_index(name).map(|ix| &self.families[ix])
    }

    /// The family substituted for unknown names by the legacy matcher.
    pub fn default_family(&self) -> Option<&FontFamily> {
        self.families.first()
    }

    /// Resolves a family name, weight and slant to an outline face.
    pub fn resolve(
        &self,
        family: &str,
        weight: FontWeight,
        slant: FontSlant,
    ) -> Result<Arc<FontFace>, Error> {
        let face = self
            .find_family(family)
            .ok_or(Error::FontTypeMismatch)?
            .first_matching_font(weight, slant)?;
        log::debug!("resolved {family:?} {weight:?} {slant:?} to face {}", face.index());
        Ok(face)
    }

    /// Resolves a logical font by selecting it into a screen device context.
    ///
    /// Outline resolution requires the family to exist. Legacy resolution
    /// mirrors the legacy matcher and silently substitutes the default family
    /// for unknown names.
    pub fn face_from_log_font(
        &self,
        log_font: &LogFont,
        font_type: FontType,
    ) -> Result<Arc<FontFace>, Error> {
        let mut dc = DeviceContext::screen();
        let selection = dc.select_font(log_font.clone());
        self.face_from_dc(&selection, font_type)
    }

    fn face_from_dc(&self, dc: &DeviceContext, font_type: FontType) -> Result<Arc<FontFace>, Error> {
        let log_font = dc.selected_font().ok_or(Error::FontTypeMismatch)?;
        let family = match (self.find_family(&log_font.face_name), font_type) {
            (Some(family), _) => family,
            (None, FontType::Legacy) => {
                let family = self.default_family().ok_or(Error::FontTypeMismatch)?;
                log::debug!(
                    "substituting {:?} for unknown family {:?}",
                    family.name,
                    log_font.face_name
                );
                family
            }
            (None, FontType::Outline) => return Err(Error::FontTypeMismatch),
        };
        let slant = if log_font.italic {
            FontSlant::Italic
        } else {
            FontSlant::Normal
        };
        let outline_only = log_font.out_precision == OutPrecision::Outline;
        let entry = family
            .best_match(log_font.weight as f32, slant, outline_only)
            .ok_or(Error::FontTypeMismatch)?;
        FontFace::with_type(entry.data.clone(), entry.index, font_type).map(Arc::new)
    }
}

fn platform_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];
    let home = std::env::var_os("HOME").map(PathBuf::from);
    if cfg!(windows) {
        if let Some(windir) = std::env::var_os("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
    } else if cfg!(target_os = "macos") {
        dirs.push("/System/Library/Fonts".into());
        dirs.push("/Library/Fonts".into());
        dirs.extend(home.map(|home| home.join("Library/Fonts")));
    } else {
        dirs.push("/usr/share/fonts".into());
        dirs.push("/usr/local/share/fonts".into());
        if let Some(home) = home {
            dirs.push(home.join(".local/share/fonts"));
            dirs.push(home.join(".fonts"));
        }
    }
    dirs
}

fn collect_font_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, files);
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "ttf" | "otf" | "ttc" | "otc"
                )
            })
            .unwrap_or_default()
        {
            files.push(path);
        }
    }
}

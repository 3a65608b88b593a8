/// Bitmap font resource (AngelCode BMFont, XML flavour).
///
/// A BMFont file describes glyph rectangles inside one or more page
/// textures. The markup is deserialized into raw structs with quick-xml,
/// then validated into a `BMFontFile`. The `BMFont` asset adds the glyph
/// map and the registry ids of its page textures, on which it holds one
/// reference each.
///
/// ```xml
/// <font>
///   <info face="Arial" size="32" padding="0,0,0,0" spacing="1,1" .../>
///   <common lineHeight="32" base="26" scaleW="256" scaleH="256" pages="1" .../>
///   <pages><page id="0" file="arial_0.png"/></pages>
///   <chars count="1"><char id="65" x="0" y="0" width="10" .../></chars>
/// </font>
/// ```

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::resource::asset::AssetId;

// ===== RAW MARKUP =====

#[derive(Deserialize, Debug)]
struct FontXml {
    info: Option<InfoXml>,
    common: Option<CommonXml>,
    pages: Option<PagesXml>,
    chars: Option<CharsXml>,
}

#[derive(Deserialize, Debug)]
struct InfoXml {
    #[serde(rename = "@face", default)]
    face: String,
    #[serde(rename = "@size", default)]
    size: i32,
    #[serde(rename = "@bold", default)]
    bold: u32,
    #[serde(rename = "@italic", default)]
    italic: u32,
    #[serde(rename = "@charset", default)]
    charset: String,
    #[serde(rename = "@unicode", default)]
    unicode: u32,
    #[serde(rename = "@stretchH", default)]
    stretch_h: u32,
    #[serde(rename = "@smooth", default)]
    smooth: u32,
    #[serde(rename = "@aa", default)]
    anti_aliasing: u32,
    #[serde(rename = "@padding", default)]
    padding: Option<String>,
    #[serde(rename = "@spacing", default)]
    spacing: Option<String>,
    #[serde(rename = "@outline", default)]
    outline: u32,
}

#[derive(Deserialize, Debug)]
struct CommonXml {
    #[serde(rename = "@lineHeight", default)]
    line_height: u32,
    #[serde(rename = "@base", default)]
    base: u32,
    #[serde(rename = "@scaleW", default)]
    scale_w: u32,
    #[serde(rename = "@scaleH", default)]
    scale_h: u32,
    #[serde(rename = "@pages", default)]
    pages: u32,
    #[serde(rename = "@packed", default)]
    packed: u32,
    #[serde(rename = "@alphaChnl", default)]
    alpha_channel: u32,
    #[serde(rename = "@redChnl", default)]
    red_channel: u32,
    #[serde(rename = "@greenChnl", default)]
    green_channel: u32,
    #[serde(rename = "@blueChnl", default)]
    blue_channel: u32,
}

#[derive(Deserialize, Debug)]
struct PagesXml {
    #[serde(rename = "page", default)]
    pages: Vec<PageXml>,
}

#[derive(Deserialize, Debug)]
struct PageXml {
    #[serde(rename = "@id", default)]
    id: u32,
    #[serde(rename = "@file")]
    file: String,
}

#[derive(Deserialize, Debug)]
struct CharsXml {
    #[serde(rename = "@count")]
    count: Option<usize>,
    #[serde(rename = "char", default)]
    chars: Vec<CharXml>,
}

#[derive(Deserialize, Debug)]
struct CharXml {
    #[serde(rename = "@id", default)]
    id: u32,
    #[serde(rename = "@x", default)]
    x: u32,
    #[serde(rename = "@y", default)]
    y: u32,
    #[serde(rename = "@width", default)]
    width: u32,
    #[serde(rename = "@height", default)]
    height: u32,
    #[serde(rename = "@xoffset", default)]
    x_offset: i32,
    #[serde(rename = "@yoffset", default)]
    y_offset: i32,
    #[serde(rename = "@xadvance", default)]
    x_advance: i32,
    #[serde(rename = "@page", default)]
    page: u32,
    #[serde(rename = "@chnl", default)]
    channel: u32,
}

/// Parse a comma-separated integer tuple of exactly `N` components
fn parse_tuple<const N: usize>(attribute: &str, value: &str) -> Result<[i32; N]> {
    let malformed = || Error::MalformedResource(format!(
        "BMFont {} '{}' is not a list of {} integers", attribute, value, N
    ));

    let components: Vec<i32> = value
        .split(',')
        .map(|c| c.trim().parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| malformed())?;

    components.try_into().map_err(|_| malformed())
}

// ===== PARSED FILE =====

/// `info` section
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BMFontInfo {
    pub face: String,
    pub size: i32,
    pub bold: bool,
    pub italic: bool,
    pub charset: String,
    pub unicode: bool,
    pub stretch_h: u32,
    pub smooth: bool,
    pub anti_aliasing: bool,
    pub pad_x: i32,
    pub pad_y: i32,
    pub pad_w: i32,
    pub pad_h: i32,
    pub spacing_x: i32,
    pub spacing_y: i32,
    pub outline: u32,
}

/// `common` section
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BMFontCommon {
    pub line_height: u32,
    pub base: u32,
    pub scale_w: u32,
    pub scale_h: u32,
    pub pages: u32,
    pub packed: bool,
    pub alpha_channel: u32,
    pub red_channel: u32,
    pub green_channel: u32,
    pub blue_channel: u32,
}

/// One page texture declaration
#[derive(Debug, Clone, PartialEq)]
pub struct BMFontPage {
    pub id: u32,
    pub file: String,
}

/// Glyph rectangle and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontChar {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
    pub page: u32,
    pub channel: u32,
}

impl From<CharXml> for FontChar {
    fn from(raw: CharXml) -> Self {
        Self {
            id: raw.id,
            x: raw.x,
            y: raw.y,
            width: raw.width,
            height: raw.height,
            x_offset: raw.x_offset,
            y_offset: raw.y_offset,
            x_advance: raw.x_advance,
            page: raw.page,
            channel: raw.channel,
        }
    }
}

/// Validated content of a BMFont file
#[derive(Debug, Clone, PartialEq)]
pub struct BMFontFile {
    pub info: BMFontInfo,
    pub common: BMFontCommon,
    /// Pages in declaration order
    pub pages: Vec<BMFontPage>,
    /// Exactly the declared number of glyphs, in declaration order
    pub chars: Vec<FontChar>,
}

impl BMFontFile {
    /// Parse and validate BMFont XML
    ///
    /// # Errors
    ///
    /// `Error::MalformedResource` when the markup is invalid, a section is
    /// missing, a padding/spacing tuple is malformed, or `chars count`
    /// exceeds the number of `char` elements.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::MalformedResource(format!("BMFont is not UTF-8: {}", e)))?;
        let xml: FontXml = quick_xml::de::from_str(text)
            .map_err(|e| Error::MalformedResource(format!("BMFont markup: {}", e)))?;

        let missing = |section: &str| Error::MalformedResource(format!(
            "BMFont has no '{}' section", section
        ));
        let info = xml.info.ok_or_else(|| missing("info"))?;
        let common = xml.common.ok_or_else(|| missing("common"))?;
        let pages = xml.pages.ok_or_else(|| missing("pages"))?;
        let chars = xml.chars.ok_or_else(|| missing("chars"))?;

        let [pad_x, pad_y, pad_w, pad_h] = match &info.padding {
            Some(value) => parse_tuple::<4>("padding", value)?,
            None => [0; 4],
        };
        let [spacing_x, spacing_y] = match &info.spacing {
            Some(value) => parse_tuple::<2>("spacing", value)?,
            None => [0; 2],
        };

        let declared = chars.count.unwrap_or(chars.chars.len());
        if declared > chars.chars.len() {
            return Err(Error::MalformedResource(format!(
                "BMFont declares {} chars but contains {}", declared, chars.chars.len()
            )));
        }
        if declared < chars.chars.len() {
            crate::engine_debug!("ember3d::BMFont",
                "Ignoring {} char elements beyond the declared count {}",
                chars.chars.len() - declared, declared);
        }

        Ok(Self {
            info: BMFontInfo {
                face: info.face,
                size: info.size,
                bold: info.bold != 0,
                italic: info.italic != 0,
                charset: info.charset,
                unicode: info.unicode != 0,
                stretch_h: info.stretch_h,
                smooth: info.smooth != 0,
                anti_aliasing: info.anti_aliasing != 0,
                pad_x,
                pad_y,
                pad_w,
                pad_h,
                spacing_x,
                spacing_y,
                outline: info.outline,
            },
            common: BMFontCommon {
                line_height: common.line_height,
                base: common.base,
                scale_w: common.scale_w,
                scale_h: common.scale_h,
                pages: common.pages,
                packed: common.packed != 0,
                alpha_channel: common.alpha_channel,
                red_channel: common.red_channel,
                green_channel: common.green_channel,
                blue_channel: common.blue_channel,
            },
            pages: pages.pages.into_iter()
                .map(|page| BMFontPage { id: page.id, file: page.file })
                .collect(),
            chars: chars.chars.into_iter()
                .take(declared)
                .map(FontChar::from)
                .collect(),
        })
    }
}

// ===== FONT ASSET =====

/// Bitmap font asset
pub struct BMFont {
    path: PathBuf,
    file: BMFontFile,
    char_map: FxHashMap<u32, FontChar>,
    page_textures: Vec<Option<AssetId>>,
}

impl BMFont {
    /// Build the font from its parsed file and the ids of its page textures
    ///
    /// `page_textures` follows `file.pages` order; `None` marks a page that
    /// failed to load. The font owns one reference on every `Some` id.
    pub(crate) fn new(path: impl Into<PathBuf>, file: BMFontFile, page_textures: Vec<Option<AssetId>>) -> Self {
        // Later duplicates replace earlier ones
        let char_map = file.chars.iter().map(|c| (c.id, *c)).collect();

        Self {
            path: path.into(),
            file,
            char_map,
            page_textures,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &BMFontInfo {
        &self.file.info
    }

    pub fn common(&self) -> &BMFontCommon {
        &self.file.common
    }

    pub fn pages(&self) -> &[BMFontPage] {
        &self.file.pages
    }

    pub fn page_count(&self) -> usize {
        self.page_textures.len()
    }

    /// Number of distinct glyphs
    pub fn char_count(&self) -> usize {
        self.char_map.len()
    }

    pub fn find_char(&self, code: u32) -> Option<&FontChar> {
        self.char_map.get(&code)
    }

    /// Texture of page `index`, `None` when out of range or the page failed to load
    pub fn page_texture(&self, index: usize) -> Option<AssetId> {
        self.page_textures.get(index).copied().flatten()
    }

    pub fn page_textures(&self) -> &[Option<AssetId>] {
        &self.page_textures
    }

    pub fn line_height(&self) -> f32 {
        self.file.common.line_height as f32
    }

    /// Width and height of `text` laid out with glyph advances
    ///
    /// `'\n'` starts a new line; characters without a glyph are skipped.
    pub fn measure_text(&self, text: &str) -> (f32, f32) {
        if text.is_empty() {
            return (0.0, 0.0);
        }

        let mut width = 0.0f32;
        let mut lines = 0usize;
        for line in text.split('\n') {
            let advance: i32 = line.chars()
                .filter_map(|c| self.find_char(c as u32))
                .map(|glyph| glyph.x_advance)
                .sum();
            width = width.max(advance as f32);
            lines += 1;
        }

        (width, lines as f32 * self.line_height())
    }
}

#[cfg(test)]
#[path = "bmfont_tests.rs"]
mod tests;

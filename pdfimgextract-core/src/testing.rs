//! Test PDF builder
//!
//! Builds small documents with known image XObjects so the locator, the
//! decoder and the CLI can be checked against exact expectations.

use crate::error::Result;
use crate::task::ImageRef;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};
use std::path::Path;

/// An image XObject to place on a page
#[derive(Debug, Clone)]
pub enum FixtureImage {
    /// 8-bit DeviceGray, unfiltered
    Gray { width: u32, height: u32 },
    /// 8-bit DeviceRGB, unfiltered
    Rgb { width: u32, height: u32 },
    /// 8-bit DeviceRGB, FlateDecode compressed
    FlateRgb { width: u32, height: u32 },
    /// Baseline JPEG under DCTDecode
    Jpeg { width: u32, height: u32 },
    /// A JBIG2 stream, which the decoder rejects
    Jbig2,
    /// 8-bit DeviceGray whose `/Width` and `/Height` are indirect objects
    GrayIndirectSize { width: u32, height: u32 },
    /// An image drawn by a Form XObject instead of by the page
    InForm(Box<FixtureImage>),
}

impl FixtureImage {
    pub fn gray(width: u32, height: u32) -> Self {
        FixtureImage::Gray { width, height }
    }

    pub fn rgb(width: u32, height: u32) -> Self {
        FixtureImage::Rgb { width, height }
    }

    pub fn flate_rgb(width: u32, height: u32) -> Self {
        FixtureImage::FlateRgb { width, height }
    }

    pub fn jpeg(width: u32, height: u32) -> Self {
        FixtureImage::Jpeg { width, height }
    }

    pub fn jbig2() -> Self {
        FixtureImage::Jbig2
    }

    pub fn gray_indirect_size(width: u32, height: u32) -> Self {
        FixtureImage::GrayIndirectSize { width, height }
    }

    pub fn in_form(image: FixtureImage) -> Self {
        FixtureImage::InForm(Box::new(image))
    }

    /// Extension the extractor is expected to pick for this image
    pub fn extension(&self) -> &'static str {
        match self {
            FixtureImage::Jpeg { .. } => "jpg",
            FixtureImage::InForm(image) => image.extension(),
            _ => "png",
        }
    }

    /// Add the objects for this image to `doc`. Returns the XObject the page
    /// draws and the image itself, which differ for form-wrapped images.
    fn add_to(&self, doc: &mut Document) -> Result<(ObjectId, ImageRef)> {
        let stream = match *self {
            FixtureImage::Gray { width, height } => Stream::new(
                image_dict(width, height, "DeviceGray"),
                gradient(width * height),
            ),
            FixtureImage::Rgb { width, height } => Stream::new(
                image_dict(width, height, "DeviceRGB"),
                gradient(width * height * 3),
            ),
            FixtureImage::FlateRgb { width, height } => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&gradient(width * height * 3))?;
                let mut dict = image_dict(width, height, "DeviceRGB");
                dict.set("Filter", "FlateDecode");
                Stream::new(dict, encoder.finish()?)
            }
            FixtureImage::Jpeg { width, height } => {
                let mut dict = image_dict(width, height, "DeviceRGB");
                dict.set("Filter", "DCTDecode");
                Stream::new(dict, jpeg_bytes(width, height)?)
            }
            FixtureImage::Jbig2 => {
                let mut dict = image_dict(8, 8, "DeviceGray");
                dict.set("BitsPerComponent", 1);
                dict.set("Filter", "JBIG2Decode");
                Stream::new(dict, vec![0x97, 0x4A, 0x42, 0x32])
            }
            FixtureImage::GrayIndirectSize { width, height } => {
                let mut dict = image_dict(width, height, "DeviceGray");
                dict.set("Width", doc.add_object(Object::Integer(width as i64)));
                dict.set("Height", doc.add_object(Object::Integer(height as i64)));
                Stream::new(dict, gradient(width * height))
            }
            FixtureImage::InForm(ref image) => {
                let (image_id, owned) = image.add_to(doc)?;
                let form = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![
                            Object::Integer(0),
                            Object::Integer(0),
                            Object::Integer(1),
                            Object::Integer(1),
                        ],
                        "Resources" => dictionary! {
                            "XObject" => dictionary! { "Im1" => image_id },
                        },
                    },
                    b"q /Im1 Do Q".to_vec(),
                );
                return Ok((doc.add_object(form), owned));
            }
        };
        let id = doc.add_object(stream);
        Ok((id, ImageRef::from(id)))
    }
}

/// Encode a solid-colour JPEG of the given size
pub fn jpeg_bytes(width: u32, height: u32) -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn gradient(len: u32) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

#[derive(Debug, Clone, Default)]
struct FixturePage {
    images: Vec<FixtureImage>,
    /// (page, image index) pairs drawn again on this page under another name
    reused: Vec<(usize, usize)>,
    /// Font-only resources, no `/XObject` entry
    text_only: bool,
    /// Resources live on the `/Pages` node instead of the page
    inherited: bool,
}

/// Builder for multi-page documents with image XObjects
#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    pages: Vec<FixturePage>,
}

impl PdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page owning `images`
    pub fn page(mut self, images: Vec<FixtureImage>) -> Self {
        self.pages.push(FixturePage {
            images,
            ..FixturePage::default()
        });
        self
    }

    /// Append a page that shows text and has no `/XObject` resources
    pub fn text_page(mut self) -> Self {
        self.pages.push(FixturePage {
            text_only: true,
            ..FixturePage::default()
        });
        self
    }

    /// Move the last page's resources up to the `/Pages` node, where the page
    /// inherits them. Only one page per document can be marked.
    pub fn inherit_resources(mut self) -> Self {
        if let Some(last) = self.pages.last_mut() {
            last.inherited = true;
        }
        self
    }

    /// Draw image `index` of the last page a second time on that page
    pub fn reuse_on_same_page(self, index: usize) -> Self {
        let page = self.pages.len().saturating_sub(1);
        self.reuse_image(page, index)
    }

    /// Draw image `index` owned by page `from_page` on the last page
    pub fn reuse_image(mut self, from_page: usize, index: usize) -> Self {
        if let Some(last) = self.pages.last_mut() {
            last.reused.push((from_page, index));
        }
        self
    }

    /// Extensions expected for every owned image, in discovery order
    pub fn extensions(&self) -> Vec<&'static str> {
        self.pages
            .iter()
            .flat_map(|page| page.images.iter().map(FixtureImage::extension))
            .collect()
    }

    /// Write the document and return the image references owned by each page
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Vec<ImageRef>>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(self.pages.len());
        let mut owned: Vec<Vec<ImageRef>> = Vec::with_capacity(self.pages.len());
        let mut inherited = None;

        for page in &self.pages {
            if page.text_only {
                let content_id = doc.add_object(Stream::new(
                    dictionary! {},
                    b"BT /F1 12 Tf 72 720 Td (No images here) Tj ET".to_vec(),
                ));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => media_box(),
                    "Resources" => dictionary! {
                        "Font" => dictionary! {
                            "F1" => dictionary! {
                                "Type" => "Font",
                                "Subtype" => "Type1",
                                "BaseFont" => "Helvetica",
                            },
                        },
                    },
                    "Contents" => content_id,
                });
                kids.push(Object::Reference(page_id));
                owned.push(Vec::new());
                continue;
            }

            let mut xobjects = Dictionary::new();
            let mut content = Vec::new();
            let mut ids = Vec::with_capacity(page.images.len());

            for (idx, image) in page.images.iter().enumerate() {
                let (drawn, image_ref) = image.add_to(&mut doc)?;
                let name = format!("Im{}", idx + 1);
                draw(&mut content, &name, idx);
                xobjects.set(name, Object::Reference(drawn));
                ids.push(image_ref);
            }
            owned.push(ids);

            for (n, &(from_page, index)) in page.reused.iter().enumerate() {
                if let Some(image) = owned.get(from_page).and_then(|ids| ids.get(index)) {
                    let name = format!("Re{}", n + 1);
                    draw(&mut content, &name, page.images.len() + n);
                    xobjects.set(name, Object::Reference(image.object_id()));
                }
            }

            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let resources = dictionary! { "XObject" => xobjects };
            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box(),
                "Contents" => content_id,
            };
            if page.inherited {
                inherited = Some(resources);
            } else {
                page_dict.set("Resources", resources);
            }
            kids.push(Object::Reference(doc.add_object(page_dict)));
        }

        let count = kids.len() as i64;
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        };
        if let Some(resources) = inherited {
            pages.set("Resources", resources);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path.as_ref())?;

        Ok(owned)
    }
}

fn media_box() -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ]
}

fn draw(content: &mut Vec<u8>, name: &str, slot: usize) {
    let y = 700 - 60 * slot as i64;
    content.extend_from_slice(format!("q 50 0 0 50 72 {y} cm /{name} Do Q\n").as_bytes());
}

// Embedded raster image extraction from page XObject resources
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::lopdf_helper::{filter_names, get_name, get_number, page_resources, resolve, resolve_dict};

/// A decoded image plus where it came from
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub page: u32,
    pub resource_name: String,
    pub image: DynamicImage,
}

/// Decode every image XObject in page order, then resource order.
///
/// An image object shared by several pages is returned once. Images with
/// encodings we cannot decode are skipped with a warning.
pub fn extract_images(document: &Document) -> Vec<ExtractedImage> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut images = Vec::new();

    for (page_number, page_id) in document.get_pages() {
        let Some(resources) = page_resources(document, page_id) else {
            continue;
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|x| resolve_dict(document, x))
        else {
            continue;
        };

        for (name, entry) in xobjects.iter() {
            if let Object::Reference(id) = entry {
                if !seen.insert(*id) {
                    continue;
                }
            }
            let Some(Object::Stream(stream)) = resolve(document, entry) else {
                continue;
            };
            if get_name(document, &stream.dict, b"Subtype") != Some(b"Image".as_slice()) {
                continue;
            }

            let resource_name = String::from_utf8_lossy(name).into_owned();
            match decode_image_stream(document, stream) {
                Ok(image) => {
                    debug!(
                        page = page_number,
                        resource = %resource_name,
                        width = image.width(),
                        height = image.height(),
                        "decoded embedded image"
                    );
                    images.push(ExtractedImage {
                        page: page_number,
                        resource_name,
                        image,
                    });
                }
                Err(reason) => {
                    warn!(page = page_number, resource = %resource_name, %reason, "skipping embedded image")
                }
            }
        }
    }

    images
}

fn decode_image_stream(document: &Document, stream: &Stream) -> std::result::Result<DynamicImage, String> {
    let filters = filter_names(document, &stream.dict);

    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|e| format!("JPEG decode failed: {}", e));
        }
        Some(b"DCTDecode") | Some(b"JPXDecode") | Some(b"JBIG2Decode") | Some(b"CCITTFaxDecode") => {
            return Err(format!(
                "unsupported image filter chain {:?}",
                filters.iter().map(|f| String::from_utf8_lossy(f).into_owned()).collect::<Vec<_>>()
            ));
        }
        _ => {}
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| format!("stream decode failed: {}", e))?
    };

    let width = dimension(document, stream, b"Width")?;
    let height = dimension(document, stream, b"Height")?;
    let bits = get_number(document, &stream.dict, b"BitsPerComponent").unwrap_or(8.0) as u32;
    if bits != 8 {
        return Err(format!("{} bits per component not supported", bits));
    }

    let components = color_components(document, stream).ok_or("unsupported colour space")?;
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(components))
        .ok_or_else(|| format!("image dimensions {}x{} overflow", width, height))?;
    if data.len() < expected {
        return Err(format!("pixel data too short: {} < {}", data.len(), expected));
    }
    let mut data = data;
    data.truncate(expected);

    let image = match components {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(&data)).map(DynamicImage::ImageRgb8),
        _ => None,
    };
    image.ok_or_else(|| "pixel buffer does not match dimensions".to_string())
}

// Width or height: a positive number that fits a u32
fn dimension(document: &Document, stream: &Stream, key: &[u8]) -> std::result::Result<u32, String> {
    let name = String::from_utf8_lossy(key);
    let value = get_number(document, &stream.dict, key).ok_or_else(|| format!("missing /{}", name))?;
    if !(value >= 1.0 && value <= u32::MAX as f32) {
        return Err(format!("invalid /{} {}", name, value));
    }
    Ok(value as u32)
}

// Number of colour components for DeviceGray/RGB/CMYK or an ICCBased space
fn color_components(document: &Document, stream: &Stream) -> Option<usize> {
    let space = resolve(document, stream.dict.get(b"ColorSpace").ok()?)?;
    match space {
        Object::Name(name) => device_components(name),
        Object::Array(items) => {
            let family = match resolve(document, items.first()?)? {
                Object::Name(name) => name.as_slice(),
                _ => return None,
            };
            match family {
                b"ICCBased" => {
                    let profile = resolve_dict(document, items.get(1)?)?;
                    get_number(document, profile, b"N").map(|n| n as usize)
                }
                other => device_components(other),
            }
        }
        _ => None,
    }
}

fn device_components(name: &[u8]) -> Option<usize> {
    match name {
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"CalRGB" => Some(3),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u32;
            [
                ((255 - px[0] as u32) * k / 255) as u8,
                ((255 - px[1] as u32) * k / 255) as u8,
                ((255 - px[2] as u32) * k / 255) as u8,
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn page_with_xobjects(doc: &mut Document, xobjects: lopdf::Dictionary) -> ObjectId {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        page_id
    }

    fn raw_image(width: i64, height: i64, space: &str, pixels: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => space,
                "BitsPerComponent" => 8,
            },
            pixels,
        )
    }

    #[test]
    fn decodes_uncompressed_gray_and_rgb_images_in_order() {
        let mut doc = Document::with_version("1.5");
        let gray = doc.add_object(raw_image(2, 2, "DeviceGray", vec![0, 64, 128, 255]));
        let rgb = doc.add_object(raw_image(1, 2, "DeviceRGB", vec![255, 0, 0, 0, 255, 0]));
        page_with_xobjects(&mut doc, dictionary! { "Im1" => gray, "Im2" => rgb });

        let images = extract_images(&doc);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].resource_name, "Im1");
        assert_eq!((images[0].image.width(), images[0].image.height()), (2, 2));
        assert_eq!(images[1].image.to_rgb8().get_pixel(0, 1).0, [0, 255, 0]);
    }

    #[test]
    fn skips_non_image_xobjects_and_short_buffers() {
        let mut doc = Document::with_version("1.5");
        let form = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form" },
            b"".to_vec(),
        ));
        let broken = doc.add_object(raw_image(10, 10, "DeviceRGB", vec![0; 5]));
        page_with_xobjects(&mut doc, dictionary! { "Fm1" => form, "Im1" => broken });

        assert!(extract_images(&doc).is_empty());
    }

    #[test]
    fn huge_dimensions_are_skipped_not_overflowed() {
        let mut doc = Document::with_version("1.5");
        let huge = doc.add_object(raw_image(4_000_000_000, 4_000_000_000, "DeviceRGB", vec![0; 12]));
        page_with_xobjects(&mut doc, dictionary! { "Im1" => huge });

        assert!(extract_images(&doc).is_empty());
    }

    #[test]
    fn zero_or_negative_dimensions_are_rejected() {
        let mut doc = Document::with_version("1.5");
        let negative = doc.add_object(raw_image(-5, -5, "DeviceGray", Vec::new()));
        let flat = doc.add_object(raw_image(0, 3, "DeviceGray", Vec::new()));
        page_with_xobjects(&mut doc, dictionary! { "Im1" => negative, "Im2" => flat });

        assert!(extract_images(&doc).is_empty());
    }

    #[test]
    fn cmyk_black_is_rgb_black() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
    }
}

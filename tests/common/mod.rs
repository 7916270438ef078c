// Fixture PDFs shaped like the plan and gamma-analysis exports
#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use rtreport::report::renderer::encode_win_ansi;
use std::io::Cursor;

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// One page, one BT/ET block per line, optional DCT image.
pub fn text_pdf(lines: &[&str], jpeg_bytes: Option<&[u8]>) -> Vec<u8> {
    pages_pdf(&[lines], jpeg_bytes)
}

/// One page per entry, in order. The image, if any, goes on the first page.
pub fn pages_pdf(pages: &[&[&str]], jpeg_bytes: Option<&[u8]>) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for (page_index, lines) in pages.iter().enumerate() {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 9.into()]),
                Operation::new("Td", vec![50.into(), (770 - 12 * i as i64).into()]),
                Operation::new("Tj", vec![Object::String(encode_win_ansi(line), StringFormat::Literal)]),
                Operation::new("ET", vec![]),
            ]);
        }

        let mut xobjects = lopdf::Dictionary::new();
        if let (0, Some(bytes)) = (page_index, jpeg_bytes) {
            let decoded = image::load_from_memory(bytes).unwrap();
            let mut stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => decoded.width() as i64,
                    "Height" => decoded.height() as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                bytes.to_vec(),
            );
            stream.allows_compression = false;
            xobjects.set("Im1", doc.add_object(stream));
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new("cm", vec![200.into(), 0.into(), 0.into(), 100.into(), 300.into(), 100.into()]),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Plan text with the displacement values on lines 22..=24 and a field
/// table holding two plausible beams plus one short setup record.
pub fn plan_lines() -> Vec<&'static str> {
    let mut lines = vec![
        "Relatório de Planejamento",
        "Nome: Maria Silva",
        "Data de Nasc.: Monday, March 04, 1985",
        "Prontuário: 123456",
        "Radio-Oncologista: Dr. Paulo Souza",
        "Curso / Plano: C1 / Mama Esquerda",
        "Dose de Prescrição: 5000 cGy",
        "Curva de Prescrição: 95%",
        "Imagem Utilizada: CBCT",
        "Deslocamento da mesa da posição de setup de referência: Sim",
    ];
    lines.extend(std::iter::repeat("Observações gerais").take(9));
    lines.extend(["LATERAL", "VERTICAL", "LONGITUDINAL"]);
    lines.extend(["1.20 cm", "-0.50 cm", "3.00 cm"]);
    lines.extend([
        "Parâmetros dos Campos",
        "Campo",
        "Técnica",
        "1",
        "STATIC",
        "TrueBeam",
        "6X",
        "X1: 5.0 cm",
        "X2: 5.0 cm",
        "0.0 deg",
        "100.0 cm",
        "120 UM",
        "-",
        "2",
        "ARC",
        "TrueBeam",
        "6X",
        "X1: 4.0 cm",
        "X2: 4.0 cm",
        "180.0 deg",
        "98.5 cm",
        "140 UM",
        "CBCT",
        "SETUP",
        "Assinaturas",
    ]);
    lines
}

pub fn qa_lines() -> Vec<&'static str> {
    vec![
        "Relatório de Análise Gama",
        "Campo 1",
        "Gama DTA : 3.00 mm Tol.: 95.00 %",
        "Área gama < 1,0 98.50 % 97.20%",
        "Resultado da análise: APROVADO",
        "Campo 2",
        "Gama DTA : 2.00 mm Tol.: 97.00 %",
        "Área gama < 1,0 99.10 % 99.00 %",
        "Resultado da análise: Aprovado",
    ]
}

pub fn plan_pdf() -> Vec<u8> {
    text_pdf(&plan_lines(), Some(&jpeg(32, 24)))
}

pub fn qa_pdf() -> Vec<u8> {
    text_pdf(&qa_lines(), None)
}

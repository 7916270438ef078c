// PDF writer for the unified report
//
// Builds the page content by hand with lopdf: standard Type1 Helvetica
// with WinAnsi encoding for text, RGB XObjects for images. Content flows
// top to bottom and breaks onto a new page when a block does not fit.
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use super::model::{QaRow, UnifiedReportModel};
use crate::config::{OutputLayout, PatientField};
use crate::extraction::displacement::AXES;
use crate::types::Result;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_X: f32 = 60.0;
const TOP: f32 = 740.0;
const BOTTOM: f32 = 50.0;

const SIGNATURES_PER_ROW: usize = 3;
const SIGNATURE_ROW_HEIGHT: f32 = 80.0;

const APPROVED_RGB: [f32; 3] = [0.196, 0.804, 0.196];
const REJECTED_RGB: [f32; 3] = [0.8, 0.1, 0.1];

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Map text into WinAnsiEncoding; anything outside it becomes '?'.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

/// Content stream under construction, split into pages.
struct Canvas {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: TOP,
        }
    }

    /// Break the page unless `height` more points fit above the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.y - height < BOTTOM && !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = TOP;
        }
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.colored_text(font, size, x, y, text, [0.0, 0.0, 0.0]);
    }

    fn colored_text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str, rgb: [f32; 3]) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.resource().as_bytes().to_vec()), real(size)]),
            Operation::new("rg", rgb.iter().copied().map(real).collect()),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new("Tj", vec![Object::String(encode_win_ansi(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rule(&mut self, x1: f32, x2: f32, y: f32) {
        self.current.extend([
            Operation::new("w", vec![real(0.5)]),
            Operation::new("m", vec![real(x1), real(y)]),
            Operation::new("l", vec![real(x2), real(y)]),
            Operation::new("S", vec![]),
        ]);
    }

    fn image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) {
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Scale `image` to fit inside a `box_w` x `box_h` box, keeping aspect.
fn fit(image: &DynamicImage, box_w: f32, box_h: f32) -> (f32, f32) {
    let (w, h) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let scale = (box_w / w).min(box_h / h);
    (w * scale, h * scale)
}

fn image_stream(image: &DynamicImage) -> Stream {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(width as i64),
            "Height" => Object::Integer(height as i64),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => Object::Integer(8),
        },
        rgb.into_raw(),
    )
}

fn patient_label(field: PatientField) -> &'static str {
    match field {
        PatientField::Name => "Paciente:",
        PatientField::BirthDate => "Data de Nascimento:",
        PatientField::RecordNumber => "Prontuário:",
        PatientField::RadiationOncologist => "Radio-Oncologista:",
        PatientField::CoursePlan => "Curso/Plano:",
        PatientField::PrescribedDose => "Dose Prescrita:",
        PatientField::PrescriptionCurve => "Curva de Prescrição:",
        PatientField::Imaging => "Imagem:",
        PatientField::TableDisplacement => "Deslocamento:",
    }
}

pub struct ReportRenderer<'a> {
    output: &'a OutputLayout,
    approved_term: &'a str,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(output: &'a OutputLayout, approved_term: &'a str) -> Self {
        Self {
            output,
            approved_term,
        }
    }

    pub fn render(&self, model: &UnifiedReportModel) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let mut xobjects = Dictionary::new();
        let mut canvas = Canvas::new();

        if let Some(logo) = &model.assets.logo {
            let (w, h) = fit(logo, 120.0, 50.0);
            xobjects.set("Logo", Object::Reference(doc.add_object(image_stream(logo))));
            canvas.image("Logo", PAGE_WIDTH - 40.0 - w, PAGE_HEIGHT - 30.0 - h, w, h);
        }

        self.draw_header(&mut canvas, model);
        self.draw_displacement(&mut canvas, model);

        let plan_images: Vec<_> = model
            .plan_images
            .iter()
            .take(self.output.max_plan_images)
            .collect();
        if !plan_images.is_empty() {
            canvas.reserve(112.0);
            for (i, extracted) in plan_images.iter().enumerate() {
                let name = format!("Plan{}", i + 1);
                let (w, h) = fit(&extracted.image, 160.0, 100.0);
                let id = doc.add_object(image_stream(&extracted.image));
                xobjects.set(name.as_str(), Object::Reference(id));
                canvas.image(&name, MARGIN_X - 30.0 + i as f32 * 190.0, canvas.y - h, w, h);
            }
            canvas.advance(112.0);
        }

        self.draw_fields(&mut canvas, model);
        self.draw_qa(&mut canvas, &model.qa_rows);

        // Three signature slots per row
        for (row, signatures) in model.assets.signatures.chunks(SIGNATURES_PER_ROW).enumerate() {
            canvas.reserve(SIGNATURE_ROW_HEIGHT);
            let base = canvas.y - 55.0;
            for (column, signature) in signatures.iter().enumerate() {
                let i = row * SIGNATURES_PER_ROW + column;
                let name = format!("Sig{}", i + 1);
                let x = MARGIN_X + column as f32 * 180.0;
                let (w, h) = fit(signature, 140.0, 50.0);
                let id = doc.add_object(image_stream(signature));
                xobjects.set(name.as_str(), Object::Reference(id));
                canvas.image(&name, x, base, w, h);
                canvas.rule(x, x + 140.0, base - 4.0);
                let caption = self.output.signature_captions.get(i).map(String::as_str).unwrap_or("");
                canvas.text(Font::Regular, 8.0, x, base - 14.0, caption);
            }
            canvas.advance(SIGNATURE_ROW_HEIGHT);
        }

        let pages = canvas.finish();
        debug!(pages = pages.len(), xobjects = xobjects.len(), "report content laid out");
        self.write_document(doc, pages, xobjects, model)
    }

    fn write_document(
        &self,
        mut doc: Document,
        pages: Vec<Vec<Operation>>,
        xobjects: Dictionary,
        model: &UnifiedReportModel,
    ) -> Result<Vec<u8>> {
        let pages_id: ObjectId = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! {
                Font::Regular.resource() => regular,
                Font::Bold.resource() => bold,
            },
            "XObject" => xobjects,
        });

        let mut kids = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(format!("rtreport {}", model.layout_version)),
            "Title" => Object::String(encode_win_ansi(model.title.trim_end()), StringFormat::Literal),
        });
        doc.trailer.set("Root", catalog);
        doc.trailer.set("Info", info);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }

    fn draw_header(&self, canvas: &mut Canvas, model: &UnifiedReportModel) {
        canvas.text(Font::Bold, 16.0, MARGIN_X, canvas.y, &model.title);
        canvas.advance(28.0);

        // Five rows on the left, four on the right
        let (left, right) = PatientField::ALL.split_at(5);
        for row in 0..left.len() {
            let y = canvas.y;
            for (column, field) in [(0.0, left.get(row)), (255.0, right.get(row))] {
                if let Some(field) = field {
                    let value = model.patient.get(*field).display();
                    canvas.text(Font::Bold, 8.0, MARGIN_X + column, y, patient_label(*field));
                    canvas.text(Font::Regular, 8.0, MARGIN_X + column + 92.0, y, &truncate(value, 32));
                }
            }
            canvas.advance(14.0);
        }
        canvas.advance(8.0);
    }

    fn draw_displacement(&self, canvas: &mut Canvas, model: &UnifiedReportModel) {
        canvas.reserve(50.0);
        canvas.text(Font::Bold, 10.0, MARGIN_X, canvas.y, "DESLOCAMENTO DA MESA");
        canvas.advance(7.0);
        canvas.rule(MARGIN_X, PAGE_WIDTH - MARGIN_X, canvas.y);
        canvas.advance(16.0);

        let values = model.displacement.values();
        for (i, (axis, value)) in AXES.iter().zip(values).enumerate() {
            let x = MARGIN_X + 15.0 + i as f32 * 170.0;
            canvas.text(Font::Bold, 9.0, x, canvas.y, &format!("{}:", axis));
            canvas.text(Font::Regular, 9.0, x + 78.0, canvas.y, value);
        }
        canvas.advance(10.0);
        canvas.rule(MARGIN_X, PAGE_WIDTH - MARGIN_X, canvas.y);
        canvas.advance(18.0);
    }

    fn draw_fields(&self, canvas: &mut Canvas, model: &UnifiedReportModel) {
        canvas.reserve(30.0);
        canvas.text(Font::Bold, 10.0, MARGIN_X, canvas.y, "PARÂMETROS DOS CAMPOS");
        canvas.advance(14.0);

        for index in 0..model.fields.len() {
            let Some((field, qa)) = model.field_view(index) else {
                continue;
            };
            canvas.reserve(9.0);
            canvas.text(Font::Bold, 6.0, MARGIN_X, canvas.y, &field.identifier);
            canvas.text(Font::Regular, 6.0, MARGIN_X + 30.0, canvas.y, &truncate(&field.values.join("  "), 125));
            if let Some(qa) = qa {
                self.draw_verdict(canvas, 6.0, PAGE_WIDTH - MARGIN_X - 40.0, canvas.y, qa);
            }
            canvas.advance(9.0);
        }

        if !model.rejected_fields.is_empty() {
            canvas.reserve(9.0);
            let note = format!("Registros descartados na validação: {}", model.rejected_fields.len());
            canvas.text(Font::Regular, 6.0, MARGIN_X, canvas.y, &note);
            canvas.advance(9.0);
        }
        canvas.advance(10.0);
    }

    fn draw_qa(&self, canvas: &mut Canvas, rows: &[QaRow]) {
        canvas.reserve(40.0);
        canvas.text(Font::Bold, 8.0, MARGIN_X, canvas.y, &self.output.qa_heading);
        canvas.advance(15.0);

        let columns = [
            (0.0, "Campo"),
            (70.0, "Tol. / DTA"),
            (180.0, "Área gama < 1,0"),
            (280.0, "Verificação"),
            (370.0, "Resultado"),
        ];
        for (x, header) in columns {
            canvas.text(Font::Bold, 7.0, MARGIN_X + x, canvas.y, header);
        }
        canvas.advance(12.0);

        for row in rows {
            canvas.reserve(12.0);
            let y = canvas.y;
            canvas.text(Font::Regular, 8.0, MARGIN_X, y, &row.field_id);
            canvas.text(Font::Regular, 8.0, MARGIN_X + 70.0, y, &row.dta_summary());
            canvas.text(Font::Regular, 8.0, MARGIN_X + 180.0, y, &format!("{} %", row.area_pct));
            canvas.text(Font::Regular, 8.0, MARGIN_X + 280.0, y, &format!("{} %", row.crosscheck_pct));
            self.draw_verdict(canvas, 8.0, MARGIN_X + 370.0, y, row);
            canvas.advance(12.0);
        }
        canvas.advance(10.0);
    }

    fn draw_verdict(&self, canvas: &mut Canvas, size: f32, x: f32, y: f32, row: &QaRow) {
        let rgb = if row.is_approved(self.approved_term) {
            APPROVED_RGB
        } else {
            REJECTED_RGB
        };
        canvas.colored_text(Font::Bold, size, x, y, &row.result, rgb);
    }
}

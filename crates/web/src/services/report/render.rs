//! PDF rendering of a [`ReportLayout`] with `genpdf`.

use std::path::Path;

use genpdf::elements::{Break, FramedElement, Image, LinearLayout, Paragraph};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Document, Element as _, Margins, SimplePageDecorator};

use super::ReportError;
use super::layout::{FOOTER_URL, IMAGE_MISSING_TEXT, NO_FINDINGS_TEXT, ReportLayout, Section};

const TITLE_COLOR: Color = Color::Rgb(0x2C, 0x3E, 0x50);
const HEADING_COLOR: Color = Color::Rgb(0x34, 0x49, 0x5E);
const PRODUCT_COLOR: Color = Color::Rgb(0x29, 0x80, 0xB9);
const BRAND_COLOR: Color = Color::Rgb(0x7F, 0x8C, 0x8D);

/// Page margin in millimetres (about 40pt).
const PAGE_MARGIN: u8 = 14;

/// Render `layout` to a PDF at `path` using the TTF family `font_family`
/// from `font_dir` (`{family}-Regular.ttf`, `-Bold`, `-Italic`,
/// `-BoldItalic`).
///
/// # Errors
///
/// Returns `ReportError::Font` if the fonts cannot be loaded and
/// `ReportError::Render` if the document cannot be written. An image that
/// fails to load is replaced by the placeholder text instead.
pub fn render_pdf(
    layout: &ReportLayout,
    font_dir: &Path,
    font_family: &str,
    path: &Path,
) -> Result<(), ReportError> {
    let fonts = genpdf::fonts::from_files(font_dir, font_family, None)
        .map_err(|e| ReportError::Font(e.to_string()))?;

    let mut doc = Document::new(fonts);
    doc.set_title(super::layout::REPORT_TITLE);
    doc.set_minimal_conformance();
    doc.set_line_spacing(1.25);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGIN);
    doc.set_page_decorator(decorator);

    for section in &layout.sections {
        push_section(&mut doc, section);
    }

    doc.render_to_file(path)
        .map_err(|e| ReportError::Render(e.to_string()))
}

fn push_section(doc: &mut Document, section: &Section) {
    match section {
        Section::Title(title) => {
            doc.push(
                Paragraph::new(title.as_str())
                    .aligned(Alignment::Center)
                    .styled(Style::new().bold().with_font_size(24).with_color(TITLE_COLOR)),
            );
            doc.push(Break::new(1.5));
        }
        Section::UserInfo {
            username,
            email,
            analyzed_at,
        } => {
            let info = LinearLayout::vertical()
                .element(
                    Paragraph::new("Kullanıcı Bilgileri")
                        .styled(Style::new().bold().with_font_size(14).with_color(HEADING_COLOR)),
                )
                .element(labelled("Kullanıcı Adı", username))
                .element(labelled("E-posta", email))
                .element(labelled("Analiz Tarihi", analyzed_at));
            doc.push(boxed(info));
            doc.push(Break::new(1));
        }
        Section::Heading(text) => {
            doc.push(Break::new(0.5));
            doc.push(
                Paragraph::new(*text)
                    .styled(Style::new().bold().with_font_size(16).with_color(HEADING_COLOR)),
            );
            doc.push(Break::new(0.5));
        }
        Section::Image(path) => match Image::from_path(path) {
            Ok(image) => {
                doc.push(image.with_alignment(Alignment::Center));
                doc.push(Break::new(1));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Report image unreadable");
                doc.push(Paragraph::new(IMAGE_MISSING_TEXT).styled(Style::new().bold()));
            }
        },
        Section::ImageMissing => {
            doc.push(Paragraph::new(IMAGE_MISSING_TEXT).styled(Style::new().bold()));
        }
        Section::Summary { lines, assessment } => {
            let mut summary = LinearLayout::vertical();
            for line in lines {
                summary.push(labelled(line.label, &line.value));
            }
            summary.push(
                Paragraph::new("Değerlendirme:")
                    .styled(Style::new().bold().with_color(HEADING_COLOR)),
            );
            summary.push(Paragraph::new(assessment.as_str()));
            doc.push(boxed(summary));
        }
        Section::Finding {
            category,
            count,
            severity,
        } => {
            let (r, g, b) = severity.rgb();
            let mut line = Paragraph::default();
            line.push(format!("• {}", Section::finding_text(*category, *count)));
            line.push_styled(
                format!(" (Şiddet: {})", severity.label()),
                Style::new().bold().with_color(Color::Rgb(r, g, b)),
            );
            doc.push(boxed(line));
            doc.push(Break::new(0.3));
        }
        Section::NoFindings => {
            doc.push(boxed(Paragraph::new(NO_FINDINGS_TEXT)));
        }
        Section::Recommendation(rec) => {
            let product = LinearLayout::vertical()
                .element(
                    Paragraph::new(rec.product_name.as_str())
                        .styled(Style::new().bold().with_font_size(14).with_color(PRODUCT_COLOR)),
                )
                .element(
                    Paragraph::new(rec.brand.as_str())
                        .styled(Style::new().italic().with_color(BRAND_COLOR)),
                )
                .element(Paragraph::new(rec.description.as_str()))
                .element(labelled("Fiyat Aralığı", &rec.price_range))
                .element(labelled("İçerikler", &rec.ingredients))
                .element(labelled("Kullanım", &rec.usage_instructions));
            doc.push(boxed(product));
            doc.push(Break::new(0.5));
        }
        Section::Footer { generated_on } => {
            doc.push(Break::new(2));
            let footer = LinearLayout::vertical()
                .element(
                    Paragraph::new(ReportLayout::footer_text(generated_on))
                        .aligned(Alignment::Center),
                )
                .element(Paragraph::new(FOOTER_URL).aligned(Alignment::Center));
            doc.push(boxed(footer.styled(Style::new().with_color(TITLE_COLOR))));
        }
    }
}

fn labelled(label: &str, value: &str) -> Paragraph {
    let mut paragraph = Paragraph::default();
    paragraph.push_styled(format!("{label}: "), Style::new().bold().with_color(HEADING_COLOR));
    paragraph.push(value.to_owned());
    paragraph
}

fn boxed<E: genpdf::Element>(element: E) -> FramedElement<genpdf::elements::PaddedElement<E>> {
    element.padded(Margins::all(3)).framed()
}

//! Report structure, independent of the PDF backend.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};

use hocskin_core::catalog::RecommendationTemplate;
use hocskin_core::{Category, ConditionCounts, Severity};

pub const REPORT_TITLE: &str = "HocSkin Cilt Analiz Raporu";
pub const IMAGE_MISSING_TEXT: &str = "Analiz görseli bulunamadı.";
pub const NO_FINDINGS_TEXT: &str = "Herhangi bir cilt sorunu tespit edilmedi.";
pub const FOOTER_URL: &str = "www.hocskin.com";

/// Who the report is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUser {
    pub username: String,
    pub email: String,
}

/// Everything a report is built from.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub skin_type: String,
    pub base_age: f64,
    pub skin_age: f64,
    pub assessment: String,
    pub counts: ConditionCounts,
    pub recommendations: Vec<RecommendationTemplate>,
    /// Absolute path of the annotated image.
    pub image: PathBuf,
    pub user: Option<ReportUser>,
    pub analyzed_at: DateTime<Utc>,
}

/// One labelled line of the summary box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub label: &'static str,
    pub value: String,
}

/// A block of the report, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Title(String),
    UserInfo {
        username: String,
        email: String,
        analyzed_at: String,
    },
    Heading(&'static str),
    Image(PathBuf),
    ImageMissing,
    Summary {
        lines: Vec<SummaryLine>,
        assessment: String,
    },
    Finding {
        category: Category,
        count: u32,
        severity: Severity,
    },
    NoFindings,
    Recommendation(RecommendationTemplate),
    Footer {
        generated_on: String,
    },
}

impl Section {
    /// Text of a finding line, e.g. "Sivilce: 4 adet tespit edildi".
    #[must_use]
    pub fn finding_text(category: Category, count: u32) -> String {
        format!("{}: {count} {} tespit edildi", category.label(), category.unit())
    }
}

/// The ordered sections of one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub sections: Vec<Section>,
}

impl ReportLayout {
    /// Lay out a report.
    ///
    /// `image_available` says whether `data.image` can be read; when it
    /// can't, the image is replaced by a text placeholder.
    #[must_use]
    pub fn build(data: &ReportData, image_available: bool, generated_at: DateTime<Local>) -> Self {
        let mut sections = vec![Section::Title(REPORT_TITLE.to_string())];

        if let Some(user) = &data.user {
            sections.push(Section::UserInfo {
                username: user.username.clone(),
                email: user.email.clone(),
                analyzed_at: data
                    .analyzed_at
                    .with_timezone(&Local)
                    .format("%d/%m/%Y %H:%M")
                    .to_string(),
            });
        }

        sections.push(Section::Heading("Analiz Görseli"));
        sections.push(if image_available {
            Section::Image(data.image.clone())
        } else {
            Section::ImageMissing
        });

        sections.push(Section::Heading("Cilt Analizi Sonuçları"));
        sections.push(Section::Summary {
            lines: vec![
                SummaryLine {
                    label: "Cilt Tipi",
                    value: data.skin_type.clone(),
                },
                SummaryLine {
                    label: "Tahmini Yaş",
                    value: format!("{} yaş", format_age(data.base_age)),
                },
                SummaryLine {
                    label: "Cilt Yaşı",
                    value: format!("{} yaş", format_age(data.skin_age)),
                },
            ],
            assessment: data.assessment.clone(),
        });

        sections.push(Section::Heading("Tespit Edilen Cilt Sorunları"));
        let findings: Vec<Section> = data
            .counts
            .iter()
            .filter(|&(_, count)| count > 0)
            .map(|(category, count)| Section::Finding {
                category,
                count,
                severity: Severity::from_count(count),
            })
            .collect();
        if findings.is_empty() {
            sections.push(Section::NoFindings);
        } else {
            sections.extend(findings);
        }

        if !data.recommendations.is_empty() {
            sections.push(Section::Heading("Kişiselleştirilmiş Ürün Önerileri"));
            sections.extend(
                data.recommendations
                    .iter()
                    .cloned()
                    .map(Section::Recommendation),
            );
        }

        sections.push(Section::Footer {
            generated_on: generated_at.format("%d/%m/%Y").to_string(),
        });

        Self { sections }
    }

    /// File name for a report generated at `at`.
    #[must_use]
    pub fn file_name(at: DateTime<Local>) -> String {
        format!("hocskin_rapor_{}.pdf", at.format("%Y%m%d_%H%M%S"))
    }

    /// Footer sentence for the given date.
    #[must_use]
    pub fn footer_text(generated_on: &str) -> String {
        format!("Bu rapor HocSkin tarafından {generated_on} tarihinde oluşturulmuştur.")
    }
}

/// Ages print without a trailing `.0`.
fn format_age(age: f64) -> String {
    if age.fract().abs() < f64::EPSILON {
        format!("{age:.0}")
    } else {
        format!("{age:.1}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn template(name: &str) -> RecommendationTemplate {
        RecommendationTemplate {
            product_name: name.to_string(),
            brand: "Marka".to_string(),
            product_type: "serum".to_string(),
            description: "Açıklama".to_string(),
            price_range: "orta".to_string(),
            ingredients: "Niasinamid".to_string(),
            usage_instructions: "Akşamları".to_string(),
            target_skin_type: None,
        }
    }

    fn data(counts: ConditionCounts) -> ReportData {
        ReportData {
            skin_type: "karma".to_string(),
            base_age: 30.0,
            skin_age: 32.5,
            assessment: "Cildiniz gerçek yaşınızdan biraz daha olgun görünüyor.".to_string(),
            counts,
            recommendations: vec![template("A"), template("B")],
            image: PathBuf::from("/tmp/results/combined_x.jpg"),
            user: Some(ReportUser {
                username: "ayse".to_string(),
                email: "ayse@example.com".to_string(),
            }),
            analyzed_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 15, 8, 5, 9).unwrap()
    }

    fn kinds(layout: &ReportLayout) -> Vec<&'static str> {
        layout
            .sections
            .iter()
            .map(|s| match s {
                Section::Title(_) => "title",
                Section::UserInfo { .. } => "user",
                Section::Heading(_) => "heading",
                Section::Image(_) => "image",
                Section::ImageMissing => "image_missing",
                Section::Summary { .. } => "summary",
                Section::Finding { .. } => "finding",
                Section::NoFindings => "no_findings",
                Section::Recommendation(_) => "recommendation",
                Section::Footer { .. } => "footer",
            })
            .collect()
    }

    #[test]
    fn test_section_order() {
        let layout = ReportLayout::build(&data(ConditionCounts::new(2, 0, 7, 4)), true, now());
        assert_eq!(
            kinds(&layout),
            vec![
                "title",
                "user",
                "heading",
                "image",
                "heading",
                "summary",
                "heading",
                "finding",
                "finding",
                "finding",
                "heading",
                "recommendation",
                "recommendation",
                "footer",
            ]
        );
    }

    #[test]
    fn test_findings_carry_severity() {
        let layout = ReportLayout::build(&data(ConditionCounts::new(2, 0, 7, 4)), true, now());
        let findings: Vec<_> = layout
            .sections
            .iter()
            .filter_map(|s| match s {
                Section::Finding {
                    category,
                    count,
                    severity,
                } => Some((*category, *count, *severity)),
                _ => None,
            })
            .collect();
        assert_eq!(
            findings,
            vec![
                (Category::Acne, 2, Severity::Low),
                (Category::Eyebag, 7, Severity::High),
                (Category::Redness, 4, Severity::Medium),
            ]
        );
    }

    #[test]
    fn test_missing_image_and_no_findings() {
        let mut input = data(ConditionCounts::default());
        input.user = None;
        input.recommendations.clear();
        let layout = ReportLayout::build(&input, false, now());
        assert_eq!(
            kinds(&layout),
            vec![
                "title",
                "heading",
                "image_missing",
                "heading",
                "summary",
                "heading",
                "no_findings",
                "footer",
            ]
        );
    }

    #[test]
    fn test_summary_values() {
        let layout = ReportLayout::build(&data(ConditionCounts::default()), true, now());
        let Some(Section::Summary { lines, assessment }) = layout
            .sections
            .iter()
            .find(|s| matches!(s, Section::Summary { .. }))
        else {
            panic!("summary missing");
        };
        assert_eq!(lines[0].value, "karma");
        assert_eq!(lines[1].value, "30 yaş");
        assert_eq!(lines[2].value, "32.5 yaş");
        assert!(assessment.contains("biraz daha olgun"));
    }

    #[test]
    fn test_footer_and_file_name() {
        let layout = ReportLayout::build(&data(ConditionCounts::default()), true, now());
        assert_eq!(
            layout.sections.last(),
            Some(&Section::Footer {
                generated_on: "15/03/2025".to_string()
            })
        );
        assert_eq!(
            ReportLayout::footer_text("15/03/2025"),
            "Bu rapor HocSkin tarafından 15/03/2025 tarihinde oluşturulmuştur."
        );
        assert_eq!(ReportLayout::file_name(now()), "hocskin_rapor_20250315_080509.pdf");
    }

    #[test]
    fn test_finding_text() {
        assert_eq!(
            Section::finding_text(Category::Redness, 3),
            "Kızarıklık: 3 bölge tespit edildi"
        );
        assert_eq!(Section::finding_text(Category::Acne, 1), "Sivilce: 1 adet tespit edildi");
    }
}

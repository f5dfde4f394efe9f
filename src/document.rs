//! Page surface, captured pages, and the finalized PDF document.
//!
//! A single [`PageSurface`] stands in for the off-screen rendering container:
//! the renderer mounts one page's content onto it, captures the content into a
//! [`RenderedPage`], and resets it before the next page.  Captured pages are
//! collected by a [`GeneratedDocument`] in strict index order and turned into
//! the final PDF bytes exactly once.

use genpdf::elements::{Break, Image, PageBreak, Paragraph};
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Mm, Scale, Size};

use crate::charts::{self, BarChartSpec, PieChartSpec};
use crate::error::ReportError;
use crate::fonts;

/// Landscape page width in millimetres (A4 flipped).
pub const PAGE_WIDTH_MM: f64 = 297.0;
/// Landscape page height in millimetres (A4 flipped).
pub const PAGE_HEIGHT_MM: f64 = 210.0;

/// DPI assumed by the PDF layer for embedded rasters.
const IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

/// File extension of every generated document.
pub const DOCUMENT_EXTENSION: &str = "pdf";

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

/// Content mounted on the surface before capture.
///
/// Chart blocks hold drawing specifications; rasterization happens at capture
/// time so the capture scale applies uniformly.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceBlock {
    /// Page-level heading.
    Heading(String),
    /// Secondary line under a heading.
    Subheading(String),
    /// One labeled metric value.
    StatRow {
        /// Metric label.
        label: String,
        /// Already-formatted display value.
        value: String,
    },
    /// One legend entry with its palette swatch color.
    LegendRow {
        /// RGB swatch color matching the chart slice.
        swatch: [u8; 3],
        /// Category label.
        label: String,
        /// Formatted weight/percentage detail.
        detail: String,
    },
    /// Pie-style breakdown chart.
    PieChart(PieChartSpec),
    /// Bar chart over a period series.
    BarChart(BarChartSpec),
    /// Vertical whitespace, in text lines.
    Spacer(f64),
}

/// Captured page content, charts already rasterized.
#[derive(Clone, Debug, PartialEq)]
pub enum PageBlock {
    /// Page-level heading.
    Heading(String),
    /// Secondary line under a heading.
    Subheading(String),
    /// One labeled metric value.
    StatRow { label: String, value: String },
    /// One legend entry.
    LegendRow {
        swatch: [u8; 3],
        label: String,
        detail: String,
    },
    /// Rasterized chart and its rendered width on the page.
    ChartImage { png: Vec<u8>, width_mm: f64 },
    /// Vertical whitespace, in text lines.
    Spacer(f64),
}

/// The reusable off-screen page container.
///
/// Exactly one surface exists per renderer; it must be reset between pages
/// and between members.  Mounting while stale content is present is a bug in
/// the caller, which `reset` makes impossible to hit in the sequential loop.
#[derive(Debug, Default)]
pub struct PageSurface {
    title: String,
    blocks: Vec<SurfaceBlock>,
}

impl PageSurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all mounted content.
    pub fn reset(&mut self) {
        self.title.clear();
        self.blocks.clear();
    }

    /// Whether nothing is currently mounted.
    pub fn is_clear(&self) -> bool {
        self.title.is_empty() && self.blocks.is_empty()
    }

    /// Sets the page title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Mounts one content block.
    pub fn mount(&mut self, block: SurfaceBlock) {
        self.blocks.push(block);
    }

    /// Captures the mounted content into a page, rasterizing charts at
    /// `capture_scale ×` display density.
    pub fn capture(&self, index: usize, capture_scale: f64) -> Result<RenderedPage, ReportError> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let captured = match block {
                SurfaceBlock::Heading(text) => PageBlock::Heading(text.clone()),
                SurfaceBlock::Subheading(text) => PageBlock::Subheading(text.clone()),
                SurfaceBlock::StatRow { label, value } => PageBlock::StatRow {
                    label: label.clone(),
                    value: value.clone(),
                },
                SurfaceBlock::LegendRow {
                    swatch,
                    label,
                    detail,
                } => PageBlock::LegendRow {
                    swatch: *swatch,
                    label: label.clone(),
                    detail: detail.clone(),
                },
                SurfaceBlock::PieChart(spec) => {
                    let png = charts::rasterize_pie(spec, capture_scale, index)?;
                    PageBlock::ChartImage {
                        png,
                        width_mm: px_to_mm(spec.diameter_px()),
                    }
                }
                SurfaceBlock::BarChart(spec) => {
                    let png = charts::rasterize_bars(spec, capture_scale, index)?;
                    PageBlock::ChartImage {
                        png,
                        width_mm: px_to_mm(spec.size_px().0),
                    }
                }
                SurfaceBlock::Spacer(lines) => PageBlock::Spacer(*lines),
            };
            blocks.push(captured);
        }

        Ok(RenderedPage {
            index,
            title: self.title.clone(),
            blocks,
        })
    }
}

fn px_to_mm(px: u32) -> f64 {
    // Display density of the page geometry: 96 px per inch.
    (px as f64) * MM_PER_INCH / 96.0
}

/// One captured report page.
///
/// Owned exclusively by the generation run that produced it; appended to the
/// document exactly once and discarded with it.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedPage {
    /// Zero-based position within the document.
    pub index: usize,
    /// Page heading.
    pub title: String,
    /// Captured content in layout order.
    pub blocks: Vec<PageBlock>,
}

/// An in-progress paginated document.
#[derive(Debug)]
pub struct GeneratedDocument {
    member_name: String,
    period_label: String,
    pages: Vec<RenderedPage>,
}

impl GeneratedDocument {
    /// Starts an empty document for one member and period.
    pub fn new(member_name: impl Into<String>, period_label: impl Into<String>) -> Self {
        Self {
            member_name: member_name.into(),
            period_label: period_label.into(),
            pages: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The appended pages, in order.
    pub fn pages(&self) -> &[RenderedPage] {
        &self.pages
    }

    /// Appends the next page.
    ///
    /// Pages carry the index they were rendered for; the document refuses
    /// anything but the next sequential index, so ordering mistakes surface
    /// immediately instead of producing a shuffled report.
    pub fn append_page(&mut self, page: RenderedPage) -> Result<(), ReportError> {
        if page.index != self.pages.len() {
            return Err(ReportError::PageOutOfOrder {
                got: page.index,
                expected: self.pages.len(),
            });
        }
        self.pages.push(page);
        Ok(())
    }

    /// Filename the finalized document will carry.
    pub fn filename(&self) -> String {
        format!(
            "{}_{} Report.{}",
            self.member_name, self.period_label, DOCUMENT_EXTENSION
        )
    }

    /// Renders all pages into the final landscape PDF.
    ///
    /// Consumes the document; a finalized report is never mutated again.
    pub fn finalize(self) -> Result<FinalizedReport, ReportError> {
        let filename = self.filename();
        let page_count = self.pages.len();

        let font_family = fonts::default_font_family()?;
        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(filename.clone());
        doc.set_paper_size(Size::new(
            mm_from_f64(PAGE_WIDTH_MM),
            mm_from_f64(PAGE_HEIGHT_MM),
        ));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(12);
        doc.set_page_decorator(decorator);

        for page in &self.pages {
            if page.index > 0 {
                doc.push(PageBreak::new());
            }
            push_page(&mut doc, page)?;
        }

        let mut bytes = Vec::new();
        doc.render(&mut bytes)?;

        Ok(FinalizedReport {
            filename,
            bytes,
            page_count,
        })
    }
}

fn heading_style() -> Style {
    let mut style = Style::new();
    style.set_bold();
    style.set_font_size(20);
    style
}

fn subheading_style() -> Style {
    let mut style = Style::new();
    style.set_font_size(12);
    style.set_color(Color::Rgb(90, 90, 90));
    style
}

fn stat_label_style() -> Style {
    let mut style = Style::new();
    style.set_font_size(11);
    style
}

fn stat_value_style() -> Style {
    let mut style = Style::new();
    style.set_bold();
    style.set_font_size(11);
    style
}

fn push_page(doc: &mut genpdf::Document, page: &RenderedPage) -> Result<(), ReportError> {
    if !page.title.is_empty() {
        let mut title = Paragraph::default();
        title.push_styled(page.title.clone(), heading_style());
        doc.push(title);
        doc.push(Break::new(0.8));
    }

    for block in &page.blocks {
        match block {
            PageBlock::Heading(text) => {
                let mut paragraph = Paragraph::default();
                paragraph.push_styled(text.clone(), heading_style());
                doc.push(paragraph);
            }
            PageBlock::Subheading(text) => {
                let mut paragraph = Paragraph::default();
                paragraph.push_styled(text.clone(), subheading_style());
                doc.push(paragraph);
            }
            PageBlock::StatRow { label, value } => {
                let mut paragraph = Paragraph::default();
                paragraph.push_styled(format!("{}:  ", label), stat_label_style());
                paragraph.push_styled(value.clone(), stat_value_style());
                doc.push(paragraph);
            }
            PageBlock::LegendRow {
                swatch,
                label,
                detail,
            } => {
                let mut swatch_style = Style::new();
                swatch_style.set_color(Color::Rgb(swatch[0], swatch[1], swatch[2]));
                let mut paragraph = Paragraph::default();
                paragraph.push_styled("\u{25A0} ", swatch_style);
                paragraph.push_styled(format!("{}  ", label), stat_label_style());
                paragraph.push_styled(detail.clone(), stat_value_style());
                doc.push(paragraph);
            }
            PageBlock::ChartImage { png, width_mm } => {
                let dynamic = image::load_from_memory(png).map_err(|err| {
                    ReportError::RenderFault {
                        page: page.index,
                        reason: format!("captured chart could not be decoded: {}", err),
                    }
                })?;
                use image::GenericImageView;
                let (px_width, _) = dynamic.dimensions();
                let natural_mm = (px_width as f64) * MM_PER_INCH / IMAGE_DPI;
                let mut element = Image::from_dynamic_image(dynamic)?;
                if natural_mm > f64::EPSILON {
                    let scale = width_mm / natural_mm;
                    element.set_scale(Scale::new(scale, scale));
                }
                element.set_alignment(Alignment::Center);
                doc.push(element);
            }
            PageBlock::Spacer(lines) => {
                doc.push(Break::new(*lines));
            }
        }
    }

    Ok(())
}

/// A finalized multi-page report.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalizedReport {
    /// Download filename, extension included.
    pub filename: String,
    /// Rendered PDF bytes.
    pub bytes: Vec<u8>,
    /// Number of pages in the document.
    pub page_count: usize,
}

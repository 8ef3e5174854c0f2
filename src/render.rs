//! # PDF Rendering
//!
//! Turns a markdown report into a PDF with `genpdf`. The markdown is first
//! flattened into [`Block`]s with `pulldown-cmark`, then each block becomes a
//! styled paragraph. Rendering is blocking work and runs on tokio's blocking
//! pool.

use async_trait::async_trait;
use genpdf::elements::{Break, Image, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, SimplePageDecorator};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RenderError;
use crate::pipeline::ReportRenderer;

/// A renderable chunk of a markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(u8, String),
    Paragraph(String),
    ListItem(String),
    Code(String),
}

/// Flatten markdown into blocks. Inline formatting is dropped.
pub fn markdown_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut text = String::new();
    let mut list_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { .. })
            | Event::Start(Tag::CodeBlock(_))
            | Event::Start(Tag::Item) => text.clear(),
            Event::Start(Tag::Paragraph) if list_depth == 0 => text.clear(),
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => list_depth = list_depth.saturating_sub(1),

            Event::End(TagEnd::Heading(level)) => {
                blocks.push(Block::Heading(level as u8, text.trim().to_string()));
                text.clear();
            }
            Event::End(TagEnd::Paragraph) if list_depth == 0 => {
                push_text(&mut blocks, &mut text, Block::Paragraph);
            }
            Event::End(TagEnd::Paragraph) => text.push(' '),
            Event::End(TagEnd::Item) => push_text(&mut blocks, &mut text, Block::ListItem),
            Event::End(TagEnd::CodeBlock) => {
                let code = text.trim_end().to_string();
                if !code.is_empty() {
                    blocks.push(Block::Code(code));
                }
                text.clear();
            }

            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    blocks
}

fn push_text(blocks: &mut Vec<Block>, text: &mut String, make: fn(String) -> Block) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        blocks.push(make(trimmed.to_string()));
    }
    text.clear();
}

fn heading_size(level: u8) -> u8 {
    match level {
        1 => 18,
        2 => 15,
        3 => 13,
        _ => 12,
    }
}

const REPORT_TITLE: &str = "Research Report";

/// Renders reports to timestamped PDF files.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    output_dir: PathBuf,
    font_dir: PathBuf,
    font_family: String,
}

impl PdfRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, font_dir: impl Into<PathBuf>, font_family: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            font_dir: font_dir.into(),
            font_family: font_family.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.pdf_output_dir, &config.font_dir, &config.font_family)
    }

    fn render_blocking(&self, markdown: &str, image: Option<&Path>) -> Result<PathBuf, RenderError> {
        let fonts = genpdf::fonts::from_files(&self.font_dir, &self.font_family, None)
            .map_err(|e| RenderError::Font(format!("{} in {}: {}", self.font_family, self.font_dir.display(), e)))?;

        let mut doc = Document::new(fonts);
        doc.set_title(REPORT_TITLE);
        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(20);
        doc.set_page_decorator(decorator);

        doc.push(Paragraph::new(StyledString::new(
            REPORT_TITLE,
            Style::new().bold().with_font_size(22),
        )));
        doc.push(Break::new(1));

        if let Some(path) = image {
            match Image::from_path(path) {
                Ok(image) => {
                    doc.push(image.with_alignment(Alignment::Center));
                    doc.push(Break::new(1));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping hero image"),
            }
        }

        for block in markdown_blocks(markdown) {
            match block {
                Block::Heading(level, text) => {
                    doc.push(Break::new(0.5));
                    doc.push(Paragraph::new(StyledString::new(
                        text,
                        Style::new().bold().with_font_size(heading_size(level)),
                    )));
                }
                Block::Paragraph(text) => doc.push(Paragraph::new(text)),
                Block::ListItem(text) => doc.push(Paragraph::new(format!("- {}", text))),
                Block::Code(code) => {
                    for line in code.lines() {
                        doc.push(Paragraph::new(StyledString::new(
                            line.to_string(),
                            Style::new().with_font_size(9),
                        )));
                    }
                }
            }
            doc.push(Break::new(0.5));
        }

        fs::create_dir_all(&self.output_dir)?;
        let filename = format!(
            "research_report_{}.pdf",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);
        debug!(path = %path.display(), "Writing PDF");

        doc.render_to_file(&path)
            .map_err(|e| RenderError::Render(e.to_string()))?;
        Ok(path)
    }
}

#[async_trait]
impl ReportRenderer for PdfRenderer {
    async fn render(&self, markdown: &str, image: Option<&Path>) -> Result<PathBuf, RenderError> {
        let renderer = self.clone();
        let markdown = markdown.to_string();
        let image = image.map(Path::to_path_buf);

        tokio::task::spawn_blocking(move || renderer.render_blocking(&markdown, image.as_deref()))
            .await
            .map_err(|e| RenderError::Render(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_blocks() {
        let markdown = "# Pizza in Rome\n\nRome has *great* pizza.\nReally.\n\n\
                        ## Places\n\n- Da Remo\n- Pizzarium\n\n```\nlet x = 1;\n```\n";

        assert_eq!(
            markdown_blocks(markdown),
            vec![
                Block::Heading(1, "Pizza in Rome".to_string()),
                Block::Paragraph("Rome has great pizza. Really.".to_string()),
                Block::Heading(2, "Places".to_string()),
                Block::ListItem("Da Remo".to_string()),
                Block::ListItem("Pizzarium".to_string()),
                Block::Code("let x = 1;".to_string()),
            ]
        );
    }

    #[test]
    fn test_loose_list_items_keep_text() {
        let blocks = markdown_blocks("- first\n\n- second\n");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem("first".to_string()),
                Block::ListItem("second".to_string()),
            ]
        );
    }

    #[test]
    fn test_heading_sizes_shrink() {
        assert!(heading_size(1) > heading_size(2));
        assert_eq!(heading_size(6), 12);
    }

    #[tokio::test]
    async fn test_missing_fonts_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfRenderer::new(dir.path().join("out"), dir.path().join("no-fonts"), "Missing");

        let err = renderer.render("# Report", None).await.unwrap_err();
        assert!(matches!(err, RenderError::Font(_)));
        assert!(!dir.path().join("out").exists());
    }
}

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use super::{ExportError, ReportTable};

// A4 portrait, millimetres.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;

const TITLE_Y: f32 = 15.0;
const RULE_Y: f32 = 20.0;
const RULE_INSET: f32 = 14.0;
const TABLE_START_Y: f32 = 25.0;

const TITLE_SIZE: f32 = 18.0;
const CELL_SIZE: f32 = 8.0;
const CELL_PADDING: f32 = 2.0;
const LINE_HEIGHT: f32 = 3.6;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_RATIO: f32 = 0.5;

/// Paginated grid table with a centered title and a separator rule.
///
/// The header row repeats at the top of every page.
pub fn render_pdf(table: &ReportTable) -> Result<Vec<u8>, ExportError> {
    let (doc, page, layer) =
        PdfDocument::new(table.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Render(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Render(e.to_string()))?;

    let col_width = (PAGE_WIDTH - 2.0 * MARGIN) / table.columns.len() as f32;
    let max_chars = chars_that_fit(col_width - 2.0 * CELL_PADDING, CELL_SIZE);

    let header: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|c| wrap(c, max_chars))
        .collect();
    let header_height = row_height(line_count(&header));

    let first = doc.get_page(page).get_layer(layer);
    draw_title(&first, &bold, table.title);

    let mut canvas = Canvas {
        layer: first,
        top: TABLE_START_Y,
        y: TABLE_START_Y,
        col_width,
        columns: table.columns.len(),
    };
    canvas.header(&header, header_height, &bold);

    for row in &table.rows {
        let cells = wrap_row(row, max_chars);
        let height = row_height(line_count(&cells));
        if canvas.y + height > PAGE_HEIGHT - MARGIN {
            canvas.close_grid();
            canvas = canvas.next_page(&doc);
            canvas.header(&header, header_height, &bold);
        }

        canvas.row(&cells, height, &regular, black());
    }
    canvas.close_grid();
    drop(canvas);

    doc.save_to_bytes()
        .map_err(|e| ExportError::Render(e.to_string()))
}

struct Canvas {
    layer: PdfLayerReference,
    /// Top of the table on this page, from the top edge.
    top: f32,
    /// Next free row position, from the top edge.
    y: f32,
    col_width: f32,
    columns: usize,
}

impl Canvas {
    fn next_page(self, doc: &PdfDocumentReference) -> Self {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
        Self {
            layer: doc.get_page(page).get_layer(layer),
            top: MARGIN,
            y: MARGIN,
            ..self
        }
    }

    fn header(&mut self, cells: &[Vec<String>], height: f32, font: &IndirectFontRef) {
        self.row(cells, height, font, header_blue());
    }

    fn row(&mut self, cells: &[Vec<String>], height: f32, font: &IndirectFontRef, color: Color) {
        self.layer.set_fill_color(color);
        for (col, lines) in cells.iter().enumerate() {
            let x = MARGIN + col as f32 * self.col_width + CELL_PADDING;
            for (i, line) in lines.iter().enumerate() {
                let baseline = self.y + CELL_PADDING + (i as f32 + 1.0) * LINE_HEIGHT - 0.8;
                self.layer
                    .use_text(line.as_str(), CELL_SIZE, Mm(x), Mm(PAGE_HEIGHT - baseline), font);
            }
        }

        self.y += height;
        self.hline(self.y);
    }

    /// Outer top rule plus the vertical column rules for this page.
    fn close_grid(&self) {
        self.layer.set_outline_color(grid_gray());
        self.layer.set_outline_thickness(0.2);
        self.hline(self.top);
        for col in 0..=self.columns {
            let x = MARGIN + col as f32 * self.col_width;
            self.segment((x, self.top), (x, self.y));
        }
    }

    fn hline(&self, y: f32) {
        self.layer.set_outline_color(grid_gray());
        self.layer.set_outline_thickness(0.2);
        self.segment((MARGIN, y), (PAGE_WIDTH - MARGIN, y));
    }

    fn segment(&self, from: (f32, f32), to: (f32, f32)) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(from.0), Mm(PAGE_HEIGHT - from.1)), false),
                (Point::new(Mm(to.0), Mm(PAGE_HEIGHT - to.1)), false),
            ],
            is_closed: false,
        });
    }
}

fn draw_title(layer: &PdfLayerReference, font: &IndirectFontRef, title: &str) {
    let width = text_width(title, TITLE_SIZE);
    layer.set_fill_color(header_blue());
    layer.use_text(
        title,
        TITLE_SIZE,
        Mm((PAGE_WIDTH - width) / 2.0),
        Mm(PAGE_HEIGHT - TITLE_Y),
        font,
    );

    layer.set_outline_color(Color::Rgb(Rgb::new(0.59, 0.59, 0.59, None)));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(RULE_INSET), Mm(PAGE_HEIGHT - RULE_Y)), false),
            (
                Point::new(Mm(PAGE_WIDTH - RULE_INSET), Mm(PAGE_HEIGHT - RULE_Y)),
                false,
            ),
        ],
        is_closed: false,
    });
}

fn row_height(lines: usize) -> f32 {
    lines as f32 * LINE_HEIGHT + 2.0 * CELL_PADDING
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * GLYPH_RATIO
}

fn chars_that_fit(width: f32, size: f32) -> usize {
    ((width / (size * PT_TO_MM * GLYPH_RATIO)).floor() as usize).max(1)
}

/// Lines per cell; every cell keeps its full text.
fn wrap_row(row: &[String], max: usize) -> Vec<Vec<String>> {
    row.iter().map(|cell| wrap(cell, max)).collect()
}

fn line_count(cells: &[Vec<String>]) -> usize {
    cells.iter().map(Vec::len).max().unwrap_or(1).max(1)
}

/// Word-wrap text into lines of at most `max` characters.
///
/// Words longer than a line are split across lines.
fn wrap(text: &str, max: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let len = word.chars().count();
        match lines.last_mut() {
            Some(line) if line.chars().count() + 1 + len <= max => {
                line.push(' ');
                line.push_str(word);
                continue;
            }
            _ => {}
        }

        if len <= max {
            lines.push(word.to_string());
        } else {
            let chars: Vec<char> = word.chars().collect();
            lines.extend(chars.chunks(max).map(|chunk| chunk.iter().collect::<String>()));
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn header_blue() -> Color {
    Color::Rgb(Rgb::new(0.13, 0.59, 0.95, None))
}

fn grid_gray() -> Color {
    Color::Rgb(Rgb::new(0.86, 0.86, 0.86, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;

    fn table(rows: usize) -> ReportTable {
        ReportTable {
            layer: LayerKind::Temperature,
            title: LayerKind::Temperature.report_title(),
            columns: LayerKind::Temperature.report_columns(),
            rows: (0..rows)
                .map(|i| {
                    vec![
                        format!("Point {i}"),
                        "31.2357".into(),
                        "30.0444".into(),
                        "21".into(),
                        "25".into(),
                        "15".into(),
                        "8".into(),
                    ]
                })
                .collect(),
        }
    }

    #[test]
    fn wrap_splits_on_words() {
        assert_eq!(
            wrap("Current Temperature (°C)", 12),
            vec!["Current", "Temperature", "(°C)"]
        );
        assert_eq!(wrap("Lon", 12), vec!["Lon"]);
        assert_eq!(wrap("", 12), vec![""]);
    }

    #[test]
    fn long_words_are_split_not_cut() {
        assert_eq!(wrap("1013.25hPa", 4), vec!["1013", ".25h", "Pa"]);
    }

    #[test]
    fn eight_column_cells_wrap_instead_of_truncating() {
        let columns = LayerKind::Wind.report_columns().len();
        let max = chars_that_fit((PAGE_WIDTH - 2.0 * MARGIN) / columns as f32 - 2.0 * CELL_PADDING, CELL_SIZE);
        let row: Vec<String> = ["Kafr El Sheikh", "30.9396", "31.1107", "15", "E (90)", "", "Moderate Breeze", "18.2"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        let cells = wrap_row(&row, max);

        assert_eq!(cells[6], vec!["Moderate", "Breeze"]);
        assert_eq!(cells[0].join(" "), "Kafr El Sheikh");
        assert!(cells.iter().flatten().all(|line| !line.contains("..")));
        assert_eq!(line_count(&cells), 2);
        assert_eq!(cells[5], vec![""]);
    }

    #[test]
    fn renders_single_page_document() {
        let bytes = render_pdf(&table(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_tables_span_pages() {
        let short = render_pdf(&table(1)).unwrap();
        let long = render_pdf(&table(120)).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }
}

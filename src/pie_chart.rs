use std::convert::Infallible;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_7X13, FONT_9X15_BOLD};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyleBuilder, Rectangle, Sector};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};

use crate::report::{write_atomically, ReportWriter};
use crate::summary::EmployeeShare;

/// 円グラフの出力先。
pub const PIE_CHART_PATH: &str = "EmployeeTimePieChart.png";

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

/// 最初の扇形を描き始める角度。x軸の正の向きから時計回り。
pub const REFERENCE_ANGLE: f32 = 0.0;

const TITLE: &str = "Employee Time Distribution";
const PIE_DIAMETER: u32 = 300;
const PIE_TOP: i32 = 60;
const LEGEND_LEFT: i32 = 50;
const LEGEND_TOP: i32 = PIE_TOP + PIE_DIAMETER as i32 + 40;
const LEGEND_BOX_SIZE: u32 = 20;
const LEGEND_LINE_HEIGHT: i32 = 25;
const LEGEND_COLUMN_WIDTH: i32 = 370;

/// 扇形と凡例に順番に割り当てる色。従業員数が色数を超えると再利用する。
pub const PALETTE: [Rgb888; 10] = [
    Rgb888::new(66, 133, 244),
    Rgb888::new(234, 67, 63),
    Rgb888::new(251, 188, 7),
    Rgb888::new(52, 168, 82),
    Rgb888::new(171, 71, 188),
    Rgb888::new(0, 150, 136),
    Rgb888::new(255, 87, 34),
    Rgb888::new(103, 58, 183),
    Rgb888::new(205, 220, 57),
    Rgb888::new(121, 85, 72),
];

const OUTLINE: Rgb888 = Rgb888::new(169, 169, 169);

/// 円グラフの1つの扇形。
#[derive(Clone, Debug, PartialEq)]
pub struct Wedge {
    pub start_degrees: f32,
    pub sweep_degrees: f32,
    pub color: Rgb888,
}

/// 集計結果の順に、隙間なく並ぶ扇形を計算する。
pub fn layout_wedges(shares: &[EmployeeShare]) -> Vec<Wedge> {
    let mut current = REFERENCE_ANGLE;
    shares
        .iter()
        .enumerate()
        .map(|(index, share)| {
            let sweep = (share.percentage_of_total / 100.0 * 360.0) as f32;
            let wedge = Wedge {
                start_degrees: current,
                sweep_degrees: sweep,
                color: palette_color(index),
            };
            current += sweep;
            wedge
        })
        .collect()
}

/// 凡例に表示する文字列。
pub fn legend_label(share: &EmployeeShare) -> String {
    format!(
        "{}: {:.2}% ({:.2} hours)",
        share.name, share.percentage_of_total, share.total_hours
    )
}

fn palette_color(index: usize) -> Rgb888 {
    PALETTE[index % PALETTE.len()]
}

/// `RgbImage`に描画するための`DrawTarget`。範囲外の点は捨てる。
struct Canvas {
    image: RgbImage,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        }
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.image.width() && y < self.image.height() {
                self.image
                    .put_pixel(x, y, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}

/// 円グラフ、タイトル、凡例を描画した画像を返す。
pub fn draw_pie_chart(shares: &[EmployeeShare]) -> Result<RgbImage> {
    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    let pie_left = (WIDTH - PIE_DIAMETER) as i32 / 2;
    let pie_top_left = Point::new(pie_left, PIE_TOP);

    for wedge in layout_wedges(shares) {
        let style = PrimitiveStyleBuilder::new()
            .fill_color(wedge.color)
            .stroke_color(OUTLINE)
            .stroke_width(1)
            .build();
        if wedge.sweep_degrees >= 360.0 {
            Circle::new(pie_top_left, PIE_DIAMETER)
                .into_styled(style)
                .draw(&mut canvas)?;
        } else {
            Sector::new(
                pie_top_left,
                PIE_DIAMETER,
                Angle::from_degrees(wedge.start_degrees),
                Angle::from_degrees(wedge.sweep_degrees),
            )
            .into_styled(style)
            .draw(&mut canvas)?;
        }
    }

    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(
        TITLE,
        Point::new(WIDTH as i32 / 2, 30),
        MonoTextStyle::new(&FONT_10X20, Rgb888::BLACK),
        centered,
    )
    .draw(&mut canvas)?;

    draw_legend(&mut canvas, shares)?;

    Ok(canvas.image)
}

/// 凡例を円グラフの下に1行ずつ描画する。下端に達したら次の列へ移る。
fn draw_legend(canvas: &mut Canvas, shares: &[EmployeeShare]) -> Result<()> {
    let heading_style = MonoTextStyle::new(&FONT_9X15_BOLD, Rgb888::BLACK);
    let label_style = MonoTextStyle::new(&FONT_7X13, Rgb888::BLACK);
    let top_aligned = TextStyleBuilder::new().baseline(Baseline::Top).build();
    let rows_per_column = ((HEIGHT as i32 - LEGEND_TOP) / LEGEND_LINE_HEIGHT).max(1) as usize;

    Text::with_text_style(
        "Legend:",
        Point::new(LEGEND_LEFT, LEGEND_TOP - 22),
        heading_style,
        top_aligned,
    )
    .draw(canvas)?;

    for (index, share) in shares.iter().enumerate() {
        let column = (index / rows_per_column) as i32;
        let row = (index % rows_per_column) as i32;
        let top_left = Point::new(
            LEGEND_LEFT + column * LEGEND_COLUMN_WIDTH,
            LEGEND_TOP + row * LEGEND_LINE_HEIGHT,
        );

        Rectangle::new(top_left, Size::new_equal(LEGEND_BOX_SIZE))
            .into_styled(
                PrimitiveStyleBuilder::new()
                    .fill_color(palette_color(index))
                    .stroke_color(Rgb888::BLACK)
                    .stroke_width(1)
                    .build(),
            )
            .draw(canvas)?;

        Text::with_text_style(
            &legend_label(share),
            top_left + Point::new(LEGEND_BOX_SIZE as i32 + 10, 4),
            label_style,
            top_aligned,
        )
        .draw(canvas)?;
    }

    Ok(())
}

/// 集計結果を円グラフのPNG画像としてファイルに書き出す。
pub struct PieChartWriter {
    path: PathBuf,
}

impl PieChartWriter {
    /// 新しい`PieChartWriter`を返す。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReportWriter<EmployeeShare> for PieChartWriter {
    fn write_report(&self, rows: &[EmployeeShare]) -> Result<PathBuf> {
        let image = draw_pie_chart(rows).context("Failed to draw pie chart")?;

        // ファイルに触れる前にメモリ上でエンコードを済ませる
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
            .context("Failed to encode pie chart as PNG")?;
        write_atomically(&self.path, &png)
            .with_context(|| format!("Failed to write pie chart: {}", self.path.display()))?;

        Ok(self.path.clone())
    }
}

//! Chart tool — render a time series as a PNG line chart.
//!
//! The x axis is categorical: each x value is a label at its index, the way
//! a category scale lays out timestamps. Text is drawn through the
//! `chart-fonts` feature (on by default); without a font backend plotters
//! cannot draw the caption at all.

use async_trait::async_trait;
use opsclaw_core::error::ToolError;
use opsclaw_core::tool::{Tool, ToolResult, parse_arguments};
use plotters::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_TITLE: &str = "Time Series Chart";
const DEFAULT_LINE_COLOR: &str = "rgb(75, 192, 192)";
const DEFAULT_BACKGROUND: &str = "white";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum XValue {
    Text(String),
    Number(serde_json::Number),
}

impl XValue {
    fn label(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartArgs {
    x_data: Vec<XValue>,
    y_data: Vec<f64>,
    x_label: String,
    y_label: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    line_color: Option<String>,
    #[serde(default)]
    background_color: Option<String>,
}

/// Everything the renderer needs, owned so it can move to a blocking thread.
struct ChartSpec {
    labels: Vec<String>,
    values: Vec<f64>,
    x_label: String,
    y_label: String,
    title: String,
    line_color: RGBAColor,
    background: RGBAColor,
    size: (u32, u32),
}

pub struct ChartTool {
    default_path: String,
    size: (u32, u32),
}

impl ChartTool {
    pub fn new(default_path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            default_path: default_path.into(),
            size: (width, height),
        }
    }
}

impl Default for ChartTool {
    fn default() -> Self {
        Self::new("chart.png", 800, 500)
    }
}

/// Check the two series before anything is drawn.
fn validate_series(x_len: usize, y_len: usize) -> Result<(), String> {
    if x_len != y_len {
        return Err(format!(
            "Error: x_data and y_data must have the same length. Got x_data.length={x_len} and y_data.length={y_len}"
        ));
    }
    if x_len == 0 {
        return Err("Error: Input data arrays cannot be empty".into());
    }
    Ok(())
}

/// Parse a CSS color: a few names, `#rgb`, `#rrggbb`, `rgb()` or `rgba()`.
pub fn parse_css_color(input: &str) -> Option<RGBAColor> {
    let s = input.trim().to_ascii_lowercase();
    let named = match s.as_str() {
        "white" => Some((255, 255, 255)),
        "black" => Some((0, 0, 0)),
        "red" => Some((255, 0, 0)),
        "green" => Some((0, 128, 0)),
        "blue" => Some((0, 0, 255)),
        "yellow" => Some((255, 255, 0)),
        "orange" => Some((255, 165, 0)),
        "purple" => Some((128, 0, 128)),
        "gray" | "grey" => Some((128, 128, 128)),
        "cyan" => Some((0, 255, 255)),
        "magenta" => Some((255, 0, 255)),
        _ => None,
    };
    if let Some((r, g, b)) = named {
        return Some(RGBAColor(r, g, b, 1.0));
    }

    if let Some(hex) = s.strip_prefix('#') {
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        return Some(RGBAColor(channel(0)?, channel(2)?, channel(4)?, 1.0));
    }

    let (inner, wants_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = s.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let expected = if wants_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }
    let channel = |p: &str| p.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    let alpha = if wants_alpha {
        parts[3].parse::<f64>().ok()?.clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some(RGBAColor(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

fn color_or_default(value: Option<&str>, default: &str) -> RGBAColor {
    let requested = value.unwrap_or(default);
    parse_css_color(requested).unwrap_or_else(|| {
        warn!(color = %requested, fallback = %default, "Unrecognized chart color");
        parse_css_color(default).unwrap_or(RGBAColor(0, 0, 0, 1.0))
    })
}

/// Y range with a little headroom; a flat series still gets a visible band.
fn y_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

fn render(spec: &ChartSpec, path: &Path) -> Result<(), String> {
    let root = BitMapBackend::new(path, spec.size).into_drawing_area();
    root.fill(&spec.background).map_err(|e| e.to_string())?;

    let n = spec.values.len();
    let (y_min, y_max) = y_range(&spec.values);
    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 18))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)
        .map_err(|e| e.to_string())?;

    let labels = &spec.labels;
    let label_at = |x: &f64| {
        let i = x.round();
        if (x - i).abs() < 1e-6 && i >= 0.0 && (i as usize) < labels.len() {
            labels[i as usize].clone()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .x_labels(n.min(12))
        .x_label_formatter(&label_at)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(|e| e.to_string())?;

    let points: Vec<(f64, f64)> = spec
        .values
        .iter()
        .enumerate()
        .map(|(i, y)| (i as f64, *y))
        .collect();
    let line_style = ShapeStyle {
        color: spec.line_color,
        filled: false,
        stroke_width: 2,
    };
    let legend_color = spec.line_color;
    chart
        .draw_series(LineSeries::new(points.iter().copied(), line_style))
        .map_err(|e| e.to_string())?
        .label(spec.title.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &legend_color));
    chart
        .draw_series(points.iter().map(|p| Circle::new(*p, 3, spec.line_color.filled())))
        .map_err(|e| e.to_string())?;
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperMiddle)
        .draw()
        .map_err(|e| e.to_string())?;

    root.present().map_err(|e| e.to_string())
}

#[async_trait]
impl Tool for ChartTool {
    fn name(&self) -> &str {
        "chart"
    }

    fn description(&self) -> &str {
        "Generates and saves a line graph from time series data"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "x_data": {
                    "type": "array",
                    "items": { "type": ["string", "number"] },
                    "description": "The x-axis data points (typically timestamps)"
                },
                "y_data": {
                    "type": "array",
                    "items": { "type": "number" },
                    "description": "The y-axis data points"
                },
                "x_label": { "type": "string", "description": "The label for the x-axis" },
                "y_label": { "type": "string", "description": "The label for the y-axis" },
                "title": { "type": "string", "description": "The title of the chart" },
                "output_path": {
                    "type": "string",
                    "description": "The file path to save the chart (defaults to chart.png in current directory)"
                },
                "line_color": {
                    "type": "string",
                    "description": "The color of the line (CSS color string)"
                },
                "background_color": {
                    "type": "string",
                    "description": "The background color of the chart (CSS color string, defaults to white)"
                }
            },
            "required": ["x_data", "y_data", "x_label", "y_label"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: ChartArgs = parse_arguments(arguments)?;

        if let Err(message) = validate_series(args.x_data.len(), args.y_data.len()) {
            return Ok(ToolResult::failure(message));
        }

        let output_path = args.output_path.unwrap_or_else(|| self.default_path.clone());
        let resolved: PathBuf = match std::path::absolute(&output_path) {
            Ok(p) => p,
            Err(e) => return Ok(chart_error(e)),
        };

        let spec = ChartSpec {
            labels: args.x_data.iter().map(XValue::label).collect(),
            values: args.y_data,
            x_label: args.x_label,
            y_label: args.y_label,
            title: args.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            line_color: color_or_default(args.line_color.as_deref(), DEFAULT_LINE_COLOR),
            background: color_or_default(args.background_color.as_deref(), DEFAULT_BACKGROUND),
            size: self.size,
        };

        debug!(path = %resolved.display(), points = spec.values.len(), "Rendering chart");

        let target = resolved.clone();
        let rendered = tokio::task::spawn_blocking(move || render(&spec, &target))
            .await
            .map_err(|e| ToolError::failed("chart", e))?;

        match rendered {
            Ok(()) => {
                let path = resolved.display().to_string();
                let message = format!("Chart saved to {path}");
                Ok(ToolResult::structured(
                    true,
                    message.clone(),
                    serde_json::json!({ "success": true, "message": message, "path": path }),
                ))
            }
            Err(e) => Ok(chart_error(e)),
        }
    }
}

fn chart_error(error: impl std::fmt::Display) -> ToolResult {
    warn!(error = %error, "Chart rendering failed");
    let message = format!("Error creating chart: {error}");
    ToolResult::structured(
        false,
        message.clone(),
        serde_json::json!({ "success": false, "message": message }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(path: &Path, x: serde_json::Value, y: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "x_data": x,
            "y_data": y,
            "x_label": "time",
            "y_label": "latency (ms)",
            "output_path": path.to_string_lossy(),
        })
    }

    #[tokio::test]
    async fn mismatched_lengths_name_both() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.png");
        let result = ChartTool::default()
            .execute(args(&path, serde_json::json!(["a", "b", "c"]), serde_json::json!([1, 2])))
            .await
            .unwrap();
        assert_eq!(
            result,
            ToolResult::failure(
                "Error: x_data and y_data must have the same length. Got x_data.length=3 and y_data.length=2"
            )
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn empty_series_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.png");
        let result = ChartTool::default()
            .execute(args(&path, serde_json::json!([]), serde_json::json!([])))
            .await
            .unwrap();
        assert_eq!(result, ToolResult::failure("Error: Input data arrays cannot be empty"));
    }

    #[tokio::test]
    async fn writes_png_at_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latency.png");
        let result = ChartTool::default()
            .execute(args(
                &path,
                serde_json::json!(["10:00", "10:05", 1700000000, "10:15"]),
                serde_json::json!([120.0, 135.5, 980.0, 128.0]),
            ))
            .await
            .unwrap();

        assert!(result.success, "{}", result.output);
        let data = result.data.unwrap();
        let reported = PathBuf::from(data["path"].as_str().unwrap());
        assert!(reported.is_absolute());
        assert_eq!(data["message"], format!("Chart saved to {}", reported.display()));

        let bytes = std::fs::read(&reported).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn title_and_labels_reach_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let render_with = |name: &str, title: &str, y_label: &str| {
            let path = dir.path().join(name);
            let mut arguments = args(&path, serde_json::json!(["a", "b"]), serde_json::json!([1, 2]));
            arguments["title"] = serde_json::json!(title);
            arguments["y_label"] = serde_json::json!(y_label);
            (path, arguments)
        };

        let (first, first_args) = render_with("first.png", "CPU usage", "percent");
        let (second, second_args) = render_with("second.png", "Error rate", "errors / min");
        let tool = ChartTool::new("unused.png", 320, 200);
        assert!(tool.execute(first_args).await.unwrap().success);
        assert!(tool.execute(second_args).await.unwrap().success);

        assert_ne!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[tokio::test]
    async fn single_flat_point_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.png");
        let result = ChartTool::new("unused.png", 320, 200)
            .execute(args(&path, serde_json::json!([1]), serde_json::json!([5])))
            .await
            .unwrap();
        assert!(result.success, "{}", result.output);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("c.png");
        let result = ChartTool::default()
            .execute(args(&path, serde_json::json!([1, 2]), serde_json::json!([1, 2])))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Error creating chart: "));
        assert_eq!(result.data.unwrap()["success"], false);
    }

    #[tokio::test]
    async fn y_data_must_be_numbers() {
        let err = ChartTool::default()
            .execute(args(Path::new("x.png"), serde_json::json!(["a"]), serde_json::json!(["b"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn css_colors() {
        let rgb = parse_css_color("rgb(75, 192, 192)").unwrap();
        assert_eq!((rgb.0, rgb.1, rgb.2), (75, 192, 192));
        let rgba = parse_css_color("rgba(0, 0, 0, 0.5)").unwrap();
        assert!((rgba.3 - 0.5).abs() < f64::EPSILON);
        let hex = parse_css_color("#ff8800").unwrap();
        assert_eq!((hex.0, hex.1, hex.2), (255, 136, 0));
        let short = parse_css_color("#fff").unwrap();
        assert_eq!((short.0, short.1, short.2), (255, 255, 255));
        assert!(parse_css_color("White").is_some());
        assert!(parse_css_color("not-a-color").is_none());
        assert!(parse_css_color("rgb(1, 2)").is_none());
    }

    #[test]
    fn flat_series_gets_band() {
        assert_eq!(y_range(&[3.0, 3.0]), (2.0, 4.0));
        let (lo, hi) = y_range(&[0.0, 100.0]);
        assert!(lo < 0.0 && hi > 100.0);
    }
}

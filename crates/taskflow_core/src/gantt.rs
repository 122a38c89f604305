//! Gantt chart geometry: date to pixel layout, whole-day drag snapping and
//! dependency arrow paths.

use crate::board::{Board, Stamp, TaskPatch};
use crate::dates;
use crate::error::AppError;
use crate::model::Task;
use std::fmt::Write as _;
use time::{Date, UtcOffset};

const ARROW_GAP: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GanttConfig {
    pub day_width: f64,
    pub row_height: f64,
    pub padding_days: i64,
}

impl Default for GanttConfig {
    fn default() -> Self {
        Self {
            day_width: 40.0,
            row_height: 36.0,
            padding_days: 2,
        }
    }
}

impl GanttConfig {
    pub fn bar_height(&self) -> f64 {
        self.row_height * 2.0 / 3.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GanttBar {
    pub task_id: String,
    pub title: String,
    pub start: Date,
    pub end: Date,
    pub row: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl GanttBar {
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyArrow {
    pub from_task: String,
    pub to_task: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GanttLayout {
    pub config: GanttConfig,
    pub timeline_start: Option<Date>,
    pub days: i64,
    pub bars: Vec<GanttBar>,
    pub arrows: Vec<DependencyArrow>,
}

impl GanttLayout {
    pub fn width(&self) -> f64 {
        self.days as f64 * self.config.day_width
    }

    pub fn height(&self) -> f64 {
        self.bars.len() as f64 * self.config.row_height
    }

    pub fn bar(&self, task_id: &str) -> Option<&GanttBar> {
        self.bars.iter().find(|bar| bar.task_id == task_id)
    }
}

/// Start and end dates a task occupies on the chart.
pub fn bar_dates(task: &Task, offset: UtcOffset) -> Result<(Date, Date), AppError> {
    let start = match (task.start_date.as_deref(), task.due_date.as_deref()) {
        (Some(start), _) => dates::parse_date(start)?,
        (None, Some(due)) => dates::parse_date(due)?,
        (None, None) => dates::date_of_timestamp(&task.created_at, offset)?,
    };
    let end = match task.due_date.as_deref() {
        Some(due) => dates::parse_date(due)?,
        None => start,
    };
    Ok((start, end.max(start)))
}

pub fn layout<'a, I>(tasks: I, config: GanttConfig, offset: UtcOffset) -> Result<GanttLayout, AppError>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut spans = Vec::new();
    for task in tasks {
        let (start, end) = bar_dates(task, offset)?;
        spans.push((task, start, end));
    }

    let (Some(earliest), Some(latest)) = (
        spans.iter().map(|(_, start, _)| *start).min(),
        spans.iter().map(|(_, _, end)| *end).max(),
    ) else {
        return Ok(GanttLayout {
            config,
            timeline_start: None,
            days: 0,
            bars: Vec::new(),
            arrows: Vec::new(),
        });
    };

    let timeline_start = dates::add_days(earliest, config.padding_days.saturating_neg())?;
    let timeline_end = dates::add_days(latest, config.padding_days)?;
    let days = dates::days_between(timeline_start, timeline_end) + 1;
    let bar_height = config.bar_height();

    let bars: Vec<GanttBar> = spans
        .iter()
        .enumerate()
        .map(|(row, (task, start, end))| GanttBar {
            task_id: task.id.clone(),
            title: task.title.clone(),
            start: *start,
            end: *end,
            row,
            x: dates::days_between(timeline_start, *start) as f64 * config.day_width,
            y: row as f64 * config.row_height + (config.row_height - bar_height) / 2.0,
            width: (dates::days_between(*start, *end) + 1) as f64 * config.day_width,
            height: bar_height,
        })
        .collect();

    let mut arrows = Vec::new();
    for (task, _, _) in &spans {
        let Some(to) = bars.iter().find(|bar| bar.task_id == task.id) else {
            continue;
        };
        for dep in &task.dependencies {
            if let Some(from) = bars.iter().find(|bar| &bar.task_id == dep) {
                arrows.push(DependencyArrow {
                    from_task: from.task_id.clone(),
                    to_task: to.task_id.clone(),
                    path: dependency_path(from, to, &config),
                });
            }
        }
    }

    Ok(GanttLayout {
        config,
        timeline_start: Some(timeline_start),
        days,
        bars,
        arrows,
    })
}

/// Elbow path from the right edge of `from` to the left edge of `to`. When
/// `to` starts before the elbow the path detours through the gap between
/// rows.
pub fn dependency_path(from: &GanttBar, to: &GanttBar, config: &GanttConfig) -> String {
    let (x1, y1) = (from.right(), from.center_y());
    let (x2, y2) = (to.x, to.center_y());
    let elbow = x1 + ARROW_GAP;
    if x2 - ARROW_GAP >= elbow {
        format!("M {x1} {y1} H {elbow} V {y2} H {x2}")
    } else {
        let gap_y = if y2 >= y1 {
            (from.row as f64 + 1.0) * config.row_height
        } else {
            from.row as f64 * config.row_height
        };
        let back = x2 - ARROW_GAP;
        format!("M {x1} {y1} H {elbow} V {gap_y} H {back} V {y2} H {x2}")
    }
}

/// Rounds a pixel delta to whole days.
pub fn snap_days(delta_px: f64, day_width: f64) -> i64 {
    if day_width <= 0.0 {
        return 0;
    }
    (delta_px / day_width).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    ResizeStart,
    ResizeEnd,
}

/// New `(start, end)` after dragging by `days`; resizing never shrinks the
/// bar below one day.
pub fn drag_dates(
    start: Date,
    end: Date,
    mode: DragMode,
    days: i64,
) -> Result<(Date, Date), AppError> {
    Ok(match mode {
        DragMode::Move => (dates::add_days(start, days)?, dates::add_days(end, days)?),
        DragMode::ResizeStart => (dates::add_days(start, days)?.min(end), end),
        DragMode::ResizeEnd => (start, dates::add_days(end, days)?.max(start)),
    })
}

impl Board {
    /// Persists a drag on the chart as new start and due dates.
    pub fn apply_drag(
        &mut self,
        task_id: &str,
        mode: DragMode,
        delta_px: f64,
        config: &GanttConfig,
        offset: UtcOffset,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let task = self.task(task_id)?;
        let days = snap_days(delta_px, config.day_width);
        if days == 0 {
            return Ok(task.clone());
        }
        let (start, end) = bar_dates(task, offset)?;
        let (start, end) = drag_dates(start, end, mode, days)?;
        let id = task.id.clone();
        let patch = TaskPatch {
            start_date: Some(Some(dates::format_date(start)?)),
            due_date: Some(Some(dates::format_date(end)?)),
            ..TaskPatch::default()
        };
        self.update_task(&id, patch, stamp)
    }
}

/// One text row per bar, one character per day.
pub fn render_ascii(layout: &GanttLayout) -> String {
    let Some(start) = layout.timeline_start else {
        return String::new();
    };
    let end = dates::add_days(start, layout.days - 1).unwrap_or(start);
    let label_width = layout
        .bars
        .iter()
        .map(|bar| bar.title.chars().count())
        .max()
        .unwrap_or(0)
        .min(24);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:label_width$}  {} .. {}",
        "",
        start,
        end
    );
    for bar in &layout.bars {
        let offset = dates::days_between(start, bar.start).max(0) as usize;
        let length = (dates::days_between(bar.start, bar.end) + 1) as usize;
        let trailing = (layout.days as usize).saturating_sub(offset + length);
        let title: String = bar.title.chars().take(label_width).collect();
        let _ = writeln!(
            out,
            "{title:label_width$}  {}{}{}",
            ".".repeat(offset),
            "#".repeat(length),
            ".".repeat(trailing)
        );
    }
    out
}

/// Standalone SVG document with bars, labels and dependency arrows.
pub fn render_svg(layout: &GanttLayout) -> String {
    let width = layout.width();
    let height = layout.height();
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    out.push_str(
        "  <defs><marker id=\"arrow\" markerWidth=\"8\" markerHeight=\"8\" refX=\"8\" refY=\"4\" orient=\"auto\"><path d=\"M 0 0 L 8 4 L 0 8 z\"/></marker></defs>\n",
    );
    for bar in &layout.bars {
        let _ = writeln!(
            out,
            r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="4"><title>{}</title></rect>"#,
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            escape_xml(&bar.title)
        );
    }
    for arrow in &layout.arrows {
        let _ = writeln!(
            out,
            r#"  <path d="{}" fill="none" stroke="black" marker-end="url(#arrow)"/>"#,
            arrow.path
        );
    }
    out.push_str("</svg>\n");
    out
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

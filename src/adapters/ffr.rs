//! FlashFlashRevolution adapter
//!
//! Parses chart payloads from the FFR chart API. Each chart row is
//! `[beat, direction, color, time_ms]`; only the direction and the time are
//! used. Directions map to one-hot 4-key steps, times are re-based to the
//! first row and converted to seconds.

use crate::error::ComputeError;
use crate::note::{Step, DEFAULT_CHANNELS};
use crate::schema::{ChartDocument, ChartId, ChartRecord};
use serde::Deserialize;
use serde_json::Value;

use super::ChartPayloadAdapter;

const DIRECTION_COLUMN: usize = 1;
const TIME_COLUMN: usize = 3;

/// FFR chart payload adapter
pub struct FfrAdapter;

impl ChartPayloadAdapter for FfrAdapter {
    fn parse(&self, raw_json: &str) -> Result<ChartDocument, ComputeError> {
        let payload: FfrPayload = serde_json::from_str(raw_json)?;

        let rows = payload
            .chart
            .iter()
            .enumerate()
            .map(|(i, row)| parse_row(i, row))
            .collect::<Result<Vec<_>, _>>()?;

        let start_ms = rows.iter().map(|&(_, ms)| ms).fold(f64::INFINITY, f64::min);
        let chart = rows
            .into_iter()
            .map(|(step, ms)| ChartRecord {
                time: (ms - start_ms) / 1000.0,
                step: step.to_string(),
            })
            .collect();

        Ok(ChartDocument {
            id: payload.level.map(ChartId::Number),
            name: payload.name,
            difficulty: payload.difficulty,
            chart,
        })
    }
}

fn parse_row(index: usize, row: &[Value]) -> Result<(Step, f64), ComputeError> {
    let column = |c: usize| {
        row.get(c).ok_or_else(|| {
            ComputeError::ParseError(format!(
                "chart row {index} has {} columns, expected at least {}",
                row.len(),
                TIME_COLUMN + 1
            ))
        })
    };

    let channel = parse_direction(column(DIRECTION_COLUMN)?).ok_or_else(|| {
        ComputeError::ParseError(format!("chart row {index} has an unknown direction"))
    })?;
    let time_ms = parse_number(column(TIME_COLUMN)?).ok_or_else(|| {
        ComputeError::ParseError(format!("chart row {index} has a non-numeric time"))
    })?;

    let step = Step::single(channel, DEFAULT_CHANNELS)?;
    Ok((step, time_ms))
}

/// Direction column: receptor index or arrow letter
fn parse_direction(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|c| c as usize).filter(|&c| c < DEFAULT_CHANNELS),
        Value::String(s) => match s.to_ascii_uppercase().as_str() {
            "L" => Some(0),
            "D" => Some(1),
            "U" => Some(2),
            "R" => Some(3),
            other => other.parse::<usize>().ok().filter(|&c| c < DEFAULT_CHANNELS),
        },
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
struct FfrPayload {
    level: Option<i64>,
    name: Option<String>,
    difficulty: Option<u32>,
    #[serde(default)]
    chart: Vec<Vec<Value>>,
}

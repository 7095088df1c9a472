use crate::assignment::CoordinateMapping;
use crate::database::Measurement;
use crate::interpolation::Grid;
use crate::signal::{shade, signal_quality, BANDS};
use anyhow::Result;
use chrono::{TimeZone, Utc};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub struct ReportGenerator;

impl ReportGenerator {
    /// Text rendering of a grid, one shade character per cell
    pub fn write_heatmap<W: Write>(writer: &mut W, grid: &Grid, sample_count: usize) -> Result<()> {
        writeln!(writer, "========================================")?;
        writeln!(writer, "          SIGNAL HEAT MAP")?;
        writeln!(writer, "========================================")?;
        writeln!(
            writer,
            "Generated: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(writer, "Grid: {}x{}  Samples: {}", grid.width(), grid.height(), sample_count)?;
        if let (Some(min), Some(max)) = (grid.min(), grid.max()) {
            writeln!(writer, "Range: {} dBm to {} dBm", min, max)?;
        }
        writeln!(writer)?;

        let border = format!("+{}+", "-".repeat(grid.width()));
        writeln!(writer, "{}", border)?;
        for row in grid.rows() {
            let line: String = row.iter().map(|&v| shade(v)).collect();
            writeln!(writer, "|{}|", line)?;
        }
        writeln!(writer, "{}", border)?;
        writeln!(writer)?;

        writeln!(writer, "Legend:")?;
        for (rssi, label) in BANDS {
            writeln!(writer, "  {}  {:<16} {}", shade(rssi), label, signal_quality(rssi))?;
        }

        Ok(())
    }

    pub fn generate_heatmap(grid: &Grid, sample_count: usize, output: Option<&Path>) -> Result<()> {
        let mut writer = open_output(output)?;
        Self::write_heatmap(&mut writer, grid, sample_count)
    }

    pub fn generate_heatmap_json(grid: &Grid, output: Option<&Path>) -> Result<()> {
        let mut writer = open_output(output)?;
        serde_json::to_writer_pretty(&mut writer, grid)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn write_coordinates<W: Write>(writer: &mut W, mapping: &CoordinateMapping) -> Result<()> {
        if mapping.is_empty() {
            writeln!(writer, "No coordinates assigned.")?;
            return Ok(());
        }

        writeln!(writer, "Location             | Coordinate")?;
        writeln!(writer, "---------------------|--------------------------")?;
        for (name, coordinate) in mapping {
            writeln!(writer, "{:<20} | {}", name, coordinate)?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total locations: {}", mapping.len())?;

        Ok(())
    }

    pub fn write_measurements<W: Write>(writer: &mut W, measurements: &[Measurement]) -> Result<()> {
        writeln!(writer, "Time                 | Location             | Signal")?;
        writeln!(writer, "---------------------|----------------------|----------------")?;
        for m in measurements {
            writeln!(
                writer,
                "{} | {:<20} | {:4}dBm {}",
                format_timestamp(m.timestamp),
                m.location,
                m.rssi,
                signal_quality(m.rssi)
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total measurements: {}", measurements.len())?;

        Ok(())
    }
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    Ok(writer)
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

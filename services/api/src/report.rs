use crate::infra::parse_date;
use chrono::NaiveDate;
use clap::Args;
use hmpi_monitor::error::AppError;
use hmpi_monitor::monitoring::{
    assess, parse_samples, score_samples, template_csv, ChartData, DashboardError, RecordId,
    Sample, SampleImportRow, SampleReadings, ScoredBatch,
};
use hmpi_monitor::telemetry;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Measured concentration (Si)
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) si: f64,
    /// Ideal or standard concentration (Ii)
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) ii: f64,
    /// Maximum permissible concentration (Mi)
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) mi: f64,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TemplateArgs {
    /// Write the template to a file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Import file following the sample template
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Only include samples on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) since: Option<NaiveDate>,
    /// Only include samples on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) until: Option<NaiveDate>,
    /// Print the chart data as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OfflineReport {
    source: String,
    sample_count: usize,
    unscorable: Vec<RecordId>,
    charts: ChartData,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let readings = SampleReadings {
        si: args.si,
        ii: args.ii,
        mi: args.mi,
    };

    let assessment = assess(&readings)?;
    println!(
        "HMPI {:.2} | {} ({})",
        assessment.hmpi,
        assessment.level.label(),
        assessment.color
    );
    Ok(())
}

pub(crate) fn run_template(args: TemplateArgs) -> Result<(), AppError> {
    let template = template_csv();
    match args.output {
        Some(path) => {
            std::fs::write(&path, template)?;
            println!("Template written to {}", path.display());
        }
        None => print!("{template}"),
    }
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    telemetry::init_cli("warn")?;

    let ReportArgs {
        csv,
        since,
        until,
        json,
    } = args;

    let file = File::open(&csv)?;
    let rows = parse_samples(BufReader::new(file)).map_err(DashboardError::from)?;
    let samples = rows
        .iter()
        .enumerate()
        .map(|(index, row)| offline_sample(index, row))
        .filter(|sample| since.map_or(true, |since| sample.date >= since))
        .filter(|sample| until.map_or(true, |until| sample.date <= until));
    let batch = score_samples(samples);

    let report = OfflineReport {
        source: csv.display().to_string(),
        sample_count: batch.scored.len() + batch.unscorable.len(),
        charts: ChartData::from_scored(&batch.scored),
        unscorable: batch.unscorable.clone(),
    };

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        println!("{rendered}");
    } else {
        render_report(&report, &batch);
    }
    Ok(())
}

/// Import rows have no store id yet; the sample label stands in, or the row number when
/// the label is blank.
fn offline_sample(index: usize, row: &SampleImportRow) -> Sample {
    let id = if row.sample_label.is_empty() {
        format!("row-{}", index + 1)
    } else {
        row.sample_label.clone()
    };

    Sample {
        id: RecordId(id),
        project_id: row.project_id.clone(),
        metal: row.metal.clone(),
        readings: row.readings,
        latitude: row.latitude,
        longitude: row.longitude,
        district: row.district.clone(),
        city: row.city.clone(),
        date: row.date,
        created_at: None,
    }
}

fn render_report(report: &OfflineReport, batch: &ScoredBatch) {
    println!("HMPI report for {}", report.source);
    println!(
        "Samples: {} scored, {} unscorable",
        batch.scored.len(),
        report.unscorable.len()
    );

    println!("\nRisk distribution");
    for entry in &report.charts.risk_distribution {
        println!("- {} ({}): {}", entry.name, entry.color, entry.value);
    }

    if report.charts.metal_summary.is_empty() {
        println!("\nMetals: none");
    } else {
        println!("\nMetals");
        for entry in &report.charts.metal_summary {
            println!(
                "- {}: {} samples, average HMPI {:.2}",
                entry.name, entry.count, entry.avg_hmpi
            );
        }
    }

    if !report.charts.time_series.is_empty() {
        println!("\nTimeline");
        for point in &report.charts.time_series {
            println!("- {}: {:.2}", point.date, point.hmpi);
        }
    }

    if !report.unscorable.is_empty() {
        println!("\nUnscorable samples (zero Ii or non-finite index)");
        for id in &report.unscorable {
            println!("- {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmpi_monitor::monitoring::ScoringError;

    #[test]
    fn unscorable_readings_fail_the_score_command() {
        let err = run_score(ScoreArgs {
            si: 0.09,
            ii: 0.0,
            mi: 0.7,
        })
        .expect_err("zero ideal concentration");
        assert!(matches!(err, AppError::Scoring(ScoringError::ZeroIdeal)));

        run_score(ScoreArgs {
            si: 0.09,
            ii: 0.3,
            mi: 0.7,
        })
        .expect("valid readings score");
    }

    #[test]
    fn offline_samples_fall_back_to_row_numbers() {
        let csv = template_csv().replace("S002", "");
        let rows = parse_samples(csv.as_bytes()).expect("template parses");

        let first = offline_sample(0, &rows[0]);
        let second = offline_sample(1, &rows[1]);
        assert_eq!(first.id, RecordId::from("S001"));
        assert_eq!(second.id, RecordId::from("row-2"));
    }

    #[test]
    fn report_scores_template_rows() {
        let rows = parse_samples(template_csv().as_bytes()).expect("template parses");
        let batch = score_samples(
            rows.iter()
                .enumerate()
                .map(|(index, row)| offline_sample(index, row)),
        );
        let charts = ChartData::from_scored(&batch.scored);

        assert!(batch.unscorable.is_empty());
        assert_eq!(charts.metal_summary.len(), 2);
        assert_eq!(charts.time_series[0].hmpi, 21.0);
    }
}

use std::{fs::File, io::BufWriter, path::Path};

use binroute_optimizer::solution::solution::Solution;
use comfy_table::Table;
use serde::Serialize;

pub fn routes_table(solution: &Solution) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "vehicle",
        "stops",
        "distance (km)",
        "duration",
        "cost",
        "on time",
        "utilization",
    ]);

    for route in &solution.routes {
        table.add_row(vec![
            route.vehicle_id.clone(),
            route.len().to_string(),
            format!("{:.2}", route.distance_km),
            format!("{:#}", route.duration),
            format!("{:.2}", route.cost),
            format!("{:.0}%", route.service_quality * 100.0),
            format!("{:.0}%", route.capacity_utilization * 100.0),
        ]);
    }

    table
}

pub fn print_summary(solution: &Solution) {
    println!("{}", routes_table(solution));
    println!(
        "version {} | {} served | {} unassigned | score {} | {} iterations{}",
        solution.version(),
        solution.metrics.served,
        solution.metrics.unassigned,
        solution.metrics.score,
        solution.metadata.iterations,
        if solution.metadata.estimated_distances {
            " | estimated distances"
        } else {
            ""
        },
    );

    for unassigned in &solution.unassigned {
        println!("unassigned {}: {}", unassigned.bin_id, unassigned.reason);
    }
    for warning in &solution.warnings {
        println!("warning: {warning}");
    }
}

/// Writes `value` as JSON to `out`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(BufWriter::new(file), value)?;
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }

    Ok(())
}

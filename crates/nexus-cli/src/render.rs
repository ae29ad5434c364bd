//! Salida de texto para la terminal (sustituye el gráfico de torta).

use nexus_domain::AttendanceStats;

const BAR_WIDTH: usize = 40;

/// Resumen de asistencia: total asistido destacado y desglose con barras.
pub fn attendance_breakdown(stats: &AttendanceStats) -> String {
    let (attended_cells, not_attended_cells) = match stats.total() {
        0 => (0, 0),
        total => {
            let cells = ((stats.total_attended as f64 / total as f64) * BAR_WIDTH as f64).round() as usize;
            (cells, BAR_WIDTH - cells)
        }
    };
    format!("Attended: {}\n\nAttendance Breakdown\n  Attended     {} {:.1}% ({})\n  Not Attended {} {:.1}% ({})",
            stats.total_attended,
            bar(attended_cells),
            stats.attended_percent(),
            stats.total_attended,
            bar(not_attended_cells),
            stats.not_attended_percent(),
            stats.total_not_attended)
}

fn bar(cells: usize) -> String {
    format!("[{}{}]", "#".repeat(cells), " ".repeat(BAR_WIDTH - cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_split_proportionally() {
        let text = attendance_breakdown(&AttendanceStats::new(3, 1));
        assert!(text.starts_with("Attended: 3\n"));
        assert!(text.contains(&format!("[{}{}] 75.0% (3)", "#".repeat(30), " ".repeat(10))));
        assert!(text.contains(&format!("[{}{}] 25.0% (1)", "#".repeat(10), " ".repeat(30))));
    }

    #[test]
    fn empty_store_draws_empty_bars() {
        let text = attendance_breakdown(&AttendanceStats::default());
        let empty = format!("[{}]", " ".repeat(BAR_WIDTH));
        assert_eq!(text.matches(&empty).count(), 2);
    }
}

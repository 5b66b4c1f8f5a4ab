use crate::session::Session;

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open().await?;
    let report = session.controller.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.subjects.is_empty() {
        println!("No subjects recorded yet.");
        return Ok(());
    }
    for m in &report.subjects {
        let semester = m
            .semester_total
            .map(|total| format!("  of {total} this semester"))
            .unwrap_or_default();
        println!(
            "{:<32} {:>3}/{:<3} {:>3}%  missed {:<3} {}{semester}",
            m.name, m.attended, m.conducted, m.percentage, m.missed, m.band
        );
    }
    let o = &report.overall;
    println!(
        "{:<32} {:>3}/{:<3} {:>3}%  missed {:<3} {}",
        "Overall", o.attended, o.conducted, o.percentage, o.missed, o.band
    );
    Ok(())
}

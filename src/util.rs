use std::time::Instant;

pub fn print_hms(start: &Instant) {
    println!("Elapsed time: {}", hms(start.elapsed().as_secs()));
}

fn hms(total_seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

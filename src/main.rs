fn main() {
    if let Err(err) = metric_frames::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = runqc::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

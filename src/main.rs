fn main() {
    if let Err(error) = tardis::run_cli() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

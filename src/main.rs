fn main() {
    if let Err(err) = prequel::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

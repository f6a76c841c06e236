fn main() {
    if let Err(err) = datasight::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

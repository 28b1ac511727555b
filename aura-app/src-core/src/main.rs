fn main() {
    if let Err(e) = aura_app_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

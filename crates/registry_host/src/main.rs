use lib_registry_host::init;

fn main() {
    if let Err(e) = init() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

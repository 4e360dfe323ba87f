//! Version command

/// Execute version command
pub fn execute(json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            })
        );
    } else {
        println!("latch {}", env!("CARGO_PKG_VERSION"));
        println!("rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }
}

//! Terminal output helpers for the CLI host

/// Display a welcome banner.
pub fn display_banner() {
    println!("\n╔═══════════════════════════════════════════════════════════╗");
    println!("║                                                           ║");
    println!("║        Cardiorespiratory Simulator                       ║");
    println!("║                                                           ║");
    println!("╚═══════════════════════════════════════════════════════════╝\n");
}

/// Display a progress message.
pub fn progress(message: &str) {
    println!("⏳ {}", message);
}

/// Display a success message.
pub fn success(message: &str) {
    println!("✅ {}", message);
}

/// Display an error message.
pub fn error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Display an info message.
pub fn info(message: &str) {
    println!("ℹ️  {}", message);
}

use std::env;
use std::path::PathBuf;

fn main() {
    let target = env::var("TARGET").unwrap_or_default();

    // reqwest's TLS stack needs the system frameworks on Apple targets
    if target.contains("apple") {
        println!("cargo:rustc-link-lib=framework=Foundation");
        println!("cargo:rustc-link-lib=framework=Security");
        println!("cargo:rustc-link-lib=framework=SystemConfiguration");
    }

    // Copy header file next to the built library for the Xcode project
    let header_src = "include/roster_core.h";
    if let Ok(out_dir) = env::var("OUT_DIR") {
        let out_path = PathBuf::from(out_dir);
        if let Some(target_dir) = out_path.ancestors().nth(3) {
            if std::path::Path::new(header_src).exists() {
                if let Err(e) = std::fs::copy(header_src, target_dir.join("roster_core.h")) {
                    println!("cargo:warning=Failed to copy header file: {}", e);
                }
            }
        }
    }

    println!("cargo:rerun-if-changed={}", header_src);
    println!("cargo:rerun-if-changed=build.rs");
}

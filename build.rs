// build.rs

use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let Ok(out_dir) = env::var("OUT_DIR") else {
        panic!("OUT_DIR not set by cargo");
    };
    let dest_path = Path::new(&out_dir).join("build_info.rs");

    // stamped into the startup log line
    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    if let Err(e) = fs::write(
        &dest_path,
        format!("pub const BUILD_DATE: &str = \"{}\";", build_date),
    ) {
        panic!("unable to write build info: {e}");
    }

    println!("cargo:rerun-if-changed=build.rs");
}

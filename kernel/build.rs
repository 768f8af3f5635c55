use std::env;
use std::path::Path;

fn main() {
	let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("linker.ld");
	println!("cargo:rerun-if-changed={}", script.display());

	// Only the bare-metal image gets the higher-half layout.
	if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
		println!("cargo:rustc-link-arg-bins=-T{}", script.display());
	}
}

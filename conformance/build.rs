use packetgen::GenerateOptions;
use std::path::PathBuf;

fn main() {
    let src = PathBuf::from("protocol/image.idl");
    println!("cargo:rerun-if-changed={}", src.display());

    let out_dir = std::env::var("OUT_DIR").unwrap();
    let dest = PathBuf::from(out_dir).join("image_protocol.rs");
    if let Err(e) = packetgen::generate_file(&src, &dest, &GenerateOptions::default()) {
        panic!("{}: {}", src.display(), e);
    }
}

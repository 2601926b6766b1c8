/// Builds the gRPC client and server code for the `regiond.proto` definition
/// using `tonic-prost-build`.
///
/// The generated module and an encoded file descriptor set (consumed by the
/// reflection service) are written to the crate's `OUT_DIR`.
///
/// # Files and Paths
///
/// - Proto file: `proto/regiond.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails, which aborts the
/// build with the underlying `protoc` diagnostics.
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("regiond_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/regiond.proto");

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/regiond.proto"], &["proto"])
        .unwrap();
}

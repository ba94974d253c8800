//! Build script for proto compilation.
//!
//! The provider protocol is owned by Hemmer core; this crate vendors the
//! .proto file and compiles the server-side types at build time.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}

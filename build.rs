//! Generates the gRPC wire types and service stubs from `proto/staff.proto`.
//!
//! The descriptor set is compiled with protox so no system `protoc` is needed.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/staff.proto");

    let file_descriptors = protox::compile(["staff.proto"], ["proto"])?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_fds(file_descriptors)?;

    Ok(())
}

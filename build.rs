// Build script for pandoc-converter.
// Generates the gRPC server and client from proto/converter/v1/converter.proto.

fn main() {
    // Use vendored protoc from protoc-bin-vendored
    std::env::set_var(
        "PROTOC",
        protoc_bin_vendored::protoc_bin_path().expect("vendored protoc not available"),
    );

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true) // client is used by the integration tests
        .compile_protos(&["proto/converter/v1/converter.proto"], &["proto/"])
        .unwrap_or_else(|e| panic!("Failed to compile protos: {}", e));

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/");
}

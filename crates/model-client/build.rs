fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the bundled protoc so builds don't depend on a system install
    let protoc_path =
        protoc_bin_vendored::protoc_bin_path().expect("failed to find bundled protoc");
    std::env::set_var("PROTOC", protoc_path);

    println!("cargo:rerun-if-changed=../../proto/inference.proto");
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["../../proto/inference.proto"], &["../../proto"])?;
    Ok(())
}
